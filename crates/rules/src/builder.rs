use std::sync::Arc;

use rustc_hash::FxHashSet;
use strata_core::{
    AuthorityRuleConfiguration, RuleConfiguration, RuleScope, SqlParserRuleConfiguration, TransactionRuleConfiguration,
};
use tracing::{debug, warn};

use crate::{AuthorityRule, ReadwriteSplittingRule, Rule, RuleError, RuleMetaData, ShardingRule, SqlParserRule, TransactionRule};

/// Global rule types, in the order they appear in the built rule list.
pub const GLOBAL_RULE_TYPES: [&str; 3] = ["authority", "transaction", "sql-parser"];

/// Build schema-scoped rules from `configs` against the schema's data source names.
/// Global configurations are skipped.
pub fn build_schema_rules(
    schema_name: &str,
    configs: &[RuleConfiguration],
    data_sources: &FxHashSet<String>,
) -> Result<RuleMetaData, RuleError> {
    let mut kept = Vec::with_capacity(configs.len());
    let mut rules: Vec<Arc<dyn Rule>> = Vec::with_capacity(configs.len());
    for cfg in configs.iter() {
        let rule: Arc<dyn Rule> = match cfg {
            RuleConfiguration::Sharding(c) => Arc::new(ShardingRule::new(c.clone(), data_sources)?),
            RuleConfiguration::ReadwriteSplitting(c) => Arc::new(ReadwriteSplittingRule::new(c.clone(), data_sources)?),
            other => {
                warn!(schema = %schema_name, rule = other.kind(), "rules: global configuration in schema scope ignored");
                continue;
            }
        };
        kept.push(cfg.clone());
        rules.push(rule);
    }
    debug!(schema = %schema_name, rules = rules.len(), "rules: schema rules built");
    Ok(RuleMetaData::new(kept, rules))
}

/// Build the authority, transaction and sql-parser rules. Missing kinds fall back to their
/// defaults; when a kind is configured more than once the last one wins.
pub fn build_global_rules<'a>(
    configs: &[RuleConfiguration],
    schema_names: impl IntoIterator<Item = &'a str>,
) -> Result<RuleMetaData, RuleError> {
    let mut authority: Option<AuthorityRuleConfiguration> = None;
    let mut transaction: Option<TransactionRuleConfiguration> = None;
    let mut parser: Option<SqlParserRuleConfiguration> = None;
    for cfg in configs.iter() {
        match cfg {
            RuleConfiguration::Authority(c) => authority = Some(c.clone()),
            RuleConfiguration::Transaction(c) => transaction = Some(c.clone()),
            RuleConfiguration::SqlParser(c) => parser = Some(c.clone()),
            other => {
                debug_assert_eq!(other.scope(), RuleScope::Schema);
                warn!(rule = other.kind(), "rules: schema configuration in global scope ignored");
            }
        }
    }
    let authority = authority.unwrap_or_default();
    let transaction = transaction.unwrap_or_default();
    let parser = parser.unwrap_or_default();
    let rules: Vec<Arc<dyn Rule>> = vec![
        Arc::new(AuthorityRule::new(authority.clone(), schema_names)?),
        Arc::new(TransactionRule::new(transaction.clone())?),
        Arc::new(SqlParserRule::new(parser.clone())?),
    ];
    let configurations = vec![
        RuleConfiguration::Authority(authority),
        RuleConfiguration::Transaction(transaction),
        RuleConfiguration::SqlParser(parser),
    ];
    Ok(RuleMetaData::new(configurations, rules))
}
