use std::any::Any;

use rustc_hash::{FxHashMap, FxHashSet};
use strata_core::{RuleConfiguration, ShardingRuleConfiguration, ShardingTableRuleConfiguration};

use crate::{Rule, RuleError};

/// Logic table → actual data sources. Rebuilt whenever its configuration or the schema's
/// data sources change.
#[derive(Debug)]
pub struct ShardingRule {
    config: ShardingRuleConfiguration,
    tables: FxHashMap<String, ShardingTableRuleConfiguration>,
    broadcast: FxHashSet<String>,
}

impl ShardingRule {
    pub fn new(config: ShardingRuleConfiguration, data_sources: &FxHashSet<String>) -> Result<Self, RuleError> {
        let missing = config
            .tables
            .iter()
            .flat_map(|t| t.data_sources.iter())
            .chain(config.default_data_source.iter())
            .find(|ds| !data_sources.contains(ds.as_str()));
        if let Some(ds) = missing {
            return Err(RuleError::MissingDataSource { rule: "sharding", data_source: ds.clone() });
        }
        let mut tables = FxHashMap::default();
        for t in config.tables.iter() {
            if t.data_sources.is_empty() {
                return Err(RuleError::Invalid { rule: "sharding", message: format!("table `{}` has no data sources", t.logic_table) });
            }
            tables.insert(t.logic_table.to_ascii_lowercase(), t.clone());
        }
        let broadcast = config.broadcast_tables.iter().map(|t| t.to_ascii_lowercase()).collect();
        Ok(Self { config, tables, broadcast })
    }

    /// Case-insensitive lookup by logic table name.
    pub fn find_table_rule(&self, logic_table: &str) -> Option<&ShardingTableRuleConfiguration> {
        self.tables.get(&logic_table.to_ascii_lowercase())
    }

    pub fn is_broadcast_table(&self, table: &str) -> bool {
        self.broadcast.contains(&table.to_ascii_lowercase())
    }

    pub fn default_data_source(&self) -> Option<&str> {
        self.config.default_data_source.as_deref()
    }
}

impl Rule for ShardingRule {
    fn rule_type(&self) -> &'static str { "sharding" }

    fn as_any(&self) -> &dyn Any { self }

    fn configuration(&self) -> RuleConfiguration { RuleConfiguration::Sharding(self.config.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> FxHashSet<String> { v.iter().map(|s| s.to_string()).collect() }

    fn order_table() -> ShardingTableRuleConfiguration {
        ShardingTableRuleConfiguration {
            logic_table: "t_order".into(),
            data_sources: vec!["ds_0".into(), "ds_1".into()],
            sharding_column: Some("order_id".into()),
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let cfg = ShardingRuleConfiguration { tables: vec![order_table()], broadcast_tables: vec!["t_dict".into()], default_data_source: None };
        let rule = ShardingRule::new(cfg, &names(&["ds_0", "ds_1"])).unwrap();
        assert!(rule.find_table_rule("T_ORDER").is_some());
        assert!(rule.is_broadcast_table("T_Dict"));
        assert!(rule.find_table_rule("t_item").is_none());
    }

    #[test]
    fn unknown_data_source_is_rejected() {
        let cfg = ShardingRuleConfiguration { tables: vec![order_table()], ..Default::default() };
        let err = ShardingRule::new(cfg, &names(&["ds_0"])).unwrap_err();
        assert_eq!(err, RuleError::MissingDataSource { rule: "sharding", data_source: "ds_1".into() });
    }
}
