use std::any::Any;

use strata_core::{CacheOption, RuleConfiguration, SqlParserRuleConfiguration};

use crate::{Rule, RuleError};

#[derive(Debug)]
pub struct SqlParserRule {
    config: SqlParserRuleConfiguration,
}

impl SqlParserRule {
    pub fn new(config: SqlParserRuleConfiguration) -> Result<Self, RuleError> {
        for (name, c) in [("parse tree", &config.parse_tree_cache), ("sql statement", &config.sql_statement_cache)] {
            if c.initial_capacity as u64 > c.maximum_size || c.concurrency_level == 0 {
                return Err(RuleError::Invalid { rule: "sql-parser", message: format!("{} cache option {:?} is out of range", name, c) });
            }
        }
        Ok(Self { config })
    }

    pub fn sql_comment_parse_enabled(&self) -> bool { self.config.sql_comment_parse_enabled }

    pub fn parse_tree_cache(&self) -> CacheOption { self.config.parse_tree_cache }

    pub fn sql_statement_cache(&self) -> CacheOption { self.config.sql_statement_cache }
}

impl Rule for SqlParserRule {
    fn rule_type(&self) -> &'static str { "sql-parser" }

    fn as_any(&self) -> &dyn Any { self }

    fn configuration(&self) -> RuleConfiguration { RuleConfiguration::SqlParser(self.config.clone()) }
}
