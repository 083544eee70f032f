use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::User;

/// Whether a rule lives inside one schema or applies cluster-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleScope {
    Schema,
    Global,
}

/// Serializable rule descriptor as persisted in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleConfiguration {
    Sharding(ShardingRuleConfiguration),
    ReadwriteSplitting(ReadwriteSplittingRuleConfiguration),
    Authority(AuthorityRuleConfiguration),
    Transaction(TransactionRuleConfiguration),
    SqlParser(SqlParserRuleConfiguration),
}

impl RuleConfiguration {
    pub fn scope(&self) -> RuleScope {
        match self {
            Self::Sharding(_) | Self::ReadwriteSplitting(_) => RuleScope::Schema,
            Self::Authority(_) | Self::Transaction(_) | Self::SqlParser(_) => RuleScope::Global,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sharding(_) => "sharding",
            Self::ReadwriteSplitting(_) => "readwrite-splitting",
            Self::Authority(_) => "authority",
            Self::Transaction(_) => "transaction",
            Self::SqlParser(_) => "sql-parser",
        }
    }
}

/// Named algorithm with free-form properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmConfiguration {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub props: BTreeMap<String, String>,
}

impl AlgorithmConfiguration {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), props: BTreeMap::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardingRuleConfiguration {
    #[serde(default)]
    pub tables: Vec<ShardingTableRuleConfiguration>,
    #[serde(default)]
    pub broadcast_tables: Vec<String>,
    #[serde(default)]
    pub default_data_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardingTableRuleConfiguration {
    pub logic_table: String,
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub sharding_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadwriteSplittingRuleConfiguration {
    #[serde(default)]
    pub groups: Vec<ReadwriteSplittingGroupConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadwriteSplittingGroupConfiguration {
    pub name: String,
    pub write_data_source: String,
    #[serde(default)]
    pub read_data_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityRuleConfiguration {
    #[serde(default)]
    pub users: Vec<User>,
    pub provider: AlgorithmConfiguration,
}

impl Default for AuthorityRuleConfiguration {
    fn default() -> Self {
        Self {
            users: vec![User::new("root", "root", "%")],
            provider: AlgorithmConfiguration::new("ALL_PRIVILEGES_PERMITTED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRuleConfiguration {
    pub default_type: String,
    #[serde(default)]
    pub provider_type: Option<String>,
}

impl Default for TransactionRuleConfiguration {
    fn default() -> Self {
        Self { default_type: "LOCAL".to_string(), provider_type: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOption {
    pub initial_capacity: usize,
    pub maximum_size: u64,
    #[serde(default = "CacheOption::default_concurrency")]
    pub concurrency_level: usize,
}

impl CacheOption {
    pub fn new(initial_capacity: usize, maximum_size: u64) -> Self {
        Self { initial_capacity, maximum_size, concurrency_level: Self::default_concurrency() }
    }

    fn default_concurrency() -> usize { 4 }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlParserRuleConfiguration {
    #[serde(default)]
    pub sql_comment_parse_enabled: bool,
    pub parse_tree_cache: CacheOption,
    pub sql_statement_cache: CacheOption,
}

impl Default for SqlParserRuleConfiguration {
    fn default() -> Self {
        Self {
            sql_comment_parse_enabled: false,
            parse_tree_cache: CacheOption::new(128, 1024),
            sql_statement_cache: CacheOption::new(2000, 65535),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_representation() {
        let cfg = RuleConfiguration::ReadwriteSplitting(ReadwriteSplittingRuleConfiguration {
            groups: vec![ReadwriteSplittingGroupConfiguration {
                name: "pr_ds".into(),
                write_data_source: "primary_ds".into(),
                read_data_sources: vec!["ds_0".into(), "ds_1".into()],
            }],
        });
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["type"], "readwrite-splitting");
        assert_eq!(v["groups"][0]["writeDataSource"], "primary_ds");
        let back: RuleConfiguration = serde_json::from_value(v).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn scopes() {
        assert_eq!(RuleConfiguration::Sharding(Default::default()).scope(), RuleScope::Schema);
        assert_eq!(RuleConfiguration::Authority(Default::default()).scope(), RuleScope::Global);
        assert_eq!(RuleConfiguration::SqlParser(Default::default()).kind(), "sql-parser");
    }
}
