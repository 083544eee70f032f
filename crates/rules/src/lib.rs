//! Strata rules: runtime rule instances built from rule configurations, the capability
//! traits the coordinator dispatches on, and the schema/global rule builders.

#![forbid(unsafe_code)]

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use strata_core::{Grantee, RuleConfiguration, User};

mod authority;
mod builder;
mod parser;
mod readwrite;
mod sharding;
mod transaction;

pub use authority::AuthorityRule;
pub use builder::{build_global_rules, build_schema_rules, GLOBAL_RULE_TYPES};
pub use parser::SqlParserRule;
pub use readwrite::ReadwriteSplittingRule;
pub use sharding::ShardingRule;
pub use transaction::{TransactionRule, TransactionType};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("{rule} rule references unknown data source `{data_source}`")]
    MissingDataSource { rule: &'static str, data_source: String },
    #[error("{rule} rule: unknown algorithm type `{type_name}`")]
    UnknownAlgorithm { rule: &'static str, type_name: String },
    #[error("{rule} rule: {message}")]
    Invalid { rule: &'static str, message: String },
}

/// Availability change for one data source, applied to rules in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceStatus {
    Disabled { schema_name: String, data_source_name: String, disabled: bool },
    PrimaryChanged { schema_name: String, group_name: String, primary_data_source_name: String },
}

impl DataSourceStatus {
    pub fn schema_name(&self) -> &str {
        match self {
            Self::Disabled { schema_name, .. } | Self::PrimaryChanged { schema_name, .. } => schema_name,
        }
    }
}

/// Rules that track data-source availability without being rebuilt.
pub trait StatusContainedRule: Send + Sync {
    fn update_status(&self, status: &DataSourceStatus);

    /// Adopt runtime status from `previous`, the instance this rule replaces.
    fn inherit_status(&self, _previous: &dyn Rule) {}
}

/// Rules that own the cluster user set.
pub trait AuthorityCapability: Send + Sync {
    fn find_user(&self, grantee: &Grantee) -> Option<User>;
    fn users(&self) -> Vec<User>;
    /// Swap the whole user set in place.
    fn replace_users(&self, users: Vec<User>);
    /// Track the schema list after schemas are added or dropped.
    fn refresh_schemas(&self, schema_names: &[String]);
}

/// A runtime rule instance. Capabilities are discovered through the `as_*` accessors.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Matches [`RuleConfiguration::kind`] for the built-in rules.
    fn rule_type(&self) -> &'static str;

    fn configuration(&self) -> RuleConfiguration;

    fn as_any(&self) -> &dyn Any;

    fn as_status_contained(&self) -> Option<&dyn StatusContainedRule> { None }

    fn as_authority(&self) -> Option<&dyn AuthorityCapability> { None }
}

/// Ordered rule instances together with the configurations they were built from.
#[derive(Debug, Clone, Default)]
pub struct RuleMetaData {
    configurations: Vec<RuleConfiguration>,
    rules: Vec<Arc<dyn Rule>>,
}

impl RuleMetaData {
    pub fn new(configurations: Vec<RuleConfiguration>, rules: Vec<Arc<dyn Rule>>) -> Self {
        Self { configurations, rules }
    }

    pub fn configurations(&self) -> &[RuleConfiguration] { &self.configurations }

    pub fn rules(&self) -> &[Arc<dyn Rule>] { &self.rules }

    pub fn len(&self) -> usize { self.rules.len() }

    pub fn is_empty(&self) -> bool { self.rules.is_empty() }

    pub fn count_of(&self, rule_type: &str) -> usize {
        self.rules.iter().filter(|r| r.rule_type() == rule_type).count()
    }

    pub fn status_contained(&self) -> impl Iterator<Item = &dyn StatusContainedRule> {
        self.rules.iter().filter_map(|r| r.as_status_contained())
    }

    /// Hand runtime status from `previous` to the matching rules of `self`. Rules are paired
    /// by type in list order.
    pub fn inherit_status(&self, previous: &RuleMetaData) {
        let mut seen: Vec<&'static str> = Vec::new();
        for rule in self.rules.iter() {
            let kind = rule.rule_type();
            let nth = seen.iter().filter(|k| **k == kind).count();
            seen.push(kind);
            let (Some(status), Some(prev)) =
                (rule.as_status_contained(), previous.rules.iter().filter(|r| r.rule_type() == kind).nth(nth))
            else {
                continue;
            };
            status.inherit_status(prev.as_ref());
        }
    }

    /// Copy sharing every rule instance, with the configuration of `config`'s kind replaced.
    pub fn with_configuration(&self, config: RuleConfiguration) -> Self {
        let mut configurations = self.configurations.clone();
        match configurations.iter_mut().find(|c| c.kind() == config.kind()) {
            Some(slot) => *slot = config,
            None => configurations.push(config),
        }
        Self { configurations, rules: self.rules.clone() }
    }

    /// First rule of concrete type `T`.
    pub fn find<T: Rule + 'static>(&self) -> Option<&T> {
        self.rules.iter().find_map(|r| r.as_any().downcast_ref::<T>())
    }

    pub fn find_authority(&self) -> Option<&dyn AuthorityCapability> {
        self.rules.iter().find_map(|r| r.as_authority())
    }
}
