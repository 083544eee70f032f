//! Strata core types: data sources, rule configurations, users, table metadata,
//! instance identity and the governance events delivered by the cluster registry.

#![forbid(unsafe_code)]

mod datasource;
mod event;
mod instance;
mod props;
mod rule;
mod schema;
mod user;

pub use datasource::{DataSourceMap, DataSourceProperties};
pub use event::GovernanceEvent;
pub use instance::{InstanceDefinition, InstanceType, StateType};
pub use props::{ConfigurationProperties, PropertyKey};
pub use rule::{
    AlgorithmConfiguration, AuthorityRuleConfiguration, CacheOption, ReadwriteSplittingGroupConfiguration,
    ReadwriteSplittingRuleConfiguration, RuleConfiguration, RuleScope, ShardingRuleConfiguration,
    ShardingTableRuleConfiguration, SqlParserRuleConfiguration, TransactionRuleConfiguration,
};
pub use schema::{ColumnMetaData, IndexMetaData, QualifiedSchema, TableMetaData};
pub use user::{Grantee, User};

/// Errors raised while interpreting core values coming from the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("malformed qualified schema `{0}` (expect schema.dataSource)")]
    MalformedQualifiedSchema(String),
    #[error("unknown instance state `{0}`")]
    UnknownState(String),
    #[error("unknown instance type `{0}` (expect proxy or jdbc)")]
    UnknownInstanceType(String),
}

pub mod prelude {
    pub use super::{
        ConfigurationProperties, DataSourceMap, DataSourceProperties, GovernanceEvent, Grantee, InstanceDefinition,
        QualifiedSchema, RuleConfiguration, StateType, TableMetaData, User,
    };
}
