//! Strata persistence: durable schema, rule and property configuration.
//!
//! Everything is a JSON value under a registry-style key (`/metadata/{schema}/dataSources`,
//! `/rules`, `/props`, ...). [`SqliteMetaDataStore`] is the on-disk backend; [`MemoryMetaDataStore`]
//! backs tests and can fail loads for a chosen schema.

#![forbid(unsafe_code)]

use strata_core::{ConfigurationProperties, DataSourceMap, RuleConfiguration};

mod memory;
mod sqlite;

pub use memory::MemoryMetaDataStore;
pub use sqlite::SqliteMetaDataStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("backend: {0}")]
    Backend(String),
    #[error("decode `{key}`: {reason}")]
    Decode { key: String, reason: String },
    #[error("unavailable: {0}")]
    Unavailable(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

impl From<anyhow::Error> for PersistError {
    fn from(e: anyhow::Error) -> Self { PersistError::Backend(format!("{:#}", e)) }
}

/// Persisted configuration as consumed by the coordinator. Absent entries load as empty.
pub trait MetaDataPersistService: Send + Sync {
    fn load_schema_names(&self) -> PersistResult<Vec<String>>;
    fn load_data_sources(&self, schema: &str) -> PersistResult<DataSourceMap>;
    fn load_schema_rules(&self, schema: &str) -> PersistResult<Vec<RuleConfiguration>>;
    fn load_global_rules(&self) -> PersistResult<Vec<RuleConfiguration>>;
    fn load_properties(&self) -> PersistResult<ConfigurationProperties>;

    fn persist_data_sources(&self, schema: &str, data_sources: &DataSourceMap) -> PersistResult<()>;
    fn persist_schema_rules(&self, schema: &str, rules: &[RuleConfiguration]) -> PersistResult<()>;
    fn persist_global_rules(&self, rules: &[RuleConfiguration]) -> PersistResult<()>;
    fn persist_properties(&self, props: &ConfigurationProperties) -> PersistResult<()>;
    fn drop_schema(&self, schema: &str) -> PersistResult<()>;
}

/// Registry-style keys shared by the backends.
pub(crate) mod keys {
    pub const GLOBAL_RULES: &str = "/rules";
    pub const PROPS: &str = "/props";

    pub fn schema(schema: &str) -> String { format!("/metadata/{}", schema) }
    pub fn data_sources(schema: &str) -> String { format!("/metadata/{}/dataSources", schema) }
    pub fn rules(schema: &str) -> String { format!("/metadata/{}/rules", schema) }
}
