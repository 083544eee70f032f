use std::collections::BTreeMap;

use parking_lot::RwLock;
use strata_core::{ConfigurationProperties, DataSourceMap, RuleConfiguration};

use crate::{MetaDataPersistService, PersistError, PersistResult};

#[derive(Debug, Default, Clone)]
struct SchemaEntry {
    data_sources: DataSourceMap,
    rules: Vec<RuleConfiguration>,
}

#[derive(Debug, Default)]
struct State {
    schemas: BTreeMap<String, SchemaEntry>,
    global_rules: Vec<RuleConfiguration>,
    props: ConfigurationProperties,
    failing: Vec<String>,
}

/// In-memory backend for tests and embedded use. `fail_schema` makes every load for that
/// schema fail until `heal_schema` is called.
#[derive(Debug, Default)]
pub struct MemoryMetaDataStore {
    state: RwLock<State>,
}

impl MemoryMetaDataStore {
    pub fn new() -> Self { Self::default() }

    pub fn fail_schema(&self, schema: &str) {
        self.state.write().failing.push(schema.to_string());
    }

    pub fn heal_schema(&self, schema: &str) {
        self.state.write().failing.retain(|s| s != schema);
    }

    fn check(&self, schema: &str) -> PersistResult<()> {
        if self.state.read().failing.iter().any(|s| s == schema) {
            return Err(PersistError::Unavailable(format!("schema `{}` is unreachable", schema)));
        }
        Ok(())
    }
}

impl MetaDataPersistService for MemoryMetaDataStore {
    fn load_schema_names(&self) -> PersistResult<Vec<String>> { Ok(self.state.read().schemas.keys().cloned().collect()) }

    fn load_data_sources(&self, schema: &str) -> PersistResult<DataSourceMap> {
        self.check(schema)?;
        Ok(self.state.read().schemas.get(schema).map(|e| e.data_sources.clone()).unwrap_or_default())
    }

    fn load_schema_rules(&self, schema: &str) -> PersistResult<Vec<RuleConfiguration>> {
        self.check(schema)?;
        Ok(self.state.read().schemas.get(schema).map(|e| e.rules.clone()).unwrap_or_default())
    }

    fn load_global_rules(&self) -> PersistResult<Vec<RuleConfiguration>> { Ok(self.state.read().global_rules.clone()) }

    fn load_properties(&self) -> PersistResult<ConfigurationProperties> { Ok(self.state.read().props.clone()) }

    fn persist_data_sources(&self, schema: &str, data_sources: &DataSourceMap) -> PersistResult<()> {
        self.state.write().schemas.entry(schema.to_string()).or_default().data_sources = data_sources.clone();
        Ok(())
    }

    fn persist_schema_rules(&self, schema: &str, rules: &[RuleConfiguration]) -> PersistResult<()> {
        self.state.write().schemas.entry(schema.to_string()).or_default().rules = rules.to_vec();
        Ok(())
    }

    fn persist_global_rules(&self, rules: &[RuleConfiguration]) -> PersistResult<()> {
        self.state.write().global_rules = rules.to_vec();
        Ok(())
    }

    fn persist_properties(&self, props: &ConfigurationProperties) -> PersistResult<()> {
        self.state.write().props = props.clone();
        Ok(())
    }

    fn drop_schema(&self, schema: &str) -> PersistResult<()> {
        self.state.write().schemas.remove(schema);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injected_failure_is_scoped_to_schema() {
        let s = MemoryMetaDataStore::new();
        s.persist_schema_rules("a", &[]).unwrap();
        s.persist_schema_rules("b", &[]).unwrap();
        s.fail_schema("a");
        assert!(matches!(s.load_data_sources("a"), Err(PersistError::Unavailable(_))));
        assert!(s.load_data_sources("b").is_ok());
        s.heal_schema("a");
        assert!(s.load_schema_rules("a").is_ok());
    }
}
