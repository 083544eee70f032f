use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use strata_core::TableMetaData;
use strata_rules::RuleMetaData;

use crate::ResourceSet;

/// Table catalog of one schema. Patched in place by table deltas, so it is shared by
/// every snapshot that references the schema.
#[derive(Debug, Default)]
pub struct SchemaObject {
    tables: RwLock<FxHashMap<String, TableMetaData>>,
}

impl SchemaObject {
    pub fn new(tables: impl IntoIterator<Item = TableMetaData>) -> Self {
        Self { tables: RwLock::new(tables.into_iter().map(|t| (t.name.clone(), t)).collect()) }
    }

    /// Upsert under the table's own name; returns the replaced entry.
    pub fn put(&self, table: TableMetaData) -> Option<TableMetaData> {
        self.tables.write().insert(table.name.clone(), table)
    }

    pub fn remove(&self, name: &str) -> Option<TableMetaData> { self.tables.write().remove(name) }

    pub fn get(&self, name: &str) -> Option<TableMetaData> { self.tables.read().get(name).cloned() }

    pub fn contains(&self, name: &str) -> bool { self.tables.read().contains_key(name) }

    pub fn len(&self) -> usize { self.tables.read().len() }

    pub fn is_empty(&self) -> bool { self.tables.read().is_empty() }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

/// Everything the router needs for one schema. Fields are swapped as whole `Arc`s.
#[derive(Debug, Clone)]
pub struct SchemaContext {
    name: String,
    resources: Arc<ResourceSet>,
    rules: Arc<RuleMetaData>,
    schema: Arc<SchemaObject>,
}

impl SchemaContext {
    pub fn new(name: impl Into<String>, resources: ResourceSet, rules: RuleMetaData, schema: SchemaObject) -> Self {
        Self { name: name.into(), resources: Arc::new(resources), rules: Arc::new(rules), schema: Arc::new(schema) }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn resources(&self) -> &Arc<ResourceSet> { &self.resources }

    pub fn rules(&self) -> &Arc<RuleMetaData> { &self.rules }

    pub fn schema(&self) -> &Arc<SchemaObject> { &self.schema }

    /// Same resources and catalog, new rule list.
    pub fn with_rules(&self, rules: RuleMetaData) -> Self {
        Self { rules: Arc::new(rules), ..self.clone() }
    }

    /// Adopt an existing catalog (e.g. when a schema is reloaded).
    pub fn with_catalog(self, schema: Arc<SchemaObject>) -> Self {
        Self { schema, ..self }
    }

    /// Same catalog, new resources and the rules rebuilt against them.
    pub fn with_resources(&self, resources: ResourceSet, rules: RuleMetaData) -> Self {
        Self { resources: Arc::new(resources), rules: Arc::new(rules), ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_rules_preserves_other_fields() {
        let ctx = SchemaContext::new("db", ResourceSet::default(), RuleMetaData::default(), SchemaObject::default());
        let next = ctx.with_rules(RuleMetaData::default());
        assert!(Arc::ptr_eq(ctx.resources(), next.resources()));
        assert!(Arc::ptr_eq(ctx.schema(), next.schema()));
        assert!(!Arc::ptr_eq(ctx.rules(), next.rules()));
    }

    #[test]
    fn catalog_patch_is_shared() {
        let ctx = SchemaContext::new("db", ResourceSet::default(), RuleMetaData::default(), SchemaObject::default());
        let next = ctx.with_rules(RuleMetaData::default());
        ctx.schema().put(TableMetaData::new("t_order"));
        assert!(next.schema().contains("t_order"));
        assert!(next.schema().remove("t_order").is_some());
        assert!(ctx.schema().is_empty());
    }
}
