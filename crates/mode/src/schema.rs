use std::sync::Arc;
use std::time::Instant;

use strata_core::{DataSourceMap, QualifiedSchema, RuleConfiguration, TableMetaData};
use strata_persist::MetaDataPersistService;
use strata_rules::{build_schema_rules, DataSourceStatus};
use strata_store::{DataSourceFactory, ResourceSet, SchemaContext, SchemaObject, Snapshot, SnapshotWriter};
use tracing::{debug, info};

use crate::CoordinatorError;

/// Builds and patches single-schema contexts.
pub struct SchemaContextBuilder<'a> {
    persist: &'a dyn MetaDataPersistService,
    factory: &'a dyn DataSourceFactory,
}

impl<'a> SchemaContextBuilder<'a> {
    pub fn new(persist: &'a dyn MetaDataPersistService, factory: &'a dyn DataSourceFactory) -> Self {
        Self { persist, factory }
    }

    /// Load `schema_name` from persistence and build its context. An existing catalog is
    /// reused so a re-delivered add keeps tables already patched in.
    pub fn load(&self, schema_name: &str, catalog: Option<Arc<SchemaObject>>) -> Result<SchemaContext, CoordinatorError> {
        let data_sources = self.persist.load_data_sources(schema_name).map_err(CoordinatorError::persist(schema_name))?;
        let configs = self.persist.load_schema_rules(schema_name).map_err(CoordinatorError::persist(schema_name))?;
        let resources = ResourceSet::open(self.factory, &data_sources);
        let rules = build_schema_rules(schema_name, &configs, &resources.name_set()).map_err(CoordinatorError::rule(schema_name))?;
        let ctx = SchemaContext::new(schema_name, resources, rules, SchemaObject::default());
        Ok(match catalog {
            Some(schema) => ctx.with_catalog(schema),
            None => ctx,
        })
    }

    pub fn add(&self, w: &mut SnapshotWriter<'_>, schema_name: &str) -> Result<(), CoordinatorError> {
        let t0 = Instant::now();
        let existing = w.current().schema(schema_name).cloned();
        let readd = existing.is_some();
        let ctx = self.load(schema_name, existing.as_ref().map(|c| Arc::clone(c.schema())))?;
        if let Some(prev) = existing.as_ref() {
            ctx.rules().inherit_status(prev.rules());
        }
        let (data_sources, rules) = (ctx.resources().len(), ctx.rules().len());
        w.replace_schema(ctx);
        refresh_authority(&w.current());
        info!(schema = %schema_name, data_sources, rules, readd, took_ms = %t0.elapsed().as_millis(), "coordinator: schema added");
        Ok(())
    }

    /// Unknown schemas are a no-op. Resources close once the last snapshot holding them drops.
    pub fn remove(&self, w: &mut SnapshotWriter<'_>, schema_name: &str) {
        match w.remove_schema(schema_name) {
            Some(ctx) => {
                refresh_authority(&w.current());
                info!(schema = %schema_name, data_sources = ctx.resources().len(), "coordinator: schema deleted");
            }
            None => debug!(schema = %schema_name, "coordinator: delete for unknown schema ignored"),
        }
    }

    /// Patch the table catalog in place; rules and resources are left alone.
    pub fn alter_table(&self, snapshot: &Snapshot, schema_name: &str, changed: Option<TableMetaData>, deleted: Option<String>) {
        let Some(ctx) = snapshot.schema(schema_name) else {
            debug!(schema = %schema_name, "coordinator: table change for unknown schema ignored");
            return;
        };
        match (changed, deleted) {
            (Some(table), _) => {
                let name = table.name.clone();
                let replaced = ctx.schema().put(table).is_some();
                debug!(schema = %schema_name, table = %name, replaced, "coordinator: table upserted");
            }
            (None, Some(name)) => {
                let removed = ctx.schema().remove(&name).is_some();
                debug!(schema = %schema_name, table = %name, removed, "coordinator: table removed");
            }
            (None, None) => debug!(schema = %schema_name, "coordinator: empty table change ignored"),
        }
    }

    pub fn alter_rules(&self, w: &mut SnapshotWriter<'_>, schema_name: &str, configs: &[RuleConfiguration]) -> Result<(), CoordinatorError> {
        let snap = w.current();
        let Some(cur) = snap.schema(schema_name) else {
            debug!(schema = %schema_name, "coordinator: rule change for unknown schema ignored");
            return Ok(());
        };
        let rules = build_schema_rules(schema_name, configs, &cur.resources().name_set()).map_err(CoordinatorError::rule(schema_name))?;
        rules.inherit_status(cur.rules());
        let count = rules.len();
        w.replace_schema(cur.with_rules(rules));
        info!(schema = %schema_name, rules = count, "coordinator: schema rules rebuilt");
        Ok(())
    }

    /// Reconcile resources by key and rebuild rules against the new set. Rebuilt rules keep
    /// the live status of the ones they replace. A rule rebuild failure leaves the previous
    /// context installed.
    pub fn alter_data_sources(&self, w: &mut SnapshotWriter<'_>, schema_name: &str, props: &DataSourceMap) -> Result<(), CoordinatorError> {
        let snap = w.current();
        let Some(cur) = snap.schema(schema_name) else {
            debug!(schema = %schema_name, "coordinator: data source change for unknown schema ignored");
            return Ok(());
        };
        let (resources, diff) = cur.resources().reconcile(self.factory, props);
        let rules = build_schema_rules(schema_name, cur.rules().configurations(), &resources.name_set())
            .map_err(CoordinatorError::rule(schema_name))?;
        rules.inherit_status(cur.rules());
        w.replace_schema(cur.with_resources(resources, rules));
        info!(
            schema = %schema_name,
            added = ?diff.added,
            removed = ?diff.removed,
            changed = ?diff.changed,
            retained = diff.retained.len(),
            "coordinator: data sources changed"
        );
        Ok(())
    }

    /// Push a status change to every status-contained rule of the schema.
    pub fn update_status(&self, snapshot: &Snapshot, qualified: &QualifiedSchema, status: DataSourceStatus) {
        let Some(ctx) = snapshot.schema(&qualified.schema_name) else {
            debug!(target_ds = %qualified, "coordinator: status change for unknown schema ignored");
            return;
        };
        let mut updated = 0usize;
        for rule in ctx.rules().status_contained() {
            rule.update_status(&status);
            updated += 1;
        }
        debug!(target_ds = %qualified, updated, "coordinator: data source status applied");
    }
}

fn refresh_authority(snapshot: &Snapshot) {
    if let Some(authority) = snapshot.global_rules().find_authority() {
        authority.refresh_schemas(&snapshot.schema_names());
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use strata_core::{ConfigurationProperties, ShardingRuleConfiguration};
    use strata_persist::MemoryMetaDataStore;
    use strata_rules::{Rule, RuleMetaData, StatusContainedRule};
    use strata_store::SimpleDataSourceFactory;

    use super::*;

    #[derive(Debug, Default)]
    struct Recording {
        calls: AtomicUsize,
        last: Mutex<Option<DataSourceStatus>>,
    }

    impl StatusContainedRule for Recording {
        fn update_status(&self, status: &DataSourceStatus) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some(status.clone());
        }
    }

    impl Rule for Recording {
        fn rule_type(&self) -> &'static str { "recording" }

        fn as_any(&self) -> &dyn Any { self }

        fn configuration(&self) -> RuleConfiguration { RuleConfiguration::Sharding(ShardingRuleConfiguration::default()) }

        fn as_status_contained(&self) -> Option<&dyn StatusContainedRule> { Some(self) }
    }

    fn snapshot_with(rules: Vec<Arc<dyn Rule>>) -> Snapshot {
        let ctx = SchemaContext::new("db", ResourceSet::default(), RuleMetaData::new(vec![], rules), SchemaObject::default());
        Snapshot::new([ctx], RuleMetaData::default(), ConfigurationProperties::default())
    }

    #[test]
    fn status_reaches_each_status_rule_once() {
        let persist = MemoryMetaDataStore::new();
        let builder = SchemaContextBuilder::new(&persist, &SimpleDataSourceFactory);
        let recording = Arc::new(Recording::default());
        let rule: Arc<dyn Rule> = recording.clone();
        let snap = snapshot_with(vec![rule]);
        let qualified = QualifiedSchema::new("db", "ds_0");
        let status = DataSourceStatus::Disabled { schema_name: "db".into(), data_source_name: "ds_0".into(), disabled: true };
        builder.update_status(&snap, &qualified, status.clone());
        assert_eq!(recording.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recording.last.lock().as_ref(), Some(&status));

        builder.update_status(&snap, &QualifiedSchema::new("other", "ds_0"), status);
        assert_eq!(recording.calls.load(Ordering::SeqCst), 1);
    }
}
