//! Strata store: the node's metadata context.
//!
//! Readers load an immutable [`Snapshot`] without blocking; writers go through
//! [`ContextStore::write`], which serializes mutation and installs each new snapshot with
//! a single atomic swap.

#![forbid(unsafe_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use strata_core::ConfigurationProperties;
use strata_rules::RuleMetaData;
use tokio::sync::watch;
use tracing::debug;

mod instance;
mod resource;
mod schema;

pub use instance::{InstanceContext, StateContext};
pub use resource::{
    DataSourceFactory, DataSourceHandle, PooledDataSource, Resource, ResourceDiff, ResourceSet, SimpleDataSourceFactory,
};
pub use schema::{SchemaContext, SchemaObject};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("open data source `{name}`: {reason}")]
    ResourceOpen { name: String, reason: String },
    #[error("close data source `{name}`: {reason}")]
    ResourceClose { name: String, reason: String },
}

/// Immutable view of all schemas, global rules and properties at one epoch.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    epoch: u64,
    schemas: FxHashMap<String, Arc<SchemaContext>>,
    global_rules: Arc<RuleMetaData>,
    props: Arc<ConfigurationProperties>,
}

impl Snapshot {
    pub fn new(schemas: impl IntoIterator<Item = SchemaContext>, global_rules: RuleMetaData, props: ConfigurationProperties) -> Self {
        Self {
            epoch: 0,
            schemas: schemas.into_iter().map(|s| (s.name().to_string(), Arc::new(s))).collect(),
            global_rules: Arc::new(global_rules),
            props: Arc::new(props),
        }
    }

    pub fn epoch(&self) -> u64 { self.epoch }

    pub fn schema(&self, name: &str) -> Option<&Arc<SchemaContext>> { self.schemas.get(name) }

    pub fn contains_schema(&self, name: &str) -> bool { self.schemas.contains_key(name) }

    /// Sorted for stable output.
    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Arc<SchemaContext>> { self.schemas.values() }

    pub fn global_rules(&self) -> &Arc<RuleMetaData> { &self.global_rules }

    pub fn props(&self) -> &Arc<ConfigurationProperties> { &self.props }
}

/// Holder of the current snapshot and the local instance context.
pub struct ContextStore {
    current: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
    instance: Arc<InstanceContext>,
    epoch_tx: watch::Sender<u64>,
}

impl ContextStore {
    pub fn new(initial: Snapshot, instance: InstanceContext) -> Self {
        let (epoch_tx, _) = watch::channel(initial.epoch);
        Self { current: ArcSwap::from_pointee(initial), write_lock: Mutex::new(()), instance: Arc::new(instance), epoch_tx }
    }

    /// Stable reference; later installs never show through it.
    pub fn snapshot(&self) -> Arc<Snapshot> { self.current.load_full() }

    pub fn instance_context(&self) -> &Arc<InstanceContext> { &self.instance }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> { self.epoch_tx.subscribe() }

    /// Take the mutation lock. Only one writer exists at a time; readers are unaffected.
    pub fn write(&self) -> SnapshotWriter<'_> {
        SnapshotWriter { store: self, _guard: self.write_lock.lock() }
    }
}

/// Exclusive writer over the store. Each mutation installs a new snapshot immediately.
pub struct SnapshotWriter<'a> {
    store: &'a ContextStore,
    _guard: MutexGuard<'a, ()>,
}

impl SnapshotWriter<'_> {
    pub fn current(&self) -> Arc<Snapshot> { self.store.current.load_full() }

    /// Add or replace one schema entry.
    pub fn replace_schema(&mut self, ctx: SchemaContext) {
        let mut next = (*self.current()).clone();
        next.schemas.insert(ctx.name().to_string(), Arc::new(ctx));
        self.install(next);
    }

    /// Remove one schema entry; a missing schema leaves the snapshot untouched.
    pub fn remove_schema(&mut self, name: &str) -> Option<Arc<SchemaContext>> {
        let cur = self.current();
        if !cur.schemas.contains_key(name) {
            return None;
        }
        let mut next = (*cur).clone();
        let removed = next.schemas.remove(name);
        self.install(next);
        removed
    }

    pub fn replace_global_rules(&mut self, rules: RuleMetaData) {
        let mut next = (*self.current()).clone();
        next.global_rules = Arc::new(rules);
        self.install(next);
    }

    pub fn replace_properties(&mut self, props: ConfigurationProperties) {
        let mut next = (*self.current()).clone();
        next.props = Arc::new(props);
        self.install(next);
    }

    fn install(&self, mut next: Snapshot) {
        next.epoch = self.store.current.load().epoch.saturating_add(1);
        let epoch = next.epoch;
        self.store.current.store(Arc::new(next));
        self.store.epoch_tx.send_replace(epoch);
        debug!(epoch, "snapshot installed");
    }
}
