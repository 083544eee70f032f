//! Resource handles owned by a schema's `ResourceSet`.
//!
//! A `Resource` is reference counted: sets and snapshots share it, and the underlying
//! handle is closed when the last owner goes away. Replacing a `ResourceSet` therefore
//! releases removed data sources only once no reader can still observe the old snapshot.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use metrics::counter;
use rustc_hash::FxHashSet;
use strata_core::{DataSourceMap, DataSourceProperties};
use tracing::{debug, warn};

use crate::StoreError;

/// An open physical data source (e.g. a connection pool).
pub trait DataSourceHandle: Send + Sync + fmt::Debug {
    fn close(&self) -> Result<(), StoreError>;
}

/// Opens handles from persisted properties.
pub trait DataSourceFactory: Send + Sync {
    fn create(&self, name: &str, props: &DataSourceProperties) -> Result<Box<dyn DataSourceHandle>, StoreError>;
}

/// In-process pool bookkeeping; opens nothing on the network.
#[derive(Debug)]
pub struct PooledDataSource {
    pub url: Option<String>,
    pub maximum_pool_size: usize,
    closed: AtomicBool,
}

impl PooledDataSource {
    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }
}

impl DataSourceHandle for PooledDataSource {
    fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::ResourceClose { name: self.url.clone().unwrap_or_default(), reason: "already closed".into() });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleDataSourceFactory;

impl DataSourceFactory for SimpleDataSourceFactory {
    fn create(&self, name: &str, props: &DataSourceProperties) -> Result<Box<dyn DataSourceHandle>, StoreError> {
        if props.data_source_class_name.trim().is_empty() {
            return Err(StoreError::ResourceOpen { name: name.to_string(), reason: "missing dataSourceClassName".into() });
        }
        Ok(Box::new(PooledDataSource {
            url: props.url().map(str::to_string),
            maximum_pool_size: props.maximum_pool_size(),
            closed: AtomicBool::new(false),
        }))
    }
}

struct ResourceInner {
    name: String,
    props: DataSourceProperties,
    handle: Box<dyn DataSourceHandle>,
}

impl Drop for ResourceInner {
    fn drop(&mut self) {
        match self.handle.close() {
            Ok(()) => {
                counter!("resource_released_total", 1);
                debug!(ds = %self.name, "resource released");
            }
            Err(e) => warn!(ds = %self.name, error = %e, "resource release failed"),
        }
    }
}

/// Shared handle to one open data source.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

impl Resource {
    pub fn open(factory: &dyn DataSourceFactory, name: &str, props: &DataSourceProperties) -> Result<Self, StoreError> {
        let handle = factory.create(name, props)?;
        counter!("resource_opened_total", 1);
        Ok(Self { inner: Arc::new(ResourceInner { name: name.to_string(), props: props.clone(), handle }) })
    }

    pub fn name(&self) -> &str { &self.inner.name }

    pub fn props(&self) -> &DataSourceProperties { &self.inner.props }

    pub fn handle(&self) -> &dyn DataSourceHandle { self.inner.handle.as_ref() }

    /// Same underlying handle (not merely equal properties).
    pub fn ptr_eq(&self, other: &Resource) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("name", &self.inner.name).field("handle", &self.inner.handle).finish()
    }
}

/// Outcome of reconciling a set against new properties.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
    pub retained: Vec<String>,
}

/// Data-source name → open resource, in persisted order.
#[derive(Debug, Default, Clone)]
pub struct ResourceSet {
    resources: IndexMap<String, Resource>,
}

impl ResourceSet {
    /// Open every data source; failures are logged and the key is left out.
    pub fn open(factory: &dyn DataSourceFactory, props: &DataSourceMap) -> Self {
        let mut resources = IndexMap::with_capacity(props.len());
        for (name, p) in props.iter() {
            match Resource::open(factory, name, p) {
                Ok(r) => { resources.insert(name.clone(), r); }
                Err(e) => warn!(ds = %name, error = %e, "resource open failed; data source skipped"),
            }
        }
        Self { resources }
    }

    /// Build the successor set for `props`: keys present in both with identical properties
    /// keep their handle, new or changed keys are opened, dropped keys are left to be
    /// released with the last snapshot referencing them.
    pub fn reconcile(&self, factory: &dyn DataSourceFactory, props: &DataSourceMap) -> (Self, ResourceDiff) {
        let mut diff = ResourceDiff::default();
        let mut resources = IndexMap::with_capacity(props.len());
        for (name, p) in props.iter() {
            match self.resources.get(name) {
                Some(existing) if existing.props() == p => {
                    diff.retained.push(name.clone());
                    resources.insert(name.clone(), existing.clone());
                    continue;
                }
                Some(_) => diff.changed.push(name.clone()),
                None => diff.added.push(name.clone()),
            }
            match Resource::open(factory, name, p) {
                Ok(r) => { resources.insert(name.clone(), r); }
                Err(e) => warn!(ds = %name, error = %e, "resource open failed; data source skipped"),
            }
        }
        diff.removed = self.resources.keys().filter(|k| !props.contains_key(*k)).cloned().collect();
        (Self { resources }, diff)
    }

    pub fn get(&self, name: &str) -> Option<&Resource> { self.resources.get(name) }

    pub fn contains(&self, name: &str) -> bool { self.resources.contains_key(name) }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.resources.keys().map(String::as_str) }

    pub fn name_set(&self) -> FxHashSet<String> { self.resources.keys().cloned().collect() }

    pub fn len(&self) -> usize { self.resources.len() }

    pub fn is_empty(&self) -> bool { self.resources.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }
}
