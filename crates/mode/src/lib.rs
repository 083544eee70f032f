//! Strata cluster mode: keeps the node's metadata context in step with registry events.
//!
//! [`EventCoordinator`] classifies each [`GovernanceEvent`](strata_core::GovernanceEvent) and
//! hands it to exactly one of the schema, global-rule or instance handlers. All snapshot
//! mutation goes through the store's single writer.

#![forbid(unsafe_code)]

use std::sync::Arc;

use strata_core::InstanceDefinition;
use strata_persist::{MetaDataPersistService, PersistError};
use strata_rules::{build_global_rules, RuleError};
use strata_store::{ContextStore, DataSourceFactory, InstanceContext, Snapshot};
use tracing::info;

mod coordinator;
mod global;
mod instance;
mod schema;

pub use coordinator::EventCoordinator;
pub use global::GlobalRuleContextBuilder;
pub use instance::InstanceStateMachine;
pub use schema::SchemaContextBuilder;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("load `{scope}` from persistence: {source}")]
    Persist {
        scope: String,
        #[source]
        source: PersistError,
    },
    #[error("build rules for `{scope}`: {source}")]
    Rule {
        scope: String,
        #[source]
        source: RuleError,
    },
}

impl CoordinatorError {
    pub(crate) fn persist(scope: &str) -> impl FnOnce(PersistError) -> Self + '_ {
        move |source| Self::Persist { scope: scope.to_string(), source }
    }

    pub(crate) fn rule(scope: &str) -> impl FnOnce(RuleError) -> Self + '_ {
        move |source| Self::Rule { scope: scope.to_string(), source }
    }
}

pub(crate) const GLOBAL_SCOPE: &str = "(global)";

/// The node's metadata context plus the collaborators needed to rebuild it.
pub struct ContextManager {
    store: ContextStore,
    persist: Arc<dyn MetaDataPersistService>,
    factory: Arc<dyn DataSourceFactory>,
}

impl ContextManager {
    pub fn new(store: ContextStore, persist: Arc<dyn MetaDataPersistService>, factory: Arc<dyn DataSourceFactory>) -> Self {
        Self { store, persist, factory }
    }

    /// Build the startup snapshot from the full persisted configuration.
    pub fn bootstrap(
        persist: Arc<dyn MetaDataPersistService>,
        factory: Arc<dyn DataSourceFactory>,
        instance: InstanceDefinition,
    ) -> Result<Self, CoordinatorError> {
        let names = persist.load_schema_names().map_err(CoordinatorError::persist(GLOBAL_SCOPE))?;
        let builder = SchemaContextBuilder::new(persist.as_ref(), factory.as_ref());
        let mut schemas = Vec::with_capacity(names.len());
        for name in names.iter() {
            schemas.push(builder.load(name, None)?);
        }
        let global_configs = persist.load_global_rules().map_err(CoordinatorError::persist(GLOBAL_SCOPE))?;
        let global_rules = build_global_rules(&global_configs, names.iter().map(String::as_str))
            .map_err(CoordinatorError::rule(GLOBAL_SCOPE))?;
        let props = persist.load_properties().map_err(CoordinatorError::persist(GLOBAL_SCOPE))?;
        info!(schemas = names.len(), global_rules = global_rules.len(), instance = %instance.instance_id, "context: bootstrapped");
        let store = ContextStore::new(Snapshot::new(schemas, global_rules, props), InstanceContext::new(instance));
        Ok(Self::new(store, persist, factory))
    }

    /// Current snapshot for query serving.
    pub fn snapshot(&self) -> Arc<Snapshot> { self.store.snapshot() }

    pub fn instance_context(&self) -> &Arc<InstanceContext> { self.store.instance_context() }

    pub fn store(&self) -> &ContextStore { &self.store }

    pub(crate) fn schema_builder(&self) -> SchemaContextBuilder<'_> {
        SchemaContextBuilder::new(self.persist.as_ref(), self.factory.as_ref())
    }
}
