use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use strata_core::GovernanceEvent;
use strata_rules::DataSourceStatus;
use tracing::{debug, error};

use crate::{ContextManager, CoordinatorError, GlobalRuleContextBuilder, InstanceStateMachine};

/// Routes registry events to their handler. Safe to call from many threads at once:
/// snapshot mutation is serialized by the store's writer lock, handlers run to completion
/// on the calling thread.
#[derive(Clone)]
pub struct EventCoordinator {
    manager: Arc<ContextManager>,
}

impl EventCoordinator {
    pub fn new(manager: Arc<ContextManager>) -> Self { Self { manager } }

    pub fn manager(&self) -> &Arc<ContextManager> { &self.manager }

    /// Apply one event. Errors are logged here and returned for the caller to surface;
    /// the context stays as it was before the failing event.
    pub fn renew(&self, event: GovernanceEvent) -> Result<(), CoordinatorError> {
        let t0 = Instant::now();
        let kind = event.kind();
        let res = self.dispatch(event);
        histogram!("coordinator_apply_ms", t0.elapsed().as_secs_f64() * 1000.0, "kind" => kind);
        match &res {
            Ok(()) => {
                counter!("coordinator_events_total", 1, "kind" => kind);
                debug!(kind, took_ms = %t0.elapsed().as_millis(), "coordinator: event applied");
            }
            Err(e) => {
                counter!("coordinator_events_failed_total", 1, "kind" => kind);
                error!(kind, error = %e, "coordinator: event failed");
            }
        }
        res
    }

    fn dispatch(&self, event: GovernanceEvent) -> Result<(), CoordinatorError> {
        let store = self.manager.store();
        let schemas = self.manager.schema_builder();
        let global = GlobalRuleContextBuilder;
        match event {
            GovernanceEvent::SchemaAdded { schema_name } => schemas.add(&mut store.write(), &schema_name),
            GovernanceEvent::SchemaDeleted { schema_name } => {
                schemas.remove(&mut store.write(), &schema_name);
                Ok(())
            }
            GovernanceEvent::SchemaChanged { schema_name, changed_table, deleted_table } => {
                schemas.alter_table(&store.snapshot(), &schema_name, changed_table, deleted_table);
                Ok(())
            }
            GovernanceEvent::RuleConfigurationsChanged { schema_name, version, rule_configurations } => {
                debug!(schema = %schema_name, version = %version, "coordinator: rule configurations received");
                schemas.alter_rules(&mut store.write(), &schema_name, &rule_configurations)
            }
            GovernanceEvent::DataSourceChanged { schema_name, version, data_source_properties } => {
                debug!(schema = %schema_name, version = %version, "coordinator: data sources received");
                schemas.alter_data_sources(&mut store.write(), &schema_name, &data_source_properties)
            }
            GovernanceEvent::DisabledStateChanged { qualified_schema, disabled } => {
                let w = store.write();
                let status = DataSourceStatus::Disabled {
                    schema_name: qualified_schema.schema_name.clone(),
                    data_source_name: qualified_schema.data_source_name.clone(),
                    disabled,
                };
                schemas.update_status(&w.current(), &qualified_schema, status);
                Ok(())
            }
            GovernanceEvent::PrimaryStateChanged { qualified_schema, primary_data_source_name } => {
                let w = store.write();
                let status = DataSourceStatus::PrimaryChanged {
                    schema_name: qualified_schema.schema_name.clone(),
                    group_name: qualified_schema.data_source_name.clone(),
                    primary_data_source_name,
                };
                schemas.update_status(&w.current(), &qualified_schema, status);
                Ok(())
            }
            GovernanceEvent::GlobalRuleConfigurationsChanged { rule_configurations } => {
                global.alter_rules(&mut store.write(), &rule_configurations)
            }
            GovernanceEvent::AuthorityChanged { users } => {
                global.alter_users(&mut store.write(), users);
                Ok(())
            }
            GovernanceEvent::PropertiesChanged { properties } => {
                global.alter_properties(&mut store.write(), properties);
                Ok(())
            }
            GovernanceEvent::InstanceStateChanged { instance_id, states } => {
                InstanceStateMachine::new(store.instance_context()).on_state(&instance_id, states);
                Ok(())
            }
            GovernanceEvent::WorkerIdChanged { instance_id, worker_id } => {
                InstanceStateMachine::new(store.instance_context()).on_worker_id(&instance_id, worker_id);
                Ok(())
            }
            GovernanceEvent::LabelsChanged { instance_id, labels } => {
                InstanceStateMachine::new(store.instance_context()).on_labels(&instance_id, labels);
                Ok(())
            }
        }
    }
}
