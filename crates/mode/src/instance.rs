use strata_core::StateType;
use strata_store::InstanceContext;
use tracing::{debug, info, warn};

/// Applies state, worker-id and label events addressed to the local instance.
/// Events for any other instance id are ignored.
pub struct InstanceStateMachine<'a> {
    instance: &'a InstanceContext,
}

impl<'a> InstanceStateMachine<'a> {
    pub fn new(instance: &'a InstanceContext) -> Self { Self { instance } }

    fn is_local(&self, instance_id: &str, what: &str) -> bool {
        let local = self.instance.is_local(instance_id);
        if !local {
            debug!(instance = %instance_id, event = what, "coordinator: event for remote instance ignored");
        }
        local
    }

    /// Replace the reported states; the effective state is the most severe one.
    pub fn on_state(&self, instance_id: &str, states: Vec<String>) {
        if !self.is_local(instance_id, "state") {
            return;
        }
        let parsed: Vec<StateType> = states
            .iter()
            .filter_map(|s| match s.parse() {
                Ok(st) => Some(st),
                Err(e) => {
                    warn!(error = %e, "coordinator: unknown reported state skipped");
                    None
                }
            })
            .collect();
        let current = self.instance.update_status(states, &parsed);
        info!(state = %current, "coordinator: instance state switched");
    }

    pub fn on_worker_id(&self, instance_id: &str, worker_id: u64) {
        if !self.is_local(instance_id, "worker_id") {
            return;
        }
        self.instance.set_worker_id(worker_id);
        info!(worker_id, "coordinator: worker id assigned");
    }

    pub fn on_labels(&self, instance_id: &str, labels: Vec<String>) {
        if !self.is_local(instance_id, "labels") {
            return;
        }
        debug!(labels = ?labels, "coordinator: labels replaced");
        self.instance.set_labels(labels);
    }
}
