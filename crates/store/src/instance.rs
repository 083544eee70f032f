use parking_lot::RwLock;
use smallvec::SmallVec;
use strata_core::{InstanceDefinition, StateType};

/// Effective state is the most severe reported one; nothing reported means `Ok`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateContext {
    current: StateType,
}

impl StateContext {
    pub fn current(&self) -> StateType { self.current }

    pub fn switch(&mut self, reported: &[StateType]) -> StateType {
        self.current = reported.iter().copied().max().unwrap_or_default();
        self.current
    }
}

#[derive(Debug, Default)]
struct InstanceState {
    status: Vec<String>,
    state: StateContext,
    worker_id: Option<u64>,
    labels: SmallVec<[String; 4]>,
}

/// The local node: fixed identity plus state, worker id and labels, each last-writer-wins.
#[derive(Debug)]
pub struct InstanceContext {
    definition: InstanceDefinition,
    inner: RwLock<InstanceState>,
}

impl InstanceContext {
    pub fn new(definition: InstanceDefinition) -> Self {
        Self { definition, inner: RwLock::new(InstanceState::default()) }
    }

    pub fn definition(&self) -> &InstanceDefinition { &self.definition }

    pub fn is_local(&self, instance_id: &str) -> bool { self.definition.instance_id == instance_id }

    /// Raw reported states as last written to the registry.
    pub fn status(&self) -> Vec<String> { self.inner.read().status.clone() }

    pub fn current_state(&self) -> StateType { self.inner.read().state.current() }

    pub fn worker_id(&self) -> Option<u64> { self.inner.read().worker_id }

    pub fn labels(&self) -> Vec<String> { self.inner.read().labels.to_vec() }

    /// Replace the raw status and recompute the effective state from `parsed`.
    pub fn update_status(&self, raw: Vec<String>, parsed: &[StateType]) -> StateType {
        let mut inner = self.inner.write();
        inner.status = raw;
        inner.state.switch(parsed)
    }

    pub fn set_worker_id(&self, worker_id: u64) { self.inner.write().worker_id = Some(worker_id); }

    /// Duplicates collapse; first occurrence keeps its position.
    pub fn set_labels(&self, labels: Vec<String>) {
        let mut set: SmallVec<[String; 4]> = SmallVec::with_capacity(labels.len());
        for l in labels.into_iter() {
            if !set.contains(&l) {
                set.push(l);
            }
        }
        self.inner.write().labels = set;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_severe_state_wins() {
        let ctx = InstanceContext::new(InstanceDefinition::proxy("127.0.0.1", 3307));
        assert_eq!(ctx.current_state(), StateType::Ok);
        ctx.update_status(vec!["OK".into(), "LOCK".into()], &[StateType::Ok, StateType::Lock]);
        assert_eq!(ctx.current_state(), StateType::Lock);
        ctx.update_status(Vec::new(), &[]);
        assert_eq!(ctx.current_state(), StateType::Ok);
    }

    #[test]
    fn labels_dedup() {
        let ctx = InstanceContext::new(InstanceDefinition::proxy("127.0.0.1", 3307));
        ctx.set_labels(vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(ctx.labels(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(ctx.worker_id(), None);
    }
}
