use strata_core::{ConfigurationProperties, RuleConfiguration, User};
use strata_rules::build_global_rules;
use strata_store::SnapshotWriter;
use tracing::{info, warn};

use crate::{CoordinatorError, GLOBAL_SCOPE};

/// Rebuilds or patches cluster-wide rules and properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalRuleContextBuilder;

impl GlobalRuleContextBuilder {
    /// Rebuild the whole global rule list; kinds missing from `configs` use defaults.
    pub fn alter_rules(&self, w: &mut SnapshotWriter<'_>, configs: &[RuleConfiguration]) -> Result<(), CoordinatorError> {
        let names = w.current().schema_names();
        let rules = build_global_rules(configs, names.iter().map(String::as_str)).map_err(CoordinatorError::rule(GLOBAL_SCOPE))?;
        let count = rules.len();
        w.replace_global_rules(rules);
        info!(configured = configs.len(), rules = count, "coordinator: global rules rebuilt");
        Ok(())
    }

    /// Swap the authority rule's users in place, then install a rule list that shares every
    /// instance but records the new users in its configurations. The writer is held so a
    /// concurrent rebuild cannot drop the update.
    pub fn alter_users(&self, w: &mut SnapshotWriter<'_>, users: Vec<User>) {
        let snap = w.current();
        let global = snap.global_rules();
        let Some(rule) = global.rules().iter().find(|r| r.as_authority().is_some()) else {
            warn!("coordinator: no authority rule installed; user change ignored");
            return;
        };
        let count = users.len();
        if let Some(authority) = rule.as_authority() {
            authority.replace_users(users);
        }
        let next = global.with_configuration(rule.configuration());
        w.replace_global_rules(next);
        info!(users = count, "coordinator: authority users replaced");
    }

    pub fn alter_properties(&self, w: &mut SnapshotWriter<'_>, props: ConfigurationProperties) {
        let keys = props.raw().len();
        w.replace_properties(props);
        info!(keys, "coordinator: properties replaced");
    }
}
