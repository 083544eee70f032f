use std::any::Any;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use strata_core::{ReadwriteSplittingGroupConfiguration, ReadwriteSplittingRuleConfiguration, RuleConfiguration};
use tracing::debug;

use crate::{DataSourceStatus, Rule, RuleError, StatusContainedRule};

#[derive(Debug, Clone)]
struct GroupState {
    /// Primary named by the configuration this group was built from.
    configured_write: String,
    write: String,
    reads: Vec<String>,
    disabled: FxHashSet<String>,
}

impl GroupState {
    /// Promote replica `primary`; the demoted primary takes its slot in the read set.
    /// Names outside the group are refused.
    fn switch_primary(&mut self, primary: &str) -> Result<String, &'static str> {
        if self.write == primary {
            return Err("already primary");
        }
        let Some(pos) = self.reads.iter().position(|r| r == primary) else {
            return Err("not a member of the group");
        };
        let old = std::mem::replace(&mut self.write, primary.to_string());
        self.reads[pos] = old.clone();
        self.disabled.remove(primary);
        Ok(old)
    }
}

/// Primary/replica groups. Availability and primary changes are applied in place.
#[derive(Debug)]
pub struct ReadwriteSplittingRule {
    groups: RwLock<FxHashMap<String, GroupState>>,
    order: Vec<String>,
}

impl ReadwriteSplittingRule {
    pub fn new(config: ReadwriteSplittingRuleConfiguration, data_sources: &FxHashSet<String>) -> Result<Self, RuleError> {
        let mut groups = FxHashMap::default();
        let mut order = Vec::with_capacity(config.groups.len());
        for g in config.groups.into_iter() {
            for ds in std::iter::once(&g.write_data_source).chain(g.read_data_sources.iter()) {
                if !data_sources.contains(ds.as_str()) {
                    return Err(RuleError::MissingDataSource { rule: "readwrite-splitting", data_source: ds.clone() });
                }
            }
            if groups.contains_key(&g.name) {
                return Err(RuleError::Invalid { rule: "readwrite-splitting", message: format!("duplicate group `{}`", g.name) });
            }
            order.push(g.name.clone());
            groups.insert(
                g.name,
                GroupState {
                    configured_write: g.write_data_source.clone(),
                    write: g.write_data_source,
                    reads: g.read_data_sources,
                    disabled: FxHashSet::default(),
                },
            );
        }
        Ok(Self { groups: RwLock::new(groups), order })
    }

    pub fn write_data_source(&self, group: &str) -> Option<String> {
        self.groups.read().get(group).map(|g| g.write.clone())
    }

    /// Replicas of `group` that are not currently disabled, in configured order.
    pub fn enabled_read_data_sources(&self, group: &str) -> Vec<String> {
        self.groups
            .read()
            .get(group)
            .map(|g| g.reads.iter().filter(|r| !g.disabled.contains(*r)).cloned().collect())
            .unwrap_or_default()
    }
}

impl StatusContainedRule for ReadwriteSplittingRule {
    fn update_status(&self, status: &DataSourceStatus) {
        let mut groups = self.groups.write();
        match status {
            DataSourceStatus::Disabled { data_source_name, disabled, .. } => {
                for (name, g) in groups.iter_mut() {
                    if !g.reads.iter().any(|r| r == data_source_name) {
                        continue;
                    }
                    if *disabled { g.disabled.insert(data_source_name.clone()); } else { g.disabled.remove(data_source_name); }
                    debug!(group = %name, ds = %data_source_name, disabled, "readwrite-splitting: replica status updated");
                }
            }
            DataSourceStatus::PrimaryChanged { group_name, primary_data_source_name, .. } => {
                let Some(g) = groups.get_mut(group_name) else {
                    debug!(group = %group_name, "readwrite-splitting: primary change for unknown group ignored");
                    return;
                };
                match g.switch_primary(primary_data_source_name) {
                    Ok(old) => {
                        debug!(group = %group_name, from = %old, to = %primary_data_source_name, "readwrite-splitting: primary switched")
                    }
                    Err(reason) => {
                        debug!(group = %group_name, ds = %primary_data_source_name, reason, "readwrite-splitting: primary change ignored")
                    }
                }
            }
        }
    }

    /// Keep the live primary and disabled replicas of groups that survive a rebuild.
    /// A group whose configured primary changed starts over from its new configuration.
    fn inherit_status(&self, previous: &dyn Rule) {
        let Some(previous) = previous.as_any().downcast_ref::<ReadwriteSplittingRule>() else {
            return;
        };
        if std::ptr::eq(previous, self) {
            return;
        }
        let prev_groups = previous.groups.read();
        let mut groups = self.groups.write();
        for (name, g) in groups.iter_mut() {
            let Some(p) = prev_groups.get(name) else { continue };
            if p.configured_write == g.configured_write && p.write != g.write {
                if let Err(reason) = g.switch_primary(&p.write) {
                    debug!(group = %name, ds = %p.write, reason, "readwrite-splitting: live primary not carried over");
                }
            }
            g.disabled = p.disabled.iter().filter(|d| g.reads.contains(*d)).cloned().collect();
            debug!(group = %name, primary = %g.write, disabled = g.disabled.len(), "readwrite-splitting: status carried over");
        }
    }
}

impl Rule for ReadwriteSplittingRule {
    fn rule_type(&self) -> &'static str { "readwrite-splitting" }

    fn as_any(&self) -> &dyn Any { self }

    fn configuration(&self) -> RuleConfiguration {
        let groups = self.groups.read();
        let groups = self
            .order
            .iter()
            .filter_map(|name| groups.get(name).map(|g| (name, g)))
            .map(|(name, g)| ReadwriteSplittingGroupConfiguration {
                name: name.clone(),
                write_data_source: g.write.clone(),
                read_data_sources: g.reads.clone(),
            })
            .collect();
        RuleConfiguration::ReadwriteSplitting(ReadwriteSplittingRuleConfiguration { groups })
    }

    fn as_status_contained(&self) -> Option<&dyn StatusContainedRule> { Some(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> ReadwriteSplittingRule {
        let cfg = ReadwriteSplittingRuleConfiguration {
            groups: vec![ReadwriteSplittingGroupConfiguration {
                name: "pr_ds".into(),
                write_data_source: "primary_ds".into(),
                read_data_sources: vec!["ds_0".into(), "ds_1".into()],
            }],
        };
        let names = ["primary_ds", "ds_0", "ds_1"].iter().map(|s| s.to_string()).collect();
        ReadwriteSplittingRule::new(cfg, &names).unwrap()
    }

    #[test]
    fn disable_and_enable_replica() {
        let r = rule();
        let disable = |flag| DataSourceStatus::Disabled { schema_name: "db".into(), data_source_name: "ds_0".into(), disabled: flag };
        r.update_status(&disable(true));
        assert_eq!(r.enabled_read_data_sources("pr_ds"), vec!["ds_1".to_string()]);
        r.update_status(&disable(false));
        assert_eq!(r.enabled_read_data_sources("pr_ds"), vec!["ds_0".to_string(), "ds_1".to_string()]);
    }

    #[test]
    fn primary_switch_swaps_roles() {
        let r = rule();
        r.update_status(&DataSourceStatus::PrimaryChanged {
            schema_name: "db".into(),
            group_name: "pr_ds".into(),
            primary_data_source_name: "ds_1".into(),
        });
        assert_eq!(r.write_data_source("pr_ds").as_deref(), Some("ds_1"));
        assert_eq!(r.enabled_read_data_sources("pr_ds"), vec!["ds_0".to_string(), "primary_ds".to_string()]);
    }

    #[test]
    fn primary_outside_group_is_refused() {
        let r = rule();
        r.update_status(&DataSourceStatus::PrimaryChanged {
            schema_name: "db".into(),
            group_name: "pr_ds".into(),
            primary_data_source_name: "ds_x".into(),
        });
        assert_eq!(r.write_data_source("pr_ds").as_deref(), Some("primary_ds"));
        assert_eq!(r.enabled_read_data_sources("pr_ds"), vec!["ds_0".to_string(), "ds_1".to_string()]);
    }

    #[test]
    fn promoted_replica_is_no_longer_disabled() {
        let r = rule();
        r.update_status(&DataSourceStatus::Disabled { schema_name: "db".into(), data_source_name: "ds_1".into(), disabled: true });
        r.update_status(&DataSourceStatus::PrimaryChanged {
            schema_name: "db".into(),
            group_name: "pr_ds".into(),
            primary_data_source_name: "ds_1".into(),
        });
        assert_eq!(r.write_data_source("pr_ds").as_deref(), Some("ds_1"));
        assert_eq!(r.enabled_read_data_sources("pr_ds"), vec!["ds_0".to_string(), "primary_ds".to_string()]);
    }

    #[test]
    fn rebuilt_rule_inherits_live_status() {
        let old = rule();
        old.update_status(&DataSourceStatus::PrimaryChanged {
            schema_name: "db".into(),
            group_name: "pr_ds".into(),
            primary_data_source_name: "ds_1".into(),
        });
        old.update_status(&DataSourceStatus::Disabled { schema_name: "db".into(), data_source_name: "ds_0".into(), disabled: true });
        let next = rule();
        next.inherit_status(&old);
        assert_eq!(next.write_data_source("pr_ds").as_deref(), Some("ds_1"));
        assert_eq!(next.enabled_read_data_sources("pr_ds"), vec!["primary_ds".to_string()]);
    }

    #[test]
    fn reconfigured_primary_wins_over_live_primary() {
        let old = rule();
        old.update_status(&DataSourceStatus::PrimaryChanged {
            schema_name: "db".into(),
            group_name: "pr_ds".into(),
            primary_data_source_name: "ds_1".into(),
        });
        let cfg = ReadwriteSplittingRuleConfiguration {
            groups: vec![ReadwriteSplittingGroupConfiguration {
                name: "pr_ds".into(),
                write_data_source: "ds_0".into(),
                read_data_sources: vec!["primary_ds".into(), "ds_1".into()],
            }],
        };
        let names = ["primary_ds", "ds_0", "ds_1"].iter().map(|s| s.to_string()).collect();
        let next = ReadwriteSplittingRule::new(cfg, &names).unwrap();
        next.inherit_status(&old);
        assert_eq!(next.write_data_source("pr_ds").as_deref(), Some("ds_0"));
    }

    #[test]
    fn unknown_group_is_ignored() {
        let r = rule();
        r.update_status(&DataSourceStatus::PrimaryChanged {
            schema_name: "db".into(),
            group_name: "other".into(),
            primary_data_source_name: "ds_1".into(),
        });
        assert_eq!(r.write_data_source("pr_ds").as_deref(), Some("primary_ds"));
    }
}
