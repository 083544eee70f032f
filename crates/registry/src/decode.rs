use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use strata_core::{ConfigurationProperties, DataSourceMap, GovernanceEvent, QualifiedSchema, RuleConfiguration, TableMetaData, User};

use crate::{ChangeType, DataChangedEvent, RegistryError, Result};

/// Map one notification onto a governance event. Keys outside the layout and `Ignored`
/// notifications yield `Ok(None)`; payloads that do not parse are errors.
pub fn decode(event: &DataChangedEvent) -> Result<Option<GovernanceEvent>> {
    use ChangeType::*;
    if event.change_type == Ignored {
        return Ok(None);
    }
    let key = event.key.as_str();
    let value = event.value.as_str();
    let change = event.change_type;
    let segments: Vec<&str> = key.trim_start_matches('/').split('/').collect();
    let decoded = match (segments.as_slice(), change) {
        (["metadata", schema], Added) => Some(GovernanceEvent::SchemaAdded { schema_name: schema.to_string() }),
        (["metadata", schema], Deleted) => Some(GovernanceEvent::SchemaDeleted { schema_name: schema.to_string() }),
        (["metadata", schema, "versions", version, "dataSources"], Added | Updated) => Some(GovernanceEvent::DataSourceChanged {
            schema_name: schema.to_string(),
            version: version.to_string(),
            data_source_properties: yaml_or_default::<DataSourceMap>(key, value)?,
        }),
        (["metadata", schema, "versions", version, "rules"], Added | Updated) => Some(GovernanceEvent::RuleConfigurationsChanged {
            schema_name: schema.to_string(),
            version: version.to_string(),
            rule_configurations: yaml_or_default::<Vec<RuleConfiguration>>(key, value)?,
        }),
        (["metadata", schema, "tables", _], Added | Updated) => Some(GovernanceEvent::SchemaChanged {
            schema_name: schema.to_string(),
            changed_table: Some(yaml::<TableMetaData>(key, value)?),
            deleted_table: None,
        }),
        (["metadata", schema, "tables", table], Deleted) => Some(GovernanceEvent::SchemaChanged {
            schema_name: schema.to_string(),
            changed_table: None,
            deleted_table: Some(table.to_string()),
        }),
        (["rules"], Added | Updated) => {
            Some(GovernanceEvent::GlobalRuleConfigurationsChanged { rule_configurations: yaml_or_default(key, value)? })
        }
        (["users"], Added | Updated) => Some(GovernanceEvent::AuthorityChanged { users: yaml_or_default::<Vec<User>>(key, value)? }),
        (["props"], Added | Updated) => Some(GovernanceEvent::PropertiesChanged { properties: properties(key, value)? }),
        (["status", "storage_nodes", "disable", qualified], _) => Some(GovernanceEvent::DisabledStateChanged {
            qualified_schema: qualified_schema(key, qualified)?,
            disabled: change != Deleted,
        }),
        (["status", "storage_nodes", "primary", qualified], Added | Updated) => {
            let primary = value.trim();
            if primary.is_empty() {
                return Err(invalid(key, "empty primary data source name"));
            }
            Some(GovernanceEvent::PrimaryStateChanged {
                qualified_schema: qualified_schema(key, qualified)?,
                primary_data_source_name: primary.to_string(),
            })
        }
        (["status", "compute_nodes", "status", id], _) => Some(GovernanceEvent::InstanceStateChanged {
            instance_id: id.to_string(),
            states: if change == Deleted { Vec::new() } else { yaml_or_default(key, value)? },
        }),
        (["status", "compute_nodes", "worker_id", id], Added | Updated) => Some(GovernanceEvent::WorkerIdChanged {
            instance_id: id.to_string(),
            worker_id: value.trim().parse().map_err(|e| invalid(key, format!("worker id `{}`: {}", value.trim(), e)))?,
        }),
        (["status", "compute_nodes", "labels", id], _) => Some(GovernanceEvent::LabelsChanged {
            instance_id: id.to_string(),
            labels: if change == Deleted { Vec::new() } else { yaml_or_default(key, value)? },
        }),
        _ => None,
    };
    Ok(decoded)
}

fn invalid(key: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::Invalid { key: key.to_string(), reason: reason.into() }
}

fn yaml<T: DeserializeOwned>(key: &str, value: &str) -> Result<T> {
    serde_yaml::from_str(value).map_err(|source| RegistryError::Payload { key: key.to_string(), source })
}

/// An empty payload decodes to `T::default()`.
fn yaml_or_default<T: DeserializeOwned + Default>(key: &str, value: &str) -> Result<T> {
    if value.trim().is_empty() {
        return Ok(T::default());
    }
    yaml(key, value)
}

fn qualified_schema(key: &str, raw: &str) -> Result<QualifiedSchema> {
    raw.parse().map_err(|e: strata_core::CoreError| invalid(key, e.to_string()))
}

/// Props are stored as a YAML map whose scalars may be typed (`sql-show: true`).
fn properties(key: &str, value: &str) -> Result<ConfigurationProperties> {
    let raw: BTreeMap<String, serde_yaml::Value> = yaml_or_default(key, value)?;
    let mut out = BTreeMap::new();
    for (k, v) in raw {
        let s = match v {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Null => String::new(),
            other => return Err(invalid(key, format!("`{}` is not a scalar: {:?}", k, other))),
        };
        out.insert(k, s);
    }
    Ok(ConfigurationProperties::new(out))
}
