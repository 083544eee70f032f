use crate::{ConfigurationProperties, DataSourceMap, QualifiedSchema, RuleConfiguration, TableMetaData, User};

/// Typed change notification delivered by the cluster registry.
#[derive(Debug, Clone, PartialEq)]
pub enum GovernanceEvent {
    SchemaAdded { schema_name: String },
    SchemaDeleted { schema_name: String },
    /// Table-level delta: upsert `changed_table`, otherwise drop `deleted_table`.
    SchemaChanged { schema_name: String, changed_table: Option<TableMetaData>, deleted_table: Option<String> },
    RuleConfigurationsChanged { schema_name: String, version: String, rule_configurations: Vec<RuleConfiguration> },
    DataSourceChanged { schema_name: String, version: String, data_source_properties: DataSourceMap },
    DisabledStateChanged { qualified_schema: QualifiedSchema, disabled: bool },
    PrimaryStateChanged { qualified_schema: QualifiedSchema, primary_data_source_name: String },
    GlobalRuleConfigurationsChanged { rule_configurations: Vec<RuleConfiguration> },
    AuthorityChanged { users: Vec<User> },
    PropertiesChanged { properties: ConfigurationProperties },
    /// Raw reported states as written to the registry (`OK`, `LOCK`, `CIRCUIT_BREAK`).
    InstanceStateChanged { instance_id: String, states: Vec<String> },
    WorkerIdChanged { instance_id: String, worker_id: u64 },
    LabelsChanged { instance_id: String, labels: Vec<String> },
}

impl GovernanceEvent {
    /// Stable name used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SchemaAdded { .. } => "schema_added",
            Self::SchemaDeleted { .. } => "schema_deleted",
            Self::SchemaChanged { .. } => "schema_changed",
            Self::RuleConfigurationsChanged { .. } => "rule_configurations_changed",
            Self::DataSourceChanged { .. } => "data_source_changed",
            Self::DisabledStateChanged { .. } => "disabled_state_changed",
            Self::PrimaryStateChanged { .. } => "primary_state_changed",
            Self::GlobalRuleConfigurationsChanged { .. } => "global_rule_configurations_changed",
            Self::AuthorityChanged { .. } => "authority_changed",
            Self::PropertiesChanged { .. } => "properties_changed",
            Self::InstanceStateChanged { .. } => "instance_state_changed",
            Self::WorkerIdChanged { .. } => "worker_id_changed",
            Self::LabelsChanged { .. } => "labels_changed",
        }
    }
}
