use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Data sources of one schema keyed by logical name, in persisted order.
pub type DataSourceMap = IndexMap<String, DataSourceProperties>;

/// Durable description of one physical data source (pool class + pool settings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceProperties {
    pub data_source_class_name: String,
    #[serde(default)]
    pub props: BTreeMap<String, serde_json::Value>,
}

impl DataSourceProperties {
    pub fn new(data_source_class_name: impl Into<String>) -> Self {
        Self { data_source_class_name: data_source_class_name.into(), props: BTreeMap::new() }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(|v| v.as_str())
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str("url").or_else(|| self.get_str("jdbcUrl"))
    }

    /// Pool bound; accepts numbers or numeric strings, defaults to 50.
    pub fn maximum_pool_size(&self) -> usize {
        match self.props.get("maximumPoolSize") {
            Some(serde_json::Value::Number(n)) => n.as_u64().map(|v| v as usize).unwrap_or(50),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(50),
            _ => 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_size_parses_numbers_and_strings() {
        let a = DataSourceProperties::new("Hikari").with("maximumPoolSize", 8);
        let b = DataSourceProperties::new("Hikari").with("maximumPoolSize", "12");
        let c = DataSourceProperties::new("Hikari");
        assert_eq!(a.maximum_pool_size(), 8);
        assert_eq!(b.maximum_pool_size(), 12);
        assert_eq!(c.maximum_pool_size(), 50);
    }

    #[test]
    fn persisted_shape_is_camel_case() {
        let v: DataSourceProperties = serde_json::from_value(serde_json::json!({
            "dataSourceClassName": "Hikari",
            "props": { "url": "mysql://db:3306/ds_0" }
        }))
        .unwrap();
        assert_eq!(v.url(), Some("mysql://db:3306/ds_0"));
    }
}
