use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Typed keys with their registry spelling and default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    SqlShow,
    SqlSimple,
    KernelExecutorSize,
    MaxConnectionsSizePerQuery,
    CheckTableMetadataEnabled,
    ProxyFrontendFlushThreshold,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 6] = [
        Self::SqlShow,
        Self::SqlSimple,
        Self::KernelExecutorSize,
        Self::MaxConnectionsSizePerQuery,
        Self::CheckTableMetadataEnabled,
        Self::ProxyFrontendFlushThreshold,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::SqlShow => "sql-show",
            Self::SqlSimple => "sql-simple",
            Self::KernelExecutorSize => "kernel-executor-size",
            Self::MaxConnectionsSizePerQuery => "max-connections-size-per-query",
            Self::CheckTableMetadataEnabled => "check-table-metadata-enabled",
            Self::ProxyFrontendFlushThreshold => "proxy-frontend-flush-threshold",
        }
    }

    pub fn default_value(self) -> &'static str {
        match self {
            Self::SqlShow | Self::SqlSimple | Self::CheckTableMetadataEnabled => "false",
            Self::KernelExecutorSize => "0",
            Self::MaxConnectionsSizePerQuery => "1",
            Self::ProxyFrontendFlushThreshold => "128",
        }
    }
}

/// Cluster-wide runtime properties. Unknown keys are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationProperties {
    props: BTreeMap<String, String>,
}

impl ConfigurationProperties {
    pub fn new(props: BTreeMap<String, String>) -> Self { Self { props } }

    pub fn raw(&self) -> &BTreeMap<String, String> { &self.props }

    pub fn get(&self, key: PropertyKey) -> &str {
        self.props.get(key.key()).map(String::as_str).unwrap_or_else(|| key.default_value())
    }

    /// Unparsable values fall back to the key's default.
    pub fn get_bool(&self, key: PropertyKey) -> bool {
        self.get(key).trim().parse().unwrap_or_else(|_| key.default_value() == "true")
    }

    pub fn get_usize(&self, key: PropertyKey) -> usize {
        self.get(key).trim().parse().unwrap_or_else(|_| key.default_value().parse().unwrap_or(0))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigurationProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { props: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_and_invalid() {
        let props: ConfigurationProperties = [("sql-show", "true"), ("kernel-executor-size", "nope")].into_iter().collect();
        assert!(props.get_bool(PropertyKey::SqlShow));
        assert!(!props.get_bool(PropertyKey::SqlSimple));
        assert_eq!(props.get_usize(PropertyKey::KernelExecutorSize), 0);
        assert_eq!(props.get_usize(PropertyKey::ProxyFrontendFlushThreshold), 128);
    }

    #[test]
    fn unknown_keys_survive() {
        let props: ConfigurationProperties = [("custom-key", "x")].into_iter().collect();
        assert_eq!(props.raw().get("custom-key").map(String::as_str), Some("x"));
    }
}
