use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// `schema.dataSource`: one data source (or readwrite group) inside a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedSchema {
    pub schema_name: String,
    pub data_source_name: String,
}

impl QualifiedSchema {
    pub fn new(schema_name: impl Into<String>, data_source_name: impl Into<String>) -> Self {
        Self { schema_name: schema_name.into(), data_source_name: data_source_name.into() }
    }
}

impl FromStr for QualifiedSchema {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((schema, ds)) if !schema.is_empty() && !ds.is_empty() && !ds.contains('.') => {
                Ok(Self::new(schema, ds))
            }
            _ => Err(CoreError::MalformedQualifiedSchema(s.to_string())),
        }
    }
}

impl fmt::Display for QualifiedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema_name, self.data_source_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetaData {
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetaData {
    pub name: String,
}

/// Catalog entry for one logic table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetaData {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnMetaData>,
    #[serde(default)]
    pub indexes: Vec<IndexMetaData>,
}

impl TableMetaData {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), columns: Vec::new(), indexes: Vec::new() }
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter(|c| c.primary_key).map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_qualified_schema() {
        let q: QualifiedSchema = "sharding_db.ds_0".parse().unwrap();
        assert_eq!(q.schema_name, "sharding_db");
        assert_eq!(q.data_source_name, "ds_0");
        assert_eq!(q.to_string(), "sharding_db.ds_0");
    }

    #[test]
    fn reject_malformed_qualified_schema() {
        for bad in ["", "schema", ".ds", "schema.", "a.b.c"] {
            assert_eq!(
                bad.parse::<QualifiedSchema>(),
                Err(CoreError::MalformedQualifiedSchema(bad.to_string())),
                "{bad}"
            );
        }
    }
}
