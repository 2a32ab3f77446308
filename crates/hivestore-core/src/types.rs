//! Catalog entity types: databases, tables, partitions and their descriptors.
//!
//! All maps are `BTreeMap` so that a serialized payload is byte-stable across
//! round trips.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A top-level namespace owning zero or more tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location_uri: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Database {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        location_uri: impl Into<String>,
        parameters: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            location_uri: location_uri.into(),
            parameters,
        }
    }
}

/// A column name, type and comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Serializer/deserializer configuration for a storage descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerDeInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub serialization_lib: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Sort order of a bucketed column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub col: String,
    /// 1 for ascending, 0 for descending.
    pub order: i32,
}

/// Physical layout of a table or partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    #[serde(default)]
    pub cols: Vec<FieldSchema>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub input_format: String,
    #[serde(default)]
    pub output_format: String,
    #[serde(default)]
    pub compressed: bool,
    #[serde(default)]
    pub num_buckets: i32,
    #[serde(default)]
    pub serde_info: SerDeInfo,
    #[serde(default)]
    pub bucket_cols: Vec<String>,
    #[serde(default)]
    pub sort_cols: Vec<Order>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// A table definition. The catalog only interprets `db_name` and
/// `table_name`; every other field is stored and returned as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub table_name: String,
    pub db_name: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub create_time: i32,
    #[serde(default)]
    pub last_access_time: i32,
    #[serde(default)]
    pub retention: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<StorageDescriptor>,
    #[serde(default)]
    pub partition_keys: Vec<FieldSchema>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub table_type: String,
}

impl Table {
    /// An otherwise-empty table definition named `db_name.table_name`.
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            db_name: db_name.into(),
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// A subdivision of a table identified by an ordered tuple of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub values: Vec<String>,
    pub db_name: String,
    pub table_name: String,
    #[serde(default)]
    pub create_time: i32,
    #[serde(default)]
    pub last_access_time: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<StorageDescriptor>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Partition {
    pub fn new(
        db_name: impl Into<String>,
        table_name: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        Self {
            values,
            db_name: db_name.into(),
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// Convert a listing `max` argument into an optional cap.
///
/// A non-negative value caps the result; any negative value is unbounded.
pub fn listing_limit(max: i32) -> Option<usize> {
    usize::try_from(max).ok()
}
