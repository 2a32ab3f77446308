//! In-process wide-column store.
//!
//! `MemoryStore` is cheaply clonable (`Arc`-based) and `Send + Sync`. Every
//! mutation takes the write lock once, which makes each single-row call
//! atomic. It backs embedded catalogs, tests and the network server.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Column, ColumnClient, ConnectionProvider, DEFAULT_KEYSPACE};
use crate::error::BackendError;

type Row = BTreeMap<Vec<u8>, Vec<u8>>;
type ColumnFamily = BTreeMap<Vec<u8>, Row>;

#[derive(Default)]
struct Keyspace {
    column_families: BTreeMap<String, ColumnFamily>,
}

/// Version string reported by `describe_version`.
pub const VERSION: &str = concat!("hivestore-memory/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Default)]
pub struct MemoryStore {
    keyspaces: Arc<RwLock<BTreeMap<String, Keyspace>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client bound to `keyspace`.
    pub fn client(&self, keyspace: impl Into<String>) -> MemoryClient {
        MemoryClient {
            store: self.clone(),
            keyspace: keyspace.into(),
        }
    }

    pub fn get(&self, keyspace: &str, cf: &str, row: &[u8], column: &[u8]) -> Option<Vec<u8>> {
        let guard = self.keyspaces.read();
        guard
            .get(keyspace)?
            .column_families
            .get(cf)?
            .get(row)?
            .get(column)
            .cloned()
    }

    pub fn get_slice(
        &self,
        keyspace: &str,
        cf: &str,
        row: &[u8],
        count: Option<usize>,
    ) -> Vec<Column> {
        let guard = self.keyspaces.read();
        let Some(columns) = guard
            .get(keyspace)
            .and_then(|ks| ks.column_families.get(cf))
            .and_then(|family| family.get(row))
        else {
            return Vec::new();
        };
        columns
            .iter()
            .take(count.unwrap_or(usize::MAX))
            .map(|(name, value)| Column {
                name: name.clone(),
                value: value.clone(),
            })
            .collect()
    }

    pub fn insert(&self, keyspace: &str, cf: &str, row: &[u8], column: &[u8], value: &[u8]) {
        let mut guard = self.keyspaces.write();
        guard
            .entry(keyspace.to_string())
            .or_default()
            .column_families
            .entry(cf.to_string())
            .or_default()
            .entry(row.to_vec())
            .or_default()
            .insert(column.to_vec(), value.to_vec());
    }

    pub fn remove(&self, keyspace: &str, cf: &str, row: &[u8], column: Option<&[u8]>) {
        let mut guard = self.keyspaces.write();
        let Some(family) = guard
            .get_mut(keyspace)
            .and_then(|ks| ks.column_families.get_mut(cf))
        else {
            return;
        };
        match column {
            None => {
                family.remove(row);
            }
            Some(column) => {
                if let Some(columns) = family.get_mut(row) {
                    columns.remove(column);
                    // A row with no columns does not exist.
                    if columns.is_empty() {
                        family.remove(row);
                    }
                }
            }
        }
    }

    /// Number of rows in a column family.
    pub fn row_count(&self, keyspace: &str, cf: &str) -> usize {
        self.keyspaces
            .read()
            .get(keyspace)
            .and_then(|ks| ks.column_families.get(cf))
            .map_or(0, BTreeMap::len)
    }
}

impl ConnectionProvider for MemoryStore {
    type Client = MemoryClient;

    fn get_client(&self) -> Result<MemoryClient, BackendError> {
        Ok(self.client(DEFAULT_KEYSPACE))
    }
}

/// A `MemoryStore` handle bound to one keyspace.
#[derive(Clone)]
pub struct MemoryClient {
    store: MemoryStore,
    keyspace: String,
}

impl ColumnClient for MemoryClient {
    fn describe_version(&self) -> Result<String, BackendError> {
        Ok(VERSION.to_string())
    }

    fn get(&self, cf: &str, row: &[u8], column: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.store.get(&self.keyspace, cf, row, column))
    }

    fn get_slice(
        &self,
        cf: &str,
        row: &[u8],
        count: Option<usize>,
    ) -> Result<Vec<Column>, BackendError> {
        Ok(self.store.get_slice(&self.keyspace, cf, row, count))
    }

    fn insert(
        &self,
        cf: &str,
        row: &[u8],
        column: &[u8],
        value: &[u8],
    ) -> Result<(), BackendError> {
        self.store.insert(&self.keyspace, cf, row, column, value);
        Ok(())
    }

    fn remove(&self, cf: &str, row: &[u8], column: Option<&[u8]>) -> Result<(), BackendError> {
        self.store.remove(&self.keyspace, cf, row, column);
        Ok(())
    }
}
