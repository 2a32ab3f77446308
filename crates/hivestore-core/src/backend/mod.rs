//! The wide-column backend as seen by the catalog.
//!
//! The catalog only needs single-row operations against named column
//! families inside one keyspace. Rows hold columns sorted by column name;
//! each single-row call is atomic, and nothing spans rows.

pub mod memory;

use crate::error::BackendError;

pub use memory::{MemoryClient, MemoryStore};

/// Keyspace used when none is configured.
pub const DEFAULT_KEYSPACE: &str = "HiveMetaStore";

/// A column name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
}

/// A live handle to the backend, bound to one keyspace.
pub trait ColumnClient {
    /// Backend identification string; used as a connectivity probe.
    fn describe_version(&self) -> Result<String, BackendError>;

    /// Read a single column.
    fn get(&self, cf: &str, row: &[u8], column: &[u8]) -> Result<Option<Vec<u8>>, BackendError>;

    /// Read the columns of a row in column-name order, at most `count` of them.
    fn get_slice(
        &self,
        cf: &str,
        row: &[u8],
        count: Option<usize>,
    ) -> Result<Vec<Column>, BackendError>;

    /// Upsert a single column.
    fn insert(&self, cf: &str, row: &[u8], column: &[u8], value: &[u8])
    -> Result<(), BackendError>;

    /// Remove one column, or the whole row when `column` is `None`.
    /// Removing something absent is not an error.
    fn remove(&self, cf: &str, row: &[u8], column: Option<&[u8]>) -> Result<(), BackendError>;
}

/// Supplies configured backend clients.
pub trait ConnectionProvider {
    type Client: ColumnClient;

    fn get_client(&self) -> Result<Self::Client, BackendError>;
}
