//! Primary store: keyed CRUD of entity payloads.
//!
//! Each entity kind lives in its own column family. A row holds one
//! `payload` column with the JSON-serialized entity. This layer has no
//! cross-key knowledge and performs no retries.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::ColumnClient;
use crate::encoding::RowKey;
use crate::error::{EncodingError, Error};

/// Column holding the serialized entity.
pub const PAYLOAD_COLUMN: &[u8] = b"payload";

/// Column naming the entity a row is being renamed to. It lives on the
/// source row, so deleting that row clears it.
pub const MOVE_MARKER_COLUMN: &[u8] = b"moving_to";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Database,
    Table,
    Partition,
}

impl EntityKind {
    pub fn column_family(self) -> &'static str {
        match self {
            EntityKind::Database => "Databases",
            EntityKind::Table => "Tables",
            EntityKind::Partition => "Partitions",
        }
    }
}

/// Upsert an entity payload. Overwrites unconditionally.
pub fn put<T: Serialize>(
    client: &impl ColumnClient,
    kind: EntityKind,
    key: &RowKey,
    payload: &T,
) -> Result<(), Error> {
    let bytes = serde_json::to_vec(payload).map_err(|e| {
        EncodingError::CorruptPayload(format!("failed to serialize {kind:?} payload: {e}"))
    })?;
    client.insert(kind.column_family(), key.as_bytes(), PAYLOAD_COLUMN, &bytes)?;
    Ok(())
}

/// Fetch an entity payload, or `None` if the row is absent.
pub fn get<T: DeserializeOwned>(
    client: &impl ColumnClient,
    kind: EntityKind,
    key: &RowKey,
) -> Result<Option<T>, Error> {
    let Some(bytes) = client.get(kind.column_family(), key.as_bytes(), PAYLOAD_COLUMN)? else {
        return Ok(None);
    };
    let payload = serde_json::from_slice(&bytes).map_err(|e| {
        EncodingError::CorruptPayload(format!("failed to deserialize {kind:?} payload: {e}"))
    })?;
    Ok(Some(payload))
}

/// Whether a row exists for `key`, without decoding it.
pub fn exists(client: &impl ColumnClient, kind: EntityKind, key: &RowKey) -> Result<bool, Error> {
    Ok(client
        .get(kind.column_family(), key.as_bytes(), PAYLOAD_COLUMN)?
        .is_some())
}

/// Delete an entity row. Deleting an absent row is a no-op.
pub fn delete(client: &impl ColumnClient, kind: EntityKind, key: &RowKey) -> Result<(), Error> {
    client.remove(kind.column_family(), key.as_bytes(), None)?;
    Ok(())
}

/// Mark the entity at `key` as being renamed to `target`.
pub fn set_move_marker(
    client: &impl ColumnClient,
    kind: EntityKind,
    key: &RowKey,
    target: &str,
) -> Result<(), Error> {
    client.insert(
        kind.column_family(),
        key.as_bytes(),
        MOVE_MARKER_COLUMN,
        target.as_bytes(),
    )?;
    Ok(())
}

/// The rename target recorded on `key`, if a rename is in progress.
pub fn move_marker(
    client: &impl ColumnClient,
    kind: EntityKind,
    key: &RowKey,
) -> Result<Option<String>, Error> {
    let Some(bytes) = client.get(kind.column_family(), key.as_bytes(), MOVE_MARKER_COLUMN)? else {
        return Ok(None);
    };
    let target = String::from_utf8(bytes).map_err(|e| {
        EncodingError::CorruptPayload(format!("invalid {kind:?} move marker: {e}"))
    })?;
    Ok(Some(target))
}
