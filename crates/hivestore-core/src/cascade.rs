//! Multi-row alters and deletes over a backend without transactions.
//!
//! Every procedure here is a sequence of idempotent single-row steps ordered
//! write-new-before-delete-old. A crash part way leaves both the old and the
//! new names resolvable; re-running the same call converges on the final
//! state.
//!
//! A rename first writes a move marker onto the source row naming its
//! target. An existing target row is only ever written over when the source
//! carries that marker, so a rename never lands on an unrelated entity.

use tracing::{debug, warn};

use crate::backend::ColumnClient;
use crate::encoding::key::{partition_name, partition_values};
use crate::encoding::{encode_database_key, encode_partition_key, encode_table_key};
use crate::error::{Error, SchemaError};
use crate::index::{self, IndexId};
use crate::store::{self, EntityKind};
use crate::types::{Database, Partition, Table};

/// Rename or redefine a table within its database.
///
/// `new_table.db_name` must equal `db_name`; moving a table across databases
/// is rejected with [`SchemaError::InvalidAlter`].
pub fn alter_table(
    client: &impl ColumnClient,
    db_name: &str,
    old_name: &str,
    new_table: &Table,
) -> Result<(), Error> {
    if new_table.db_name != db_name {
        return Err(SchemaError::InvalidAlter(format!(
            "cannot move table {old_name} from database {db_name} to {}",
            new_table.db_name
        ))
        .into());
    }

    let new_name = new_table.table_name.as_str();
    let old_key = encode_table_key(db_name, old_name)?;
    let new_key = encode_table_key(db_name, new_name)?;
    let old_exists = store::exists(client, EntityKind::Table, &old_key)?;

    if new_key == old_key {
        if !old_exists {
            return Err(SchemaError::NoSuchObject(format!("table {db_name}.{old_name}")).into());
        }
        return move_table(client, db_name, old_name, new_table, Destination::Claimed);
    }

    let target: Option<Table> = store::get(client, EntityKind::Table, &new_key)?;
    let step = plan_rename(
        old_exists,
        store::move_marker(client, EntityKind::Table, &old_key)?,
        target.as_ref().map(|t| t == new_table),
        new_name,
        &format!("table {db_name}.{old_name}"),
        &format!("table {db_name}.{new_name}"),
    )?;
    match step {
        Rename::Done => return Ok(()),
        Rename::Start => store::set_move_marker(client, EntityKind::Table, &old_key, new_name)?,
        Rename::Resume => {}
    }

    move_table(client, db_name, old_name, new_table, Destination::Claimed)
}

/// Rename or redefine a database, moving every table it owns.
///
/// Retry-safe but not transactional: if this fails part way, the old name
/// stays resolvable with whatever tables have not moved yet, and calling it
/// again with the same arguments completes the move.
pub fn alter_database(
    client: &impl ColumnClient,
    old_name: &str,
    new_db: &Database,
) -> Result<(), Error> {
    let old_key = encode_database_key(old_name)?;
    let new_key = encode_database_key(&new_db.name)?;
    let old_exists = store::exists(client, EntityKind::Database, &old_key)?;

    if new_key == old_key {
        if !old_exists {
            return Err(SchemaError::NoSuchObject(format!("database {old_name}")).into());
        }
        store::put(client, EntityKind::Database, &new_key, new_db)?;
        index::add(client, &IndexId::Databases, &new_db.name)?;
        return Ok(());
    }

    let target: Option<Database> = store::get(client, EntityKind::Database, &new_key)?;
    let step = plan_rename(
        old_exists,
        store::move_marker(client, EntityKind::Database, &old_key)?,
        target.as_ref().map(|d| d == new_db),
        &new_db.name,
        &format!("database {old_name}"),
        &format!("database {}", new_db.name),
    )?;
    match step {
        Rename::Done => return Ok(()),
        Rename::Start => {
            store::set_move_marker(client, EntityKind::Database, &old_key, &new_db.name)?
        }
        Rename::Resume => {}
    }

    store::put(client, EntityKind::Database, &new_key, new_db)?;
    index::add(client, &IndexId::Databases, &new_db.name)?;

    let tables = index::list(client, &IndexId::tables(old_name), None)?;
    debug!(from = old_name, to = %new_db.name, tables = tables.len(), "moving database");

    for table_name in tables {
        let table_key = encode_table_key(old_name, &table_name)?;
        let Some(mut table) = store::get::<Table>(client, EntityKind::Table, &table_key)? else {
            // Dangling index entry left by an interrupted delete.
            index::remove(client, &IndexId::tables(old_name), &table_name)?;
            continue;
        };
        table.db_name = new_db.name.clone();
        move_table(client, old_name, &table_name, &table, Destination::MustMatch).inspect_err(
            |e| {
                warn!(
                    from = old_name,
                    to = %new_db.name,
                    table = %table_name,
                    error = %e,
                    "database move interrupted; retry alter_database to finish"
                );
            },
        )?;
    }

    index::remove(client, &IndexId::Databases, old_name)?;
    store::delete(client, EntityKind::Database, &old_key)?;
    Ok(())
}

/// Delete a table and every partition it owns.
///
/// Returns whether a table row existed. Index entries are removed before
/// their rows so an interruption never leaves an entry pointing nowhere.
pub fn drop_table(
    client: &impl ColumnClient,
    db_name: &str,
    table_name: &str,
) -> Result<bool, Error> {
    let table_key = encode_table_key(db_name, table_name)?;
    let existed = store::exists(client, EntityKind::Table, &table_key)?;

    let partitions = IndexId::partitions(db_name, table_name);
    for name in index::list(client, &partitions, None)? {
        index::remove(client, &partitions, &name)?;
        let values = partition_values(&name);
        let key = encode_partition_key(db_name, table_name, &values)?;
        store::delete(client, EntityKind::Partition, &key)?;
    }

    index::remove(client, &IndexId::tables(db_name), table_name)?;
    store::delete(client, EntityKind::Table, &table_key)?;
    Ok(existed)
}

/// Progress of a rename between two distinct keys.
#[derive(Debug, PartialEq, Eq)]
enum Rename {
    /// Nothing written yet; the target name is free.
    Start,
    /// The source carries a marker for this target; finish the move.
    Resume,
    /// The source is gone and the target already holds the request.
    Done,
}

/// Decide how a rename proceeds from the source row, its move marker and
/// the target row (`Some(equal_to_request)` when it exists).
fn plan_rename(
    old_exists: bool,
    marker: Option<String>,
    target_matches: Option<bool>,
    new_name: &str,
    old_label: &str,
    new_label: &str,
) -> Result<Rename, Error> {
    if !old_exists {
        return match target_matches {
            Some(true) => Ok(Rename::Done),
            _ => Err(SchemaError::NoSuchObject(old_label.to_string()).into()),
        };
    }
    match (marker, target_matches) {
        (Some(marker), _) if marker == new_name => Ok(Rename::Resume),
        (Some(marker), _) => Err(SchemaError::InvalidOperation(format!(
            "{old_label} is being renamed to {marker}"
        ))
        .into()),
        (None, Some(_)) => Err(SchemaError::AlreadyExists(new_label.to_string()).into()),
        (None, None) => Ok(Rename::Start),
    }
}

/// Who may occupy a table's destination row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Destination {
    /// The caller owns the destination name and may overwrite it.
    Claimed,
    /// The destination must be empty or already hold this exact table.
    MustMatch,
}

/// Re-key one table from `(old_db, old_name)` to the location named by
/// `table`, carrying its partitions and index memberships along.
fn move_table(
    client: &impl ColumnClient,
    old_db: &str,
    old_name: &str,
    table: &Table,
    destination: Destination,
) -> Result<(), Error> {
    let new_db = table.db_name.as_str();
    let new_name = table.table_name.as_str();
    let old_key = encode_table_key(old_db, old_name)?;
    let new_key = encode_table_key(new_db, new_name)?;

    if destination == Destination::MustMatch && new_key != old_key {
        let existing: Option<Table> = store::get(client, EntityKind::Table, &new_key)?;
        if existing.is_some_and(|t| t != *table) {
            return Err(SchemaError::AlreadyExists(format!("table {new_db}.{new_name}")).into());
        }
    }

    store::put(client, EntityKind::Table, &new_key, table)?;
    index::add(client, &IndexId::tables(new_db), new_name)?;

    if new_key == old_key {
        return Ok(());
    }

    let old_parts = IndexId::partitions(old_db, old_name);
    let new_parts = IndexId::partitions(new_db, new_name);
    for name in index::list(client, &old_parts, None)? {
        let values = partition_values(&name);
        let old_part_key = encode_partition_key(old_db, old_name, &values)?;
        if let Some(mut partition) =
            store::get::<Partition>(client, EntityKind::Partition, &old_part_key)?
        {
            partition.db_name = new_db.to_string();
            partition.table_name = new_name.to_string();
            let new_part_key = encode_partition_key(new_db, new_name, &partition.values)?;
            store::put(client, EntityKind::Partition, &new_part_key, &partition)?;
            index::add(client, &new_parts, &partition_name(&partition.values)?)?;
        }
        index::remove(client, &old_parts, &name)?;
        store::delete(client, EntityKind::Partition, &old_part_key)?;
    }

    index::remove(client, &IndexId::tables(old_db), old_name)?;
    store::delete(client, EntityKind::Table, &old_key)?;
    debug!(
        from = %format!("{old_db}.{old_name}"),
        to = %format!("{new_db}.{new_name}"),
        "moved table"
    );
    Ok(())
}
