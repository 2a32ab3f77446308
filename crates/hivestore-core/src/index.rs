//! Derived indices: all databases, all tables per database, all partition
//! names per table.
//!
//! Each index is one row in the `Indexes` column family; each member is a
//! column named by the encoded member with an empty value. Listing is a
//! column slice, so members come back in encoded-key order.
//!
//! Callers keep the ordering discipline: write the primary row before adding
//! to an index, and remove from the index before deleting the primary row.

use crate::backend::ColumnClient;
use crate::encoding::RowKey;
use crate::encoding::key::{
    TAG_INDEX_DATABASES, TAG_INDEX_PARTITIONS, TAG_INDEX_TABLES, decode_member,
    encode_components, encode_member,
};
use crate::error::Error;

pub const INDEX_COLUMN_FAMILY: &str = "Indexes";

/// Identifies one derived index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexId {
    Databases,
    Tables { db: String },
    Partitions { db: String, table: String },
}

impl IndexId {
    pub fn tables(db: &str) -> Self {
        IndexId::Tables { db: db.to_string() }
    }

    pub fn partitions(db: &str, table: &str) -> Self {
        IndexId::Partitions {
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    pub fn row_key(&self) -> RowKey {
        match self {
            IndexId::Databases => encode_components(TAG_INDEX_DATABASES, &[]),
            IndexId::Tables { db } => encode_components(TAG_INDEX_TABLES, &[db.as_str()]),
            IndexId::Partitions { db, table } => {
                encode_components(TAG_INDEX_PARTITIONS, &[db.as_str(), table.as_str()])
            }
        }
    }
}

pub fn add(client: &impl ColumnClient, index: &IndexId, member: &str) -> Result<(), Error> {
    client.insert(
        INDEX_COLUMN_FAMILY,
        index.row_key().as_bytes(),
        &encode_member(member),
        &[],
    )?;
    Ok(())
}

/// Remove a member. Removing an absent member is a no-op.
pub fn remove(client: &impl ColumnClient, index: &IndexId, member: &str) -> Result<(), Error> {
    client.remove(
        INDEX_COLUMN_FAMILY,
        index.row_key().as_bytes(),
        Some(&encode_member(member)),
    )?;
    Ok(())
}

/// List members in encoded-key order, capped at `limit` when given.
pub fn list(
    client: &impl ColumnClient,
    index: &IndexId,
    limit: Option<usize>,
) -> Result<Vec<String>, Error> {
    let columns = client.get_slice(INDEX_COLUMN_FAMILY, index.row_key().as_bytes(), limit)?;
    let mut members = Vec::with_capacity(columns.len());
    for column in columns {
        members.push(decode_member(&column.name)?);
    }
    Ok(members)
}

pub fn contains(client: &impl ColumnClient, index: &IndexId, member: &str) -> Result<bool, Error> {
    Ok(client
        .get(
            INDEX_COLUMN_FAMILY,
            index.row_key().as_bytes(),
            &encode_member(member),
        )?
        .is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryClient, MemoryStore};

    fn setup() -> MemoryClient {
        MemoryStore::new().client("test")
    }

    #[test]
    fn test_list_is_lexicographic_not_insertion_order() {
        let client = setup();
        let index = IndexId::Databases;
        for name in ["zeta", "alpha", "mid", "alpha2"] {
            add(&client, &index, name).unwrap();
        }
        assert_eq!(
            list(&client, &index, None).unwrap(),
            vec!["alpha", "alpha2", "mid", "zeta"]
        );
    }

    #[test]
    fn test_limit_caps_result() {
        let client = setup();
        let index = IndexId::tables("db");
        for name in ["a", "b", "c"] {
            add(&client, &index, name).unwrap();
        }
        assert_eq!(list(&client, &index, Some(2)).unwrap(), vec!["a", "b"]);
        assert!(list(&client, &index, Some(0)).unwrap().is_empty());
        assert_eq!(list(&client, &index, Some(100)).unwrap().len(), 3);
    }

    #[test]
    fn test_add_is_idempotent_and_remove_absent_is_noop() {
        let client = setup();
        let index = IndexId::tables("db");
        add(&client, &index, "t").unwrap();
        add(&client, &index, "t").unwrap();
        assert_eq!(list(&client, &index, None).unwrap(), vec!["t"]);

        remove(&client, &index, "t").unwrap();
        remove(&client, &index, "t").unwrap();
        assert!(list(&client, &index, None).unwrap().is_empty());
        assert!(!contains(&client, &index, "t").unwrap());
    }

    #[test]
    fn test_indices_are_scoped() {
        let client = setup();
        add(&client, &IndexId::tables("db1"), "t").unwrap();
        add(&client, &IndexId::partitions("db1", "t"), "p").unwrap();

        assert!(list(&client, &IndexId::tables("db2"), None).unwrap().is_empty());
        assert!(list(&client, &IndexId::Databases, None).unwrap().is_empty());
        assert!(
            list(&client, &IndexId::partitions("db1", "other"), None)
                .unwrap()
                .is_empty()
        );
        assert!(contains(&client, &IndexId::partitions("db1", "t"), "p").unwrap());
    }

    #[test]
    fn test_scope_components_do_not_bleed() {
        assert_ne!(
            IndexId::partitions("ab", "c").row_key(),
            IndexId::partitions("a", "bc").row_key()
        );
        assert_ne!(IndexId::tables("").row_key(), IndexId::Databases.row_key());
    }
}
