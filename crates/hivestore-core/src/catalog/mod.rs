//! The catalog facade: create, get, list, alter and drop for databases,
//! tables and partitions.
//!
//! `MetaStore` orchestrates the primary store, the index maintainer and the
//! cascade engine. It holds no locks of its own; every call fetches a client
//! from the connection provider and runs synchronously against it.

pub mod pattern;

use tracing::debug;

use crate::backend::{ColumnClient, ConnectionProvider};
use crate::cascade;
use crate::encoding::key::{partition_name, partition_values, require_name};
use crate::encoding::{encode_database_key, encode_partition_key, encode_table_key};
use crate::error::{Error, SchemaError};
use crate::index::{self, IndexId};
use crate::store::{self, EntityKind};
use crate::types::{Database, Partition, Table, listing_limit};

pub use pattern::NamePattern;

/// A Hive-style metadata catalog over a wide-column backend.
pub struct MetaStore<P> {
    provider: P,
}

impl<P: ConnectionProvider> MetaStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Round-trip to the backend; returns its version string.
    pub fn probe(&self) -> Result<String, Error> {
        Ok(self.provider.get_client()?.describe_version()?)
    }

    fn client(&self) -> Result<P::Client, Error> {
        Ok(self.provider.get_client()?)
    }

    // -----------------------------------------------------------------------
    // Databases
    // -----------------------------------------------------------------------

    /// Create a database. Fails with `AlreadyExists` if the name is taken.
    pub fn create_database(&self, db: &Database) -> Result<(), Error> {
        let client = self.client()?;
        let key = encode_database_key(&db.name)?;
        if store::exists(&client, EntityKind::Database, &key)? {
            return Err(SchemaError::AlreadyExists(format!("database {}", db.name)).into());
        }
        store::put(&client, EntityKind::Database, &key, db)?;
        index::add(&client, &IndexId::Databases, &db.name)?;
        debug!(db = %db.name, "created database");
        Ok(())
    }

    pub fn get_database(&self, name: &str) -> Result<Option<Database>, Error> {
        let client = self.client()?;
        store::get(&client, EntityKind::Database, &encode_database_key(name)?)
    }

    /// All database names in key order.
    pub fn get_all_databases(&self) -> Result<Vec<String>, Error> {
        index::list(&self.client()?, &IndexId::Databases, None)
    }

    /// Database names matching a Hive-style pattern.
    pub fn get_databases(&self, pattern: &str) -> Result<Vec<String>, Error> {
        let pattern = NamePattern::new(pattern);
        let mut names = self.get_all_databases()?;
        names.retain(|n| pattern.matches(n));
        Ok(names)
    }

    /// Replace a database definition, renaming it (and moving its tables)
    /// when `db.name` differs from `name`. Safe to retry after a failure.
    pub fn alter_database(&self, name: &str, db: &Database) -> Result<(), Error> {
        cascade::alter_database(&self.client()?, name, db)?;
        debug!(from = name, to = %db.name, "altered database");
        Ok(())
    }

    /// Drop an empty database. Returns whether it existed.
    pub fn drop_database(&self, name: &str) -> Result<bool, Error> {
        let client = self.client()?;
        let key = encode_database_key(name)?;
        if !index::list(&client, &IndexId::tables(name), Some(1))?.is_empty() {
            return Err(SchemaError::InvalidOperation(format!(
                "database {name} is not empty"
            ))
            .into());
        }
        let existed = store::exists(&client, EntityKind::Database, &key)?;
        index::remove(&client, &IndexId::Databases, name)?;
        store::delete(&client, EntityKind::Database, &key)?;
        debug!(db = name, existed, "dropped database");
        Ok(existed)
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    /// Create a table in an existing database.
    pub fn create_table(&self, table: &Table) -> Result<(), Error> {
        let client = self.client()?;
        let db_key = encode_database_key(&table.db_name)?;
        let key = encode_table_key(&table.db_name, &table.table_name)?;
        if !store::exists(&client, EntityKind::Database, &db_key)? {
            return Err(SchemaError::NoSuchObject(format!("database {}", table.db_name)).into());
        }
        if store::exists(&client, EntityKind::Table, &key)? {
            return Err(SchemaError::AlreadyExists(format!(
                "table {}.{}",
                table.db_name, table.table_name
            ))
            .into());
        }
        store::put(&client, EntityKind::Table, &key, table)?;
        index::add(&client, &IndexId::tables(&table.db_name), &table.table_name)?;
        debug!(db = %table.db_name, table = %table.table_name, "created table");
        Ok(())
    }

    pub fn get_table(&self, db_name: &str, table_name: &str) -> Result<Option<Table>, Error> {
        let client = self.client()?;
        store::get(
            &client,
            EntityKind::Table,
            &encode_table_key(db_name, table_name)?,
        )
    }

    /// All table names in `db_name`, in key order.
    pub fn get_all_tables(&self, db_name: &str) -> Result<Vec<String>, Error> {
        require_name("database", db_name)?;
        index::list(&self.client()?, &IndexId::tables(db_name), None)
    }

    /// Table names in `db_name` matching a Hive-style pattern.
    pub fn get_tables(&self, db_name: &str, pattern: &str) -> Result<Vec<String>, Error> {
        let pattern = NamePattern::new(pattern);
        let mut names = self.get_all_tables(db_name)?;
        names.retain(|n| pattern.matches(n));
        Ok(names)
    }

    /// Drop a table and its partitions. Returns whether it existed.
    pub fn drop_table(&self, db_name: &str, table_name: &str) -> Result<bool, Error> {
        let existed = cascade::drop_table(&self.client()?, db_name, table_name)?;
        debug!(db = db_name, table = table_name, existed, "dropped table");
        Ok(existed)
    }

    /// Replace a table definition, renaming it when
    /// `table.table_name != table_name`. The database cannot change.
    pub fn alter_table(&self, db_name: &str, table_name: &str, table: &Table) -> Result<(), Error> {
        cascade::alter_table(&self.client()?, db_name, table_name, table)?;
        debug!(
            db = db_name,
            from = table_name,
            to = %table.table_name,
            "altered table"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Partitions
    // -----------------------------------------------------------------------

    /// Add a partition to an existing table.
    pub fn add_partition(&self, partition: &Partition) -> Result<(), Error> {
        let client = self.client()?;
        let table_key = encode_table_key(&partition.db_name, &partition.table_name)?;
        let key = encode_partition_key(
            &partition.db_name,
            &partition.table_name,
            &partition.values,
        )?;
        let name = partition_name(&partition.values)?;
        if !store::exists(&client, EntityKind::Table, &table_key)? {
            return Err(SchemaError::NoSuchObject(format!(
                "table {}.{}",
                partition.db_name, partition.table_name
            ))
            .into());
        }
        if store::exists(&client, EntityKind::Partition, &key)? {
            return Err(SchemaError::AlreadyExists(format!(
                "partition {:?} of {}.{}",
                partition.values, partition.db_name, partition.table_name
            ))
            .into());
        }
        store::put(&client, EntityKind::Partition, &key, partition)?;
        index::add(
            &client,
            &IndexId::partitions(&partition.db_name, &partition.table_name),
            &name,
        )?;
        debug!(
            db = %partition.db_name,
            table = %partition.table_name,
            partition = ?partition.values,
            "added partition"
        );
        Ok(())
    }

    pub fn get_partition(
        &self,
        db_name: &str,
        table_name: &str,
        values: &[String],
    ) -> Result<Option<Partition>, Error> {
        let client = self.client()?;
        store::get(
            &client,
            EntityKind::Partition,
            &encode_partition_key(db_name, table_name, values)?,
        )
    }

    /// Partition names of a table in key order. A non-negative `max` caps the
    /// result; a negative `max` returns every name.
    pub fn list_partition_names(
        &self,
        db_name: &str,
        table_name: &str,
        max: i32,
    ) -> Result<Vec<String>, Error> {
        require_name("database", db_name)?;
        require_name("table", table_name)?;
        index::list(
            &self.client()?,
            &IndexId::partitions(db_name, table_name),
            listing_limit(max),
        )
    }

    /// Partitions of a table in name order, with the same `max` rules as
    /// [`MetaStore::list_partition_names`].
    pub fn get_partitions(
        &self,
        db_name: &str,
        table_name: &str,
        max: i32,
    ) -> Result<Vec<Partition>, Error> {
        require_name("database", db_name)?;
        require_name("table", table_name)?;
        let client = self.client()?;
        let names = index::list(
            &client,
            &IndexId::partitions(db_name, table_name),
            listing_limit(max),
        )?;
        let mut partitions = Vec::with_capacity(names.len());
        for name in names {
            let key = encode_partition_key(db_name, table_name, &partition_values(&name))?;
            // Skip entries whose row is mid-delete.
            if let Some(partition) = store::get(&client, EntityKind::Partition, &key)? {
                partitions.push(partition);
            }
        }
        Ok(partitions)
    }

    /// Drop one partition. Returns whether it existed.
    pub fn drop_partition(
        &self,
        db_name: &str,
        table_name: &str,
        values: &[String],
    ) -> Result<bool, Error> {
        let client = self.client()?;
        let key = encode_partition_key(db_name, table_name, values)?;
        let existed = store::exists(&client, EntityKind::Partition, &key)?;
        index::remove(
            &client,
            &IndexId::partitions(db_name, table_name),
            &partition_name(values)?,
        )?;
        store::delete(&client, EntityKind::Partition, &key)?;
        debug!(db = db_name, table = table_name, partition = ?values, existed, "dropped partition");
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::backend::MemoryStore;
    use crate::error::EncodingError;

    fn setup() -> MetaStore<MemoryStore> {
        MetaStore::new(MemoryStore::new())
    }

    fn database(name: &str) -> Database {
        Database::new(name, "My Database", "file:///tmp/", BTreeMap::new())
    }

    fn part_values() -> Vec<String> {
        vec![
            "cassandra://localhost:9160/user/hive/warehouse/mydb.db/invites/ds=2008-08-08"
                .to_string(),
            "cassandra://localhost:9160/user/hive/warehouse/mydb.db/invites/ds=2008-08-15"
                .to_string(),
        ]
    }

    #[test]
    fn test_create_delete_database_and_table() {
        let ms = setup();
        let db = database("db_name");
        ms.create_database(&db).unwrap();
        assert_eq!(ms.get_database("db_name").unwrap(), Some(db));

        let table = Table::new("db_name", "table_name");
        ms.create_table(&table).unwrap();
        assert_eq!(ms.get_table("db_name", "table_name").unwrap(), Some(table));

        assert_eq!(ms.get_all_databases().unwrap().len(), 1);
        assert_eq!(ms.get_all_tables("db_name").unwrap().len(), 1);

        assert!(ms.drop_table("db_name", "table_name").unwrap());
        assert!(ms.get_table("db_name", "table_name").unwrap().is_none());
        assert!(ms.get_all_tables("db_name").unwrap().is_empty());
    }

    #[test]
    fn test_missing_entities_are_none() {
        let ms = setup();
        assert!(ms.get_database("nope").unwrap().is_none());
        assert!(ms.get_table("nope", "nope").unwrap().is_none());
        assert!(
            ms.get_partition("nope", "nope", &["x".to_string()])
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_duplicate_creates_rejected() {
        let ms = setup();
        ms.create_database(&database("db")).unwrap();
        let err = ms.create_database(&database("db")).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::AlreadyExists(_))));

        ms.create_table(&Table::new("db", "t")).unwrap();
        let err = ms.create_table(&Table::new("db", "t")).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::AlreadyExists(_))));

        let p = Partition::new("db", "t", vec!["a".to_string()]);
        ms.add_partition(&p).unwrap();
        let err = ms.add_partition(&p).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::AlreadyExists(_))));
    }

    #[test]
    fn test_references_enforced() {
        let ms = setup();
        let err = ms.create_table(&Table::new("missing_db", "t")).unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::NoSuchObject(_))));

        ms.create_database(&database("db")).unwrap();
        let err = ms
            .add_partition(&Partition::new("db", "missing", vec!["a".to_string()]))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::NoSuchObject(_))));
    }

    #[test]
    fn test_listings_reject_empty_identifiers() {
        let ms = setup();
        let invalid = |r: Result<Vec<String>, Error>| {
            matches!(
                r,
                Err(Error::Encoding(EncodingError::InvalidIdentifier { .. }))
            )
        };
        assert!(invalid(ms.get_all_tables("")));
        assert!(invalid(ms.get_tables("", "*")));
        assert!(invalid(ms.list_partition_names("", "", 10)));
        assert!(invalid(ms.list_partition_names("db", "", -1)));
        assert!(matches!(
            ms.get_partitions("", "t", -1),
            Err(Error::Encoding(EncodingError::InvalidIdentifier { .. }))
        ));
    }

    #[test]
    fn test_find_empty_partition_list() {
        let ms = setup();
        ms.create_database(&database("db_name")).unwrap();
        ms.create_table(&Table::new("db_name", "table_name")).unwrap();

        for max in [100, -1, 0, i32::MIN] {
            assert!(
                ms.list_partition_names("db_name", "table_name", max)
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[test]
    fn test_alter_table() {
        let ms = setup();
        ms.create_database(&database("alter_table_db_name")).unwrap();
        let table = Table::new("alter_table_db_name", "orig_table_name");
        ms.create_table(&table).unwrap();
        assert_eq!(
            ms.get_table("alter_table_db_name", "orig_table_name").unwrap(),
            Some(table)
        );

        let altered = Table::new("alter_table_db_name", "new_table_name");
        ms.alter_table("alter_table_db_name", "orig_table_name", &altered)
            .unwrap();
        assert_eq!(ms.get_all_tables("alter_table_db_name").unwrap().len(), 1);
        assert_eq!(
            ms.get_table("alter_table_db_name", "new_table_name").unwrap(),
            Some(altered)
        );
    }

    #[test]
    fn test_alter_database_table() {
        let ms = setup();
        ms.create_database(&database("alter_db_db_name")).unwrap();
        let table = Table::new("alter_db_db_name", "table_name");
        ms.create_table(&table).unwrap();
        assert_eq!(
            ms.get_table("alter_db_db_name", "table_name").unwrap(),
            Some(table)
        );

        let altered = database("alter_db_db_name2");
        ms.alter_database("alter_db_db_name", &altered).unwrap();
        assert_eq!(ms.get_all_tables("alter_db_db_name2").unwrap().len(), 1);
        assert!(ms.get_database("alter_db_db_name").unwrap().is_none());
        assert_eq!(ms.get_database("alter_db_db_name2").unwrap(), Some(altered.clone()));

        // Running it again changes nothing.
        ms.alter_database("alter_db_db_name", &altered).unwrap();
        assert_eq!(ms.get_all_databases().unwrap(), vec!["alter_db_db_name2"]);
        assert_eq!(ms.get_all_tables("alter_db_db_name2").unwrap(), vec!["table_name"]);
    }

    #[test]
    fn test_add_partition() {
        let ms = setup();
        ms.create_database(&database("alter_part_db")).unwrap();
        ms.create_table(&Table::new("alter_part_db", "table_name"))
            .unwrap();

        let part = Partition::new("alter_part_db", "table_name", part_values());
        ms.add_partition(&part).unwrap();

        let found = ms
            .get_partition("alter_part_db", "table_name", &part_values())
            .unwrap();
        assert_eq!(found, Some(part));
        assert_eq!(
            ms.list_partition_names("alter_part_db", "table_name", -1)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_partition_listing_order_and_limit() {
        let ms = setup();
        ms.create_database(&database("db")).unwrap();
        ms.create_table(&Table::new("db", "t")).unwrap();
        for ds in ["2008-08-15", "2008-08-01", "2008-08-08"] {
            ms.add_partition(&Partition::new("db", "t", vec![format!("ds={ds}")]))
                .unwrap();
        }

        assert_eq!(
            ms.list_partition_names("db", "t", -1).unwrap(),
            vec!["ds=2008-08-01", "ds=2008-08-08", "ds=2008-08-15"]
        );
        assert_eq!(
            ms.list_partition_names("db", "t", 2).unwrap(),
            vec!["ds=2008-08-01", "ds=2008-08-08"]
        );
        let partitions = ms.get_partitions("db", "t", 1).unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].values, vec!["ds=2008-08-01"]);
    }

    #[test]
    fn test_multi_value_partition_name_roundtrip() {
        let ms = setup();
        ms.create_database(&database("db")).unwrap();
        ms.create_table(&Table::new("db", "t")).unwrap();
        let values = vec!["a".to_string(), "b".to_string()];
        ms.add_partition(&Partition::new("db", "t", values.clone()))
            .unwrap();

        let names = ms.list_partition_names("db", "t", -1).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(partition_values(&names[0]), values);
    }

    #[test]
    fn test_drop_partition() {
        let ms = setup();
        ms.create_database(&database("db")).unwrap();
        ms.create_table(&Table::new("db", "t")).unwrap();
        let values = vec!["x".to_string()];
        ms.add_partition(&Partition::new("db", "t", values.clone()))
            .unwrap();

        assert!(ms.drop_partition("db", "t", &values).unwrap());
        assert!(ms.get_partition("db", "t", &values).unwrap().is_none());
        assert!(ms.list_partition_names("db", "t", -1).unwrap().is_empty());
        assert!(!ms.drop_partition("db", "t", &values).unwrap());
    }

    #[test]
    fn test_invalid_partition_value_rejected() {
        let ms = setup();
        ms.create_database(&database("db")).unwrap();
        ms.create_table(&Table::new("db", "t")).unwrap();
        let err = ms
            .add_partition(&Partition::new("db", "t", vec!["a\u{1F}b".to_string()]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Encoding(EncodingError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_drop_database() {
        let ms = setup();
        ms.create_database(&database("db")).unwrap();
        ms.create_table(&Table::new("db", "t")).unwrap();

        let err = ms.drop_database("db").unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::InvalidOperation(_))));

        ms.drop_table("db", "t").unwrap();
        assert!(ms.drop_database("db").unwrap());
        assert!(ms.get_database("db").unwrap().is_none());
        assert!(ms.get_all_databases().unwrap().is_empty());
        assert!(!ms.drop_database("db").unwrap());
    }

    #[test]
    fn test_pattern_listing() {
        let ms = setup();
        for name in ["sales", "sales_archive", "marketing"] {
            ms.create_database(&database(name)).unwrap();
        }
        assert_eq!(
            ms.get_databases("sales*").unwrap(),
            vec!["sales", "sales_archive"]
        );
        assert_eq!(
            ms.get_databases("MARKETING|sales").unwrap(),
            vec!["marketing", "sales"]
        );

        ms.create_table(&Table::new("sales", "orders_2024")).unwrap();
        ms.create_table(&Table::new("sales", "customers")).unwrap();
        assert_eq!(ms.get_tables("sales", "orders*").unwrap(), vec!["orders_2024"]);
    }

    #[test]
    fn test_indices_match_primary_rows() {
        let store = MemoryStore::new();
        let ms = MetaStore::new(store.clone());
        ms.create_database(&database("a")).unwrap();
        ms.create_database(&database("b")).unwrap();
        ms.create_table(&Table::new("a", "t1")).unwrap();
        ms.create_table(&Table::new("a", "t2")).unwrap();
        ms.alter_table("a", "t2", &Table::new("a", "t3")).unwrap();
        ms.alter_database("b", &database("c")).unwrap();
        ms.drop_table("a", "t1").unwrap();

        assert_eq!(ms.get_all_databases().unwrap(), vec!["a", "c"]);
        assert_eq!(store.row_count("HiveMetaStore", "Databases"), 2);
        assert_eq!(ms.get_all_tables("a").unwrap(), vec!["t3"]);
        assert_eq!(store.row_count("HiveMetaStore", "Tables"), 1);
    }

    #[test]
    fn test_probe() {
        assert!(setup().probe().unwrap().starts_with("hivestore-memory/"));
    }
}
