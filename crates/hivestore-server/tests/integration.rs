//! Integration tests for hivestore-server: start a backend, open a catalog
//! against it through the configuration layer, and run catalog operations.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::runtime::Runtime;

use hivestore_core::backend::MemoryStore;
use hivestore_core::config::{
    CONF_FRAMED, CONF_HOST, CONF_PORT, CONF_TIMEOUT_MILLIS, Configuration,
};
use hivestore_core::error::{ConfigError, Error, SchemaError};
use hivestore_core::types::{Database, Partition, Table};
use hivestore_core::MetaStore;
use hivestore_server::{ClientHolder, ColumnStoreServer, Transport, open_metastore};

/// A backend server running on its own runtime. Dropping it stops the
/// server and closes every open connection.
struct TestServer {
    runtime: Option<Runtime>,
    addr: SocketAddr,
}

impl TestServer {
    fn start(store: MemoryStore, transport: Transport) -> Self {
        Self::start_on("127.0.0.1:0", store, transport)
    }

    fn start_on(addr: &str, store: MemoryStore, transport: Transport) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let server = runtime
            .block_on(ColumnStoreServer::bind(addr, store, transport))
            .unwrap();
        let addr = server.local_addr().unwrap();
        runtime.spawn(server.run_until(std::future::pending()));
        Self {
            runtime: Some(runtime),
            addr,
        }
    }

    fn stop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn conf(port: u16, framed: bool) -> Configuration {
    let mut conf = Configuration::new();
    conf.set(CONF_HOST, "127.0.0.1")
        .set_int(CONF_PORT, i64::from(port))
        .set_bool(CONF_FRAMED, framed)
        .set_int(CONF_TIMEOUT_MILLIS, 2000);
    conf
}

fn open(server: &TestServer, framed: bool) -> MetaStore<ClientHolder> {
    open_metastore(&conf(server.addr.port(), framed)).unwrap()
}

fn database(name: &str) -> Database {
    Database::new(name, "description", "file:///tmp", BTreeMap::new())
}

fn part_values() -> Vec<String> {
    vec![
        "part_val".to_string(),
        "part:val".to_string(),
        "part=val".to_string(),
        "part/val".to_string(),
    ]
}

fn run_catalog_scenarios(framed: bool) {
    let transport = Transport::from_framed(framed);
    let server = TestServer::start(MemoryStore::new(), transport);
    let ms = open(&server, framed);

    // Create and drop a database and a table.
    ms.create_database(&database("create_db")).unwrap();
    assert_eq!(ms.get_all_databases().unwrap(), vec!["create_db"]);
    ms.create_table(&Table::new("create_db", "tbl")).unwrap();
    assert_eq!(
        ms.get_table("create_db", "tbl").unwrap(),
        Some(Table::new("create_db", "tbl"))
    );
    assert!(matches!(
        ms.create_table(&Table::new("create_db", "tbl")),
        Err(Error::Schema(SchemaError::AlreadyExists(_)))
    ));
    assert!(ms.drop_table("create_db", "tbl").unwrap());
    assert!(ms.get_table("create_db", "tbl").unwrap().is_none());
    assert!(ms.drop_database("create_db").unwrap());
    assert!(ms.get_all_databases().unwrap().is_empty());

    // A fresh table lists no partitions.
    ms.create_database(&database("part_db")).unwrap();
    ms.create_table(&Table::new("part_db", "table_name")).unwrap();
    assert!(ms.list_partition_names("part_db", "table_name", 100).unwrap().is_empty());
    assert!(ms.list_partition_names("part_db", "table_name", -1).unwrap().is_empty());

    // Add a partition whose values carry path-like characters.
    let part = Partition::new("part_db", "table_name", part_values());
    ms.add_partition(&part).unwrap();
    assert_eq!(
        ms.get_partition("part_db", "table_name", &part_values()).unwrap(),
        Some(part.clone())
    );
    assert_eq!(ms.list_partition_names("part_db", "table_name", -1).unwrap().len(), 1);

    // Rename the table; the partition follows it.
    ms.alter_table("part_db", "table_name", &Table::new("part_db", "table_name2"))
        .unwrap();
    assert_eq!(ms.get_all_tables("part_db").unwrap(), vec!["table_name2"]);
    assert!(ms.get_table("part_db", "table_name").unwrap().is_none());
    let moved = ms.get_partitions("part_db", "table_name2", -1).unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].table_name, "table_name2");
    assert_eq!(moved[0].values, part_values());

    // Rename the database; its table moves with it.
    ms.alter_database("part_db", &database("part_db2")).unwrap();
    assert_eq!(ms.get_all_databases().unwrap(), vec!["part_db2"]);
    assert_eq!(ms.get_all_tables("part_db2").unwrap(), vec!["table_name2"]);
    let table = ms.get_table("part_db2", "table_name2").unwrap().unwrap();
    assert_eq!(table.db_name, "part_db2");
    assert_eq!(
        ms.list_partition_names("part_db2", "table_name2", -1).unwrap().len(),
        1
    );
}

#[test]
fn test_catalog_over_buffered_transport() {
    run_catalog_scenarios(false);
}

#[test]
fn test_catalog_over_framed_transport() {
    run_catalog_scenarios(true);
}

#[test]
fn test_state_is_shared_between_catalogs() {
    let server = TestServer::start(MemoryStore::new(), Transport::Buffered);
    let writer = open(&server, false);
    let reader = open(&server, false);

    writer.create_database(&database("shared")).unwrap();
    writer.create_table(&Table::new("shared", "t")).unwrap();
    assert_eq!(reader.get_all_tables("shared").unwrap(), vec!["t"]);
    assert_eq!(reader.get_databases("sha*").unwrap(), vec!["shared"]);
}

#[test]
fn test_unreachable_backend_fails_to_open() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = open_metastore(&conf(port, false)).err().unwrap();
    assert!(err.is_connectivity());
    match err {
        Error::Config(ConfigError::Unreachable { endpoint, .. }) => {
            assert_eq!(endpoint, format!("127.0.0.1:{port}"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut conf = Configuration::new();
    conf.set(CONF_PORT, "not-a-port");
    let err = open_metastore(&conf).err().unwrap();
    assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_transport_mismatch_fails_to_open() {
    let server = TestServer::start(MemoryStore::new(), Transport::Framed);
    let err = open_metastore(&conf(server.addr.port(), false)).err().unwrap();
    assert!(err.is_connectivity());
}

#[test]
fn test_reconnects_after_server_restart() {
    let store = MemoryStore::new();
    let mut server = TestServer::start(store.clone(), Transport::Buffered);
    let addr = server.addr;
    let ms = open(&server, false);
    ms.create_database(&database("survivor")).unwrap();

    server.stop();
    let _server = TestServer::start_on(&addr.to_string(), store, Transport::Buffered);

    // The first call may observe the dead connection; it must not be retried
    // silently, but the next call reconnects.
    let _ = ms.get_all_databases();
    assert_eq!(ms.get_all_databases().unwrap(), vec!["survivor"]);
    assert!(ms.provider().is_connected());
}
