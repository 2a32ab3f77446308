//! # hivestore
//!
//! A Hive-style metadata catalog (databases, tables, partitions) persisted in
//! a schema-less wide-column store.
//!
//! The backend offers only per-row atomicity: no foreign keys, no secondary
//! indices and no multi-row transactions. The catalog layers uniqueness,
//! ordered listing and cascading rename on top of it with explicit index
//! rows and ordered, idempotent write sequences.
//!
//! ## Quick Start
//!
//! ```
//! use hivestore_core::backend::MemoryStore;
//! use hivestore_core::catalog::MetaStore;
//! use hivestore_core::types::{Database, Table};
//!
//! let metastore = MetaStore::new(MemoryStore::new());
//!
//! let db = Database::new("web", "clickstream", "file:///warehouse/web", Default::default());
//! metastore.create_database(&db).unwrap();
//! metastore.create_table(&Table::new("web", "events")).unwrap();
//!
//! metastore
//!     .alter_table("web", "events", &Table::new("web", "page_views"))
//!     .unwrap();
//! assert_eq!(metastore.get_all_tables("web").unwrap(), vec!["page_views"]);
//! ```

pub mod backend;
pub mod cascade;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod error;
pub mod index;
pub mod store;
pub mod types;

pub use catalog::MetaStore;
pub use error::{Error, Result};
