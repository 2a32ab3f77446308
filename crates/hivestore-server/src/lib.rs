//! Networked wide-column backend for the hivestore catalog.
//!
//! `ColumnStoreServer` serves a `MemoryStore` over TCP. `ClientHolder` is the
//! catalog-side connection provider that talks to it, and [`open_metastore`]
//! wires the two together from a [`Configuration`].

pub mod client;
pub mod error;
pub mod holder;
pub mod protocol;
pub mod server;

pub use client::ColumnStoreClient;
pub use holder::ClientHolder;
pub use protocol::Transport;
pub use server::ColumnStoreServer;

use hivestore_core::config::{Configuration, ConnectionConfig};
use hivestore_core::error::{ConfigError, Error};
use hivestore_core::MetaStore;
use tracing::info;

/// Open a catalog against the backend described by `conf`.
///
/// Connects and round-trips a version request before returning, so an
/// unreachable backend fails here with [`ConfigError::Unreachable`].
pub fn open_metastore(conf: &Configuration) -> Result<MetaStore<ClientHolder>, Error> {
    let config = ConnectionConfig::from_conf(conf)?;
    let endpoints = config.endpoints().join(",");
    let keyspace = config.keyspace.clone();

    let metastore = MetaStore::new(ClientHolder::new(config)?);
    match metastore.probe() {
        Ok(version) => {
            info!(%endpoints, %keyspace, %version, "metastore opened");
            Ok(metastore)
        }
        Err(Error::Backend(source)) => Err(ConfigError::Unreachable {
            endpoint: endpoints,
            source,
        }
        .into()),
        Err(e) => Err(e),
    }
}
