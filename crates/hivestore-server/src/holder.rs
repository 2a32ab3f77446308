//! Blocking connection provider over the async client.
//!
//! `ClientHolder` keeps one connection to the first reachable endpoint and a
//! private current-thread runtime to drive it. Each catalog call blocks on
//! one request. A transport failure drops the connection; the next
//! `get_client` reconnects. Requests are never retried here.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use hivestore_core::backend::{Column, ColumnClient, ConnectionProvider};
use hivestore_core::config::ConnectionConfig;
use hivestore_core::error::{BackendError, ConfigError};

use crate::client::{self, ColumnStoreClient};
use crate::error::ClientError;
use crate::protocol::Transport;

struct HolderInner {
    runtime: Runtime,
    config: ConnectionConfig,
    conn: Mutex<Option<ColumnStoreClient>>,
}

/// Shared, cheaply clonable handle to one backend connection.
#[derive(Clone)]
pub struct ClientHolder {
    inner: Arc<HolderInner>,
}

impl ClientHolder {
    /// Build a holder without connecting.
    pub fn new(config: ConnectionConfig) -> Result<Self, ConfigError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConfigError::Runtime(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(HolderInner {
                runtime,
                config,
                conn: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.conn.lock().is_some()
    }

    /// Drop the current connection, if any.
    pub fn disconnect(&self) {
        self.inner.conn.lock().take();
    }
}

impl HolderInner {
    fn transport(&self) -> Transport {
        Transport::from_framed(self.config.framed)
    }

    fn block_on<T>(&self, fut: impl Future<Output = client::Result<T>>) -> client::Result<T> {
        let timeout = self.config.timeout;
        self.runtime.block_on(async move {
            match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(timeout)),
            }
        })
    }

    /// Endpoints in the order they should be tried.
    fn candidates(&self) -> Vec<String> {
        let mut endpoints = self.config.endpoints();
        if self.config.randomize_connections {
            endpoints.shuffle(&mut rand::thread_rng());
        }
        endpoints
    }

    fn connect(&self) -> Result<ColumnStoreClient, BackendError> {
        let mut failures = Vec::new();
        for endpoint in self.candidates() {
            match self.block_on(ColumnStoreClient::connect(&endpoint, self.transport())) {
                Ok(client) => {
                    debug!(%endpoint, "connected to backend");
                    return Ok(client);
                }
                Err(e) => {
                    warn!(%endpoint, error = %e, "backend connection failed");
                    failures.push(format!("{endpoint}: {e}"));
                }
            }
        }
        Err(BackendError::Connectivity(format!(
            "no reachable endpoint ({})",
            failures.join("; ")
        )))
    }
}

impl ConnectionProvider for ClientHolder {
    type Client = HeldClient;

    fn get_client(&self) -> Result<HeldClient, BackendError> {
        let mut conn = self.inner.conn.lock();
        if conn.is_none() {
            *conn = Some(self.inner.connect()?);
        }
        Ok(HeldClient {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// A client handed out by [`ClientHolder`]; shares the holder's connection.
pub struct HeldClient {
    inner: Arc<HolderInner>,
}

fn connected(
    conn: &mut Option<ColumnStoreClient>,
) -> Result<&mut ColumnStoreClient, BackendError> {
    conn.as_mut()
        .ok_or_else(|| BackendError::Connectivity("connection was closed".to_string()))
}

/// Convert a client result, dropping the connection if it failed in transit.
fn settle<T>(
    conn: &mut Option<ColumnStoreClient>,
    result: client::Result<T>,
) -> Result<T, BackendError> {
    result.map_err(|e| {
        if e.is_connection_failure() {
            conn.take();
        }
        e.into()
    })
}

impl ColumnClient for HeldClient {
    fn describe_version(&self) -> Result<String, BackendError> {
        let mut conn = self.inner.conn.lock();
        let client = connected(&mut conn)?;
        let result = self.inner.block_on(client.describe_version());
        settle(&mut conn, result)
    }

    fn get(&self, cf: &str, row: &[u8], column: &[u8]) -> Result<Option<Vec<u8>>, BackendError> {
        let keyspace = &self.inner.config.keyspace;
        let mut conn = self.inner.conn.lock();
        let client = connected(&mut conn)?;
        let result = self.inner.block_on(client.get(keyspace, cf, row, column));
        settle(&mut conn, result)
    }

    fn get_slice(
        &self,
        cf: &str,
        row: &[u8],
        count: Option<usize>,
    ) -> Result<Vec<Column>, BackendError> {
        let keyspace = &self.inner.config.keyspace;
        let mut conn = self.inner.conn.lock();
        let client = connected(&mut conn)?;
        let result = self.inner.block_on(client.get_slice(keyspace, cf, row, count));
        settle(&mut conn, result)
    }

    fn insert(
        &self,
        cf: &str,
        row: &[u8],
        column: &[u8],
        value: &[u8],
    ) -> Result<(), BackendError> {
        let keyspace = &self.inner.config.keyspace;
        let mut conn = self.inner.conn.lock();
        let client = connected(&mut conn)?;
        let result = self
            .inner
            .block_on(client.insert(keyspace, cf, row, column, value));
        settle(&mut conn, result)
    }

    fn remove(&self, cf: &str, row: &[u8], column: Option<&[u8]>) -> Result<(), BackendError> {
        let keyspace = &self.inner.config.keyspace;
        let mut conn = self.inner.conn.lock();
        let client = connected(&mut conn)?;
        let result = self.inner.block_on(client.remove(keyspace, cf, row, column));
        settle(&mut conn, result)
    }
}
