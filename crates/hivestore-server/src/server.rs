//! TCP server that exposes a `MemoryStore` as a wide-column backend.
//!
//! Each connected client sends JSON requests and receives JSON responses,
//! one at a time, over the configured transport. Each request touches a
//! single row under the store's lock, which gives per-row atomicity.

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, error, info, warn};

use hivestore_core::backend::MemoryStore;
use hivestore_core::backend::memory::VERSION;

use crate::protocol::{ColumnWire, Request, Response, Transport, read_message, write_message};

/// A wide-column backend server listening on TCP.
pub struct ColumnStoreServer {
    store: MemoryStore,
    listener: TcpListener,
    transport: Transport,
}

impl ColumnStoreServer {
    /// Bind to `addr`. Port 0 picks an ephemeral port; see [`Self::local_addr`].
    pub async fn bind(
        addr: impl ToSocketAddrs,
        store: MemoryStore,
        transport: Transport,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            store,
            listener,
            transport,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the server until SIGINT or SIGTERM.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the server until `shutdown` completes.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, transport = ?self.transport, "server listening");

        let accept_loop = async {
            loop {
                match self.listener.accept().await {
                    Ok((stream, peer)) => {
                        let store = self.store.clone();
                        let transport = self.transport;
                        tokio::spawn(async move {
                            debug!(%peer, "client connected");
                            if let Err(e) = handle_connection(store, stream, transport).await {
                                warn!(%peer, error = %e, "connection handler error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept error");
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown => {
                info!("shutdown signal received");
            }
        }

        Ok(())
    }
}

async fn handle_connection(
    store: MemoryStore,
    stream: TcpStream,
    transport: Transport,
) -> std::io::Result<()> {
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);
    let mut buf = Vec::new();

    while read_message(&mut reader, transport, &mut buf).await? {
        let response = match serde_json::from_slice::<Request>(&buf) {
            Ok(req) => dispatch(&store, req),
            Err(e) => Response::error("ParseError", e.to_string()),
        };

        let resp_bytes = serde_json::to_vec(&response).unwrap_or_else(|e| {
            let fallback = Response::error("SerializationError", e.to_string());
            serde_json::to_vec(&fallback).unwrap_or_default()
        });
        write_message(&mut writer, transport, &resp_bytes).await?;
    }

    Ok(())
}

fn dispatch(store: &MemoryStore, req: Request) -> Response {
    match req {
        Request::DescribeVersion => Response::ok_version(VERSION),

        Request::Get {
            keyspace,
            column_family,
            row,
            column,
        } => match validate(&keyspace, &column_family) {
            Err(resp) => resp,
            Ok(()) => Response::ok_value(store.get(&keyspace, &column_family, &row, &column)),
        },

        Request::GetSlice {
            keyspace,
            column_family,
            row,
            count,
        } => match validate(&keyspace, &column_family) {
            Err(resp) => resp,
            Ok(()) => {
                let columns = store
                    .get_slice(&keyspace, &column_family, &row, count)
                    .into_iter()
                    .map(|c| ColumnWire {
                        name: c.name,
                        value: c.value,
                    })
                    .collect();
                Response::ok_columns(columns)
            }
        },

        Request::Insert {
            keyspace,
            column_family,
            row,
            column,
            value,
        } => match validate(&keyspace, &column_family) {
            Err(resp) => resp,
            Ok(()) => {
                store.insert(&keyspace, &column_family, &row, &column, &value);
                Response::ok_empty()
            }
        },

        Request::Remove {
            keyspace,
            column_family,
            row,
            column,
        } => match validate(&keyspace, &column_family) {
            Err(resp) => resp,
            Ok(()) => {
                store.remove(&keyspace, &column_family, &row, column.as_deref());
                Response::ok_empty()
            }
        },
    }
}

fn validate(keyspace: &str, column_family: &str) -> Result<(), Response> {
    if keyspace.is_empty() {
        return Err(Response::error(
            "InvalidRequest",
            "keyspace must not be empty",
        ));
    }
    if column_family.is_empty() {
        return Err(Response::error(
            "InvalidRequest",
            "column family must not be empty",
        ));
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(store: &MemoryStore, row: &[u8], column: &[u8]) -> Response {
        dispatch(
            store,
            Request::Insert {
                keyspace: "ks".to_string(),
                column_family: "cf".to_string(),
                row: row.to_vec(),
                column: column.to_vec(),
                value: b"v".to_vec(),
            },
        )
    }

    #[test]
    fn test_dispatch_insert_then_get() {
        let store = MemoryStore::new();
        assert!(matches!(insert(&store, b"r", b"c"), Response::Ok(_)));

        let resp = dispatch(
            &store,
            Request::Get {
                keyspace: "ks".to_string(),
                column_family: "cf".to_string(),
                row: b"r".to_vec(),
                column: b"c".to_vec(),
            },
        );
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["value"], serde_json::json!(b"v".to_vec()));
    }

    #[test]
    fn test_dispatch_slice_and_remove_row() {
        let store = MemoryStore::new();
        insert(&store, b"r", b"b");
        insert(&store, b"r", b"a");

        let slice = Request::GetSlice {
            keyspace: "ks".to_string(),
            column_family: "cf".to_string(),
            row: b"r".to_vec(),
            count: None,
        };
        let json = serde_json::to_value(dispatch(&store, slice.clone())).unwrap();
        assert_eq!(json["columns"][0]["name"], serde_json::json!(b"a".to_vec()));
        assert_eq!(json["columns"].as_array().unwrap().len(), 2);

        dispatch(
            &store,
            Request::Remove {
                keyspace: "ks".to_string(),
                column_family: "cf".to_string(),
                row: b"r".to_vec(),
                column: None,
            },
        );
        let json = serde_json::to_value(dispatch(&store, slice)).unwrap();
        assert!(json["columns"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_rejects_empty_keyspace() {
        let store = MemoryStore::new();
        let resp = dispatch(
            &store,
            Request::Get {
                keyspace: String::new(),
                column_family: "cf".to_string(),
                row: vec![],
                column: vec![],
            },
        );
        assert!(matches!(resp, Response::Error(ref e) if e.error == "InvalidRequest"));
    }
}
