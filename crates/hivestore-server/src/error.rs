//! Error types for the backend client.

use std::time::Duration;

use hivestore_core::error::BackendError;
use thiserror::Error;

use crate::protocol::ErrorResponse;

/// Errors returned by `ColumnStoreClient` methods.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),

    #[error("server disconnected")]
    Disconnected,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {}: {}", .0.error, .0.message)]
    Server(ErrorResponse),
}

impl ClientError {
    /// True when the connection can no longer be trusted and must be reopened.
    pub fn is_connection_failure(&self) -> bool {
        !matches!(self, ClientError::Server(_))
    }
}

impl From<ClientError> for BackendError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Server(resp) => BackendError::Fault {
                code: resp.error,
                message: resp.message,
            },
            other => BackendError::Connectivity(other.to_string()),
        }
    }
}
