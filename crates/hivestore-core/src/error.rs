//! Error types for all hivestore catalog operations.

use thiserror::Error;

/// Top-level error type for catalog operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{option}': {value:?} ({reason})")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    #[error("backend at {endpoint} is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to start client runtime: {0}")]
    Runtime(String),
}

/// Failures reported by, or on the way to, the wide-column backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Connectivity(String),

    #[error("backend fault: {code}: {message}")]
    Fault { code: String, message: String },
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("malformed encoded key")]
    MalformedKey,

    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid alter: {0}")]
    InvalidAlter(String),

    #[error("no such object: {0}")]
    NoSuchObject(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl Error {
    /// True when the failure came from the backend being unreachable.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Error::Backend(BackendError::Connectivity(_))
                | Error::Config(ConfigError::Unreachable { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
