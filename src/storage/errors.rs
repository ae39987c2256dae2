//! Storage error types
//!
//! Error codes:
//! - UNKNOWN_SERVICE: service name was never configured
//! - NOT_FOUND: no entity with that id in that service
//! - DECODE_ERROR: stored data could not be turned back into an entity
//! - MISSING_CONFIGURATION: a required environment variable is absent
//! - REMOTE_OPERATION_FAILED: the remote store rejected or timed out a call

use std::time::Duration;

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for raw remote client calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure of a single call to a remote object or document store
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("unexpected response status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("{0}")]
    Service(String),

    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

/// Storage errors
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("service {0:?} is not configured")]
    UnknownService(String),

    #[error("could not find entity with id {id:?} in service {service:?}")]
    NotFound { service: String, id: String },

    #[error("could not decode {context}: {reason}")]
    Decode { context: String, reason: String },

    #[error("could not encode entity {id:?}: {reason}")]
    Encode { id: String, reason: String },

    #[error("could not find environment variable {0:?} for remote storage configuration")]
    MissingConfiguration(String),

    #[error("invalid payload for service {service:?}: {reason}")]
    InvalidPayload { service: String, reason: String },

    #[error("could not {operation} {target}: {source}")]
    RemoteOperationFailed {
        operation: &'static str,
        target: String,
        #[source]
        source: RemoteError,
    },

    #[error("unknown storage type {0:?}")]
    UnknownStorageKind(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    pub(crate) fn not_found(service: &str, id: &str) -> Self {
        StorageError::NotFound {
            service: service.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn remote(operation: &'static str, target: impl Into<String>, source: RemoteError) -> Self {
        StorageError::RemoteOperationFailed {
            operation,
            target: target.into(),
            source,
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::UnknownService(_) => "UNKNOWN_SERVICE",
            StorageError::NotFound { .. } => "NOT_FOUND",
            StorageError::Decode { .. } => "DECODE_ERROR",
            StorageError::Encode { .. } => "ENCODE_ERROR",
            StorageError::MissingConfiguration(_) => "MISSING_CONFIGURATION",
            StorageError::InvalidPayload { .. } => "INVALID_PAYLOAD",
            StorageError::RemoteOperationFailed { .. } => "REMOTE_OPERATION_FAILED",
            StorageError::UnknownStorageKind(_) => "UNKNOWN_STORAGE_KIND",
            StorageError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            StorageError::UnknownService(_) => 404,
            StorageError::NotFound { .. } => 404,
            StorageError::InvalidPayload { .. } => 400,
            StorageError::RemoteOperationFailed {
                source: RemoteError::Timeout(_),
                ..
            } => 504,
            StorageError::RemoteOperationFailed { .. } => 502,
            StorageError::Decode { .. } => 500,
            StorageError::Encode { .. } => 500,
            StorageError::MissingConfiguration(_) => 500,
            StorageError::UnknownStorageKind(_) => 500,
            StorageError::Internal(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
