//! Application error types and result alias.

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Failures while reading an uploaded chart archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The bytes are not a readable gzip-compressed tar stream
    #[error("malformed chart archive: {0}")]
    Malformed(String),

    /// The archive contains no Chart.yaml
    #[error("Chart.yaml not found in chart archive")]
    MissingDescriptor,

    /// Chart.yaml exists but is not a usable descriptor
    #[error("invalid Chart.yaml: {0}")]
    InvalidDescriptor(String),
}

/// Failures of the index read-merge-write cycle.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The persisted index does not parse
    #[error("corrupt index: {0}")]
    CorruptCatalog(String),

    /// The backing storage failed or timed out
    #[error("storage unreachable: {0}")]
    Unreachable(String),

    /// Another chart version already owns the package file name
    #[error("{file_name} already belongs to {owner}")]
    ArchiveConflict { file_name: String, owner: String },

    /// Exclusive access to the index key was not granted in time
    #[error("timed out after {waited:?} waiting for lock on {key}")]
    LockTimeout { key: String, waited: Duration },
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Uploaded archive rejected
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Index update failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Not found error
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Address parse error
    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and stable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Archive(ArchiveError::Malformed(_)) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_ARCHIVE")
            }
            AppError::Archive(ArchiveError::MissingDescriptor) => {
                (StatusCode::BAD_REQUEST, "MISSING_DESCRIPTOR")
            }
            AppError::Archive(ArchiveError::InvalidDescriptor(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_DESCRIPTOR")
            }
            AppError::Store(StoreError::CorruptCatalog(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CORRUPT_INDEX")
            }
            AppError::Store(StoreError::Unreachable(_)) => {
                (StatusCode::BAD_GATEWAY, "STORAGE_UNREACHABLE")
            }
            AppError::Store(StoreError::ArchiveConflict { .. }) => {
                (StatusCode::CONFLICT, "ARCHIVE_CONFLICT")
            }
            AppError::Store(StoreError::LockTimeout { .. }) => {
                (StatusCode::SERVICE_UNAVAILABLE, "LOCK_TIMEOUT")
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            AppError::AddrParse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ADDR_PARSE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Io(_) => "IO operation failed".to_string(),
            AppError::AddrParse(_) => "Invalid address".to_string(),
            other => other.to_string(),
        };

        // Log the error
        tracing::error!(error = %self, code = code, "Request error");

        let body = Json(json!({
            "code": code,
            "message": message,
        }));

        if let AppError::Store(StoreError::LockTimeout { .. }) = &self {
            return (status, [(header::RETRY_AFTER, "1")], body).into_response();
        }

        (status, body).into_response()
    }
}
