//! # AppError
//!
//! Centralized error handling for the Wordbook ecosystem.
//! Port-level failures (`StoreError`, `BlobError`, `RelayError`) are mapped
//! onto `AppError` at the boundary of each core operation.

use thiserror::Error;

/// The primary error type for all wb-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., List, Word)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., blank word, blank list name, bad data URL)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The operation was invoked without an authenticated user.
    #[error("authentication required")]
    AuthRequired,

    /// The relay could not retrieve the remote image.
    #[error("could not fetch image: {0}")]
    UpstreamFetch(String),

    /// A word document with the same identifier already exists.
    #[error("word already exists: {0}")]
    DuplicateWord(String),

    /// A blob change failed after the owning document change was committed.
    #[error("storage inconsistency: {0}")]
    StorageInconsistency(String),

    /// Infrastructure failure (e.g., DB down, blob store unreachable)
    #[error("internal service error: {0}")]
    Internal(String),
}

/// A specialized Result type for Wordbook logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Failures reported by a [`crate::DocumentStore`] adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),

    #[error("document {0} already exists")]
    AlreadyExists(String),

    #[error("malformed document {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document store failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Failures reported by a [`crate::BlobStore`] adapter.
///
/// `NotFound` must stay distinct: callers treat it as a successful delete.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("blob {0} not found")]
    NotFound(String),

    #[error("invalid blob data: {0}")]
    InvalidData(String),

    #[error("blob store failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Failures reported by the image fetch relay, one per relay error code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("the relay must be called while authenticated")]
    Unauthenticated,

    #[error("invalid relay argument: {0}")]
    InvalidArgument(String),

    #[error("could not fetch image from URL: {0}")]
    Upstream(String),

    #[error("relay failed while storing the image: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(path) => AppError::NotFound("document".into(), path),
            StoreError::AlreadyExists(path) => AppError::DuplicateWord(path),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Unauthenticated => AppError::AuthRequired,
            RelayError::InvalidArgument(msg) => AppError::ValidationError(msg),
            RelayError::Upstream(msg) => AppError::UpstreamFetch(msg),
            RelayError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("document encoding failed: {err}"))
    }
}
