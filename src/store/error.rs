//! Store error types shared by every backend.

use thiserror::Error;

/// Failures reported by MetadataStore, BlobStore and DirectoryLookup implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record, blob or directory entry does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else a remote backend reports (permission, network, quota).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
