//! Typed error definitions for datum.
//! Provides a small set of well-known failure modes for better logs and tests.

use thiserror::Error;

use crate::model::RecordPath;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum DatumError {
    #[error("File record not found: {0}")]
    NotFound(RecordPath),

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    /// Failure surfaced by a MetadataStore, BlobStore or DirectoryLookup.
    #[error("Upstream failure: {0}")]
    Upstream(#[from] StoreError),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Operation interrupted by user")]
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictReason {
    #[error("copying within the same container is not allowed")]
    SameContainerCopy,

    #[error("source and destination are the same record-set")]
    SameLocation,

    #[error("file already exists at destination: {0}")]
    DestinationBlobExists(String),
}

impl DatumError {
    /// Stable numeric code for structured logs.
    pub fn code(&self) -> u16 {
        match self {
            DatumError::NotFound(_) => 404,
            DatumError::Conflict(_) => 409,
            DatumError::Upstream(_) => 502,
            DatumError::InvalidLocation(_) => 400,
            DatumError::Interrupted => 499,
        }
    }

    /// Short machine-friendly kind used alongside `code()`.
    pub fn kind(&self) -> &'static str {
        match self {
            DatumError::NotFound(_) => "not_found",
            DatumError::Conflict(_) => "conflict",
            DatumError::Upstream(_) => "upstream",
            DatumError::InvalidLocation(_) => "invalid_location",
            DatumError::Interrupted => "interrupted",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatumError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DatumError::Conflict(_))
    }
}
