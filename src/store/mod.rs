//! Store seams: metadata records, blobs and the container directory.
//!
//! The relocation core and the file service only ever talk to these traits;
//! `memory` and `fs` provide the in-process and local-disk backends.

mod error;
pub mod fs;
pub mod helpers;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::model::{FileRecord, RecordPath};

pub use error::{StoreError, StoreResult};

/// Document store addressed by hierarchical record paths.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch one record. `Ok(None)` when nothing is stored at `path`.
    async fn get(&self, path: &RecordPath) -> StoreResult<Option<FileRecord>>;

    /// Create or overwrite the record at `path`.
    async fn set(&self, path: &RecordPath, record: &FileRecord) -> StoreResult<()>;

    /// Remove the record at `path`. Deleting a missing record is not an error.
    async fn delete(&self, path: &RecordPath) -> StoreResult<()>;

    /// All records directly inside the collection at `collection`.
    async fn list(&self, collection: &RecordPath) -> StoreResult<Vec<FileRecord>>;

    /// Names of the sub-collections under `document`, sorted. A collection
    /// may be listed after its last record was deleted.
    async fn collections(&self, document: &RecordPath) -> StoreResult<Vec<String>>;
}

/// Content store addressed by slash-separated paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Retrieval URL for the blob; `StoreError::NotFound` when absent.
    async fn download_url(&self, path: &str) -> StoreResult<String>;

    async fn download(&self, path: &str) -> StoreResult<Bytes>;

    /// Create or overwrite the blob at `path`.
    async fn upload(&self, path: &str, data: Bytes) -> StoreResult<()>;

    /// `StoreError::NotFound` when absent.
    async fn delete(&self, path: &str) -> StoreResult<()>;
}

/// Resolves human-readable container names for departmental blob paths.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn resolve_container_display_name(
        &self,
        tenant_id: &str,
        container_id: &str,
    ) -> StoreResult<String>;
}

/// Existence probe: a URL means present, NotFound means absent, anything else is rethrown.
pub async fn blob_exists(blobs: &dyn BlobStore, path: &str) -> StoreResult<bool> {
    match blobs.download_url(path).await {
        Ok(_) => Ok(true),
        Err(StoreError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}
