//! File record lifecycle around the relocation core: upload, read, list, search, retag, delete.
//!
//! Records get a generated UUID id; the display name is a plain attribute, so two
//! uploads with the same name never collide.

use bytes::Bytes;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{ConflictReason, DatumError};
use crate::model::{FileRecord, LogicalPath};
use crate::relocate::blob_path_in;
use crate::store::{BlobStore, DirectoryLookup, MetadataStore, StoreError, blob_exists};

/// Content and attribution for a new file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub name: String,
    pub content: Bytes,
    pub uploaded_by: String,
    pub uploaded_by_name: String,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct FileService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn DirectoryLookup>,
}

impl FileService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn DirectoryLookup>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            directory,
        }
    }

    /// Store the blob, then mirror its metadata. The blob is removed again if the record write fails.
    pub async fn upload(
        &self,
        location: &LogicalPath,
        request: UploadRequest,
    ) -> Result<FileRecord, DatumError> {
        if request.name.trim().is_empty() {
            return Err(DatumError::InvalidLocation("file name is empty".into()));
        }
        let id = Uuid::new_v4().to_string();
        let record_path = location.record_path(&id)?;
        let blob_path = blob_path_in(self.directory.as_ref(), location, &id).await?;
        if blob_exists(self.blobs.as_ref(), &blob_path).await? {
            return Err(DatumError::Conflict(ConflictReason::DestinationBlobExists(blob_path)));
        }

        let size = request.content.len();
        self.blobs.upload(&blob_path, request.content).await?;
        let download_url = self.blobs.download_url(&blob_path).await?;

        let record = FileRecord {
            id,
            name: request.name.trim().to_string(),
            file_path: blob_path.clone(),
            download_url,
            uploaded_by: request.uploaded_by,
            uploaded_by_name: request.uploaded_by_name,
            uploaded_at: Utc::now(),
            tags: normalize_tags(request.tags),
        };

        if let Err(e) = self.metadata.set(&record_path, &record).await {
            if let Err(cleanup) = self.blobs.delete(&blob_path).await {
                warn!(blob = %blob_path, error = %cleanup, "could not remove blob after failed record write");
            }
            return Err(e.into());
        }

        info!(record = %record_path, blob = %blob_path, bytes = size, name = %record.name, "Uploaded file");
        Ok(record)
    }

    pub async fn get(&self, location: &LogicalPath, id: &str) -> Result<FileRecord, DatumError> {
        let path = location.record_path(id)?;
        self.metadata
            .get(&path)
            .await?
            .ok_or(DatumError::NotFound(path))
    }

    /// Records in the location's record-set, ordered by display name then id.
    pub async fn list(&self, location: &LogicalPath) -> Result<Vec<FileRecord>, DatumError> {
        let mut records = self.metadata.list(&location.collection_path()).await?;
        records.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(records)
    }

    /// Case-insensitive match against the display name or any tag.
    pub async fn search(
        &self,
        location: &LogicalPath,
        query: &str,
    ) -> Result<Vec<FileRecord>, DatumError> {
        let needle = query.trim().to_lowercase();
        let records = self.list(location).await?;
        if needle.is_empty() {
            return Ok(records);
        }
        Ok(records
            .into_iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Replace the tag list.
    pub async fn set_tags(
        &self,
        location: &LogicalPath,
        id: &str,
        tags: Vec<String>,
    ) -> Result<FileRecord, DatumError> {
        let path = location.record_path(id)?;
        let mut record = self
            .metadata
            .get(&path)
            .await?
            .ok_or_else(|| DatumError::NotFound(path.clone()))?;
        record.tags = normalize_tags(tags);
        self.metadata.set(&path, &record).await?;
        info!(record = %path, tags = ?record.tags, "Updated tags");
        Ok(record)
    }

    /// Delete the blob, then the record. A blob that is already gone is tolerated.
    pub async fn delete(&self, location: &LogicalPath, id: &str) -> Result<FileRecord, DatumError> {
        let path = location.record_path(id)?;
        let record = self
            .metadata
            .get(&path)
            .await?
            .ok_or_else(|| DatumError::NotFound(path.clone()))?;

        match self.blobs.delete(&record.file_path).await {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => {
                warn!(record = %path, blob = %record.file_path, "blob already missing; deleting record anyway")
            }
            Err(e) => return Err(e.into()),
        }
        self.metadata.delete(&path).await?;
        info!(record = %path, blob = %record.file_path, "Deleted file");
        Ok(record)
    }
}

/// Trim, drop empties, de-duplicate keeping the first spelling.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect()
}
