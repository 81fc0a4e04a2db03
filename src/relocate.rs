//! Cross-container relocation of a file record and its blob.
//!
//! `relocate` = `plan` (reads only) + `execute` (mutations, strictly in order):
//!   download -> upload -> set destination record -> delete source blob -> delete source record
//! The blob steps are skipped when source and destination share a container; the
//! two delete steps are skipped for copies.
//!
//! There is no retry and no rollback. A failure part-way leaves whatever already
//! happened in place; with an IntentJournal attached the half-done relocation is
//! recorded for `journal::reconcile`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{ConflictReason, DatumError};
use crate::journal::{IntentJournal, RelocationIntent};
use crate::model::{ContainerKind, FileRecord, LogicalPath, RecordPath, blob_path_for};
use crate::store::{BlobStore, DirectoryLookup, MetadataStore, blob_exists};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocateOptions {
    /// Keep the source record (and blob) instead of removing it.
    pub copy: bool,
}

impl RelocateOptions {
    pub fn copy() -> Self {
        Self { copy: true }
    }
}

/// Blob relocation performed for cross-container moves and copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobTransfer {
    pub from: String,
    pub to: String,
}

/// Everything decided before the first mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationPlan {
    pub source: RecordPath,
    pub destination: RecordPath,
    /// Record as read from the source.
    pub record: FileRecord,
    /// `None` when both paths share a container.
    pub blob: Option<BlobTransfer>,
    pub copy: bool,
}

/// Result of a completed relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Record as written at the destination.
    pub record: FileRecord,
    pub from: RecordPath,
    pub to: RecordPath,
    pub blob: Option<BlobTransfer>,
    pub copied: bool,
}

/// Moves or copies file records between containers.
#[derive(Clone)]
pub struct DocumentRelocator {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    directory: Arc<dyn DirectoryLookup>,
    journal: Option<IntentJournal>,
}

impl DocumentRelocator {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        directory: Arc<dyn DirectoryLookup>,
    ) -> Self {
        Self {
            metadata,
            blobs,
            directory,
            journal: None,
        }
    }

    /// Record an intent around every relocation so `reconcile` can clean up partial failures.
    pub fn with_journal(mut self, journal: IntentJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Move or copy record `id` from `source` to `destination`.
    pub async fn relocate(
        &self,
        source: &LogicalPath,
        destination: &LogicalPath,
        id: &str,
        options: RelocateOptions,
    ) -> Result<Relocation, DatumError> {
        let plan = self.plan(source, destination, id, options).await?;
        self.execute(plan).await
    }

    /// Read-only half: load the record, apply the conflict rules, compute the blob transfer.
    pub async fn plan(
        &self,
        source: &LogicalPath,
        destination: &LogicalPath,
        id: &str,
        options: RelocateOptions,
    ) -> Result<RelocationPlan, DatumError> {
        let source_path = source.record_path(id)?;
        let destination_path = destination.record_path(id)?;

        let record = self
            .metadata
            .get(&source_path)
            .await?
            .ok_or_else(|| DatumError::NotFound(source_path.clone()))?;

        let blob = if source.same_container(destination) {
            if options.copy {
                return Err(DatumError::Conflict(ConflictReason::SameContainerCopy));
            }
            if source_path == destination_path {
                return Err(DatumError::Conflict(ConflictReason::SameLocation));
            }
            None
        } else {
            let to = blob_path_in(self.directory.as_ref(), destination, id).await?;
            if blob_exists(self.blobs.as_ref(), &to).await? {
                return Err(DatumError::Conflict(ConflictReason::DestinationBlobExists(to)));
            }
            Some(BlobTransfer {
                from: record.file_path.clone(),
                to,
            })
        };

        debug!(source = %source_path, destination = %destination_path, blob = ?blob, copy = options.copy, "relocation planned");
        Ok(RelocationPlan {
            source: source_path,
            destination: destination_path,
            record,
            blob,
            copy: options.copy,
        })
    }

    /// Mutating half. Steps run one after another; the first failure is returned as-is.
    pub async fn execute(&self, plan: RelocationPlan) -> Result<Relocation, DatumError> {
        let RelocationPlan {
            source,
            destination,
            mut record,
            blob,
            copy,
        } = plan;

        let source_blob = record.file_path.clone();
        if let Some(transfer) = &blob {
            record.file_path = transfer.to.clone();
        }

        let intent_id = match &self.journal {
            Some(journal) => {
                let intent = RelocationIntent {
                    id: Uuid::new_v4(),
                    source: source.clone(),
                    destination: destination.clone(),
                    source_blob,
                    destination_blob: blob.as_ref().map(|b| b.to.clone()),
                    record: record.clone(),
                    copy,
                    started_at: Utc::now(),
                };
                journal.begin(&intent).await?;
                Some(intent.id)
            }
            None => None,
        };

        if let Some(transfer) = &blob {
            let data = self.blobs.download(&transfer.from).await?;
            debug!(blob = %transfer.from, bytes = data.len(), "downloaded source blob");
            self.blobs.upload(&transfer.to, data).await?;
            debug!(blob = %transfer.to, "uploaded destination blob");
        }

        self.metadata.set(&destination, &record).await?;
        debug!(record = %destination, "destination record written");

        if !copy {
            if let Some(transfer) = &blob {
                self.blobs.delete(&transfer.from).await?;
                debug!(blob = %transfer.from, "source blob deleted");
            }
            self.metadata.delete(&source).await?;
            debug!(record = %source, "source record deleted");
        }

        if let (Some(journal), Some(id)) = (&self.journal, intent_id)
            && let Err(e) = journal.complete(id).await
        {
            warn!(intent = %id, error = %e, "relocation finished but its intent could not be cleared");
        }

        info!(
            from = %source,
            to = %destination,
            copy,
            blob_moved = blob.is_some(),
            "Relocated file record"
        );
        Ok(Relocation {
            record,
            from: source,
            to: destination,
            blob,
            copied: copy,
        })
    }
}

/// Blob path for `file_id` in `location`'s container.
/// Departments go through the directory for their display name; buyers and manufacturers use their id.
pub async fn blob_path_in(
    directory: &dyn DirectoryLookup,
    location: &LogicalPath,
    file_id: &str,
) -> Result<String, DatumError> {
    let kind = location.kind();
    let container_id = location.container().id();
    let display = match kind {
        ContainerKind::Departmental => {
            directory
                .resolve_container_display_name(location.tenant_id(), container_id)
                .await?
        }
        ContainerKind::BuyerScoped | ContainerKind::ManufacturerScoped => container_id.to_string(),
    };
    Ok(blob_path_for(kind, &display, file_id))
}
