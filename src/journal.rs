//! Write-ahead intent journal for relocations and the reconcile sweep.
//!
//! A relocation spans two stores with no shared transaction. Before the first
//! mutation an intent file is written; it is removed once the last step
//! succeeds. Whatever is left in the journal after a crash or a failed step is
//! resolved by `reconcile`:
//! - destination holds the relocated record: finish the move (drop leftover source blob and record)
//! - move whose source record is already gone: the last step ran, nothing to do
//! - otherwise: drop the destination blob, unless a record in that container refers to it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::DatumError;
use crate::model::{FileRecord, RecordPath};
use crate::store::fs::write_atomic;
use crate::store::helpers::store_io_error;
use crate::store::{BlobStore, MetadataStore, StoreError, blob_exists};

/// One in-flight relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationIntent {
    pub id: Uuid,
    pub source: RecordPath,
    pub destination: RecordPath,
    pub source_blob: String,
    /// Set only when the blob is copied to a new path.
    pub destination_blob: Option<String>,
    /// Record as it is written at `destination`.
    pub record: FileRecord,
    pub copy: bool,
    pub started_at: DateTime<Utc>,
}

/// Directory of `{uuid}.json` intent files.
#[derive(Debug, Clone)]
pub struct IntentJournal {
    dir: PathBuf,
}

impl IntentJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn intent_file(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Persist an intent before any store is mutated.
    pub async fn begin(&self, intent: &RelocationIntent) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(intent)?;
        write_atomic(&self.intent_file(intent.id), &raw).await
    }

    /// Remove the intent after the relocation finished.
    pub async fn complete(&self, id: Uuid) -> Result<(), StoreError> {
        let file = self.intent_file(id);
        match fs::remove_file(&file)
            .await
            .map_err(store_io_error("remove intent", &file))
        {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// All intents still on disk, oldest first.
    pub async fn pending(&self) -> Result<Vec<RelocationIntent>, StoreError> {
        let mut rd = match fs::read_dir(&self.dir)
            .await
            .map_err(store_io_error("read journal", &self.dir))
        {
            Ok(rd) => rd,
            Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut out = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .map_err(store_io_error("read journal", &self.dir))?
        {
            let p = entry.path();
            if p.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read(&p).await.map_err(store_io_error("read intent", &p))?;
            match serde_json::from_slice::<RelocationIntent>(&raw) {
                Ok(intent) => out.push(intent),
                Err(e) => warn!(file = %p.display(), error = %e, "skipping unreadable intent"),
            }
        }
        out.sort_by_key(|i| i.started_at);
        Ok(out)
    }
}

/// What reconcile did with one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The relocated record is at the destination; leftover source state was removed.
    Completed,
    /// The relocated record never landed; an unreferenced destination blob was removed.
    RolledBack,
    /// Resolution failed; the intent stays in the journal.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub items: Vec<(RelocationIntent, ReconcileOutcome)>,
}

impl ReconcileReport {
    pub fn count(&self, pred: impl Fn(&ReconcileOutcome) -> bool) -> usize {
        self.items.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Failed(_)))
    }
}

/// Resolve every pending intent. One failing intent does not stop the sweep.
pub async fn reconcile(
    journal: &IntentJournal,
    metadata: &dyn MetadataStore,
    blobs: &dyn BlobStore,
) -> Result<ReconcileReport, DatumError> {
    let mut report = ReconcileReport::default();
    for intent in journal.pending().await? {
        let outcome = match resolve(&intent, metadata, blobs).await {
            Ok(outcome) => match journal.complete(intent.id).await {
                Ok(()) => outcome,
                Err(e) => ReconcileOutcome::Failed(e.to_string()),
            },
            Err(e) => ReconcileOutcome::Failed(e.to_string()),
        };
        info!(intent = %intent.id, source = %intent.source, destination = %intent.destination, outcome = ?outcome, "reconciled intent");
        report.items.push((intent, outcome));
    }
    Ok(report)
}

impl RelocationIntent {
    /// The record as it sat at the source before the relocation.
    fn source_record(&self) -> FileRecord {
        FileRecord {
            file_path: self.source_blob.clone(),
            ..self.record.clone()
        }
    }
}

async fn resolve(
    intent: &RelocationIntent,
    metadata: &dyn MetadataStore,
    blobs: &dyn BlobStore,
) -> Result<ReconcileOutcome, DatumError> {
    let at_source = metadata.get(&intent.source).await?;
    let landed = metadata.get(&intent.destination).await?.as_ref() == Some(&intent.record);

    if landed {
        if !intent.copy && at_source.as_ref() == Some(&intent.source_record()) {
            if intent.destination_blob.is_some() && blob_exists(blobs, &intent.source_blob).await? {
                blobs.delete(&intent.source_blob).await?;
            }
            metadata.delete(&intent.source).await?;
        }
        return Ok(ReconcileOutcome::Completed);
    }

    // The source record is removed only after the destination was written.
    if !intent.copy && at_source.is_none() {
        debug!(intent = %intent.id, "source already removed; relocation had finished");
        return Ok(ReconcileOutcome::Completed);
    }

    if let Some(dest_blob) = intent.destination_blob.as_deref()
        && dest_blob != intent.source_blob
        && blob_exists(blobs, dest_blob).await?
    {
        if at_source.as_ref().is_some_and(|r| r.file_path == dest_blob)
            || blob_referenced(metadata, &intent.destination, dest_blob).await?
        {
            warn!(intent = %intent.id, blob = dest_blob, "destination blob is referenced by a record; kept");
        } else {
            blobs.delete(dest_blob).await?;
        }
    }
    Ok(ReconcileOutcome::RolledBack)
}

/// Whether any record in the container holding `record` points at `blob`.
async fn blob_referenced(
    metadata: &dyn MetadataStore,
    record: &RecordPath,
    blob: &str,
) -> Result<bool, DatumError> {
    let Some(container) = record.parent_document() else {
        return Ok(false);
    };
    for set in metadata.collections(&container).await? {
        let collection = container.collection(&set)?;
        if metadata.list(&collection).await?.iter().any(|r| r.file_path == blob) {
            return Ok(true);
        }
    }
    Ok(false)
}
