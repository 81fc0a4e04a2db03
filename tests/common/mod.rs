#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

use datum::store::StoreResult;
use datum::store::memory::{MemoryBlobStore, MemoryMetadataStore, StaticDirectory};
use datum::{
    BlobStore, DirectoryLookup, DocumentRelocator, FileRecord, LogicalPath, MetadataStore,
    RecordPath, StoreError,
};

pub const TENANT: &str = "acme";

/// Shared, ordered log of every store call, as `"<store>.<op> <path>"`.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, op: &str, path: impl std::fmt::Display) {
        self.0.lock().unwrap().push(format!("{op} {path}"));
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Operation names only, e.g. `["metadata.get", "blob.download"]`.
    pub fn ops(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|e| e.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Fail the next call to `op` (and every later one) with a backend error.
#[derive(Default)]
struct FailOn(Mutex<Option<&'static str>>);

impl FailOn {
    fn check(&self, op: &str) -> StoreResult<()> {
        match *self.0.lock().unwrap() {
            Some(f) if f == op => Err(StoreError::Backend(format!("injected failure in {op}"))),
            _ => Ok(()),
        }
    }
}

pub struct RecordingMetadata {
    pub inner: MemoryMetadataStore,
    calls: CallLog,
    fail: FailOn,
}

impl RecordingMetadata {
    pub fn fail_on(&self, op: &'static str) {
        *self.fail.0.lock().unwrap() = Some(op);
    }

    pub fn heal(&self) {
        *self.fail.0.lock().unwrap() = None;
    }
}

#[async_trait]
impl MetadataStore for RecordingMetadata {
    async fn get(&self, path: &RecordPath) -> StoreResult<Option<FileRecord>> {
        self.calls.push("metadata.get", path);
        self.fail.check("metadata.get")?;
        self.inner.get(path).await
    }

    async fn set(&self, path: &RecordPath, record: &FileRecord) -> StoreResult<()> {
        self.calls.push("metadata.set", path);
        self.fail.check("metadata.set")?;
        self.inner.set(path, record).await
    }

    async fn delete(&self, path: &RecordPath) -> StoreResult<()> {
        self.calls.push("metadata.delete", path);
        self.fail.check("metadata.delete")?;
        self.inner.delete(path).await
    }

    async fn list(&self, collection: &RecordPath) -> StoreResult<Vec<FileRecord>> {
        self.calls.push("metadata.list", collection);
        self.fail.check("metadata.list")?;
        self.inner.list(collection).await
    }

    async fn collections(&self, document: &RecordPath) -> StoreResult<Vec<String>> {
        self.calls.push("metadata.collections", document);
        self.fail.check("metadata.collections")?;
        self.inner.collections(document).await
    }
}

pub struct RecordingBlobs {
    pub inner: MemoryBlobStore,
    calls: CallLog,
    fail: FailOn,
}

impl RecordingBlobs {
    pub fn fail_on(&self, op: &'static str) {
        *self.fail.0.lock().unwrap() = Some(op);
    }

    pub fn heal(&self) {
        *self.fail.0.lock().unwrap() = None;
    }
}

#[async_trait]
impl BlobStore for RecordingBlobs {
    async fn download_url(&self, path: &str) -> StoreResult<String> {
        self.calls.push("blob.download_url", path);
        self.fail.check("blob.download_url")?;
        self.inner.download_url(path).await
    }

    async fn download(&self, path: &str) -> StoreResult<Bytes> {
        self.calls.push("blob.download", path);
        self.fail.check("blob.download")?;
        self.inner.download(path).await
    }

    async fn upload(&self, path: &str, data: Bytes) -> StoreResult<()> {
        self.calls.push("blob.upload", path);
        self.fail.check("blob.upload")?;
        self.inner.upload(path, data).await
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.calls.push("blob.delete", path);
        self.fail.check("blob.delete")?;
        self.inner.delete(path).await
    }
}

pub struct RecordingDirectory {
    inner: StaticDirectory,
    calls: CallLog,
}

#[async_trait]
impl DirectoryLookup for RecordingDirectory {
    async fn resolve_container_display_name(
        &self,
        tenant_id: &str,
        container_id: &str,
    ) -> StoreResult<String> {
        self.calls
            .push("directory.resolve", format!("{tenant_id}/{container_id}"));
        self.inner
            .resolve_container_display_name(tenant_id, container_id)
            .await
    }
}

/// Memory stores wrapped with a shared call log. Departments `dept-A` ("Accounts")
/// and `dept-C` ("Compliance") are registered for tenant `acme`.
pub struct Harness {
    pub metadata: Arc<RecordingMetadata>,
    pub blobs: Arc<RecordingBlobs>,
    pub directory: Arc<RecordingDirectory>,
    pub calls: CallLog,
}

impl Harness {
    pub fn new() -> Self {
        let calls = CallLog::default();
        let directory = StaticDirectory::new()
            .with(TENANT, "dept-A", "Accounts")
            .with(TENANT, "dept-C", "Compliance");
        Self {
            metadata: Arc::new(RecordingMetadata {
                inner: MemoryMetadataStore::new(),
                calls: calls.clone(),
                fail: FailOn::default(),
            }),
            blobs: Arc::new(RecordingBlobs {
                inner: MemoryBlobStore::new(),
                calls: calls.clone(),
                fail: FailOn::default(),
            }),
            directory: Arc::new(RecordingDirectory {
                inner: directory,
                calls: calls.clone(),
            }),
            calls,
        }
    }

    pub fn relocator(&self) -> DocumentRelocator {
        DocumentRelocator::new(
            self.metadata.clone(),
            self.blobs.clone(),
            self.directory.clone(),
        )
    }

    /// Put a record and its blob in place without touching the call log.
    pub async fn seed(&self, location: &LogicalPath, id: &str, blob_path: &str) -> FileRecord {
        let rec = record(id, blob_path);
        self.metadata
            .inner
            .set(&location.record_path(id).unwrap(), &rec)
            .await
            .unwrap();
        self.blobs
            .inner
            .upload(blob_path, Bytes::from(format!("contents of {id}")))
            .await
            .unwrap();
        rec
    }

    pub async fn record_at(&self, location: &LogicalPath, id: &str) -> Option<FileRecord> {
        self.metadata
            .inner
            .get(&location.record_path(id).unwrap())
            .await
            .unwrap()
    }

    pub async fn has_blob(&self, path: &str) -> bool {
        self.blobs.inner.contains(path).await
    }
}

pub fn record(id: &str, blob_path: &str) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        name: id.to_string(),
        file_path: blob_path.to_string(),
        download_url: format!("mem://{blob_path}"),
        uploaded_by: "u-17".into(),
        uploaded_by_name: "Dana Reyes".into(),
        uploaded_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
        tags: vec!["finance".into()],
    }
}

pub fn dept(id: &str) -> LogicalPath {
    LogicalPath::department(TENANT, id).unwrap()
}

pub fn buyer(id: &str) -> LogicalPath {
    LogicalPath::buyer(TENANT, id).unwrap()
}

pub fn manufacturer(id: &str) -> LogicalPath {
    LogicalPath::manufacturer(TENANT, id).unwrap()
}
