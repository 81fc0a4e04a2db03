//! In-process backends. Used by tests and by embedders that want a throwaway store.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

use super::{BlobStore, DirectoryLookup, MetadataStore, StoreError, StoreResult};
use crate::model::{FileRecord, RecordPath};

/// Records keyed by their full path.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: RwLock<BTreeMap<RecordPath, FileRecord>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn contains(&self, path: &RecordPath) -> bool {
        self.records.read().await.contains_key(path)
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, path: &RecordPath) -> StoreResult<Option<FileRecord>> {
        Ok(self.records.read().await.get(path).cloned())
    }

    async fn set(&self, path: &RecordPath, record: &FileRecord) -> StoreResult<()> {
        if !path.is_document() {
            return Err(StoreError::InvalidPath(format!(
                "'{path}' is a collection, not a record"
            )));
        }
        self.records
            .write()
            .await
            .insert(path.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, path: &RecordPath) -> StoreResult<()> {
        self.records.write().await.remove(path);
        Ok(())
    }

    async fn list(&self, collection: &RecordPath) -> StoreResult<Vec<FileRecord>> {
        let prefix = collection.segments();
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(path, _)| {
                let segs = path.segments();
                segs.len() == prefix.len() + 1 && segs.starts_with(prefix)
            })
            .map(|(_, rec)| rec.clone())
            .collect())
    }

    async fn collections(&self, document: &RecordPath) -> StoreResult<Vec<String>> {
        let prefix = document.segments();
        let records = self.records.read().await;
        let names: BTreeSet<String> = records
            .keys()
            .map(RecordPath::segments)
            .filter(|segs| segs.len() > prefix.len() + 1 && segs.starts_with(prefix))
            .map(|segs| segs[prefix.len()].clone())
            .collect();
        Ok(names.into_iter().collect())
    }
}

/// Blobs keyed by path.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.blobs.read().await.contains_key(path)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download_url(&self, path: &str) -> StoreResult<String> {
        if self.blobs.read().await.contains_key(path) {
            Ok(format!("mem://{path}"))
        } else {
            Err(StoreError::NotFound(path.to_string()))
        }
    }

    async fn download(&self, path: &str) -> StoreResult<Bytes> {
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, data: Bytes) -> StoreResult<()> {
        self.blobs.write().await.insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.blobs
            .write()
            .await
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

/// Fixed `(tenant, container id) -> display name` table.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    names: HashMap<(String, String), String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, tenant_id: &str, container_id: &str, display_name: &str) -> Self {
        self.insert(tenant_id, container_id, display_name);
        self
    }

    pub fn insert(&mut self, tenant_id: &str, container_id: &str, display_name: &str) {
        self.names.insert(
            (tenant_id.to_string(), container_id.to_string()),
            display_name.to_string(),
        );
    }
}

#[async_trait]
impl DirectoryLookup for StaticDirectory {
    async fn resolve_container_display_name(
        &self,
        tenant_id: &str,
        container_id: &str,
    ) -> StoreResult<String> {
        self.names
            .get(&(tenant_id.to_string(), container_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                StoreError::NotFound(format!("department '{container_id}' in tenant '{tenant_id}'"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogicalPath;
    use chrono::Utc;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.into(),
            name: id.into(),
            file_path: format!("Departments/HR/{id}"),
            download_url: String::new(),
            uploaded_by: "u".into(),
            uploaded_by_name: "U".into(),
            uploaded_at: Utc::now(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn list_only_returns_direct_children() {
        let store = MemoryMetadataStore::new();
        let files = LogicalPath::department("t", "hr").unwrap();
        let other = files.clone().with_record_set("incidents").unwrap();
        store.set(&files.record_path("a").unwrap(), &record("a")).await.unwrap();
        store.set(&files.record_path("b").unwrap(), &record("b")).await.unwrap();
        store.set(&other.record_path("c").unwrap(), &record("c")).await.unwrap();

        let listed = store.list(&files.collection_path()).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let container = files.record_path("a").unwrap().parent_document().unwrap();
        assert_eq!(store.collections(&container).await.unwrap(), vec!["files", "incidents"]);
    }

    #[tokio::test]
    async fn set_rejects_collection_paths() {
        let store = MemoryMetadataStore::new();
        let files = LogicalPath::department("t", "hr").unwrap();
        let err = store.set(&files.collection_path(), &record("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn blob_delete_of_missing_is_not_found() {
        let blobs = MemoryBlobStore::new();
        assert!(blobs.delete("nope").await.unwrap_err().is_not_found());
        blobs.upload("a", Bytes::from_static(b"x")).await.unwrap();
        assert_eq!(blobs.download_url("a").await.unwrap(), "mem://a");
        blobs.delete("a").await.unwrap();
        assert!(blobs.is_empty().await);
    }

    #[tokio::test]
    async fn static_directory_lookup() {
        let dir = StaticDirectory::new().with("t", "hr", "Human Resources");
        assert_eq!(
            dir.resolve_container_display_name("t", "hr").await.unwrap(),
            "Human Resources"
        );
        assert!(dir
            .resolve_container_display_name("other", "hr")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
