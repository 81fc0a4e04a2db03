//! Local filesystem backend.
//! - Records: `{metadata_root}/{segment}/.../{id}.json` (pretty JSON).
//! - Blobs: `{blob_root}/{blob path}` with `file://` retrieval URLs.
//! - Writes go to a temp file in the destination directory and are renamed into place.
//!
//! Notes:
//! - Every segment is validated before it touches the filesystem; `..` and separators are refused.
//! - Temp names start with `.datum.` and are ignored by listings.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::helpers::store_io_error;
use super::{BlobStore, MetadataStore, StoreError, StoreResult};
use crate::model::{FileRecord, RecordPath};

const RECORD_EXT: &str = "json";
const TEMP_PREFIX: &str = ".datum.";

/// MetadataStore persisting each record as one JSON file.
#[derive(Debug, Clone)]
pub struct FsMetadataStore {
    root: PathBuf,
}

impl FsMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_dir(&self, collection: &RecordPath) -> StoreResult<PathBuf> {
        let mut dir = self.root.clone();
        for seg in collection.segments() {
            check_segment(seg)?;
            dir.push(seg);
        }
        Ok(dir)
    }

    fn record_file(&self, path: &RecordPath) -> StoreResult<PathBuf> {
        if !path.is_document() {
            return Err(StoreError::InvalidPath(format!(
                "'{path}' is a collection, not a record"
            )));
        }
        let segs = path.segments();
        let mut file = self.root.clone();
        for seg in &segs[..segs.len() - 1] {
            check_segment(seg)?;
            file.push(seg);
        }
        let leaf = path.leaf();
        check_segment(leaf)?;
        file.push(format!("{leaf}.{RECORD_EXT}"));
        Ok(file)
    }
}

#[async_trait]
impl MetadataStore for FsMetadataStore {
    async fn get(&self, path: &RecordPath) -> StoreResult<Option<FileRecord>> {
        let file = self.record_file(path)?;
        match fs::read(&file).await.map_err(store_io_error("read record", &file)) {
            Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set(&self, path: &RecordPath, record: &FileRecord) -> StoreResult<()> {
        let file = self.record_file(path)?;
        let raw = serde_json::to_vec_pretty(record)?;
        write_atomic(&file, &raw).await?;
        debug!(record = %path, file = %file.display(), "record written");
        Ok(())
    }

    async fn delete(&self, path: &RecordPath) -> StoreResult<()> {
        let file = self.record_file(path)?;
        match fs::remove_file(&file)
            .await
            .map_err(store_io_error("remove record", &file))
        {
            Ok(()) | Err(StoreError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list(&self, collection: &RecordPath) -> StoreResult<Vec<FileRecord>> {
        let dir = self.collection_dir(collection)?;
        let mut entries = match fs::read_dir(&dir)
            .await
            .map_err(store_io_error("list records", &dir))
        {
            Ok(rd) => rd,
            Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(store_io_error("list records", &dir))?
        {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TEMP_PREFIX) || !name.ends_with(&format!(".{RECORD_EXT}")) {
                continue;
            }
            let ft = entry
                .file_type()
                .await
                .map_err(store_io_error("stat record", &entry.path()))?;
            if !ft.is_file() {
                continue;
            }
            let p = entry.path();
            let raw = fs::read(&p).await.map_err(store_io_error("read record", &p))?;
            match serde_json::from_slice::<FileRecord>(&raw) {
                Ok(rec) => out.push(rec),
                Err(e) => warn!(file = %p.display(), error = %e, "skipping unreadable record"),
            }
        }
        Ok(out)
    }

    async fn collections(&self, document: &RecordPath) -> StoreResult<Vec<String>> {
        let dir = self.collection_dir(document)?;
        let mut entries = match fs::read_dir(&dir)
            .await
            .map_err(store_io_error("list collections", &dir))
        {
            Ok(rd) => rd,
            Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(store_io_error("list collections", &dir))?
        {
            let ft = entry
                .file_type()
                .await
                .map_err(store_io_error("stat collection", &entry.path()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if ft.is_dir() && !name.starts_with(TEMP_PREFIX) {
                out.push(name);
            }
        }
        out.sort();
        Ok(out)
    }
}

/// BlobStore keeping each blob as a plain file.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_file(&self, path: &str) -> StoreResult<PathBuf> {
        let mut file = self.root.clone();
        let mut any = false;
        for seg in path.split('/') {
            check_segment(seg)?;
            file.push(seg);
            any = true;
        }
        if !any {
            return Err(StoreError::InvalidPath("empty blob path".into()));
        }
        Ok(file)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn download_url(&self, path: &str) -> StoreResult<String> {
        let file = self.blob_file(path)?;
        let meta = fs::metadata(&file)
            .await
            .map_err(store_io_error("stat blob", &file))?;
        if !meta.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        Ok(format!("file://{}", file.display()))
    }

    async fn download(&self, path: &str) -> StoreResult<Bytes> {
        let file = self.blob_file(path)?;
        let raw = fs::read(&file)
            .await
            .map_err(store_io_error("read blob", &file))?;
        Ok(Bytes::from(raw))
    }

    async fn upload(&self, path: &str, data: Bytes) -> StoreResult<()> {
        let file = self.blob_file(path)?;
        write_atomic(&file, &data).await?;
        debug!(blob = path, bytes = data.len(), "blob written");
        Ok(())
    }

    async fn delete(&self, path: &str) -> StoreResult<()> {
        let file = self.blob_file(path)?;
        fs::remove_file(&file)
            .await
            .map_err(store_io_error("remove blob", &file))
    }
}

fn check_segment(seg: &str) -> StoreResult<()> {
    if seg.is_empty()
        || seg == "."
        || seg == ".."
        || seg.contains('/')
        || seg.contains('\\')
        || seg.contains('\0')
    {
        return Err(StoreError::InvalidPath(format!("invalid path segment '{seg}'")));
    }
    Ok(())
}

fn unique_temp_path(dir: &Path) -> PathBuf {
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    dir.join(format!("{TEMP_PREFIX}{pid}.{nanos}.tmp"))
}

/// Write `data` to a temp file beside `dest`, fsync it, then rename over `dest`.
pub(crate) async fn write_atomic(dest: &Path, data: &[u8]) -> StoreResult<()> {
    let dir = dest
        .parent()
        .ok_or_else(|| StoreError::InvalidPath(format!("no parent for {}", dest.display())))?;
    fs::create_dir_all(dir)
        .await
        .map_err(store_io_error("create directory", dir))?;

    let tmp = unique_temp_path(dir);
    let written = async {
        let mut f = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await?;
        f.write_all(data).await?;
        f.sync_all().await
    }
    .await;
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp).await;
        return Err(store_io_error("write temporary file", &tmp)(e));
    }

    if let Err(e) = fs::rename(&tmp, dest).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(store_io_error("rename into place", dest)(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogicalPath;
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(id: &str) -> FileRecord {
        FileRecord {
            id: id.into(),
            name: format!("{id}.pdf"),
            file_path: format!("Departments/QA/{id}"),
            download_url: String::new(),
            uploaded_by: "u".into(),
            uploaded_by_name: "U".into(),
            uploaded_at: Utc::now(),
            tags: vec!["q1".into()],
        }
    }

    #[tokio::test]
    async fn record_roundtrip_and_listing() {
        let td = tempdir().unwrap();
        let store = FsMetadataStore::new(td.path());
        let loc = LogicalPath::department("acme", "qa").unwrap();
        let p = loc.record_path("r1").unwrap();

        let rec = record("r1");
        assert_eq!(store.get(&p).await.unwrap(), None);
        store.set(&p, &rec).await.unwrap();
        assert_eq!(store.get(&p).await.unwrap(), Some(rec));

        let on_disk = td
            .path()
            .join("tenants/acme/departments/qa/files/r1.json");
        assert!(on_disk.is_file());

        let listed = store.list(&loc.collection_path()).await.unwrap();
        assert_eq!(listed.len(), 1);

        let archive = loc.clone().with_record_set("archive").unwrap();
        store.set(&archive.record_path("r2").unwrap(), &record("r2")).await.unwrap();
        let container = p.parent_document().unwrap();
        assert_eq!(store.collections(&container).await.unwrap(), vec!["archive", "files"]);

        store.delete(&p).await.unwrap();
        store.delete(&p).await.unwrap();
        assert_eq!(store.get(&p).await.unwrap(), None);
    }

    #[tokio::test]
    async fn listing_missing_collection_is_empty() {
        let td = tempdir().unwrap();
        let store = FsMetadataStore::new(td.path());
        let loc = LogicalPath::buyer("acme", "nobody").unwrap();
        assert!(store.list(&loc.collection_path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blob_lifecycle() {
        let td = tempdir().unwrap();
        let blobs = FsBlobStore::new(td.path());
        let path = "Buyers/buyer-B/invoice.pdf";

        assert!(blobs.download_url(path).await.unwrap_err().is_not_found());
        blobs.upload(path, Bytes::from_static(b"%PDF")).await.unwrap();
        assert!(blobs.download_url(path).await.unwrap().starts_with("file://"));
        assert_eq!(blobs.download(path).await.unwrap(), Bytes::from_static(b"%PDF"));

        // no temp files left beside the blob
        let dir = td.path().join("Buyers/buyer-B");
        let names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["invoice.pdf".to_string()]);

        blobs.delete(path).await.unwrap();
        assert!(blobs.delete(path).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn blob_paths_cannot_escape_root() {
        let td = tempdir().unwrap();
        let blobs = FsBlobStore::new(td.path());
        for bad in ["../x", "a//b", "", "a/./b"] {
            let err = blobs.upload(bad, Bytes::new()).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath(_)), "{bad}");
        }
    }
}
