//! Core domain types.
//! - ContainerKind / Container: who owns a set of records (department, buyer, manufacturer).
//! - LogicalPath: tenant + container + record-set, resolves to RecordPaths.
//! - FileRecord: metadata mirrored for every stored blob.
//!
//! Notes:
//! - Container is an enum so a path can never carry two container identifiers.
//! - Every identifier that ends up in a record or blob path is validated as a single segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DatumError;

/// Root collection every record path starts from.
pub const TENANTS_COLLECTION: &str = "tenants";

/// Closed set of container categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerKind {
    Departmental,
    BuyerScoped,
    ManufacturerScoped,
}

impl ContainerKind {
    /// Record-set used when a LogicalPath does not name one.
    pub fn default_record_set(self) -> &'static str {
        match self {
            ContainerKind::Departmental => "files",
            ContainerKind::BuyerScoped => "Quotes",
            ContainerKind::ManufacturerScoped => "Products",
        }
    }

    /// Collection segment holding containers of this kind under a tenant.
    pub fn collection(self) -> &'static str {
        match self {
            ContainerKind::Departmental => "departments",
            ContainerKind::BuyerScoped => "buyers",
            ContainerKind::ManufacturerScoped => "manufacturers",
        }
    }

    /// First segment of blob paths for this kind.
    pub fn blob_root(self) -> &'static str {
        match self {
            ContainerKind::Departmental => "Departments",
            ContainerKind::BuyerScoped => "Buyers",
            ContainerKind::ManufacturerScoped => "Manufacturers",
        }
    }

    /// Parse the short and long spellings accepted on the command line (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dept" | "department" | "departmental" => Some(ContainerKind::Departmental),
            "buyer" | "buyer-scoped" => Some(ContainerKind::BuyerScoped),
            "mfr" | "manufacturer" | "manufacturer-scoped" => {
                Some(ContainerKind::ManufacturerScoped)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerKind::Departmental => "departmental",
            ContainerKind::BuyerScoped => "buyer-scoped",
            ContainerKind::ManufacturerScoped => "manufacturer-scoped",
        };
        f.write_str(s)
    }
}

impl FromStr for ContainerKind {
    type Err = DatumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| DatumError::InvalidLocation(format!("unknown container kind '{s}'")))
    }
}

/// A tenant-scoped owner of record-sets. Exactly one identifier, matching the kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    Department(String),
    Buyer(String),
    Manufacturer(String),
}

impl Container {
    /// Build a container of `kind`; the id must be a valid path segment.
    pub fn new(kind: ContainerKind, id: impl Into<String>) -> Result<Self, DatumError> {
        let id = id.into();
        validate_segment(&id, "container id")?;
        Ok(match kind {
            ContainerKind::Departmental => Container::Department(id),
            ContainerKind::BuyerScoped => Container::Buyer(id),
            ContainerKind::ManufacturerScoped => Container::Manufacturer(id),
        })
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Container::Department(_) => ContainerKind::Departmental,
            Container::Buyer(_) => ContainerKind::BuyerScoped,
            Container::Manufacturer(_) => ContainerKind::ManufacturerScoped,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Container::Department(id) | Container::Buyer(id) | Container::Manufacturer(id) => id,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A named collection of records inside one tenant's container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    tenant_id: String,
    container: Container,
    record_set: Option<String>,
}

impl LogicalPath {
    pub fn new(
        tenant_id: impl Into<String>,
        container: Container,
        record_set: Option<String>,
    ) -> Result<Self, DatumError> {
        let tenant_id = tenant_id.into();
        validate_segment(&tenant_id, "tenant id")?;
        if let Some(rs) = record_set.as_deref() {
            validate_segment(rs, "record-set")?;
        }
        Ok(Self {
            tenant_id,
            container,
            record_set,
        })
    }

    /// Departmental path using the default record-set.
    pub fn department(tenant_id: &str, department_id: &str) -> Result<Self, DatumError> {
        Self::new(
            tenant_id,
            Container::new(ContainerKind::Departmental, department_id)?,
            None,
        )
    }

    /// Buyer path using the default record-set.
    pub fn buyer(tenant_id: &str, buyer_id: &str) -> Result<Self, DatumError> {
        Self::new(
            tenant_id,
            Container::new(ContainerKind::BuyerScoped, buyer_id)?,
            None,
        )
    }

    /// Manufacturer path using the default record-set.
    pub fn manufacturer(tenant_id: &str, manufacturer_id: &str) -> Result<Self, DatumError> {
        Self::new(
            tenant_id,
            Container::new(ContainerKind::ManufacturerScoped, manufacturer_id)?,
            None,
        )
    }

    /// Same container, explicit record-set.
    pub fn with_record_set(mut self, record_set: &str) -> Result<Self, DatumError> {
        validate_segment(record_set, "record-set")?;
        self.record_set = Some(record_set.to_string());
        Ok(self)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn kind(&self) -> ContainerKind {
        self.container.kind()
    }

    /// Record-set actually addressed: explicit name or the kind default.
    pub fn effective_record_set(&self) -> &str {
        self.record_set
            .as_deref()
            .unwrap_or_else(|| self.kind().default_record_set())
    }

    /// Tenant, kind and container id all equal. The record-set is deliberately ignored.
    pub fn same_container(&self, other: &LogicalPath) -> bool {
        self.tenant_id == other.tenant_id && self.container == other.container
    }

    /// Path of the record-set collection (no trailing id).
    pub fn collection_path(&self) -> RecordPath {
        RecordPath {
            segments: vec![
                TENANTS_COLLECTION.to_string(),
                self.tenant_id.clone(),
                self.kind().collection().to_string(),
                self.container.id().to_string(),
                self.effective_record_set().to_string(),
            ],
        }
    }

    /// Path of one record in this record-set.
    pub fn record_path(&self, id: &str) -> Result<RecordPath, DatumError> {
        validate_segment(id, "file id")?;
        let mut path = self.collection_path();
        path.segments.push(id.to_string());
        Ok(path)
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id,
            self.container,
            self.effective_record_set()
        )
    }
}

/// Tenant-less `kind:id[/record_set]` reference, e.g. `dept:hr` or `buyer:b-7/Quotes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef {
    pub container: Container,
    pub record_set: Option<String>,
}

impl ContainerRef {
    /// Attach a tenant to produce a full LogicalPath.
    pub fn in_tenant(&self, tenant_id: &str) -> Result<LogicalPath, DatumError> {
        LogicalPath::new(tenant_id, self.container.clone(), self.record_set.clone())
    }
}

impl FromStr for ContainerRef {
    type Err = DatumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, rest) = s.split_once(':').ok_or_else(|| {
            DatumError::InvalidLocation(format!(
                "expected KIND:ID[/RECORD_SET], got '{s}'"
            ))
        })?;
        let kind: ContainerKind = kind.parse()?;
        let (id, record_set) = match rest.split_once('/') {
            Some((id, rs)) => (id, Some(rs.to_string())),
            None => (rest, None),
        };
        if let Some(rs) = record_set.as_deref() {
            validate_segment(rs, "record-set")?;
        }
        Ok(Self {
            container: Container::new(kind, id)?,
            record_set,
        })
    }
}

/// Ordered segments alternating collection name / identifier, rooted at `tenants`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordPath {
    segments: Vec<String>,
}

impl RecordPath {
    /// Build from raw segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, DatumError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(DatumError::InvalidLocation("empty record path".into()));
        }
        for s in &segments {
            validate_segment(s, "path segment")?;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment: the record id for document paths.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Document paths have an even number of segments (collection/id pairs).
    pub fn is_document(&self) -> bool {
        self.segments.len() % 2 == 0
    }

    /// Document owning the collection this record sits in. For a file record
    /// that is its container; `None` for top-level records and collections.
    pub fn parent_document(&self) -> Option<RecordPath> {
        let n = self.segments.len();
        (self.is_document() && n > 2).then(|| RecordPath {
            segments: self.segments[..n - 2].to_vec(),
        })
    }

    /// Path of the sub-collection `name` under this document.
    pub fn collection(&self, name: &str) -> Result<RecordPath, DatumError> {
        if !self.is_document() {
            return Err(DatumError::InvalidLocation(format!(
                "'{self}' is a collection, not a record"
            )));
        }
        Self::from_segments(self.segments.iter().map(String::as_str).chain([name]))
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Metadata for one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Stable identifier; also the last segment of the record path and blob path.
    pub id: String,
    /// Display name
    pub name: String,
    /// Blob locator in the BlobStore
    pub file_path: String,
    /// Retrieval locator handed to clients
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    pub uploaded_by: String,
    pub uploaded_by_name: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Blob path for `file_id` inside a container: `{kind root}/{display name or id}/{file id}`.
pub fn blob_path_for(kind: ContainerKind, display_name: &str, file_id: &str) -> String {
    format!("{}/{}/{}", kind.blob_root(), display_name, file_id)
}

/// Reject identifiers that would change the shape of a record or blob path.
pub(crate) fn validate_segment(s: &str, what: &str) -> Result<(), DatumError> {
    if s.trim().is_empty() {
        return Err(DatumError::InvalidLocation(format!("{what} is empty")));
    }
    if s == "." || s == ".." || s.contains('/') || s.contains('\\') || s.contains('\0') {
        return Err(DatumError::InvalidLocation(format!(
            "{what} '{s}' is not a valid path segment"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_sets_per_kind() {
        assert_eq!(ContainerKind::Departmental.default_record_set(), "files");
        assert_eq!(ContainerKind::BuyerScoped.default_record_set(), "Quotes");
        assert_eq!(ContainerKind::ManufacturerScoped.default_record_set(), "Products");
    }

    #[test]
    fn record_path_applies_default_record_set() {
        let p = LogicalPath::department("acme", "dept-A").unwrap();
        let rp = p.record_path("invoice.pdf").unwrap();
        assert_eq!(rp.to_string(), "tenants/acme/departments/dept-A/files/invoice.pdf");
        assert!(rp.is_document());
        assert_eq!(rp.leaf(), "invoice.pdf");

        let b = LogicalPath::buyer("acme", "buyer-B").unwrap();
        assert_eq!(
            b.record_path("x").unwrap().to_string(),
            "tenants/acme/buyers/buyer-B/Quotes/x"
        );
    }

    #[test]
    fn container_document_and_sibling_collections() {
        let rp = LogicalPath::department("acme", "dept-A")
            .unwrap()
            .record_path("invoice.pdf")
            .unwrap();
        let container = rp.parent_document().unwrap();
        assert_eq!(container.to_string(), "tenants/acme/departments/dept-A");
        assert_eq!(
            container.collection("archive").unwrap().to_string(),
            "tenants/acme/departments/dept-A/archive"
        );
        assert!(container.collection("../x").is_err());
        assert!(rp.collection("files").unwrap().parent_document().is_none());

        let top = RecordPath::from_segments(["tenants", "acme"]).unwrap();
        assert!(top.parent_document().is_none());
        assert!(RecordPath::from_segments(Vec::<String>::new()).is_err());
    }

    #[test]
    fn same_container_ignores_record_set() {
        let a = LogicalPath::department("acme", "hr").unwrap();
        let b = a.clone().with_record_set("otherFiles").unwrap();
        assert!(a.same_container(&b));

        let other_tenant = LogicalPath::department("globex", "hr").unwrap();
        assert!(!a.same_container(&other_tenant));

        let buyer_same_id = LogicalPath::buyer("acme", "hr").unwrap();
        assert!(!a.same_container(&buyer_same_id));
    }

    #[test]
    fn container_ref_parses_kind_id_and_record_set() {
        let r: ContainerRef = "dept:hr".parse().unwrap();
        assert_eq!(r.container, Container::Department("hr".into()));
        assert_eq!(r.record_set, None);

        let r: ContainerRef = "Buyer:b-7/Archive".parse().unwrap();
        assert_eq!(r.container, Container::Buyer("b-7".into()));
        assert_eq!(r.record_set.as_deref(), Some("Archive"));

        assert!("warehouse:w1".parse::<ContainerRef>().is_err());
        assert!("dept".parse::<ContainerRef>().is_err());
        assert!("dept:".parse::<ContainerRef>().is_err());
        assert!("dept:a/b/c".parse::<ContainerRef>().is_err());
    }

    #[test]
    fn segments_reject_traversal() {
        assert!(LogicalPath::department("acme", "..").is_err());
        let p = LogicalPath::department("acme", "hr").unwrap();
        assert!(p.record_path("../etc").is_err());
        assert!(p.record_path("").is_err());
    }

    #[test]
    fn blob_path_template() {
        assert_eq!(
            blob_path_for(ContainerKind::BuyerScoped, "buyer-B", "invoice.pdf"),
            "Buyers/buyer-B/invoice.pdf"
        );
    }

    #[test]
    fn file_record_wire_names() {
        let rec = FileRecord {
            id: "a".into(),
            name: "a.txt".into(),
            file_path: "Departments/HR/a".into(),
            download_url: "mem://Departments/HR/a".into(),
            uploaded_by: "u1".into(),
            uploaded_by_name: "Uma".into(),
            uploaded_at: DateTime::<Utc>::UNIX_EPOCH,
            tags: vec![],
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("downloadURL").is_some());
        assert!(json.get("filePath").is_some());
        assert!(json.get("uploadedByName").is_some());
    }
}
