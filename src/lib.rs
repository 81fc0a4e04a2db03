//! Core library for `datum`.
//!
//! Departmental document storage: file records mirrored in a metadata store,
//! contents in a blob store, and the relocation routine that moves or copies a
//! record (and, across containers, its blob) between containers.
//!
//! Stores are traits (`store::MetadataStore`, `store::BlobStore`,
//! `store::DirectoryLookup`); `store::memory` and `store::fs` provide backends.

pub mod batch;
pub mod cli;
pub mod config;
pub mod errors;
pub mod files;
pub mod journal;
pub mod model;
pub mod output;
pub mod relocate;
pub mod shutdown;
pub mod store;

pub use batch::{BatchFailure, BatchReport, relocate_many};
pub use config::{Config, LogLevel, default_config_path, default_log_path};
pub use errors::{ConflictReason, DatumError};
pub use files::{FileService, UploadRequest};
pub use journal::{IntentJournal, ReconcileOutcome, ReconcileReport, RelocationIntent, reconcile};
pub use model::{Container, ContainerKind, ContainerRef, FileRecord, LogicalPath, RecordPath};
pub use relocate::{BlobTransfer, DocumentRelocator, RelocateOptions, Relocation, RelocationPlan};
pub use store::{BlobStore, DirectoryLookup, MetadataStore, StoreError};
