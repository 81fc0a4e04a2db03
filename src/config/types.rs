//! Core configuration types.
//! - Config holds the tenant, store locations and logging settings.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::DEFAULT_TENANT;
use super::paths::{default_data_dir, default_log_path};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// One line per completed operation (default)
    #[default]
    Normal,
    /// Per-step detail
    Info,
    /// Everything, including store calls
    Debug,
}

impl LogLevel {
    /// Case-insensitive; accepts a few common aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Runtime configuration for the local backend and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Tenant every command operates in
    pub tenant: String,
    /// Root of the JSON record tree
    pub metadata_root: PathBuf,
    /// Root of the blob tree
    pub blob_root: PathBuf,
    /// Intent journal directory; `None` disables journaling
    pub journal_dir: Option<PathBuf>,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    /// Department id -> display name used in blob paths
    pub departments: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let data = default_data_dir().unwrap_or_else(|| PathBuf::from(".datum"));
        Self {
            tenant: DEFAULT_TENANT.to_string(),
            metadata_root: data.join("metadata"),
            blob_root: data.join("blobs"),
            journal_dir: Some(data.join("journal")),
            log_level: LogLevel::Normal,
            log_file: default_log_path(),
            departments: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Explicit roots; everything else from defaults.
    pub fn new(
        tenant: impl Into<String>,
        metadata_root: impl Into<PathBuf>,
        blob_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            metadata_root: metadata_root.into(),
            blob_root: blob_root.into(),
            journal_dir: None,
            log_file: None,
            ..Default::default()
        }
    }
}
