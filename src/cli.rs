//! CLI definition and parsing.
//! Defines Args (global flags + subcommand) and provides parse().
//!
//! Notes:
//! - Locations are `KIND:ID[/RECORD_SET]`, e.g. `dept:hr`, `buyer:b-7/Quotes`, `mfr:m-1`.
//! - --debug is a shorthand for --log-level debug.
//! - Global flags override values from config.xml.

use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::types::{Config, LogLevel};
use crate::model::ContainerRef;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Departmental document store: upload, list, tag, relocate and delete files",
    arg_required_else_help = true
)]
pub struct Args {
    /// Tenant to operate in (overrides config).
    #[arg(long, global = true)]
    pub tenant: Option<String>,

    #[arg(long, global = true, value_hint = ValueHint::DirPath, help = "Override the metadata root directory")]
    pub metadata_root: Option<PathBuf>,

    #[arg(long, global = true, value_hint = ValueHint::DirPath, help = "Override the blob root directory")]
    pub blob_root: Option<PathBuf>,

    #[arg(long, global = true, value_hint = ValueHint::DirPath, help = "Override the intent journal directory")]
    pub journal_dir: Option<PathBuf>,

    /// Run relocations without an intent journal.
    #[arg(long, global = true, conflicts_with = "journal_dir")]
    pub no_journal: bool,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, value_parser = LogLevel::from_str)]
    pub log_level: Option<LogLevel>,

    /// Emit logs in structured JSON.
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the config file location used by datum and exit.
    #[arg(long)]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Move (or copy) file records between containers or record-sets.
    Relocate {
        #[arg(long, value_name = "LOCATION")]
        from: ContainerRef,
        #[arg(long, value_name = "LOCATION")]
        to: ContainerRef,
        /// Keep the source record and blob.
        #[arg(long)]
        copy: bool,
        /// Show what would happen without changing anything.
        #[arg(long)]
        dry_run: bool,
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },
    /// Upload a local file into a container.
    Upload {
        #[arg(value_name = "LOCATION")]
        location: ContainerRef,
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Display name (defaults to the file name).
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Uploader id (defaults to $USER).
        #[arg(long)]
        by: Option<String>,
        /// Uploader display name (defaults to the uploader id).
        #[arg(long)]
        by_name: Option<String>,
    },
    /// List records in a record-set.
    Ls {
        #[arg(value_name = "LOCATION")]
        location: ContainerRef,
        /// Only records whose name or a tag contains this text.
        #[arg(long)]
        search: Option<String>,
    },
    /// Replace the tags of one record (no tags clears them).
    Tag {
        #[arg(value_name = "LOCATION")]
        location: ContainerRef,
        id: String,
        tags: Vec<String>,
    },
    /// Delete records and their blobs.
    Rm {
        #[arg(value_name = "LOCATION")]
        location: ContainerRef,
        #[arg(required = true, value_name = "ID")]
        ids: Vec<String>,
    },
    /// Resolve relocations left half-done in the intent journal.
    Reconcile,
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(t) = &self.tenant {
            cfg.tenant = t.clone();
        }
        if let Some(p) = &self.metadata_root {
            cfg.metadata_root = p.clone();
        }
        if let Some(p) = &self.blob_root {
            cfg.blob_root = p.clone();
        }
        if let Some(p) = &self.journal_dir {
            cfg.journal_dir = Some(p.clone());
        }
        if self.no_journal {
            cfg.journal_dir = None;
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
