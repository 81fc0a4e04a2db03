//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Creates a template at the default location when none exists (unless DATUM_CONFIG is set).
//!
//! Notes:
//! - This module only reads/writes the config file; directory validation happens in validate.rs.
//! - Unknown elements are rejected so typos surface instead of silently using defaults.

use anyhow::{Context, Result, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use super::CONFIG_ENV;
use super::paths::{default_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    tenant: Option<String>,
    metadata_root: Option<String>,
    blob_root: Option<String>,
    journal_dir: Option<String>,
    log_level: Option<String>,
    log_file: Option<String>,
    departments: Option<XmlDepartments>,
}

#[derive(Debug, Deserialize)]
struct XmlDepartments {
    #[serde(rename = "department", default)]
    entries: Vec<XmlDepartment>,
}

#[derive(Debug, Deserialize)]
struct XmlDepartment {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "$text", default)]
    name: String,
}

/// Outcome of looking for a config file at startup.
#[derive(Debug)]
pub enum LoadResult {
    Loaded(Box<Config>, PathBuf),
    /// No file existed at the default location; a template was written there.
    CreatedTemplate(PathBuf),
    /// No config location could be determined (no home/config dir).
    Unavailable,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// Map XmlConfig -> Config, starting from defaults.
fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(t) = non_empty(parsed.tenant) {
        cfg.tenant = t;
    }
    if let Some(p) = non_empty(parsed.metadata_root) {
        cfg.metadata_root = PathBuf::from(p);
    }
    if let Some(p) = non_empty(parsed.blob_root) {
        cfg.blob_root = PathBuf::from(p);
    }
    // An explicitly empty <journal_dir/> disables journaling.
    if let Some(raw) = parsed.journal_dir {
        cfg.journal_dir = non_empty(Some(raw)).map(PathBuf::from);
    }
    if let Some(lvl) = non_empty(parsed.log_level) {
        cfg.log_level = lvl
            .parse::<LogLevel>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(raw) = parsed.log_file {
        cfg.log_file = non_empty(Some(raw)).map(PathBuf::from);
    }
    if let Some(deps) = parsed.departments {
        for d in deps.entries {
            let id = d.id.trim().to_string();
            let name = d.name.trim().to_string();
            if id.is_empty() || name.is_empty() {
                bail!("department entries need both an id attribute and a display name");
            }
            if cfg.departments.insert(id.clone(), name).is_some() {
                bail!("department '{id}' is listed more than once");
            }
        }
    }
    Ok(cfg)
}

/// Parse config XML text.
pub fn parse_config_xml(contents: &str) -> Result<Config> {
    let parsed: XmlConfig = from_xml_str(contents).context("parse config xml")?;
    xml_to_config(parsed)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    parse_config_xml(&contents).with_context(|| format!("in '{}'", path.display()))
}

/// Locate and load the config file, writing a template on first run at the default location.
pub fn load_or_init() -> Result<LoadResult> {
    let explicit = env::var_os(CONFIG_ENV).is_some_and(|v| !v.is_empty());
    let Some(path) = default_config_path() else {
        return Ok(LoadResult::Unavailable);
    };

    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(Box::new(cfg), path));
    }
    if explicit {
        bail!("{CONFIG_ENV} points to '{}', which does not exist", path.display());
    }
    create_template_config(&path)?;
    Ok(LoadResult::CreatedTemplate(path))
}

/// Write the commented template config (0600 on Unix), refusing symlinked ancestors.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let defaults = Config::default();
    let content = format!(
        "<!--\n  datum configuration (XML)\n\n    tenant         -> tenant every command operates in\n    metadata_root  -> directory holding file records (JSON)\n    blob_root      -> directory holding file contents\n    journal_dir    -> relocation intent journal (empty element disables it)\n    log_level      -> quiet | normal | info | debug\n    log_file       -> path to log file (optional; stderr is always used)\n    departments    -> <department id=\"...\">Display Name</department> entries;\n                      display names appear in blob paths\n\n  CLI flags override XML values.\n-->\n<config>\n  <tenant>{}</tenant>\n  <metadata_root>{}</metadata_root>\n  <blob_root>{}</blob_root>\n  <journal_dir>{}</journal_dir>\n  <log_level>normal</log_level>\n  <log_file>{}</log_file>\n  <departments>\n    <department id=\"hr\">HR</department>\n    <department id=\"qa\">QA</department>\n    <department id=\"logistics\">Logistics</department>\n    <department id=\"merchandising\">Merchandising</department>\n  </departments>\n</config>\n",
        defaults.tenant,
        defaults.metadata_root.display(),
        defaults.blob_root.display(),
        defaults
            .journal_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        defaults
            .log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    );

    let mut opts = fs::OpenOptions::new();
    opts.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut f = opts
        .open(path)
        .with_context(|| format!("create template config '{}'", path.display()))?;
    f.write_all(content.as_bytes())
        .with_context(|| format!("write template config '{}'", path.display()))?;
    f.sync_all().ok();

    info!("Created template config at {}", path.display());
    Ok(())
}
