//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/data/log paths and detects symlinked ancestors for safety.

use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

/// Config file location: `$DATUM_CONFIG` if set, else `<config dir>/datum/config.xml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os(CONFIG_ENV)
        && !p.is_empty()
    {
        return Some(PathBuf::from(p));
    }
    if let Some(base) = config_dir() {
        return Some(base.join("datum").join("config.xml"));
    }
    env::var_os("HOME").map(|h| PathBuf::from(h).join(".config").join("datum").join("config.xml"))
}

/// Root for local stores and the journal: `<data dir>/datum`.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(base) = data_dir() {
        return Some(base.join("datum"));
    }
    env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share").join("datum"))
}

/// Log file beside the data: `<data dir>/datum/datum.log`.
pub fn default_log_path() -> Option<PathBuf> {
    default_data_dir().map(|d| d.join("datum.log"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() {
            let meta = fs::symlink_metadata(anc)?;
            if meta.file_type().is_symlink() {
                return Ok(true);
            }
        }
        p = anc.parent();
    }
    Ok(false)
}
