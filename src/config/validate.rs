//! Config validation logic.
//! Checks the tenant and department names, creates missing store roots, probes
//! writability, and keeps the metadata, blob and journal trees apart.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

use super::types::Config;
use crate::model::validate_segment;

impl Config {
    /// Validate identifiers, prepare directories, and reject overlapping roots.
    pub fn validate(&self) -> Result<()> {
        validate_segment(&self.tenant, "tenant").context("invalid tenant")?;
        for (id, name) in &self.departments {
            validate_segment(id, "department id")
                .and_then(|_| validate_segment(name, "department display name"))
                .with_context(|| format!("invalid department entry '{id}'"))?;
        }

        let mut roots: Vec<(&str, &Path)> = vec![
            ("metadata_root", self.metadata_root.as_path()),
            ("blob_root", self.blob_root.as_path()),
        ];
        if let Some(j) = self.journal_dir.as_deref() {
            roots.push(("journal_dir", j));
        }

        for (name, dir) in &roots {
            ensure_dir_is_or_create(dir, name)?;
            ensure_writable(dir, name)?;
        }

        // Resolve symlinks and require every pair of roots to be disjoint.
        let real: Vec<(&str, std::path::PathBuf)> = roots
            .iter()
            .map(|(n, p)| (*n, fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf())))
            .collect();
        for (i, (a_name, a)) in real.iter().enumerate() {
            for (b_name, b) in real.iter().skip(i + 1) {
                if a == b {
                    bail!("{a_name} and {b_name} resolve to the same path: '{}'", a.display());
                }
                if a.starts_with(b) || b.starts_with(a) {
                    bail!(
                        "{a_name} '{}' and {b_name} '{}' must not be nested",
                        a.display(),
                        b.display()
                    );
                }
            }
        }

        info!(
            tenant = %self.tenant,
            metadata = %self.metadata_root.display(),
            blobs = %self.blob_root.display(),
            journal = %self.journal_dir.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<none>".into()),
            "Config validated"
        );
        Ok(())
    }
}

/// Ensure directory exists (create if missing). If exists, it must be a directory.
fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            error!("{name} exists but isn't a directory: {}", path.display());
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create {name} directory '{}'", path.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
        }
        info!("Created {name} directory: {}", path.display());
    }
    Ok(())
}

/// Ensure directory is writable using a create-then-remove probe file.
fn ensure_writable(path: &Path, name: &str) -> Result<()> {
    let probe = path.join(format!(".datum_probe_{}.tmp", std::process::id()));
    fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&probe)
        .with_context(|| format!("Cannot write to {name} '{}'; check permissions", path.display()))?;
    let _ = fs::remove_file(&probe);
    debug!("{name} writable: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_roots() {
        let td = tempdir().unwrap();
        let mut cfg = Config::new("acme", td.path().join("meta"), td.path().join("blobs"));
        cfg.journal_dir = Some(td.path().join("journal"));
        cfg.validate().unwrap();
        assert!(td.path().join("meta").is_dir());
        assert!(td.path().join("blobs").is_dir());
        assert!(td.path().join("journal").is_dir());
    }

    #[test]
    fn nested_roots_are_rejected() {
        let td = tempdir().unwrap();
        let cfg = Config::new("acme", td.path().join("data"), td.path().join("data").join("blobs"));
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("nested"), "{err}");
    }

    #[test]
    fn identical_roots_are_rejected() {
        let td = tempdir().unwrap();
        let cfg = Config::new("acme", td.path().join("x"), td.path().join("x"));
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("same path"), "{err}");
    }

    #[test]
    fn bad_tenant_and_department_names_are_rejected() {
        let td = tempdir().unwrap();
        let cfg = Config::new("a/b", td.path().join("m"), td.path().join("b"));
        assert!(cfg.validate().is_err());

        let mut cfg = Config::new("acme", td.path().join("m"), td.path().join("b"));
        cfg.departments.insert("hr".into(), "Human/Resources".into());
        assert!(cfg.validate().is_err());
    }
}
