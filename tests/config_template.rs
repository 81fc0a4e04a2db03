use std::fs;
use tempfile::tempdir;

use datum::config::{Config, create_template_config, load_config_from_xml_path};

#[test]
fn template_parses_back_into_a_config() {
    let td = tempdir().unwrap();
    let path = td.path().join("nested").join("config.xml");

    create_template_config(&path).unwrap();
    let cfg = load_config_from_xml_path(&path).expect("template should parse");

    let defaults = Config::default();
    assert_eq!(cfg.tenant, defaults.tenant);
    assert_eq!(cfg.metadata_root, defaults.metadata_root);
    assert_eq!(cfg.blob_root, defaults.blob_root);
    assert_eq!(cfg.departments.get("hr").map(String::as_str), Some("HR"));
    assert_eq!(cfg.departments.len(), 4);
}

#[test]
fn template_is_never_overwritten() {
    let td = tempdir().unwrap();
    let path = td.path().join("config.xml");
    fs::write(&path, "<config><tenant>mine</tenant></config>").unwrap();

    assert!(create_template_config(&path).is_err());
    assert_eq!(load_config_from_xml_path(&path).unwrap().tenant, "mine");
}

#[cfg(unix)]
#[test]
fn template_is_private() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempdir().unwrap();
    let path = td.path().join("cfg").join("config.xml");
    create_template_config(&path).unwrap();
    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[cfg(unix)]
#[test]
fn symlinked_config_dir_is_refused() {
    let td = tempdir().unwrap();
    let real = td.path().join("real");
    fs::create_dir_all(&real).unwrap();
    let link = td.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let err = create_template_config(&link.join("config.xml")).unwrap_err();
    assert!(err.to_string().contains("symlink"), "{err}");
    assert!(!real.join("config.xml").exists());
}
