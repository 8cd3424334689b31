mod common;

use std::path::PathBuf;

use common::{unique_temp_dir, write_file, CleanupDir};
use contextgui_core::config::{AppConfig, DEFAULT_REG_TOOL};
use contextgui_core::error::FailureKind;

#[test]
fn missing_config_file_yields_defaults() {
    let dir = unique_temp_dir("contextgui-config");
    let _cleanup = CleanupDir(dir.clone());

    let config = AppConfig::load(&dir.join("config.json")).expect("load");
    assert_eq!(config, AppConfig::default());
    assert_eq!(config.reg_tool, DEFAULT_REG_TOOL);
}

#[test]
fn partial_config_keeps_defaults_for_missing_fields() {
    let dir = unique_temp_dir("contextgui-config");
    let _cleanup = CleanupDir(dir.clone());
    let path = dir.join("config.json");
    write_file(&path, r#"{ "backup_dir": "D:\\Backups" }"#);

    let config = AppConfig::load(&path).expect("load");
    assert_eq!(config.backup_dir.as_deref(), Some("D:\\Backups"));
    assert_eq!(config.reg_tool, DEFAULT_REG_TOOL);
    assert_eq!(config.log_filter, None);
    assert_eq!(config.backup_dir().expect("backup dir"), PathBuf::from("D:\\Backups"));
}

#[test]
fn malformed_config_is_invalid_argument() {
    let dir = unique_temp_dir("contextgui-config");
    let _cleanup = CleanupDir(dir.clone());
    let path = dir.join("config.json");
    write_file(&path, "{ not json");

    let err = AppConfig::load(&path).unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidArgument);
}
