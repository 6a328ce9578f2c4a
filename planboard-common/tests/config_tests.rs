//! Configuration loading and root folder resolution
//!
//! Uses serial_test: tests that touch PLANBOARD_ROOT_FOLDER run one at a time.

use planboard_common::config::{
    default_root_folder, load_config, parse_config_file, resolve_root_folder, SyncTransportKind,
    TomlConfig, DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use planboard_common::models::{MarketingTier, Priority};
use planboard_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.port(), DEFAULT_PORT);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.board.activity_cap, 100);
    assert!(!config.board.enforce_allocation);
    assert!(!config.sync.enabled());
    assert_eq!(config.sync.interval(), Duration::from_millis(2000));
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
port = 6100
root_folder = "/srv/planboard"
user = "Ana"

[logging]
level = "debug"

[board]
activity_cap = 50
enforce_allocation = true

[sync]
transport = "http"
base_url = "http://localhost:9000/b"
bin_id = "abc123"
interval_ms = 1500

[[authors]]
name = "Rebecca Yarros"
prior_tier = "Mega Blockbuster"
performance = "High"
social_following = 850000
"#,
    );

    let config = parse_config_file(&path).unwrap();
    assert_eq!(config.port(), 6100);
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/planboard")));
    assert_eq!(config.user.as_deref(), Some("Ana"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.board.activity_cap, 50);
    assert!(config.board.enforce_allocation);
    assert_eq!(config.sync.transport, SyncTransportKind::Http);
    assert_eq!(config.sync.bin_id.as_deref(), Some("abc123"));
    assert_eq!(config.sync.interval(), Duration::from_millis(1500));

    let authors = config.author_directory();
    let profile = authors.lookup("rebecca yarros").unwrap();
    assert_eq!(profile.prior_tier, Some(MarketingTier::MegaBlockbuster));
    assert_eq!(profile.performance, Some(Priority::High));
}

#[test]
fn test_partial_sections_keep_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[sync]\ntransport = \"http\"\n");

    let config = parse_config_file(&path).unwrap();
    assert_eq!(config.port(), DEFAULT_PORT);
    assert!(config.sync.enabled());
    assert!(config.sync.base_url.starts_with("https://"));
    assert_eq!(config.board.activity_cap, 100);
}

#[test]
fn test_invalid_values_rejected() {
    let dir = TempDir::new().unwrap();

    let path = write_config(&dir, "[board]\nactivity_cap = 0\n");
    assert!(matches!(parse_config_file(&path), Err(Error::Config(_))));

    let path = write_config(&dir, "[sync]\ninterval_ms = 10\n");
    assert!(matches!(parse_config_file(&path), Err(Error::Config(_))));

    let path = write_config(&dir, "[[authors]]\nname = \"  \"\n");
    assert!(matches!(parse_config_file(&path), Err(Error::Config(_))));

    let path = write_config(&dir, "port = \"not a number\"\n");
    assert!(matches!(parse_config_file(&path), Err(Error::Config(_))));
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let result = load_config(Some(Path::new("/nonexistent/planboard/config.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/from/cli")), ROOT_FOLDER_ENV, &config);
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, ROOT_FOLDER_ENV, &config), PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };
    assert_eq!(resolve_root_folder(None, ROOT_FOLDER_ENV, &config), PathBuf::from("/from/toml"));

    let resolved = resolve_root_folder(None, ROOT_FOLDER_ENV, &TomlConfig::default());
    assert_eq!(resolved, default_root_folder());
    assert!(!resolved.as_os_str().is_empty());
}
