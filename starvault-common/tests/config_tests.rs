//! Tests for configuration loading and resolution priority
//!
//! Uses serial_test to prevent ENV variable race conditions: every test that
//! reads or writes STARVAULT_* variables is marked #[serial].

use serial_test::serial;
use starvault_common::config::{
    CliOverrides, RepositoryConfig, TomlConfig, ENV_DATABASE, ENV_REPO_ROOT, ENV_SCAN_ROOT,
};
use starvault_common::Error;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_SCAN_ROOT);
    env::remove_var(ENV_REPO_ROOT);
    env::remove_var(ENV_DATABASE);
}

#[test]
#[serial]
fn test_cli_beats_env_beats_toml() {
    clear_env();
    let toml = TomlConfig {
        scan_root: Some(PathBuf::from("/toml/scan")),
        repo_root: Some(PathBuf::from("/toml/repo")),
        ..TomlConfig::default()
    };

    env::set_var(ENV_SCAN_ROOT, "/env/scan");
    env::set_var(ENV_REPO_ROOT, "/env/repo");

    let cli = CliOverrides {
        scan_root: Some(PathBuf::from("/cli/scan")),
        ..CliOverrides::default()
    };
    let config = RepositoryConfig::resolve(&cli, &toml).unwrap();

    assert_eq!(config.scan_root, PathBuf::from("/cli/scan"));
    assert_eq!(config.repo_root, PathBuf::from("/env/repo"));
    assert_eq!(config.database_path, PathBuf::from("/env/repo/starvault.db"));

    env::remove_var(ENV_REPO_ROOT);
    let config = RepositoryConfig::resolve(&cli, &toml).unwrap();
    assert_eq!(config.repo_root, PathBuf::from("/toml/repo"));

    clear_env();
}

#[test]
#[serial]
fn test_repo_root_defaults_to_scan_root() {
    clear_env();
    let toml = TomlConfig {
        scan_root: Some(PathBuf::from("/data/incoming")),
        ..TomlConfig::default()
    };

    let config = RepositoryConfig::resolve(&CliOverrides::default(), &toml).unwrap();
    assert_eq!(config.repo_root, PathBuf::from("/data/incoming"));
    assert_eq!(
        config.database_path,
        PathBuf::from("/data/incoming/starvault.db")
    );
    assert!(!config.move_files);
}

#[test]
#[serial]
fn test_missing_scan_root_is_a_config_error() {
    clear_env();
    let result = RepositoryConfig::resolve(&CliOverrides::default(), &TomlConfig::default());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_empty_env_value_is_ignored() {
    clear_env();
    env::set_var(ENV_SCAN_ROOT, "  ");
    let toml = TomlConfig {
        scan_root: Some(PathBuf::from("/toml/scan")),
        ..TomlConfig::default()
    };

    let config = RepositoryConfig::resolve(&CliOverrides::default(), &toml).unwrap();
    assert_eq!(config.scan_root, PathBuf::from("/toml/scan"));
    clear_env();
}

#[test]
#[serial]
fn test_move_flag_from_cli_or_toml() {
    clear_env();
    let toml = TomlConfig {
        scan_root: Some(PathBuf::from("/s")),
        move_files: Some(true),
        ..TomlConfig::default()
    };
    assert!(RepositoryConfig::resolve(&CliOverrides::default(), &toml).unwrap().move_files);

    let cli = CliOverrides {
        scan_root: Some(PathBuf::from("/s")),
        move_files: true,
        ..CliOverrides::default()
    };
    assert!(RepositoryConfig::resolve(&cli, &TomlConfig::default()).unwrap().move_files);
}

#[test]
fn test_load_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("starvault.toml");
    std::fs::write(
        &path,
        "scan_root = \"/incoming\"\ndatabase = \"/var/lib/starvault.db\"\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.scan_root, Some(PathBuf::from("/incoming")));
    assert_eq!(config.database, Some(PathBuf::from("/var/lib/starvault.db")));
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
}

#[test]
fn test_load_missing_explicit_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = TomlConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_invalid_toml_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "scan_root = [").unwrap();

    match TomlConfig::load(Some(&path)) {
        Err(Error::Toml { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("Expected TOML error, got {:?}", other),
    }
}

#[test]
fn test_validate_requires_existing_directories() {
    let dir = TempDir::new().unwrap();
    let config = RepositoryConfig {
        scan_root: dir.path().to_path_buf(),
        repo_root: dir.path().to_path_buf(),
        database_path: dir.path().join("starvault.db"),
        move_files: false,
    };
    assert!(config.validate().is_ok());

    let missing = RepositoryConfig {
        scan_root: dir.path().join("gone"),
        ..config.clone()
    };
    assert!(matches!(missing.validate(), Err(Error::RootUnavailable(_))));

    let file = dir.path().join("file.txt");
    std::fs::write(&file, b"x").unwrap();
    let not_dir = RepositoryConfig {
        repo_root: file,
        ..config
    };
    assert!(matches!(not_dir.validate(), Err(Error::RootUnavailable(_))));
}
