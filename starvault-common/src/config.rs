//! Configuration loading and root folder resolution
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the directory that is scanned for new exposures
pub const ENV_SCAN_ROOT: &str = "STARVAULT_SCAN_ROOT";
/// Environment variable naming the repository root canonical paths are relative to
pub const ENV_REPO_ROOT: &str = "STARVAULT_REPO_ROOT";
/// Environment variable naming the metadata store file
pub const ENV_DATABASE: &str = "STARVAULT_DATABASE";

/// Default database filename inside the repository root
pub const DEFAULT_DATABASE_NAME: &str = "starvault.db";

/// Logging section of the TOML file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "starvault_ingest=debug"
    pub level: Option<String>,
}

/// On-disk configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub scan_root: Option<PathBuf>,
    pub repo_root: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub move_files: Option<bool>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse configuration text; `origin` is only used in error messages
    pub fn parse(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| Error::Toml {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load configuration from an explicit file or the platform default location.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file yields an empty configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config = Self::parse(&content, &path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Platform config file location (`~/.config/starvault/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("starvault").join("config.toml"))
}

/// Resolve a single path setting: CLI → environment → TOML
pub fn resolve_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    toml_value.map(Path::to_path_buf)
}

/// Values supplied on the command line; all optional
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub scan_root: Option<PathBuf>,
    pub repo_root: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub move_files: bool,
}

/// Fully resolved configuration handed to each component at construction
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryConfig {
    /// Directory walked for candidate exposure files
    pub scan_root: PathBuf,
    /// Directory canonical paths are resolved against when files are moved
    pub repo_root: PathBuf,
    /// SQLite file holding file and session records
    pub database_path: PathBuf,
    /// Relocate files into the canonical layout after registration
    pub move_files: bool,
}

impl RepositoryConfig {
    /// Combine CLI, environment and TOML sources.
    ///
    /// The repository root falls back to the scan root, and the database to
    /// `<repo_root>/starvault.db`. A scan root is mandatory.
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let scan_root = resolve_path(
            cli.scan_root.as_deref(),
            ENV_SCAN_ROOT,
            toml.scan_root.as_deref(),
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "No scan root configured. Use --scan-root, {} or scan_root in the config file",
                ENV_SCAN_ROOT
            ))
        })?;

        let repo_root = resolve_path(
            cli.repo_root.as_deref(),
            ENV_REPO_ROOT,
            toml.repo_root.as_deref(),
        )
        .unwrap_or_else(|| scan_root.clone());

        let database_path = resolve_path(
            cli.database.as_deref(),
            ENV_DATABASE,
            toml.database.as_deref(),
        )
        .unwrap_or_else(|| repo_root.join(DEFAULT_DATABASE_NAME));

        let move_files = cli.move_files || toml.move_files.unwrap_or(false);

        Ok(Self {
            scan_root,
            repo_root,
            database_path,
            move_files,
        })
    }

    /// Setup-level gate: both roots must exist and be directories
    pub fn validate(&self) -> Result<()> {
        for root in [&self.scan_root, &self.repo_root] {
            if !root.is_dir() {
                return Err(Error::RootUnavailable(root.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let content = r#"
            scan_root = "/data/incoming"
            repo_root = "/data/repo"
            move_files = true

            [logging]
            level = "debug"
        "#;
        let config = TomlConfig::parse(content, Path::new("test.toml")).unwrap();
        assert_eq!(config.scan_root, Some(PathBuf::from("/data/incoming")));
        assert_eq!(config.repo_root, Some(PathBuf::from("/data/repo")));
        assert_eq!(config.database, None);
        assert_eq!(config.move_files, Some(true));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_parse_invalid_toml_reports_path() {
        let err = TomlConfig::parse("scan_root = [", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_cli_argument_wins() {
        let resolved = resolve_path(
            Some(Path::new("/from/cli")),
            "STARVAULT_TEST_UNSET_VARIABLE",
            Some(Path::new("/from/toml")),
        );
        assert_eq!(resolved, Some(PathBuf::from("/from/cli")));
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let config = RepositoryConfig {
            scan_root: PathBuf::from("/nonexistent/starvault/scan"),
            repo_root: PathBuf::from("/nonexistent/starvault/repo"),
            database_path: PathBuf::from("/nonexistent/starvault/db"),
            move_files: false,
        };
        match config.validate() {
            Err(Error::RootUnavailable(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/starvault/scan"))
            }
            other => panic!("Expected RootUnavailable, got {:?}", other),
        }
    }
}
