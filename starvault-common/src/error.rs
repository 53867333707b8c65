//! Shared error type for the starvault crates

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the shared library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by configuration and metadata-store setup
#[derive(Error, Debug)]
pub enum Error {
    /// Metadata store failure (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Configuration is missing or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured root does not exist or is not a directory
    #[error("Root folder unusable: {0}")]
    RootUnavailable(PathBuf),

    /// Stored value could not be interpreted
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// Background task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}
