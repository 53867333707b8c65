//! Error types for starvault-ingest
//!
//! Input rejections are not errors (see `services::header_normalizer::Rejection`);
//! everything here is a failure that a batch logs and steps past, except
//! `ScanError`, which aborts before any file is touched.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Setup-level failures for a tree scan
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Metadata store failures with an explicit duplicate-key signal
#[derive(Debug, Error)]
pub enum StoreError {
    /// A session with this identity already exists
    #[error("Duplicate session key: {0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Database(#[from] starvault_common::Error),
}

/// Per-file registration failures
#[derive(Debug, Error)]
pub enum RegisterError {
    /// Content digest could not be computed
    #[error("Failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: starvault_common::Error,
    },

    /// Record could not be written
    #[error("Failed to persist record: {0}")]
    Persist(#[from] starvault_common::Error),

    /// Record exists but the physical file could not be moved
    #[error("Record {record_id} persisted but moving {from} to {to} failed: {source}")]
    Relocation {
        record_id: Uuid,
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while clustering or linking sessions
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    Store(#[from] starvault_common::Error),
}

