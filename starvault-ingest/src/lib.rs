//! starvault-ingest library
//!
//! Ingests raw exposure files into a repository: header normalization and
//! repair, deterministic canonical naming, content hashing, registration in
//! the metadata store, and the session passes that cluster registered files
//! and link calibration sessions to light sessions.
//!
//! The functions at the crate root are the entry points used by the CLI and
//! by other collaborators. Each batch pass takes a `RunContext` for progress
//! and cooperative cancellation.

pub mod db;
pub mod error;
pub mod fits;
pub mod models;
pub mod services;

pub use crate::error::{RegisterError, ScanError, SessionError, StoreError};
pub use crate::models::{BatchSummary, FrameType, RunContext};
pub use crate::services::{Registration, SkipReason};

use services::{
    BatchScanner, CalibrationSessionClusterer, FileRegistrar, LightSessionClusterer,
    SessionLinker,
};
use sqlx::SqlitePool;
use starvault_common::config::RepositoryConfig;
use std::path::Path;

/// Register the single file `root/name`
pub async fn register_file(
    db: &SqlitePool,
    config: &RepositoryConfig,
    root: &Path,
    name: &Path,
) -> Result<Registration, RegisterError> {
    let registrar = FileRegistrar::new(db.clone(), config.repo_root.clone(), config.move_files);
    registrar.register(root, name).await
}

/// Register every candidate file under `root`
pub async fn register_tree(
    db: &SqlitePool,
    config: &RepositoryConfig,
    root: &Path,
    ctx: &mut RunContext<'_>,
) -> Result<BatchSummary, ScanError> {
    let registrar = FileRegistrar::new(db.clone(), config.repo_root.clone(), config.move_files);
    BatchScanner::new(&registrar, &config.repo_root)
        .scan(root, ctx)
        .await
}

/// Cluster unassigned Light records into sessions
pub async fn build_light_sessions(
    db: &SqlitePool,
    ctx: &mut RunContext<'_>,
) -> Result<BatchSummary, SessionError> {
    LightSessionClusterer::new(db.clone()).run(ctx).await
}

/// Cluster unassigned Bias, Dark and Flat records into sessions
pub async fn build_calibration_sessions(
    db: &SqlitePool,
    ctx: &mut RunContext<'_>,
) -> Result<BatchSummary, SessionError> {
    CalibrationSessionClusterer::new(db.clone()).run(ctx).await
}

/// Fill empty calibration links on light sessions
pub async fn link_sessions(
    db: &SqlitePool,
    ctx: &mut RunContext<'_>,
) -> Result<BatchSummary, SessionError> {
    SessionLinker::new(db.clone()).run(ctx).await
}
