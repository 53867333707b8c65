//! Per-file registration
//!
//! normalize header (repair written in place) → hash → persist record under
//! its canonical path → optionally move the file into the repository.
//!
//! The three steps are not transactional. A file can end up repaired on disk
//! with no record, or recorded with its physical move skipped or failed;
//! those cases are logged and never rolled back.

use super::content_hasher::hash_file;
use super::header_normalizer::{normalize_file, Classification, Rejection};
use crate::db::files::{find_by_hash, insert_file, FileRecord};
use crate::error::RegisterError;
use crate::fits::has_fits_extension;
use sqlx::SqlitePool;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a file produced no new record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Extension is not a FITS extension
    NotCandidate,
    /// Header failed validation
    Rejected(Rejection),
    /// A record already exists at this canonical path
    AlreadyRegistered(String),
}

/// Outcome of registering one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Registered(Uuid),
    Skipped(SkipReason),
}

impl Registration {
    pub fn id(&self) -> Option<Uuid> {
        match self {
            Registration::Registered(id) => Some(*id),
            Registration::Skipped(_) => None,
        }
    }
}

/// Registers exposure files against one metadata store and repository root
pub struct FileRegistrar {
    db: SqlitePool,
    repo_root: PathBuf,
    move_files: bool,
}

impl FileRegistrar {
    pub fn new(db: SqlitePool, repo_root: PathBuf, move_files: bool) -> Self {
        Self {
            db,
            repo_root,
            move_files,
        }
    }

    pub fn move_files(&self) -> bool {
        self.move_files
    }

    /// Register `root/name`
    pub async fn register(&self, root: &Path, name: &Path) -> Result<Registration, RegisterError> {
        self.register_path(&root.join(name)).await
    }

    /// Register one file by full path
    pub async fn register_path(&self, path: &Path) -> Result<Registration, RegisterError> {
        if !has_fits_extension(path) {
            debug!(file = %path.display(), "Not a candidate file");
            return Ok(Registration::Skipped(SkipReason::NotCandidate));
        }

        let classification = match normalize_file(path) {
            Ok(c) => c,
            Err(rejection) => {
                warn!(file = %path.display(), reason = %rejection, "File rejected");
                return Ok(Registration::Skipped(SkipReason::Rejected(rejection)));
            }
        };

        let hash = hash_file(path).await.map_err(|source| {
            error!(file = %path.display(), error = %source, "Hashing failed");
            RegisterError::Hash {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let canonical_path = classification.canonical_path();
        self.warn_on_duplicate_content(path, &hash, &canonical_path).await?;

        let record = build_record(&classification, canonical_path.clone(), hash);
        let inserted = insert_file(&self.db, &record).await.map_err(|e| {
            if classification.mutated {
                error!(
                    file = %path.display(),
                    error = %e,
                    "Header was repaired on disk but the record could not be persisted"
                );
            }
            RegisterError::Persist(e)
        })?;

        if !inserted {
            info!(file = %path.display(), path = %canonical_path, "Already registered");
            return Ok(Registration::Skipped(SkipReason::AlreadyRegistered(canonical_path)));
        }

        info!(
            file = %path.display(),
            record_id = %record.guid,
            path = %canonical_path,
            frame_type = %record.frame_type,
            "File registered"
        );

        if self.move_files {
            self.relocate(path, &classification, record.guid)?;
        }

        Ok(Registration::Registered(record.guid))
    }

    async fn warn_on_duplicate_content(
        &self,
        path: &Path,
        hash: &str,
        canonical_path: &str,
    ) -> Result<(), RegisterError> {
        let existing = find_by_hash(&self.db, hash).await?;
        for other in existing.iter().filter(|f| f.path != canonical_path) {
            warn!(
                file = %path.display(),
                existing_id = %other.guid,
                existing_path = %other.path,
                "Identical content already registered under another path"
            );
        }
        Ok(())
    }

    /// Move the physical file into its canonical folder. An occupied
    /// destination is left alone.
    fn relocate(
        &self,
        source: &Path,
        classification: &Classification,
        record_id: Uuid,
    ) -> Result<(), RegisterError> {
        let dest_dir = self.repo_root.join(&classification.canonical_dir);
        let dest = dest_dir.join(&classification.canonical_name);

        if dest.exists() {
            warn!(
                file = %source.display(),
                destination = %dest.display(),
                record_id = %record_id,
                "Destination already exists, file not moved"
            );
            return Ok(());
        }

        let relocation_error = |e: io::Error| {
            error!(
                file = %source.display(),
                destination = %dest.display(),
                record_id = %record_id,
                error = %e,
                "Record persisted but file could not be moved"
            );
            RegisterError::Relocation {
                record_id,
                from: source.to_path_buf(),
                to: dest.clone(),
                source: e,
            }
        };

        fs::create_dir_all(&dest_dir).map_err(relocation_error)?;
        move_file(source, &dest).map_err(relocation_error)?;

        debug!(file = %source.display(), destination = %dest.display(), "File moved");
        Ok(())
    }
}

/// Rename, falling back to copy + remove when the rename fails (e.g. the
/// repository lives on another filesystem)
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(error = %rename_err, "Rename failed, copying instead");
            if let Err(copy_err) = fs::copy(from, to) {
                let _ = fs::remove_file(to);
                return Err(copy_err);
            }
            fs::remove_file(from)
        }
    }
}

fn build_record(classification: &Classification, path: String, hash: String) -> FileRecord {
    let meta = &classification.metadata;
    FileRecord {
        guid: Uuid::new_v4(),
        path,
        name: classification.canonical_name.clone(),
        acquired_at: meta.acquired_at,
        frame_type: meta.frame_type,
        object_name: meta.object.clone(),
        exposure: meta.exposure,
        x_binning: meta.x_binning,
        y_binning: meta.y_binning,
        sensor_temp: meta.sensor_temp,
        telescope: meta.telescope.clone(),
        instrument: meta.instrument.clone(),
        filter: meta.filter.clone(),
        hash,
        session_id: None,
        is_deleted: false,
        calibration_applied: false,
    }
}
