//! Batch tree scanner
//!
//! Two full walks of the scan root: the first counts candidate files so
//! progress has a stable denominator, the second registers each candidate
//! and reports after every file. Stopping mid-walk keeps whatever was
//! already registered.

use super::file_registrar::{FileRegistrar, Registration};
use crate::error::ScanError;
use crate::fits::has_fits_extension;
use crate::models::{BatchSummary, RunContext, UnitOutcome};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Repository folders the registrar moves files into
const REPOSITORY_FOLDERS: &[&str] = &["Light", "Calibrate"];

/// Walks a tree and feeds candidate files to a `FileRegistrar`
pub struct BatchScanner<'r> {
    registrar: &'r FileRegistrar,
    ignore_patterns: Vec<String>,
    excluded_dirs: Vec<PathBuf>,
}

impl<'r> BatchScanner<'r> {
    /// Create a scanner with the default ignore patterns.
    ///
    /// When the registrar moves files, the repository's own `Light/` and
    /// `Calibrate/` folders are excluded so moved files are not revisited.
    pub fn new(registrar: &'r FileRegistrar, repo_root: &Path) -> Self {
        let excluded_dirs = if registrar.move_files() {
            let repo_root = canonical_or_given(repo_root);
            REPOSITORY_FOLDERS.iter().map(|d| repo_root.join(d)).collect()
        } else {
            Vec::new()
        };

        Self {
            registrar,
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
                ".starvault-tmp".to_string(),
            ],
            excluded_dirs,
        }
    }

    /// Register every candidate file under `root`
    pub async fn scan(
        &self,
        root: &Path,
        ctx: &mut RunContext<'_>,
    ) -> Result<BatchSummary, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut summary = BatchSummary::new("scan");

        let total = self.candidates(root).count();
        tracing::info!(root = %root.display(), total, "Scan started");

        for (index, path) in self.candidates(root).enumerate() {
            if ctx.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let outcome = match self.registrar.register_path(&path).await {
                Ok(Registration::Registered(id)) => {
                    summary.ids.push(id);
                    UnitOutcome::Succeeded
                }
                Ok(Registration::Skipped(reason)) => {
                    tracing::debug!(file = %path.display(), ?reason, "File skipped");
                    UnitOutcome::Skipped
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "File registration failed");
                    UnitOutcome::Failed
                }
            };
            summary.record(outcome);

            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if !ctx.report(index + 1, total, &label) {
                summary.cancelled = true;
                break;
            }
        }

        summary.log();
        Ok(summary)
    }

    /// Candidate files in walk order (sorted by name at every level).
    ///
    /// The walk starts from the canonical root so entry paths compare
    /// equal to the excluded repository folders however `root` was spelled.
    fn candidates<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkDir::new(canonical_or_given(root))
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| self.should_process_entry(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && has_fits_extension(entry.path()))
            .map(|entry| entry.into_path())
    }

    fn should_process_entry(&self, entry: &DirEntry) -> bool {
        let file_name = entry.file_name().to_string_lossy();
        if self
            .ignore_patterns
            .iter()
            .any(|pattern| file_name.contains(pattern.as_str()))
        {
            return false;
        }

        !(entry.file_type().is_dir() && self.excluded_dirs.iter().any(|d| d == entry.path()))
    }
}

/// Resolved absolute form of `path`, or `path` itself when it cannot be resolved
fn canonical_or_given(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
