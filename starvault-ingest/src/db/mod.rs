//! Database access for starvault-ingest
//!
//! File and session records live in the shared store created by
//! `starvault_common::db`.

pub mod files;
pub mod sessions;

pub use files::FileRecord;
pub use sessions::{LinkKind, SessionRecord};

use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the metadata store and make sure the schema exists
pub async fn init_database_pool(db_path: &Path) -> starvault_common::Result<SqlitePool> {
    tracing::debug!(database = %db_path.display(), "Connecting to database");
    starvault_common::db::init_database(db_path).await
}
