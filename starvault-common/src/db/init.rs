//! Database initialization
//!
//! Opens (creating when missing) the SQLite metadata store and applies the
//! idempotent schema for file and session records.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas are per connection, so they go on the connect options
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    // Single writer: one batch runs at a time against a store
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory store with the full schema, pinned to one connection so every
/// query sees the same database
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Apply every table and index (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_sessions_table(pool).await?;
    create_files_table(pool).await?;

    Ok(())
}

/// Create the sessions table
///
/// `session_key` is the identity of a session: `Light|<object>|<date>` for
/// light sessions, `<type>|<anchor timestamp>` for calibration sessions.
/// The three link columns are only populated on light sessions.
pub async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            guid TEXT PRIMARY KEY,
            session_key TEXT NOT NULL UNIQUE,
            frame_type TEXT NOT NULL CHECK (frame_type IN ('Light', 'Dark', 'Flat', 'Bias')),
            group_key TEXT NOT NULL,
            session_date DATE NOT NULL,
            anchor_at TIMESTAMP NOT NULL,
            telescope TEXT NOT NULL,
            imager TEXT NOT NULL,
            bias_session_id TEXT REFERENCES sessions(guid),
            dark_session_id TEXT REFERENCES sessions(guid),
            flat_session_id TEXT REFERENCES sessions(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sessions_calibration_lookup
        ON sessions(frame_type, telescope, imager, session_date)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the files table
///
/// `path` is the canonical relative path (directory + filename) and the
/// natural key of a record; `hash` is written once at registration.
pub async fn create_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            guid TEXT PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            acquired_at TIMESTAMP NOT NULL,
            frame_type TEXT NOT NULL CHECK (frame_type IN ('Light', 'Dark', 'Flat', 'Bias')),
            object_name TEXT,
            exposure REAL NOT NULL,
            x_binning INTEGER NOT NULL,
            y_binning INTEGER NOT NULL,
            sensor_temp REAL NOT NULL,
            telescope TEXT NOT NULL,
            instrument TEXT NOT NULL,
            filter TEXT,
            hash TEXT NOT NULL,
            session_id TEXT REFERENCES sessions(guid),
            is_deleted INTEGER NOT NULL DEFAULT 0,
            calibration_applied INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_hash ON files(hash)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_files_unassigned ON files(frame_type, session_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_tables() {
        let pool = init_memory_database().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["files".to_string(), "sessions".to_string()]);
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();
    }
}
