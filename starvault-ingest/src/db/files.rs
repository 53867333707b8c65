//! File record persistence
//!
//! A file record is created once at registration and afterwards only gets
//! its session reference, soft-delete flag or calibration flag updated.

use crate::models::FrameType;
use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use starvault_common::{Error, Result};
use uuid::Uuid;

const FILE_COLUMNS: &str = r#"
    guid, path, name, acquired_at, frame_type, object_name, exposure,
    x_binning, y_binning, sensor_temp, telescope, instrument, filter, hash,
    session_id, is_deleted, calibration_applied
"#;

/// One registered exposure
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub guid: Uuid,
    /// Canonical relative path (directory + name), unique
    pub path: String,
    /// Canonical filename
    pub name: String,
    pub acquired_at: NaiveDateTime,
    pub frame_type: FrameType,
    /// Present only for Light frames
    pub object_name: Option<String>,
    pub exposure: f64,
    pub x_binning: i64,
    pub y_binning: i64,
    pub sensor_temp: f64,
    pub telescope: String,
    pub instrument: String,
    pub filter: Option<String>,
    /// SHA-256 of the file contents at registration
    pub hash: String,
    pub session_id: Option<Uuid>,
    pub is_deleted: bool,
    pub calibration_applied: bool,
}

fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Corrupt(format!("invalid guid {}: {}", value, e)))
}

fn file_from_row(row: &SqliteRow) -> Result<FileRecord> {
    let guid: String = row.try_get("guid")?;
    let frame_type: String = row.try_get("frame_type")?;
    let session_id: Option<String> = row.try_get("session_id")?;

    Ok(FileRecord {
        guid: parse_guid(&guid)?,
        path: row.try_get("path")?,
        name: row.try_get("name")?,
        acquired_at: row.try_get("acquired_at")?,
        frame_type: frame_type.parse().map_err(Error::Corrupt)?,
        object_name: row.try_get("object_name")?,
        exposure: row.try_get("exposure")?,
        x_binning: row.try_get("x_binning")?,
        y_binning: row.try_get("y_binning")?,
        sensor_temp: row.try_get("sensor_temp")?,
        telescope: row.try_get("telescope")?,
        instrument: row.try_get("instrument")?,
        filter: row.try_get("filter")?,
        hash: row.try_get("hash")?,
        session_id: session_id.as_deref().map(parse_guid).transpose()?,
        is_deleted: row.try_get("is_deleted")?,
        calibration_applied: row.try_get("calibration_applied")?,
    })
}

/// Insert a new record keyed by its canonical path.
///
/// Returns `false` without touching the stored row when the path is
/// already registered; the stored hash is never rewritten.
pub async fn insert_file(pool: &SqlitePool, file: &FileRecord) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO files (
            guid, path, name, acquired_at, frame_type, object_name, exposure,
            x_binning, y_binning, sensor_temp, telescope, instrument, filter, hash,
            session_id, is_deleted, calibration_applied
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO NOTHING
        "#,
    )
    .bind(file.guid.to_string())
    .bind(&file.path)
    .bind(&file.name)
    .bind(file.acquired_at)
    .bind(file.frame_type.as_str())
    .bind(&file.object_name)
    .bind(file.exposure)
    .bind(file.x_binning)
    .bind(file.y_binning)
    .bind(file.sensor_temp)
    .bind(&file.telescope)
    .bind(&file.instrument)
    .bind(&file.filter)
    .bind(&file.hash)
    .bind(file.session_id.map(|id| id.to_string()))
    .bind(file.is_deleted)
    .bind(file.calibration_applied)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Load a record by id
pub async fn load_file(pool: &SqlitePool, guid: Uuid) -> Result<Option<FileRecord>> {
    let sql = format!("SELECT {} FROM files WHERE guid = ?", FILE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(file_from_row).transpose()
}

/// Load a record by canonical path
pub async fn load_file_by_path(pool: &SqlitePool, path: &str) -> Result<Option<FileRecord>> {
    let sql = format!("SELECT {} FROM files WHERE path = ?", FILE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(path)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(file_from_row).transpose()
}

/// All records sharing a content hash
pub async fn find_by_hash(pool: &SqlitePool, hash: &str) -> Result<Vec<FileRecord>> {
    let sql = format!("SELECT {} FROM files WHERE hash = ? ORDER BY rowid", FILE_COLUMNS);
    let rows = sqlx::query(&sql).bind(hash).fetch_all(pool).await?;

    rows.iter().map(file_from_row).collect()
}

/// Live records of one frame type that no session has claimed yet.
///
/// Light records come back in registration order (no sort on object or
/// date); calibration records in acquisition order.
pub async fn load_unassigned(pool: &SqlitePool, frame_type: FrameType) -> Result<Vec<FileRecord>> {
    let order = if frame_type.is_calibration() {
        "acquired_at, rowid"
    } else {
        "rowid"
    };
    let sql = format!(
        "SELECT {} FROM files WHERE frame_type = ? AND session_id IS NULL AND is_deleted = 0 ORDER BY {}",
        FILE_COLUMNS, order
    );
    let rows = sqlx::query(&sql)
        .bind(frame_type.as_str())
        .fetch_all(pool)
        .await?;

    rows.iter().map(file_from_row).collect()
}

/// Records belonging to a session, oldest first
pub async fn files_in_session(pool: &SqlitePool, session_id: Uuid) -> Result<Vec<FileRecord>> {
    let sql = format!(
        "SELECT {} FROM files WHERE session_id = ? ORDER BY acquired_at, rowid",
        FILE_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(session_id.to_string())
        .fetch_all(pool)
        .await?;

    rows.iter().map(file_from_row).collect()
}

/// Point a record at its session
pub async fn assign_session(pool: &SqlitePool, file_id: Uuid, session_id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE files SET session_id = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(session_id.to_string())
    .bind(file_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Soft delete; the row stays for dedup and history
pub async fn mark_deleted(pool: &SqlitePool, file_id: Uuid) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE files SET is_deleted = 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(file_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Record whether calibration masters were applied to this frame
pub async fn set_calibration_applied(pool: &SqlitePool, file_id: Uuid, applied: bool) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE files SET calibration_applied = ?, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(applied)
    .bind(file_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Count records in the store
pub async fn count_files(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
