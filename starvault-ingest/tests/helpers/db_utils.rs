//! Database Test Utilities

use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use starvault_common::config::RepositoryConfig;
use starvault_ingest::db::FileRecord;
use starvault_ingest::FrameType;
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

/// File-backed store in a scratch folder
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_starvault.db");
    let pool = starvault_ingest::db::init_database_pool(&db_path)
        .await
        .unwrap();
    (temp_dir, pool)
}

/// Configuration pointing at test folders
pub fn repository_config(scan_root: &Path, repo_root: &Path, move_files: bool) -> RepositoryConfig {
    RepositoryConfig {
        scan_root: scan_root.to_path_buf(),
        repo_root: repo_root.to_path_buf(),
        database_path: repo_root.join("starvault.db"),
        move_files,
    }
}

/// `YYYY-MM-DDTHH:MM:SS`
pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

/// Record as the registrar would write it, with a unique path and hash
pub fn file_record(frame_type: FrameType, object: Option<&str>, acquired_at: &str) -> FileRecord {
    let guid = Uuid::new_v4();
    FileRecord {
        guid,
        path: format!("test/{}.fits", guid),
        name: format!("{}.fits", guid),
        acquired_at: at(acquired_at),
        frame_type,
        object_name: object.map(str::to_string),
        exposure: 300.0,
        x_binning: 1,
        y_binning: 1,
        sensor_temp: -10.0,
        telescope: "ScopeA".to_string(),
        instrument: "CamA".to_string(),
        filter: None,
        hash: format!("hash-{}", guid),
        session_id: None,
        is_deleted: false,
        calibration_applied: false,
    }
}
