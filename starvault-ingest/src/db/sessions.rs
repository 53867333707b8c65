//! Session record persistence
//!
//! Sessions are created by the clusterers and afterwards only touched by the
//! linker, through `set_link_if_empty`, which never overwrites a link.

use crate::error::StoreError;
use crate::models::FrameType;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use starvault_common::{Error, Result};
use uuid::Uuid;

const SESSION_COLUMNS: &str = r#"
    guid, session_key, frame_type, group_key, session_date, anchor_at,
    telescope, imager, bias_session_id, dark_session_id, flat_session_id
"#;

/// Calibration link slot on a light session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Bias,
    Dark,
    Flat,
}

impl LinkKind {
    pub const ALL: [LinkKind; 3] = [LinkKind::Bias, LinkKind::Dark, LinkKind::Flat];

    /// Frame type of the sessions that fill this slot
    pub fn frame_type(&self) -> FrameType {
        match self {
            LinkKind::Bias => FrameType::Bias,
            LinkKind::Dark => FrameType::Dark,
            LinkKind::Flat => FrameType::Flat,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            LinkKind::Bias => "bias_session_id",
            LinkKind::Dark => "dark_session_id",
            LinkKind::Flat => "flat_session_id",
        }
    }
}

/// One observing session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub guid: Uuid,
    /// Identity of the session, unique across the store
    pub session_key: String,
    pub frame_type: FrameType,
    /// Object name for light sessions, the frame type name for calibration
    pub group_key: String,
    pub session_date: NaiveDate,
    /// Acquisition time of the record that opened the session
    pub anchor_at: NaiveDateTime,
    pub telescope: String,
    pub imager: String,
    pub bias_session_id: Option<Uuid>,
    pub dark_session_id: Option<Uuid>,
    pub flat_session_id: Option<Uuid>,
}

impl SessionRecord {
    /// Light session keyed by object and calendar day
    pub fn light(
        object: &str,
        anchor_at: NaiveDateTime,
        telescope: &str,
        imager: &str,
    ) -> Self {
        let session_date = anchor_at.date();
        Self {
            guid: Uuid::new_v4(),
            session_key: format!("Light|{}|{}", object, session_date.format("%Y-%m-%d")),
            frame_type: FrameType::Light,
            group_key: object.to_string(),
            session_date,
            anchor_at,
            telescope: telescope.to_string(),
            imager: imager.to_string(),
            bias_session_id: None,
            dark_session_id: None,
            flat_session_id: None,
        }
    }

    /// Calibration session keyed by frame type and anchor time
    pub fn calibration(
        frame_type: FrameType,
        anchor_at: NaiveDateTime,
        telescope: &str,
        imager: &str,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            session_key: format!(
                "{}|{}",
                frame_type.as_str(),
                anchor_at.format("%Y-%m-%dT%H:%M:%S")
            ),
            frame_type,
            group_key: frame_type.as_str().to_string(),
            session_date: anchor_at.date(),
            anchor_at,
            telescope: telescope.to_string(),
            imager: imager.to_string(),
            bias_session_id: None,
            dark_session_id: None,
            flat_session_id: None,
        }
    }

    pub fn link(&self, kind: LinkKind) -> Option<Uuid> {
        match kind {
            LinkKind::Bias => self.bias_session_id,
            LinkKind::Dark => self.dark_session_id,
            LinkKind::Flat => self.flat_session_id,
        }
    }

    /// Slots still waiting for a calibration session
    pub fn missing_links(&self) -> Vec<LinkKind> {
        LinkKind::ALL
            .into_iter()
            .filter(|kind| self.link(*kind).is_none())
            .collect()
    }
}

fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Corrupt(format!("invalid guid {}: {}", value, e)))
}

fn parse_optional_guid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(parse_guid).transpose()
}

fn session_from_row(row: &SqliteRow) -> Result<SessionRecord> {
    let guid: String = row.try_get("guid")?;
    let frame_type: String = row.try_get("frame_type")?;

    Ok(SessionRecord {
        guid: parse_guid(&guid)?,
        session_key: row.try_get("session_key")?,
        frame_type: frame_type.parse().map_err(Error::Corrupt)?,
        group_key: row.try_get("group_key")?,
        session_date: row.try_get("session_date")?,
        anchor_at: row.try_get("anchor_at")?,
        telescope: row.try_get("telescope")?,
        imager: row.try_get("imager")?,
        bias_session_id: parse_optional_guid(row, "bias_session_id")?,
        dark_session_id: parse_optional_guid(row, "dark_session_id")?,
        flat_session_id: parse_optional_guid(row, "flat_session_id")?,
    })
}

/// Insert a new session.
///
/// A session key that already exists comes back as
/// `StoreError::DuplicateKey` so callers can skip the record and go on.
pub async fn insert_session(
    pool: &SqlitePool,
    session: &SessionRecord,
) -> std::result::Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        INSERT INTO sessions (
            guid, session_key, frame_type, group_key, session_date, anchor_at,
            telescope, imager, bias_session_id, dark_session_id, flat_session_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.guid.to_string())
    .bind(&session.session_key)
    .bind(session.frame_type.as_str())
    .bind(&session.group_key)
    .bind(session.session_date)
    .bind(session.anchor_at)
    .bind(&session.telescope)
    .bind(&session.imager)
    .bind(session.bias_session_id.map(|id| id.to_string()))
    .bind(session.dark_session_id.map(|id| id.to_string()))
    .bind(session.flat_session_id.map(|id| id.to_string()))
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(StoreError::DuplicateKey(session.session_key.clone()))
        }
        Err(e) => Err(StoreError::Database(e.into())),
    }
}

/// Load a session by id
pub async fn load_session(pool: &SqlitePool, guid: Uuid) -> Result<Option<SessionRecord>> {
    let sql = format!("SELECT {} FROM sessions WHERE guid = ?", SESSION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(session_from_row).transpose()
}

/// Every session, light first, then by date
pub async fn list_sessions(pool: &SqlitePool) -> Result<Vec<SessionRecord>> {
    let sql = format!(
        r#"
        SELECT {} FROM sessions
        ORDER BY CASE frame_type WHEN 'Light' THEN 0 ELSE 1 END,
                 session_date, anchor_at, guid
        "#,
        SESSION_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(session_from_row).collect()
}

/// Light sessions with at least one empty calibration link
pub async fn light_sessions_missing_links(pool: &SqlitePool) -> Result<Vec<SessionRecord>> {
    let sql = format!(
        r#"
        SELECT {} FROM sessions
        WHERE frame_type = 'Light'
          AND (bias_session_id IS NULL OR dark_session_id IS NULL OR flat_session_id IS NULL)
        ORDER BY session_date, rowid
        "#,
        SESSION_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(session_from_row).collect()
}

/// Latest calibration session of `kind` on the same equipment, dated on or
/// before `date`.
///
/// Ties on date go to the later anchor, then to the lower id.
pub async fn latest_calibration_on_or_before(
    pool: &SqlitePool,
    kind: LinkKind,
    telescope: &str,
    imager: &str,
    date: NaiveDate,
) -> Result<Option<SessionRecord>> {
    let sql = format!(
        r#"
        SELECT {} FROM sessions
        WHERE frame_type = ? AND telescope = ? AND imager = ? AND session_date <= ?
        ORDER BY session_date DESC, anchor_at DESC, guid ASC
        LIMIT 1
        "#,
        SESSION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(kind.frame_type().as_str())
        .bind(telescope)
        .bind(imager)
        .bind(date)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(session_from_row).transpose()
}

/// Fill one link slot of a light session if it is still empty.
///
/// Returns `false` when the slot was already set (or the session is not a
/// light session); the stored value is left untouched.
pub async fn set_link_if_empty(
    pool: &SqlitePool,
    light_session_id: Uuid,
    kind: LinkKind,
    calibration_session_id: Uuid,
) -> Result<bool> {
    let column = kind.column();
    let sql = format!(
        "UPDATE sessions SET {col} = ? WHERE guid = ? AND frame_type = 'Light' AND {col} IS NULL",
        col = column
    );
    let result = sqlx::query(&sql)
        .bind(calibration_session_id.to_string())
        .bind(light_session_id.to_string())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}
