//! Light session clustering
//!
//! Walks unassigned Light records in registration order. A new session
//! starts on the first record and whenever the object or the calendar day
//! differs from the current session's; every record is assigned to the
//! current session. Records are not sorted first, so interleaved objects on
//! one day split into several sessions (the second of which then collides on
//! its key and is left unassigned).

use crate::db::files::{assign_session, load_unassigned, FileRecord};
use crate::db::sessions::{insert_session, SessionRecord};
use crate::error::{SessionError, StoreError};
use crate::models::{BatchSummary, FrameType, RunContext, UnitOutcome};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;

struct CurrentSession {
    object: String,
    date: NaiveDate,
    id: Uuid,
}

/// Groups unassigned Light frames into sessions
pub struct LightSessionClusterer {
    db: SqlitePool,
}

impl LightSessionClusterer {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Cluster every unassigned Light record; the summary's ids are the
    /// sessions created
    pub async fn run(&self, ctx: &mut RunContext<'_>) -> Result<BatchSummary, SessionError> {
        let mut summary = BatchSummary::new("light-sessions");
        let records = load_unassigned(&self.db, FrameType::Light).await?;
        let total = records.len();
        info!(total, "Light session clustering started");

        let mut current: Option<CurrentSession> = None;

        for (index, record) in records.iter().enumerate() {
            if ctx.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let outcome = self.cluster_one(record, &mut current, &mut summary).await;
            summary.record(outcome);

            if !ctx.report(index + 1, total, &record.name) {
                summary.cancelled = true;
                break;
            }
        }

        summary.log();
        Ok(summary)
    }

    async fn cluster_one(
        &self,
        record: &FileRecord,
        current: &mut Option<CurrentSession>,
        summary: &mut BatchSummary,
    ) -> UnitOutcome {
        let object = record.object_name.clone().unwrap_or_default();
        let date = record.acquired_at.date();

        let starts_session = current
            .as_ref()
            .map_or(true, |c| c.object != object || c.date != date);

        if starts_session {
            let session = SessionRecord::light(
                &object,
                record.acquired_at,
                &record.telescope,
                &record.instrument,
            );
            match insert_session(&self.db, &session).await {
                Ok(()) => {
                    info!(
                        session_id = %session.guid,
                        object = %object,
                        date = %date,
                        "Light session created"
                    );
                    summary.ids.push(session.guid);
                    *current = Some(CurrentSession {
                        object,
                        date,
                        id: session.guid,
                    });
                }
                Err(StoreError::DuplicateKey(key)) => {
                    warn!(
                        record_id = %record.guid,
                        session_key = %key,
                        "Session already exists, record left unassigned"
                    );
                    return UnitOutcome::Skipped;
                }
                Err(StoreError::Database(e)) => {
                    error!(record_id = %record.guid, error = %e, "Failed to create light session");
                    return UnitOutcome::Failed;
                }
            }
        }

        let Some(session) = current.as_ref() else {
            return UnitOutcome::Skipped;
        };

        match assign_session(&self.db, record.guid, session.id).await {
            Ok(()) => UnitOutcome::Succeeded,
            Err(e) => {
                error!(record_id = %record.guid, error = %e, "Failed to assign session");
                UnitOutcome::Failed
            }
        }
    }
}
