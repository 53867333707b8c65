//! Calibration session clustering
//!
//! Bias, Dark and Flat records are clustered independently, each in
//! acquisition order, against a rolling anchor: a record more than 12 hours
//! from the anchor opens a new session and becomes the new anchor; anything
//! within 12 hours (inclusive) joins the current session.

use crate::db::files::{assign_session, load_unassigned, FileRecord};
use crate::db::sessions::{insert_session, SessionRecord};
use crate::error::{SessionError, StoreError};
use crate::models::{BatchSummary, FrameType, RunContext, UnitOutcome};
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use starvault_common::dates::same_day;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct Anchor {
    at: Option<NaiveDateTime>,
    session_id: Option<Uuid>,
}

/// Groups unassigned calibration frames into sessions
pub struct CalibrationSessionClusterer {
    db: SqlitePool,
}

impl CalibrationSessionClusterer {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Cluster every unassigned Bias, Dark and Flat record
    pub async fn run(&self, ctx: &mut RunContext<'_>) -> Result<BatchSummary, SessionError> {
        let mut summary = BatchSummary::new("calibration-sessions");

        let mut batches = Vec::with_capacity(FrameType::CALIBRATION.len());
        for frame_type in FrameType::CALIBRATION {
            batches.push(load_unassigned(&self.db, frame_type).await?);
        }
        let total: usize = batches.iter().map(Vec::len).sum();
        info!(total, "Calibration session clustering started");

        let mut done = 0;
        'types: for records in &batches {
            let mut anchor = Anchor::default();

            for record in records {
                if ctx.is_cancelled() {
                    summary.cancelled = true;
                    break 'types;
                }

                let outcome = self.cluster_one(record, &mut anchor, &mut summary).await;
                summary.record(outcome);
                done += 1;

                if !ctx.report(done, total, &record.name) {
                    summary.cancelled = true;
                    break 'types;
                }
            }
        }

        summary.log();
        Ok(summary)
    }

    async fn cluster_one(
        &self,
        record: &FileRecord,
        anchor: &mut Anchor,
        summary: &mut BatchSummary,
    ) -> UnitOutcome {
        let starts_session = anchor
            .at
            .map_or(true, |at| !same_day(at, record.acquired_at));

        if starts_session {
            let session = SessionRecord::calibration(
                record.frame_type,
                record.acquired_at,
                &record.telescope,
                &record.instrument,
            );
            match insert_session(&self.db, &session).await {
                Ok(()) => {
                    info!(
                        session_id = %session.guid,
                        frame_type = %record.frame_type,
                        anchor = %record.acquired_at,
                        "Calibration session created"
                    );
                    summary.ids.push(session.guid);
                    anchor.at = Some(record.acquired_at);
                    anchor.session_id = Some(session.guid);
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
                    error!(record_id = %record.guid, error = %e, "Failed to create calibration session");
                    return UnitOutcome::Failed;
                }
            }
        }

        let Some(session_id) = anchor.session_id else {
            return UnitOutcome::Skipped;
        };

        match assign_session(&self.db, record.guid, session_id).await {
            Ok(()) => UnitOutcome::Succeeded,
            Err(e) => {
                error!(record_id = %record.guid, error = %e, "Failed to assign session");
                UnitOutcome::Failed
            }
        }
    }
}
