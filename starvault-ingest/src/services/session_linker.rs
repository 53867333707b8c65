//! Calibration-to-light session linking
//!
//! For each Light session with an empty bias, dark or flat slot, pick the
//! latest calibration session of that kind on the same telescope and imager
//! dated on or before the light session. Slots are only ever filled, never
//! replaced, so re-running over linked sessions changes nothing.

use crate::db::sessions::{
    latest_calibration_on_or_before, light_sessions_missing_links, set_link_if_empty,
    SessionRecord,
};
use crate::error::SessionError;
use crate::models::{BatchSummary, RunContext, UnitOutcome};
use sqlx::SqlitePool;
use tracing::{debug, error, info};

/// Fills empty calibration links on light sessions
pub struct SessionLinker {
    db: SqlitePool,
}

impl SessionLinker {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Link every light session that is missing a calibration session; the
    /// summary's ids are the light sessions that gained at least one link
    pub async fn run(&self, ctx: &mut RunContext<'_>) -> Result<BatchSummary, SessionError> {
        let mut summary = BatchSummary::new("link");
        let sessions = light_sessions_missing_links(&self.db).await?;
        let total = sessions.len();
        info!(total, "Session linking started");

        for (index, session) in sessions.iter().enumerate() {
            if ctx.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let outcome = match self.link_one(session).await {
                Ok(0) => UnitOutcome::Skipped,
                Ok(_) => {
                    summary.ids.push(session.guid);
                    UnitOutcome::Succeeded
                }
                Err(e) => {
                    error!(session_id = %session.guid, error = %e, "Failed to link session");
                    UnitOutcome::Failed
                }
            };
            summary.record(outcome);

            if !ctx.report(index + 1, total, &session.session_key) {
                summary.cancelled = true;
                break;
            }
        }

        summary.log();
        Ok(summary)
    }

    /// Fill the empty slots of one light session; returns how many were set
    async fn link_one(&self, session: &SessionRecord) -> Result<usize, SessionError> {
        let mut linked = 0;

        for kind in session.missing_links() {
            let candidate = latest_calibration_on_or_before(
                &self.db,
                kind,
                &session.telescope,
                &session.imager,
                session.session_date,
            )
            .await?;

            let Some(calibration) = candidate else {
                debug!(
                    session_id = %session.guid,
                    kind = ?kind,
                    "No eligible calibration session"
                );
                continue;
            };

            if set_link_if_empty(&self.db, session.guid, kind, calibration.guid).await? {
                info!(
                    session_id = %session.guid,
                    calibration_id = %calibration.guid,
                    kind = ?kind,
                    calibration_date = %calibration.session_date,
                    "Calibration session linked"
                );
                linked += 1;
            }
        }

        Ok(linked)
    }
}
