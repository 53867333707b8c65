//! Aggregate batch outcome
//!
//! Per-file diagnostics only go to the log; these counters are what callers
//! see once a scan, clustering or linking pass finishes.

use serde::Serialize;
use uuid::Uuid;

/// How a single unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Succeeded,
    Skipped,
    Failed,
}

/// Counters for one batch pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Name of the pass ("scan", "light-sessions", ...)
    pub operation: String,

    /// Units attempted (files or records)
    pub processed: usize,

    /// Units that completed: file registered, record assigned or session linked
    pub succeeded: usize,

    /// Units rejected or with nothing to do
    pub skipped: usize,

    /// Units that hit an error; the batch carried on
    pub failed: usize,

    /// The pass stopped early on request
    pub cancelled: bool,

    /// Ids produced by the pass (file records, sessions or linked sessions)
    pub ids: Vec<Uuid>,
}

impl BatchSummary {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            ..Self::default()
        }
    }

    /// Count one finished unit
    pub fn record(&mut self, outcome: UnitOutcome) {
        self.processed += 1;
        match outcome {
            UnitOutcome::Succeeded => self.succeeded += 1,
            UnitOutcome::Skipped => self.skipped += 1,
            UnitOutcome::Failed => self.failed += 1,
        }
    }

    /// Emit the counters at info level
    pub fn log(&self) {
        tracing::info!(
            operation = %self.operation,
            processed = self.processed,
            succeeded = self.succeeded,
            skipped = self.skipped,
            failed = self.failed,
            cancelled = self.cancelled,
            "Batch finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut summary = BatchSummary::new("scan");
        summary.record(UnitOutcome::Succeeded);
        summary.record(UnitOutcome::Skipped);
        summary.record(UnitOutcome::Failed);
        summary.record(UnitOutcome::Succeeded);

        assert_eq!(summary.processed, 4);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.cancelled);
    }

    #[test]
    fn test_serializes_to_json() {
        let summary = BatchSummary::new("link");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["operation"], "link");
        assert_eq!(json["cancelled"], false);
    }
}
