//! Progress reporting and cooperative cancellation for batch passes
//!
//! Every pass checks the context after each unit of work (one file while
//! scanning, one record while clustering or linking). Stopping never undoes
//! work that was already committed.

use tokio_util::sync::CancellationToken;

/// Caller-supplied progress hook: `(current, total, label) -> continue`
pub type ProgressCallback<'a> = Box<dyn FnMut(usize, usize, &str) -> bool + Send + 'a>;

/// Cancellation token plus optional progress hook, threaded through a pass
pub struct RunContext<'a> {
    cancel: CancellationToken,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> RunContext<'a> {
    /// Context driven only by a token (e.g. cancelled from a signal handler)
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            progress: None,
        }
    }

    /// Context that never reports and is never cancelled externally
    pub fn detached() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Attach a progress hook; returning `false` from it cancels the run
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(usize, usize, &str) -> bool + Send + 'a,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Token shared with whoever may cancel this run
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Report one finished unit; returns `true` if the run should continue
    pub fn report(&mut self, current: usize, total: usize, label: &str) -> bool {
        if let Some(callback) = self.progress.as_mut() {
            if !callback(current, total, label) {
                tracing::info!(current, total, "Run cancelled by progress callback");
                self.cancel.cancel();
            }
        }
        !self.cancel.is_cancelled()
    }
}

impl Default for RunContext<'_> {
    fn default() -> Self {
        Self::detached()
    }
}
