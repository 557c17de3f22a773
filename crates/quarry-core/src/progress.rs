//! # Progress Reporting
//!
//! The `ProgressChannel` trait receives `start`, `tick` and `finish` events
//! from an import. A task has at most one channel; without one, progress calls
//! are no-ops.
//!
//! [`FinishGuard`] wraps the optional channel for the duration of a run and
//! emits `finish` exactly once: explicitly through [`FinishGuard::release`], or
//! on drop if the run unwinds.

/// Receiver of import progress events.
pub trait ProgressChannel: Send {
    /// The import started and expects to take about `estimated_seconds`.
    fn start(&mut self, estimated_seconds: u64);

    /// One stage boundary was crossed.
    fn tick(&mut self);

    /// The import is over, whatever its outcome.
    fn finish(&mut self);
}

/// Owns a task's progress channel while it runs.
pub struct FinishGuard {
    channel: Option<Box<dyn ProgressChannel>>,
    finished: bool,
}

impl FinishGuard {
    #[must_use]
    pub fn new(channel: Option<Box<dyn ProgressChannel>>) -> Self {
        Self {
            channel,
            finished: false,
        }
    }

    pub fn start(&mut self, estimated_seconds: u64) {
        if let Some(channel) = self.channel.as_mut() {
            channel.start(estimated_seconds);
        }
    }

    pub fn tick(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            channel.tick();
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Some(channel) = self.channel.as_mut() {
            channel.finish();
        }
    }

    /// Emit `finish` and hand the channel back.
    pub fn release(mut self) -> Option<Box<dyn ProgressChannel>> {
        self.finish();
        self.channel.take()
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

// =============================================================================
// TESTS
// =============================================================================
