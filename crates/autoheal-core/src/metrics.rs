//! Global atomic counters for healing runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    failures_detected: AtomicU64,
    fixes_applied: AtomicU64,
    commits_made: AtomicU64,
    runs_finished: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            failures_detected: AtomicU64::new(0),
            fixes_applied: AtomicU64::new(0),
            commits_made: AtomicU64::new(0),
            runs_finished: AtomicU64::new(0),
        }
    }

    pub fn add_failures_detected(&self, n: u64) {
        self.failures_detected.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "failures_detected", n = n, "counter incremented");
    }

    pub fn add_fixes_applied(&self, n: u64) {
        self.fixes_applied.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "fixes_applied", n = n, "counter incremented");
    }

    pub fn inc_commits(&self) {
        self.commits_made.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "commits_made", "counter incremented");
    }

    pub fn inc_runs_finished(&self) {
        self.runs_finished.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_finished", "counter incremented");
    }

    /// Emit all current counter values as one `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            failures_detected = self.failures_detected(),
            fixes_applied = self.fixes_applied(),
            commits_made = self.commits_made(),
            runs_finished = self.runs_finished(),
        );
    }

    pub fn failures_detected(&self) -> u64 {
        self.failures_detected.load(Ordering::Relaxed)
    }

    pub fn fixes_applied(&self) -> u64 {
        self.fixes_applied.load(Ordering::Relaxed)
    }

    pub fn commits_made(&self) -> u64 {
        self.commits_made.load(Ordering::Relaxed)
    }

    pub fn runs_finished(&self) -> u64 {
        self.runs_finished.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.failures_detected.store(0, Ordering::Relaxed);
        self.fixes_applied.store(0, Ordering::Relaxed);
        self.commits_made.store(0, Ordering::Relaxed);
        self.runs_finished.store(0, Ordering::Relaxed);
    }
}
