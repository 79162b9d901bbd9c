//! Structured observability hooks for the healing run lifecycle.
//!
//! Every event is an `info!` (or `warn!`) with an `event` field naming it, so
//! log pipelines can filter on `event=run.*` regardless of format.

use tracing::info;

/// RAII guard that enters a run-scoped span for the duration of a run.
///
/// ```ignore
/// let _span = RunSpan::enter("run-1234");
/// // events below carry run_id = "run-1234"
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("autoheal.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_started(run_id: &str, repo_url: &str, branch: &str, max_retries: u32) {
    info!(
        event = "run.started",
        run_id = %run_id,
        repo_url = %repo_url,
        branch = %branch,
        max_retries = max_retries,
    );
}

/// Emit event: an iteration finished detection.
pub fn emit_iteration(run_id: &str, iteration: u32, failures: usize, passed: bool) {
    info!(
        event = "run.iteration",
        run_id = %run_id,
        iteration = iteration,
        failures = failures,
        passed = passed,
    );
}

pub fn emit_fixes_applied(run_id: &str, iteration: u32, fixes: usize) {
    info!(event = "run.fixes_applied", run_id = %run_id, iteration = iteration, fixes = fixes);
}

pub fn emit_committed(run_id: &str, iteration: u32, pushed: bool) {
    info!(event = "run.committed", run_id = %run_id, iteration = iteration, pushed = pushed);
}

/// Emit event: run reached a terminal state.
pub fn emit_run_finished(
    run_id: &str,
    duration_ms: u64,
    iterations: u32,
    final_score: i64,
    success: bool,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        iterations = iterations,
        final_score = final_score,
        success = success,
    );
}

/// Emit event: the result artifact could not be written (warning level).
pub fn emit_run_finalize_error(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "run.finalize_error", run_id = %run_id, error = %error);
}
