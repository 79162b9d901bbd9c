//! Bounded detect → fix → verify loop.
//!
//! A run moves through `Running(1..=max_retries)` and ends in exactly one of
//! `Completed` or `Failed`. Iteration 1 acquires the working tree; later
//! iterations re-detect in place. Every started iteration leaves exactly one
//! timeline entry, so `ci_timeline.len() == iterations_used` always holds.
//!
//! Errors never escape [`RetryCoordinator::run`]: validation, acquisition,
//! I/O and push failures all become a terminal `Failed` result.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::detector::Detector;
use crate::domain::{
    new_run_id, CiTimelineEntry, Fix, Result, RunPhase, RunRequest, RunResult, RunStatus,
    RunSummary, TimelineStatus,
};
use crate::fix_engine::FixEngine;
use crate::metrics::METRICS;
use crate::obs::{self, RunSpan};
use crate::results::write_results;
use crate::score::score;
use crate::vcs::VersionControl;

pub const EXHAUSTED_MESSAGE: &str = "Max retries reached without passing";

/// Receives lifecycle updates: `Running` at start and once per iteration,
/// then exactly one terminal phase.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, phase: RunPhase, message: Option<&str>);
}

impl<F> StatusObserver for F
where
    F: Fn(RunPhase, Option<&str>) + Send + Sync,
{
    fn on_status(&self, phase: RunPhase, message: Option<&str>) {
        self(phase, message)
    }
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StatusObserver for NoopObserver {
    fn on_status(&self, _phase: RunPhase, _message: Option<&str>) {}
}

/// How a single iteration ended.
enum Step {
    Passed,
    Retry,
    Stop(String),
}

/// Mutable bookkeeping for one run, folded into a [`RunResult`] at the end.
struct RunLedger {
    run_id: String,
    request: RunRequest,
    branch: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    fixes: Vec<Fix>,
    timeline: Vec<CiTimelineEntry>,
    iterations_used: u32,
    total_failures_detected: Option<usize>,
    commits: u32,
}

impl RunLedger {
    fn new(run_id: String, request: &RunRequest) -> Self {
        let request = RunRequest::new(
            request.repo_url.trim(),
            request.team.trim(),
            request.leader.trim(),
            request.max_retries,
        );
        let branch = if request.team.is_empty() || request.leader.is_empty() {
            String::new()
        } else {
            request.branch_name()
        };
        Self {
            run_id,
            request,
            branch,
            started_at: Utc::now(),
            clock: Instant::now(),
            fixes: Vec::new(),
            timeline: Vec::new(),
            iterations_used: 0,
            total_failures_detected: None,
            commits: 0,
        }
    }

    fn record(&mut self, iteration: u32, status: TimelineStatus, timestamp: DateTime<Utc>) {
        if self.timeline.last().map(|e| e.iteration) == Some(iteration) {
            return;
        }
        self.timeline.push(CiTimelineEntry {
            iteration,
            status,
            timestamp,
        });
    }

    fn finish(self, status: RunStatus, error: Option<String>) -> RunResult {
        let runtime_ms = self.clock.elapsed().as_millis() as u64;
        RunResult {
            run_id: self.run_id,
            status,
            branch: self.branch,
            repo_url: self.request.repo_url,
            team: self.request.team,
            leader: self.request.leader,
            started_at: self.started_at,
            completed_at: Utc::now(),
            summary: RunSummary {
                total_fixes: self.fixes.len(),
                total_failures_detected: self.total_failures_detected,
                tests_passed: error.is_none(),
            },
            fixes: self.fixes,
            error,
            iterations_used: self.iterations_used,
            max_retries: self.request.max_retries,
            ci_timeline: self.timeline,
            score: score(runtime_ms, self.commits),
        }
    }
}

/// Drives one healing run against a [`VersionControl`] collaborator.
pub struct RetryCoordinator {
    vcs: Arc<dyn VersionControl>,
    detector: Detector,
    fix_engine: FixEngine,
    results_path: Option<PathBuf>,
    cleanup: bool,
}

impl RetryCoordinator {
    /// Coordinator scanning `.py` files with the deterministic rules only.
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self {
            vcs,
            detector: Detector::new(vec!["py".to_string()]),
            fix_engine: FixEngine::new(),
            results_path: None,
            cleanup: false,
        }
    }

    pub fn with_detector(mut self, detector: Detector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_fix_engine(mut self, fix_engine: FixEngine) -> Self {
        self.fix_engine = fix_engine;
        self
    }

    /// Persist every terminal result to `path` (plus its digest sidecar).
    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = Some(path.into());
        self
    }

    /// Remove the working tree once the run is over.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Run with a freshly generated run id.
    pub async fn run(&self, request: RunRequest, observer: &dyn StatusObserver) -> RunResult {
        self.run_with_id(new_run_id(), request, observer).await
    }

    /// Run under a caller-provided id, e.g. one issued by a
    /// [`RunRegistry`](crate::registry::RunRegistry).
    pub async fn run_with_id(
        &self,
        run_id: String,
        request: RunRequest,
        observer: &dyn StatusObserver,
    ) -> RunResult {
        let _span = RunSpan::enter(&run_id);
        let mut ledger = RunLedger::new(run_id, &request);
        observer.on_status(RunPhase::Running, None);

        let mut workdir: Option<PathBuf> = None;
        let (status, error) = match request.validate() {
            Err(e) => {
                debug!(error = %e, "request rejected");
                (RunStatus::Failed, Some(e.to_string()))
            }
            Ok(valid) => {
                obs::emit_run_started(
                    &ledger.run_id,
                    &valid.repo_url,
                    &ledger.branch,
                    valid.max_retries,
                );
                match self
                    .heal(&valid, &mut ledger, &mut workdir, observer)
                    .await
                {
                    Step::Passed => (RunStatus::Completed, None),
                    Step::Stop(reason) => (RunStatus::Failed, Some(reason)),
                    Step::Retry => (RunStatus::Failed, Some(EXHAUSTED_MESSAGE.to_string())),
                }
            }
        };

        let result = ledger.finish(status, error);
        if let Some(path) = &self.results_path {
            if let Err(e) = write_results(&result, path) {
                obs::emit_run_finalize_error(&result.run_id, &e);
            }
        }
        if self.cleanup {
            if let Some(dir) = &workdir {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    warn!(workdir = %dir.display(), error = %e, "failed to remove working tree");
                }
            }
        }

        obs::emit_run_finished(
            &result.run_id,
            (result.completed_at - result.started_at)
                .num_milliseconds()
                .max(0) as u64,
            result.iterations_used,
            result.score.final_score,
            result.passed(),
        );
        METRICS.inc_runs_finished();
        METRICS.flush();

        observer.on_status(result.status.into(), result.error.as_deref());
        result
    }

    /// Iterate until the tree passes, an iteration stops the run, or the
    /// retry budget is spent (reported as `Step::Retry`).
    async fn heal(
        &self,
        request: &RunRequest,
        ledger: &mut RunLedger,
        workdir: &mut Option<PathBuf>,
        observer: &dyn StatusObserver,
    ) -> Step {
        for iteration in 1..=request.max_retries {
            ledger.iterations_used = iteration;
            let timestamp = Utc::now();
            let progress = format!("Iteration {} of {}", iteration, request.max_retries);
            observer.on_status(RunPhase::Running, Some(&progress));

            let step = match self.iterate(iteration, request, ledger, workdir).await {
                Ok(step) => step,
                Err(e) => Step::Stop(e.to_string()),
            };
            // An iteration that errored before detection still gets its entry.
            ledger.record(iteration, TimelineStatus::Failed, timestamp);

            match step {
                Step::Retry => continue,
                terminal => return terminal,
            }
        }
        Step::Retry
    }

    async fn iterate(
        &self,
        iteration: u32,
        request: &RunRequest,
        ledger: &mut RunLedger,
        workdir: &mut Option<PathBuf>,
    ) -> Result<Step> {
        let timestamp = Utc::now();
        let root = match workdir.clone() {
            Some(root) => root,
            None => {
                let root = self
                    .vcs
                    .clone_and_checkout(&request.repo_url, &ledger.branch)
                    .await?;
                *workdir = Some(root.clone());
                root
            }
        };

        let failures = self.detector.detect(&root).await?;
        METRICS.add_failures_detected(failures.len() as u64);
        if iteration == 1 {
            ledger.total_failures_detected = Some(failures.len());
        }
        obs::emit_iteration(&ledger.run_id, iteration, failures.len(), failures.is_empty());

        if failures.is_empty() {
            ledger.record(iteration, TimelineStatus::Passed, timestamp);
            return Ok(Step::Passed);
        }
        ledger.record(iteration, TimelineStatus::Failed, timestamp);

        let applied = self.fix_engine.apply(&root, &failures).await?;
        METRICS.add_fixes_applied(applied.len() as u64);
        obs::emit_fixes_applied(&ledger.run_id, iteration, applied.len());
        if applied.is_empty() {
            return Ok(Step::Retry);
        }

        Ok(self.publish(iteration, &root, applied, ledger).await)
    }

    async fn publish(
        &self,
        iteration: u32,
        root: &Path,
        mut applied: Vec<Fix>,
        ledger: &mut RunLedger,
    ) -> Step {
        let outcome = self
            .vcs
            .commit_and_push(root, &applied, &ledger.branch)
            .await;
        for fix in &mut applied {
            fix.committed = outcome.committed;
            fix.pushed = outcome.pushed;
        }
        ledger.fixes.extend(applied);

        match outcome.error {
            Some(error) => Step::Stop(error),
            None => {
                ledger.commits += 1;
                METRICS.inc_commits();
                obs::emit_committed(&ledger.run_id, iteration, outcome.pushed);
                Step::Retry
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_ledger_records_one_entry_per_iteration() {
        let mut ledger = RunLedger::new(
            "run-1".to_string(),
            &RunRequest::new("https://example.com/r.git", "t", "l", 3),
        );
        let now = Utc::now();
        ledger.record(1, TimelineStatus::Failed, now);
        ledger.record(1, TimelineStatus::Failed, now);
        ledger.record(2, TimelineStatus::Passed, now);
        ledger.record(2, TimelineStatus::Failed, now);
        let statuses: Vec<TimelineStatus> = ledger.timeline.iter().map(|e| e.status).collect();
        assert_eq!(statuses, vec![TimelineStatus::Failed, TimelineStatus::Passed]);
    }

    #[test]
    fn test_ledger_blank_team_has_empty_branch() {
        let ledger = RunLedger::new(
            "run-1".to_string(),
            &RunRequest::new("https://example.com/r.git", " ", "l", 3),
        );
        assert_eq!(ledger.branch, "");
    }

    #[test]
    fn test_closure_observer() {
        let seen: Mutex<Vec<RunPhase>> = Mutex::new(Vec::new());
        let observer = |phase: RunPhase, _message: Option<&str>| {
            seen.lock().expect("lock").push(phase);
        };
        observer.on_status(RunPhase::Running, None);
        observer.on_status(RunPhase::Completed, None);
        assert_eq!(
            *seen.lock().expect("lock"),
            vec![RunPhase::Running, RunPhase::Completed]
        );
    }
}
