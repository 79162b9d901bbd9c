//! Single-flight run registry.
//!
//! Tracks the status of runs by id and allows at most one active run at a
//! time. The latest run's status is what a status query reports; before any
//! run has started the registry reports `idle`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coordinator::StatusObserver;
use crate::domain::{new_run_id, HealError, Result, RunPhase};

/// Status snapshot of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusView {
    pub status: RunPhase,
    pub run_id: Option<String>,
    pub message: Option<String>,
}

impl RunStatusView {
    pub fn idle() -> Self {
        Self {
            status: RunPhase::Idle,
            run_id: None,
            message: None,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    runs: HashMap<String, RunStatusView>,
    active: Option<String>,
    latest: Option<String>,
}

#[derive(Debug, Default)]
pub struct RunRegistry {
    state: Mutex<RegistryState>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserve a new run id and mark it running.
    ///
    /// Fails with [`HealError::RunInProgress`] while another run is active.
    pub fn begin(&self) -> Result<String> {
        let mut state = self.lock();
        if let Some(active) = &state.active {
            return Err(HealError::RunInProgress(active.clone()));
        }
        let run_id = new_run_id();
        state.runs.insert(
            run_id.clone(),
            RunStatusView {
                status: RunPhase::Running,
                run_id: Some(run_id.clone()),
                message: None,
            },
        );
        state.active = Some(run_id.clone());
        state.latest = Some(run_id.clone());
        debug!(run_id = %run_id, "run registered");
        Ok(run_id)
    }

    /// Record a phase change. A terminal phase releases the active slot.
    pub fn update(&self, run_id: &str, phase: RunPhase, message: Option<&str>) -> Result<()> {
        let mut state = self.lock();
        let view = state
            .runs
            .get_mut(run_id)
            .ok_or_else(|| HealError::RunNotFound(run_id.to_string()))?;
        view.status = phase;
        view.message = message.map(str::to_string);
        if phase.is_terminal() && state.active.as_deref() == Some(run_id) {
            state.active = None;
        }
        Ok(())
    }

    /// Status of the most recent run, or `idle`.
    pub fn status(&self) -> RunStatusView {
        let state = self.lock();
        state
            .latest
            .as_ref()
            .and_then(|id| state.runs.get(id))
            .cloned()
            .unwrap_or_else(RunStatusView::idle)
    }

    pub fn get(&self, run_id: &str) -> Option<RunStatusView> {
        self.lock().runs.get(run_id).cloned()
    }

    pub fn active(&self) -> Option<String> {
        self.lock().active.clone()
    }

    /// Observer forwarding coordinator updates for `run_id` into this registry.
    pub fn observer(&self, run_id: impl Into<String>) -> RegistryObserver<'_> {
        RegistryObserver {
            registry: self,
            run_id: run_id.into(),
        }
    }
}

pub struct RegistryObserver<'a> {
    registry: &'a RunRegistry,
    run_id: String,
}

impl StatusObserver for RegistryObserver<'_> {
    fn on_status(&self, phase: RunPhase, message: Option<&str>) {
        if let Err(e) = self.registry.update(&self.run_id, phase, message) {
            debug!(run_id = %self.run_id, error = %e, "dropping status update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_before_any_run() {
        let registry = RunRegistry::new();
        assert_eq!(registry.status(), RunStatusView::idle());
        assert!(registry.active().is_none());
    }

    #[test]
    fn test_second_begin_rejected_while_running() {
        let registry = RunRegistry::new();
        let first = registry.begin().expect("first run");
        let err = registry.begin().expect_err("second run");
        assert!(matches!(err, HealError::RunInProgress(ref id) if *id == first));
    }

    #[test]
    fn test_terminal_update_releases_slot() {
        let registry = RunRegistry::new();
        let first = registry.begin().expect("first run");
        registry
            .update(&first, RunPhase::Failed, Some("Max retries reached without passing"))
            .expect("update");

        let status = registry.status();
        assert_eq!(status.status, RunPhase::Failed);
        assert_eq!(status.run_id.as_deref(), Some(first.as_str()));
        assert_eq!(
            status.message.as_deref(),
            Some("Max retries reached without passing")
        );

        let second = registry.begin().expect("second run");
        assert_ne!(first, second);
        assert_eq!(registry.status().run_id.as_deref(), Some(second.as_str()));
        assert_eq!(
            registry.get(&first).map(|v| v.status),
            Some(RunPhase::Failed)
        );
    }

    #[test]
    fn test_update_unknown_run() {
        let registry = RunRegistry::new();
        let err = registry
            .update("run-missing", RunPhase::Running, None)
            .expect_err("unknown");
        assert!(matches!(err, HealError::RunNotFound(_)));
    }

    #[test]
    fn test_observer_forwards_updates() {
        let registry = RunRegistry::new();
        let run_id = registry.begin().expect("begin");
        let observer = registry.observer(run_id.clone());
        observer.on_status(RunPhase::Running, Some("Iteration 1 of 5"));
        assert_eq!(
            registry.status().message.as_deref(),
            Some("Iteration 1 of 5")
        );
        observer.on_status(RunPhase::Completed, None);
        assert!(registry.active().is_none());
        assert_eq!(registry.status().status, RunPhase::Completed);
    }

    #[test]
    fn test_status_wire_shape() {
        let value = serde_json::to_value(RunStatusView::idle()).expect("serialize");
        assert_eq!(value["status"], "idle");
        assert!(value["runId"].is_null());
    }
}
