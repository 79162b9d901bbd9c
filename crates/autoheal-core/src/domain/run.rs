//! Run request, timeline and terminal result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{HealError, Result};
use super::fix::Fix;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Lifecycle phase reported to observers and the run registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

impl From<RunStatus> for RunPhase {
    fn from(status: RunStatus) -> Self {
        match status {
            RunStatus::Completed => RunPhase::Completed,
            RunStatus::Failed => RunPhase::Failed,
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::Running => "running",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one iteration in the CI timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimelineStatus {
    Passed,
    Failed,
}

/// One completed iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CiTimelineEntry {
    pub iteration: u32,
    pub status: TimelineStatus,
    pub timestamp: DateTime<Utc>,
}

/// Score breakdown. `final_score = base_score + speed_bonus - efficiency_penalty`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub base_score: i64,
    pub speed_bonus: i64,
    pub efficiency_penalty: i64,
    pub final_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_fixes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_failures_detected: Option<usize>,
    pub tests_passed: bool,
}

/// Aggregate root for one healing run, persisted once at its terminal state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub status: RunStatus,
    pub branch: String,
    pub repo_url: String,
    pub team: String,
    pub leader: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub fixes: Vec<Fix>,
    pub summary: RunSummary,
    pub error: Option<String>,
    pub iterations_used: u32,
    pub max_retries: u32,
    pub ci_timeline: Vec<CiTimelineEntry>,
    pub score: Score,
}

impl RunResult {
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Input to a healing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub repo_url: String,
    pub team: String,
    pub leader: String,
    pub max_retries: u32,
}

impl RunRequest {
    pub fn new(
        repo_url: impl Into<String>,
        team: impl Into<String>,
        leader: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            team: team.into(),
            leader: leader.into(),
            max_retries,
        }
    }

    /// Check required fields and return a trimmed copy.
    pub fn validate(&self) -> Result<RunRequest> {
        let repo_url = self.repo_url.trim();
        if repo_url.is_empty() {
            return Err(HealError::Validation("repoUrl is required".to_string()));
        }
        let team = self.team.trim();
        if team.is_empty() {
            return Err(HealError::Validation("teamName is required".to_string()));
        }
        let leader = self.leader.trim();
        if leader.is_empty() {
            return Err(HealError::Validation("leaderName is required".to_string()));
        }
        if self.max_retries == 0 {
            return Err(HealError::Validation(
                "maxRetries must be at least 1".to_string(),
            ));
        }
        Ok(RunRequest::new(repo_url, team, leader, self.max_retries))
    }

    /// Branch derived from the team and leader identifiers.
    pub fn branch_name(&self) -> String {
        branch_name(&self.team, &self.leader)
    }
}

/// Fresh run identifier of the form `run-<uuid>`.
pub fn new_run_id() -> String {
    format!("run-{}", uuid::Uuid::new_v4())
}

/// `TEAM_LEADER_AI_Fix`: trimmed, whitespace runs collapsed to `_`, uppercased.
pub fn branch_name(team: &str, leader: &str) -> String {
    format!("{}_{}_AI_Fix", branch_segment(team), branch_segment(leader))
}

fn branch_segment(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_name_collapses_whitespace() {
        assert_eq!(
            branch_name("  team  ets ", "Deepak\tMaseeh"),
            "TEAM_ETS_DEEPAK_MASEEH_AI_Fix"
        );
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let err = RunRequest::new("  ", "team", "lead", 5)
            .validate()
            .expect_err("blank url");
        assert_eq!(err.to_string(), "repoUrl is required");

        let err = RunRequest::new("https://example.com/r.git", "", "lead", 5)
            .validate()
            .expect_err("blank team");
        assert_eq!(err.to_string(), "teamName is required");

        let err = RunRequest::new("https://example.com/r.git", "team", " ", 5)
            .validate()
            .expect_err("blank leader");
        assert_eq!(err.to_string(), "leaderName is required");
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let err = RunRequest::new("https://example.com/r.git", "t", "l", 0)
            .validate()
            .expect_err("zero retries");
        assert!(matches!(err, HealError::Validation(_)));
    }

    #[test]
    fn test_validate_trims() {
        let req = RunRequest::new(" https://example.com/r.git ", " t ", " l ", 2)
            .validate()
            .expect("valid");
        assert_eq!(req.repo_url, "https://example.com/r.git");
        assert_eq!(req.team, "t");
        assert_eq!(req.leader, "l");
    }

    #[test]
    fn test_run_ids_are_unique() {
        let a = new_run_id();
        let b = new_run_id();
        assert!(a.starts_with("run-"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_timeline_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&TimelineStatus::Passed).expect("serialize"),
            "\"PASSED\""
        );
        assert_eq!(
            serde_json::to_string(&RunStatus::Completed).expect("serialize"),
            "\"completed\""
        );
    }

    #[test]
    fn test_summary_omits_missing_detection_count() {
        let summary = RunSummary {
            total_fixes: 0,
            total_failures_detected: None,
            tests_passed: false,
        };
        let value = serde_json::to_value(&summary).expect("serialize");
        assert!(value.get("totalFailuresDetected").is_none());
        assert_eq!(value["testsPassed"], false);
    }
}
