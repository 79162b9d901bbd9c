//! Domain models for autoheal.
//!
//! Canonical definitions for the core entities:
//! - `Failure`: a defect detected at a file and line
//! - `Fix`: an edit applied in response to a failure
//! - `RunResult`: the scored, auditable outcome of one healing run

pub mod error;
pub mod failure;
pub mod fix;
pub mod run;

pub use error::{HealError, Result};
pub use failure::{BugType, Failure};
pub use fix::{Fix, FixStatus};
pub use run::{
    branch_name, new_run_id, CiTimelineEntry, RunPhase, RunRequest, RunResult, RunStatus,
    RunSummary, Score, TimelineStatus,
};
