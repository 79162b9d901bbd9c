//! Autoheal Core Library
//!
//! Detects lexical defects in a working tree, applies deterministic fixes,
//! publishes them through git and repeats until the tree is clean or the retry
//! budget is spent.

pub mod config;
pub mod coordinator;
pub mod detector;
pub mod domain;
pub mod fakes;
pub mod fix_engine;
pub mod metrics;
pub mod obs;
pub mod registry;
pub mod results;
pub mod score;
pub mod suggest;
pub mod telemetry;
pub mod vcs;

pub use config::{GitConfig, HealConfig};
pub use coordinator::{NoopObserver, RetryCoordinator, StatusObserver, EXHAUSTED_MESSAGE};
pub use detector::{collect_sources, detect_source, Detector, SourceFile};
pub use domain::{
    branch_name, new_run_id, BugType, CiTimelineEntry, Failure, Fix, FixStatus, HealError,
    Result, RunPhase, RunRequest, RunResult, RunStatus, RunSummary, Score, TimelineStatus,
};
pub use fix_engine::{apply_fixes, FixEngine};
pub use registry::{RunRegistry, RunStatusView};
pub use results::{read_results, write_results};
pub use score::score;
pub use suggest::{FixContext, SuggestionService};
pub use vcs::{CommitOutcome, GitCli, VersionControl};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
