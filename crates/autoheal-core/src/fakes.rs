//! In-memory fakes for the collaborator traits (testing only).
//!
//! `FakeVcs` hands out a pre-populated directory instead of cloning and
//! records every publish call; `FakeSuggestions` returns canned failures and
//! descriptions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::config::DEFAULT_COMMIT_PREFIX;
use crate::domain::{Failure, Fix, HealError, Result};
use crate::suggest::{FixContext, SuggestionService};
use crate::vcs::{commit_message, CommitOutcome, VersionControl};

// ---------------------------------------------------------------------------
// FakeVcs
// ---------------------------------------------------------------------------

/// One recorded `commit_and_push` call.
#[derive(Debug, Clone)]
pub struct CommitCall {
    pub workdir: PathBuf,
    pub branch: String,
    pub message: String,
    pub fixes: Vec<Fix>,
}

#[derive(Debug)]
pub struct FakeVcs {
    workdir: PathBuf,
    clone_error: Option<String>,
    push_error: Option<String>,
    clones: Mutex<Vec<(String, String)>>,
    commits: Mutex<Vec<CommitCall>>,
}

impl FakeVcs {
    /// "Clone" by handing out `workdir` as-is.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            clone_error: None,
            push_error: None,
            clones: Mutex::new(Vec::new()),
            commits: Mutex::new(Vec::new()),
        }
    }

    /// Every clone fails with `error`.
    pub fn failing_clone(mut self, error: &str) -> Self {
        self.clone_error = Some(error.to_string());
        self
    }

    /// Commits succeed locally but every push fails with `error`.
    pub fn failing_push(mut self, error: &str) -> Self {
        self.push_error = Some(error.to_string());
        self
    }

    /// `(repo_url, branch)` of every clone request.
    pub fn clones(&self) -> Vec<(String, String)> {
        self.clones.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<CommitCall> {
        self.commits.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionControl for FakeVcs {
    async fn clone_and_checkout(&self, repo_url: &str, branch: &str) -> Result<PathBuf> {
        self.clones
            .lock()
            .unwrap()
            .push((repo_url.to_string(), branch.to_string()));
        match &self.clone_error {
            Some(error) => Err(HealError::Acquisition(error.clone())),
            None => Ok(self.workdir.clone()),
        }
    }

    async fn commit_and_push(&self, workdir: &Path, fixes: &[Fix], branch: &str) -> CommitOutcome {
        self.commits.lock().unwrap().push(CommitCall {
            workdir: workdir.to_path_buf(),
            branch: branch.to_string(),
            message: commit_message(DEFAULT_COMMIT_PREFIX, fixes),
            fixes: fixes.to_vec(),
        });
        match &self.push_error {
            Some(error) => CommitOutcome::failed(true, error.clone()),
            None => CommitOutcome::success(),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeSuggestions
// ---------------------------------------------------------------------------

/// Canned suggestion service keyed by file path.
#[derive(Debug, Default)]
pub struct FakeSuggestions {
    failures: HashMap<String, Vec<Failure>>,
    description: Option<String>,
    contexts: Mutex<Vec<FixContext>>,
}

impl FakeSuggestions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suggest `failure` whenever `failure.file` is scanned.
    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failures
            .entry(failure.file.clone())
            .or_default()
            .push(failure);
        self
    }

    /// Answer every description request with `description`.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Contexts received by `fix_description`, in call order.
    pub fn contexts(&self) -> Vec<FixContext> {
        self.contexts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SuggestionService for FakeSuggestions {
    async fn suggest_failures(&self, file: &str, _content: &str) -> Vec<Failure> {
        self.failures.get(file).cloned().unwrap_or_default()
    }

    async fn fix_description(&self, context: &FixContext) -> Option<String> {
        self.contexts.lock().unwrap().push(context.clone());
        self.description.clone()
    }
}
