//! Version control collaborator.
//!
//! The coordinator only needs two operations from git: acquire a fresh working
//! tree on the run branch, and publish the fixes of one iteration. [`GitCli`]
//! implements both by shelling out to the `git` binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::GitConfig;
use crate::domain::{Fix, HealError, Result};

/// What happened when publishing one iteration's fixes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitOutcome {
    /// A commit exists locally for these fixes (or there was nothing to commit).
    pub committed: bool,
    /// The branch reached the remote.
    pub pushed: bool,
    pub error: Option<String>,
}

impl CommitOutcome {
    pub fn success() -> Self {
        Self {
            committed: true,
            pushed: true,
            error: None,
        }
    }

    pub fn failed(committed: bool, error: impl Into<String>) -> Self {
        Self {
            committed,
            pushed: false,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `repo_url` into a fresh directory and check out a new `branch`.
    async fn clone_and_checkout(&self, repo_url: &str, branch: &str) -> Result<PathBuf>;

    /// Stage everything under `workdir`, commit and push to `branch`.
    /// Succeeds without committing when the tree is clean.
    async fn commit_and_push(&self, workdir: &Path, fixes: &[Fix], branch: &str)
        -> CommitOutcome;
}

/// Commit subject for a batch of fixes, named after the first one.
pub fn commit_message(prefix: &str, fixes: &[Fix]) -> String {
    match fixes.first() {
        Some(fix) => format!("{} Fix {} in {}", prefix, fix.bug_type, fix.file),
        None => format!("{} Fix applied", prefix),
    }
}

/// Embed `token` into GitHub https URLs. Other URLs are returned unchanged.
pub fn authenticated_url(repo_url: &str, token: Option<&str>) -> String {
    match (token, repo_url.strip_prefix("https://github.com/")) {
        (Some(token), Some(rest)) if !token.is_empty() => {
            format!("https://x-access-token:{}@github.com/{}", token, rest)
        }
        _ => repo_url.to_string(),
    }
}

/// Strip credentials from text that may echo an authenticated URL.
fn redact(text: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => text.replace(token, "***"),
        _ => text.to_string(),
    }
}

/// Output of one git invocation.
#[derive(Debug)]
struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

/// [`VersionControl`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    config: GitConfig,
    clone_root: PathBuf,
}

impl GitCli {
    pub fn new(config: GitConfig) -> Self {
        Self {
            config,
            clone_root: std::env::temp_dir(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(GitConfig::from_env())
    }

    /// Create run directories under `root` instead of the system temp dir.
    pub fn with_clone_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.clone_root = root.into();
        self
    }

    pub fn config(&self) -> &GitConfig {
        &self.config
    }

    async fn git(&self, dir: Option<&Path>, args: &[&str]) -> Result<GitOutput> {
        let mut command = Command::new("git");
        command
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let subcommand = args
            .iter()
            .find(|a| !a.starts_with('-') && !a.contains('='))
            .copied()
            .unwrap_or("git");
        let child = command
            .spawn()
            .map_err(|e| HealError::Git(format!("failed to run git: {e}")))?;

        let output = if self.config.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(self.config.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| {
                HealError::Git(format!(
                    "git {} timed out after {} seconds",
                    subcommand, self.config.timeout_secs
                ))
            })??
        } else {
            child.wait_with_output().await?
        };

        let token = self.config.token.as_deref();
        Ok(GitOutput {
            success: output.status.success(),
            stdout: redact(&String::from_utf8_lossy(&output.stdout), token),
            stderr: redact(&String::from_utf8_lossy(&output.stderr), token),
        })
    }

    /// Run git and turn a non-zero exit into [`HealError::Git`].
    async fn git_checked(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let output = self.git(dir, args).await?;
        if !output.success {
            let subcommand = args.first().copied().unwrap_or("git");
            return Err(HealError::Git(format!(
                "git {} failed: {}",
                subcommand,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    async fn commit(&self, workdir: &Path, message: &str) -> Result<()> {
        let name = format!("user.name={}", self.config.author_name);
        let email = format!("user.email={}", self.config.author_email);
        let output = self
            .git(
                Some(workdir),
                &["-c", &name, "-c", &email, "commit", "-m", message],
            )
            .await?;
        if !output.success {
            return Err(HealError::Git(format!(
                "git commit failed: {}",
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn clone_and_checkout(&self, repo_url: &str, branch: &str) -> Result<PathBuf> {
        let target = self
            .clone_root
            .join(format!("autoheal-run-{}", uuid::Uuid::new_v4()));
        let url = authenticated_url(repo_url, self.config.token.as_deref());
        let target_arg = target.to_string_lossy().to_string();

        info!(repo_url = %repo_url, branch = %branch, "cloning repository");
        self.git_checked(None, &["clone", "--depth", "1", &url, &target_arg])
            .await
            .map_err(|e| HealError::Acquisition(e.to_string()))?;
        self.git_checked(Some(&target), &["checkout", "-b", branch])
            .await
            .map_err(|e| HealError::Acquisition(e.to_string()))?;

        debug!(workdir = %target.display(), "working tree ready");
        Ok(target)
    }

    async fn commit_and_push(
        &self,
        workdir: &Path,
        fixes: &[Fix],
        branch: &str,
    ) -> CommitOutcome {
        if let Err(e) = self.git_checked(Some(workdir), &["add", "-A"]).await {
            return CommitOutcome::failed(false, e.to_string());
        }
        let status = match self
            .git_checked(Some(workdir), &["status", "--porcelain"])
            .await
        {
            Ok(status) => status,
            Err(e) => return CommitOutcome::failed(false, e.to_string()),
        };
        if status.trim().is_empty() {
            debug!("working tree clean, nothing to commit");
            return CommitOutcome::success();
        }

        let message = commit_message(&self.config.commit_prefix, fixes);
        if let Err(e) = self.commit(workdir, &message).await {
            return CommitOutcome::failed(false, e.to_string());
        }

        match self
            .git_checked(Some(workdir), &["push", "-u", "origin", branch])
            .await
        {
            Ok(_) => {
                info!(branch = %branch, message = %message, "pushed fixes");
                CommitOutcome::success()
            }
            Err(e) => {
                warn!(branch = %branch, error = %e, "push failed after local commit");
                CommitOutcome::failed(true, e.to_string())
            }
        }
    }
}
