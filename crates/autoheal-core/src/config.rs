//! Environment-driven configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RESULTS_PATH: &str = "output/results.json";
pub const DEFAULT_EXTENSIONS: &str = "py";
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_COMMIT_PREFIX: &str = "[AI-AGENT]";
pub const DEFAULT_AUTHOR_NAME: &str = "autoheal";
pub const DEFAULT_AUTHOR_EMAIL: &str = "autoheal@users.noreply.github.com";

/// Settings for the git collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitConfig {
    /// Token used to authenticate `https://github.com/` remotes.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Upper bound for each git invocation. 0 disables the timeout.
    pub timeout_secs: u64,
    pub author_name: String,
    pub author_email: String,
    pub commit_prefix: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            token: None,
            timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
            author_name: DEFAULT_AUTHOR_NAME.to_string(),
            author_email: DEFAULT_AUTHOR_EMAIL.to_string(),
            commit_prefix: DEFAULT_COMMIT_PREFIX.to_string(),
        }
    }
}

impl GitConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = GitConfig::default();
        GitConfig {
            token: non_empty(lookup("GITHUB_TOKEN")).or_else(|| non_empty(lookup("GH_TOKEN"))),
            timeout_secs: lookup("AUTOHEAL_GIT_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
            author_name: non_empty(lookup("AUTOHEAL_GIT_AUTHOR_NAME"))
                .unwrap_or(defaults.author_name),
            author_email: non_empty(lookup("AUTOHEAL_GIT_AUTHOR_EMAIL"))
                .unwrap_or(defaults.author_email),
            commit_prefix: defaults.commit_prefix,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

/// Top-level settings for a healing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealConfig {
    pub max_retries: u32,
    pub results_path: PathBuf,
    /// Source extensions to scan, without the leading dot. Empty scans all.
    pub extensions: Vec<String>,
    pub git: GitConfig,
}

impl Default for HealConfig {
    fn default() -> Self {
        HealConfig {
            max_retries: DEFAULT_MAX_RETRIES,
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
            extensions: parse_extensions(DEFAULT_EXTENSIONS),
            git: GitConfig::default(),
        }
    }
}

impl HealConfig {
    /// Read `MAX_RETRIES`, `AUTOHEAL_RESULTS_PATH`, `AUTOHEAL_EXTENSIONS` and
    /// the git settings, falling back to defaults for unset or invalid values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = HealConfig::default();
        HealConfig {
            max_retries: lookup("MAX_RETRIES")
                .and_then(|v| v.trim().parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.max_retries),
            results_path: non_empty(lookup("AUTOHEAL_RESULTS_PATH"))
                .map(PathBuf::from)
                .unwrap_or(defaults.results_path),
            extensions: lookup("AUTOHEAL_EXTENSIONS")
                .map(|v| parse_extensions(&v))
                .unwrap_or(defaults.extensions),
            git: GitConfig::from_lookup(&lookup),
        }
    }
}

/// Split a comma separated list like `py, .pyi` into bare extensions.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
