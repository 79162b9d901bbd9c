//! Optional suggestion collaborator.
//!
//! A remote text-suggestion service may augment detection with extra failures
//! and replace static fix descriptions with richer ones. It is never required
//! for correctness: implementations absorb their own errors and timeouts and
//! report them as an empty result.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BugType, Failure};

/// Context handed to the collaborator when asking for a fix description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FixContext {
    pub file: String,
    pub line: usize,
    pub bug_type: BugType,
    /// The offending line as it read before the fix.
    pub snippet: String,
}

#[async_trait]
pub trait SuggestionService: Send + Sync {
    /// Further failures for one file. Empty on error.
    async fn suggest_failures(&self, file: &str, content: &str) -> Vec<Failure>;

    /// A one-sentence description of an applied fix. `None` on error.
    async fn fix_description(&self, context: &FixContext) -> Option<String>;
}
