//! Applied fix records.

use serde::{Deserialize, Serialize};

use super::failure::{BugType, Failure};

/// Status of an applied fix. Only applied edits are ever recorded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    Fixed,
}

/// A concrete edit applied in response to one [`Failure`].
///
/// `committed` and `pushed` are tracked separately so a caller can decide
/// whether a fix that was committed locally but never reached the remote
/// should be displayed as fixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub file: String,
    pub line: usize,
    pub bug_type: BugType,
    pub fix_description: String,
    pub status: FixStatus,
    #[serde(default)]
    pub committed: bool,
    #[serde(default)]
    pub pushed: bool,
}

impl Fix {
    /// Record a fix for `failure` with a static description.
    pub fn applied(failure: &Failure, description: impl Into<String>) -> Self {
        Self {
            file: failure.file.clone(),
            line: failure.line,
            bug_type: failure.bug_type,
            fix_description: description.into(),
            status: FixStatus::Fixed,
            committed: false,
            pushed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_copies_location() {
        let failure = Failure::new("pkg/util.py", 7, BugType::Import, "Unused import: sys");
        let fix = Fix::applied(&failure, "Removed unused import: sys");
        assert_eq!(fix.file, "pkg/util.py");
        assert_eq!(fix.line, 7);
        assert_eq!(fix.bug_type, BugType::Import);
        assert_eq!(fix.status, FixStatus::Fixed);
        assert!(!fix.committed);
        assert!(!fix.pushed);
    }

    #[test]
    fn test_fix_wire_shape() {
        let failure = Failure::new("a.py", 1, BugType::Linting, "Unused import: os");
        let value = serde_json::to_value(Fix::applied(&failure, "Removed unused import line"))
            .expect("serialize");
        assert_eq!(value["status"], "fixed");
        assert_eq!(value["fixDescription"], "Removed unused import line");
        assert_eq!(value["bugType"], "LINTING");
    }
}
