//! Detected defect types.

use serde::{Deserialize, Serialize};

/// Closed category of defect.
///
/// The first four variants are produced by the lexical rules. `Logic` and
/// `TypeError` only ever come from the suggestion collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BugType {
    Linting,
    Syntax,
    Import,
    Indentation,
    Logic,
    TypeError,
}

impl BugType {
    /// Wire name, e.g. `LINTING`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BugType::Linting => "LINTING",
            BugType::Syntax => "SYNTAX",
            BugType::Import => "IMPORT",
            BugType::Indentation => "INDENTATION",
            BugType::Logic => "LOGIC",
            BugType::TypeError => "TYPE_ERROR",
        }
    }

    /// Parse a wire name case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LINTING" => Some(BugType::Linting),
            "SYNTAX" => Some(BugType::Syntax),
            "IMPORT" => Some(BugType::Import),
            "INDENTATION" => Some(BugType::Indentation),
            "LOGIC" => Some(BugType::Logic),
            "TYPE_ERROR" | "TYPEERROR" => Some(BugType::TypeError),
            _ => None,
        }
    }
}

impl std::fmt::Display for BugType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected defect at a specific file and 1-based line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    /// Path relative to the working tree root, `/`-separated.
    pub file: String,

    /// Line number (1-indexed) in the content as it was detected.
    pub line: usize,

    pub bug_type: BugType,

    pub message: String,
}

impl Failure {
    pub fn new(
        file: impl Into<String>,
        line: usize,
        bug_type: BugType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            bug_type,
            message: message.into(),
        }
    }

    /// Dedupe key used to give lexical rules precedence over suggestions.
    pub fn location(&self) -> (&str, usize) {
        (self.file.as_str(), self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bug_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&BugType::Linting).expect("serialize"),
            "\"LINTING\""
        );
        assert_eq!(
            serde_json::to_string(&BugType::TypeError).expect("serialize"),
            "\"TYPE_ERROR\""
        );
    }

    #[test]
    fn test_bug_type_parse_is_case_insensitive() {
        assert_eq!(BugType::parse("syntax"), Some(BugType::Syntax));
        assert_eq!(BugType::parse(" Indentation "), Some(BugType::Indentation));
        assert_eq!(BugType::parse("TypeError"), Some(BugType::TypeError));
        assert_eq!(BugType::parse("style"), None);
    }

    #[test]
    fn test_failure_serializes_camel_case() {
        let failure = Failure::new("app/main.py", 3, BugType::Syntax, "Missing colon at end of line");
        let value = serde_json::to_value(&failure).expect("serialize");
        assert_eq!(value["bugType"], "SYNTAX");
        assert_eq!(value["line"], 3);
        assert_eq!(value["file"], "app/main.py");
    }
}
