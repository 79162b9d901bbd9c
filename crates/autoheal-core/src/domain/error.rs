//! Domain-level error taxonomy for autoheal.

/// Autoheal domain errors.
///
/// Only validation, acquisition and git failures are fatal to a run; the
/// coordinator turns every variant into a terminal `Failed` result rather than
/// propagating it to the caller.
#[derive(Debug, thiserror::Error)]
pub enum HealError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to acquire working tree: {0}")]
    Acquisition(String),

    #[error("git error: {0}")]
    Git(String),

    #[error("a run is already in progress: {0}")]
    RunInProgress(String),

    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for autoheal domain operations.
pub type Result<T> = std::result::Result<T, HealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_displays_bare_message() {
        let err = HealError::Validation("repoUrl is required".to_string());
        assert_eq!(err.to_string(), "repoUrl is required");
    }

    #[test]
    fn test_acquisition_error_display() {
        let err = HealError::Acquisition("git clone exited with 128".to_string());
        let msg = err.to_string();
        assert!(msg.contains("failed to acquire working tree"));
        assert!(msg.contains("128"));
    }

    #[test]
    fn test_digest_mismatch_error() {
        let err = HealError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
