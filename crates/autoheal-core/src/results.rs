//! Persisted run result with digest verification.
//!
//! The latest [`RunResult`] is written as pretty JSON, overwriting any earlier
//! one, next to a `.digest` sidecar holding the SHA-256 of the JSON bytes.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::domain::{HealError, Result, RunResult};

/// Hex SHA-256 of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Sidecar path for an artifact: `results.json` → `results.digest`.
pub fn digest_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("digest")
}

/// Write `result` to `path` and its digest beside it.
pub fn write_results(result: &RunResult, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(result)?;
    let digest = content_digest(&json);

    std::fs::write(path, &json)?;
    std::fs::write(digest_path(path), digest.as_bytes())?;

    Ok(path.to_path_buf())
}

/// Read and verify the artifact at `path`. `Ok(None)` when nothing has been
/// written yet.
pub fn read_results(path: &Path) -> Result<Option<RunResult>> {
    let json = match std::fs::read(path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let expected = std::fs::read_to_string(digest_path(path))?;
    let actual = content_digest(&json);
    if expected.trim() != actual {
        return Err(HealError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }

    Ok(Some(serde_json::from_slice(&json)?))
}
