//! Error types for the Gemini client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeminiError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status from the API
    #[error("Gemini API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response had no candidate text
    #[error("Gemini response contained no text")]
    EmptyResponse,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        GeminiError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeminiError>;
