//! Gemini-backed [`SuggestionService`](autoheal_core::SuggestionService).
//!
//! Enabled only when `GEMINI_API_KEY` is set. Every call absorbs its own
//! errors: failed requests yield no suggestions and no description.

pub mod client;
pub mod config;
pub mod error;
pub mod prompt;

pub use client::GeminiClient;
pub use config::GeminiConfig;
pub use error::{GeminiError, Result};
pub use prompt::{fix_description_prompt, parse_failures, suggest_failures_prompt};
