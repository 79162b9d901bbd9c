//! HTTP client for the `generateContent` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use autoheal_core::{Failure, FixContext, SuggestionService};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use crate::error::{GeminiError, Result};
use crate::prompt::{fix_description_prompt, parse_failures, suggest_failures_prompt};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Trimmed text of the first part of the first candidate.
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .map(|t| t.trim().to_string())
    }
}

pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("autoheal-gemini/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(GeminiClient {
            config,
            http_client,
        })
    }

    /// Client configured from the environment; `None` when disabled.
    pub fn from_env() -> Option<Self> {
        let config = GeminiConfig::from_env()?;
        match Self::new(config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "gemini client unavailable");
                None
            }
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Send one prompt and return the reply text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http_client
            .post(self.config.endpoint())
            .header("x-goog-api-key", self.config.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;
        parsed
            .first_text()
            .filter(|t| !t.is_empty())
            .ok_or(GeminiError::EmptyResponse)
    }
}

#[async_trait]
impl SuggestionService for GeminiClient {
    async fn suggest_failures(&self, file: &str, content: &str) -> Vec<Failure> {
        let prompt = suggest_failures_prompt(file, content, self.config.max_content_chars);
        match self.generate(&prompt).await {
            Ok(reply) => {
                let failures = parse_failures(file, &reply);
                debug!(file = %file, suggested = failures.len(), "gemini suggestions");
                failures
            }
            Err(e) => {
                warn!(file = %file, error = %e, "gemini suggestion failed");
                Vec::new()
            }
        }
    }

    async fn fix_description(&self, context: &FixContext) -> Option<String> {
        match self.generate(&fix_description_prompt(context)).await {
            Ok(reply) => Some(reply),
            Err(e) => {
                debug!(
                    file = %context.file,
                    line = context.line,
                    error = %e,
                    "gemini description failed"
                );
                None
            }
        }
    }
}
