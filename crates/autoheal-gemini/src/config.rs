//! Gemini client configuration.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// File content beyond this many characters is not sent.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 12_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub max_content_chars: usize,
}

impl GeminiConfig {
    pub fn new(api_key: &str) -> Self {
        GeminiConfig {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }

    /// `None` unless `GEMINI_API_KEY` holds a non-blank value.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty())?;
        let mut config = GeminiConfig::new(&api_key);
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(url) = lookup("GEMINI_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("GEMINI_TIMEOUT_SECS").and_then(|s| s.trim().parse().ok()) {
            config.timeout_secs = secs;
        }
        Some(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// `<base>/models/<model>:generateContent`
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}
