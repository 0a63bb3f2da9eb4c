//! Speech provider configuration.

use std::time::Duration;

/// Character limit of the primary provider.
pub const PRIMARY_CHAR_LIMIT: usize = 4000;

/// Speech provider configuration.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Base URL of the Google Translate TTS endpoint
    pub google_base_url: String,
    /// OpenAI API key; the fallback provider is disabled without it
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_voice: String,
    /// Longest text the primary provider accepts
    pub primary_char_limit: usize,
    pub request_timeout: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            google_base_url: "https://translate.google.com".to_string(),
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            openai_model: "tts-1".to_string(),
            openai_voice: "alloy".to_string(),
            primary_char_limit: PRIMARY_CHAR_LIMIT,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl VoiceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            google_base_url: std::env::var("GOOGLE_TTS_BASE_URL")
                .unwrap_or(defaults.google_base_url),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: std::env::var("OPENAI_TTS_MODEL").unwrap_or(defaults.openai_model),
            openai_voice: std::env::var("OPENAI_TTS_VOICE").unwrap_or(defaults.openai_voice),
            primary_char_limit: defaults.primary_char_limit,
            request_timeout: Duration::from_secs(
                std::env::var("TTS_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}
