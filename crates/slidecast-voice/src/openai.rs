//! OpenAI-compatible speech endpoint.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::error::{VoiceError, VoiceResult};
use crate::provider::SpeechSynthesizer;

const PROVIDER: &str = "openai";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// OpenAI `/v1/audio/speech` client.
pub struct OpenAiTts {
    api_key: String,
    base_url: String,
    model: String,
    voice: String,
    client: Client,
}

impl OpenAiTts {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        timeout: Duration,
    ) -> VoiceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::provider(PROVIDER, e.to_string()))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            voice: voice.into(),
            client,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiTts {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    // The endpoint has no slow mode and detects the language from the text.
    async fn synthesize(&self, text: &str, _language: &str, _slow: bool) -> VoiceResult<Bytes> {
        info!(
            "Requesting OpenAI speech ({} chars, model {}, voice {})",
            text.chars().count(),
            self.model,
            self.voice
        );

        let request = SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| VoiceError::provider(PROVIDER, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::provider(
                PROVIDER,
                format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
            ));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::provider(PROVIDER, e.to_string()))?;
        if audio.is_empty() {
            return Err(VoiceError::EmptyAudio { provider: PROVIDER });
        }
        Ok(audio)
    }
}
