//! Narration writing: turn raw slide text into a spoken script.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::NarrationConfig;
use crate::error::{PipelineError, PipelineResult};

/// Produces one narration per slide text, index-aligned with the input.
///
/// Implementations never fail a job: a slide that cannot be rewritten keeps
/// its original text, and an empty slide stays empty.
#[async_trait]
pub trait NarrationWriter: Send + Sync {
    async fn write(&self, slide_texts: &[String]) -> Vec<String>;
}

/// Why a single slide could not be rewritten.
#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("OpenRouter request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenRouter API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("OpenRouter returned an empty completion")]
    EmptyCompletion,
}

/// Uses the slide text as the narration unchanged.
#[derive(Debug, Default, Clone)]
pub struct PassthroughNarrator;

#[async_trait]
impl NarrationWriter for PassthroughNarrator {
    async fn write(&self, slide_texts: &[String]) -> Vec<String> {
        slide_texts.iter().map(|t| t.trim().to_string()).collect()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Rewrites slide text through an OpenRouter chat-completions endpoint.
pub struct OpenRouterNarrator {
    api_key: String,
    config: NarrationConfig,
    client: Client,
}

impl OpenRouterNarrator {
    pub fn new(api_key: impl Into<String>, config: NarrationConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::extraction(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn prompt(text: &str, slide_number: usize) -> String {
        format!(
            "You are a professional voiceover artist. Create a natural-sounding transcript \
             for a slide presentation based on the following content from slide {}:\n\n{}\n\n\
             Make it sound conversational and engaging, suitable for a voiceover. \
             Keep it concise but comprehensive.",
            slide_number, text
        )
    }

    async fn rewrite(&self, text: &str, slide_number: usize) -> Result<String, NarrationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::prompt(text, slide_number),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NarrationError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(NarrationError::EmptyCompletion);
        }
        Ok(content)
    }
}

#[async_trait]
impl NarrationWriter for OpenRouterNarrator {
    async fn write(&self, slide_texts: &[String]) -> Vec<String> {
        let mut narrations = Vec::with_capacity(slide_texts.len());

        for (i, text) in slide_texts.iter().enumerate() {
            if text.trim().is_empty() {
                narrations.push(String::new());
                continue;
            }

            match self.rewrite(text, i + 1).await {
                Ok(narration) => {
                    debug!(slide = i + 1, "Narration generated ({} chars)", narration.len());
                    narrations.push(narration);
                }
                Err(e) => {
                    warn!(slide = i + 1, "Narration failed, using slide text: {}", e);
                    narrations.push(text.trim().to_string());
                }
            }
        }
        narrations
    }
}

/// OpenRouter when a key is configured, passthrough otherwise.
pub fn narrator_from_config(config: NarrationConfig) -> PipelineResult<Arc<dyn NarrationWriter>> {
    match config.api_key.clone() {
        Some(key) => Ok(Arc::new(OpenRouterNarrator::new(key, config)?)),
        None => {
            info!("OPENROUTER_API_KEY not set, narrating slide text as-is");
            Ok(Arc::new(PassthroughNarrator))
        }
    }
}
