//! Primary/fallback speech chain.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, warn};

use crate::config::VoiceConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::google::GoogleTranslateTts;
use crate::openai::OpenAiTts;
use crate::provider::SpeechSynthesizer;

/// Tries the primary provider, then the fallback.
///
/// Text longer than the primary limit goes straight to the fallback. The
/// errors keep "text too long" and "every provider failed" distinguishable.
pub struct FallbackSynthesizer {
    primary: Arc<dyn SpeechSynthesizer>,
    fallback: Option<Arc<dyn SpeechSynthesizer>>,
    primary_limit: usize,
}

impl FallbackSynthesizer {
    pub fn new(
        primary: Arc<dyn SpeechSynthesizer>,
        fallback: Option<Arc<dyn SpeechSynthesizer>>,
        primary_limit: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_limit,
        }
    }

    /// Google primary, plus OpenAI when an API key is configured.
    pub fn from_config(config: &VoiceConfig) -> VoiceResult<Self> {
        let primary: Arc<dyn SpeechSynthesizer> = Arc::new(GoogleTranslateTts::new(
            config.google_base_url.clone(),
            config.request_timeout,
        )?);

        let fallback = match &config.openai_api_key {
            Some(key) => Some(Arc::new(OpenAiTts::new(
                key.clone(),
                config.openai_base_url.clone(),
                config.openai_model.clone(),
                config.openai_voice.clone(),
                config.request_timeout,
            )?) as Arc<dyn SpeechSynthesizer>),
            None => {
                info!("OPENAI_API_KEY not set, speech fallback disabled");
                None
            }
        };

        Ok(Self::new(primary, fallback, config.primary_char_limit))
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[async_trait]
impl SpeechSynthesizer for FallbackSynthesizer {
    fn name(&self) -> &'static str {
        "fallback-chain"
    }

    async fn synthesize(&self, text: &str, language: &str, slow: bool) -> VoiceResult<Bytes> {
        let len = text.chars().count();

        if len > self.primary_limit {
            let limit = self.primary_limit;
            return match &self.fallback {
                Some(fallback) => {
                    info!("Text of {} chars exceeds {} limit, using {}", len, limit, fallback.name());
                    fallback
                        .synthesize(text, language, slow)
                        .await
                        .map_err(|e| VoiceError::FallbackFailed {
                            len,
                            limit,
                            cause: Box::new(e),
                        })
                }
                None => Err(VoiceError::TextTooLong { len, limit }),
            };
        }

        let primary_err = match self.primary.synthesize(text, language, slow).await {
            Ok(audio) => return Ok(audio),
            Err(e) => e,
        };

        let Some(fallback) = &self.fallback else {
            return Err(primary_err);
        };

        warn!(
            "{} failed, trying {}: {}",
            self.primary.name(),
            fallback.name(),
            primary_err
        );
        fallback
            .synthesize(text, language, slow)
            .await
            .map_err(|fallback_err| VoiceError::AllProvidersFailed {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            })
    }
}
