//! Speech synthesizer contract.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::VoiceResult;

/// Converts narration text to encoded audio (MP3).
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Synthesize `text` spoken in `language` (ISO 639-1, e.g. "en").
    async fn synthesize(&self, text: &str, language: &str, slow: bool) -> VoiceResult<Bytes>;
}
