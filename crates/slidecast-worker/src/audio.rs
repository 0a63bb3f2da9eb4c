//! Per-slide narration audio.
//!
//! A slide that cannot be voiced is rendered silent. Nothing here fails a
//! chunk: every synthesis error collapses to `SlideAudio::Silent` with the
//! reason kept for the job's completion message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_models::VoiceSpeed;
use slidecast_voice::{SpeechSynthesizer, VoiceError};
use tokio::fs;
use tracing::{debug, warn};

use crate::cleanup::TempRegistry;
use crate::error::PipelineResult;
use crate::pool::ToolPool;

/// Why a slide has no narration track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SilenceReason {
    EmptyNarration,
    TextTooLong,
    ProvidersDown,
    SynthesisFailed,
    WriteFailed,
}

impl SilenceReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SilenceReason::EmptyNarration => "no narration",
            SilenceReason::TextTooLong => "narration too long",
            SilenceReason::ProvidersDown => "speech providers unavailable",
            SilenceReason::SynthesisFailed => "speech synthesis failed",
            SilenceReason::WriteFailed => "audio could not be saved",
        }
    }

    fn from_voice_error(err: &VoiceError) -> Self {
        match err {
            VoiceError::TextTooLong { .. } | VoiceError::FallbackFailed { .. } => {
                SilenceReason::TextTooLong
            }
            VoiceError::AllProvidersFailed { .. } => SilenceReason::ProvidersDown,
            _ => SilenceReason::SynthesisFailed,
        }
    }
}

/// Result of voicing one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideAudio {
    Track(PathBuf),
    Silent(SilenceReason),
}

impl SlideAudio {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            SlideAudio::Track(path) => Some(path),
            SlideAudio::Silent(_) => None,
        }
    }
}

/// Turns narration text into a temporary audio file.
pub struct SlideAudioGenerator {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    pool: ToolPool,
}

impl SlideAudioGenerator {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, pool: ToolPool) -> Self {
        Self { synthesizer, pool }
    }

    /// Voice `text` into `{dir}/{artifact_id}_{suffix}.mp3`.
    ///
    /// The file is registered with `registry` before it is written.
    pub async fn generate(
        &self,
        text: &str,
        artifact_id: &str,
        dir: &Path,
        speed: VoiceSpeed,
        language: &str,
        registry: &TempRegistry,
    ) -> PipelineResult<SlideAudio> {
        if text.trim().is_empty() {
            debug!("No narration for {}, slide will be silent", artifact_id);
            return Ok(SlideAudio::Silent(SilenceReason::EmptyNarration));
        }

        let result = self
            .pool
            .run(self.synthesizer.synthesize(text, language, speed.is_slow()))
            .await?;

        let audio = match result {
            Ok(audio) => audio,
            Err(e) => {
                let reason = SilenceReason::from_voice_error(&e);
                warn!(
                    artifact = artifact_id,
                    kind = e.kind(),
                    "Speech synthesis failed, slide will be silent: {}",
                    e
                );
                return Ok(SlideAudio::Silent(reason));
            }
        };

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let path = dir.join(format!("{}_{}.mp3", artifact_id, &suffix[..8]));
        registry.register(&path);

        if let Err(e) = fs::write(&path, &audio).await {
            warn!("Failed to save audio {}: {}", path.display(), e);
            return Ok(SlideAudio::Silent(SilenceReason::WriteFailed));
        }

        debug!("Saved {} bytes of audio to {}", audio.len(), path.display());
        Ok(SlideAudio::Track(path))
    }
}
