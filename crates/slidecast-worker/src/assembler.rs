//! Chunk assembly: voice each slide, measure it, render the chunk video.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use slidecast_media::{duration_or_default, MediaBackend, SlideClip, DEFAULT_SLIDE_DURATION_SECS};
use slidecast_models::{EncodingProfile, VoiceSpeed};
use tracing::{info, warn};

use crate::audio::{SilenceReason, SlideAudio, SlideAudioGenerator};
use crate::cleanup::TempRegistry;
use crate::error::{PipelineError, PipelineResult};
use crate::planner::Chunk;
use crate::pool::ToolPool;

/// What one chunk contributed to the final video.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkOutcome {
    pub index: usize,
    /// Rendered chunk video; `None` when the chunk produced nothing
    pub output: Option<PathBuf>,
    /// Slides with an image; they only reach the video if `output` is set
    pub rendered: usize,
    /// Slides dropped because their image is missing
    pub skipped: usize,
    /// One entry per kept slide rendered without narration
    pub silent: Vec<SilenceReason>,
}

pub struct ChunkAssembler {
    audio: SlideAudioGenerator,
    media: Arc<dyn MediaBackend>,
    pool: ToolPool,
    profile: EncodingProfile,
}

impl ChunkAssembler {
    pub fn new(
        audio: SlideAudioGenerator,
        media: Arc<dyn MediaBackend>,
        pool: ToolPool,
        profile: EncodingProfile,
    ) -> Self {
        Self {
            audio,
            media,
            pool,
            profile,
        }
    }

    /// Render `chunk` into `chunk.output`.
    ///
    /// Missing images, failed narration and render failures are absorbed; the
    /// only errors returned are ones that should fail the job.
    pub async fn assemble(
        &self,
        chunk: &Chunk,
        scratch: &Path,
        speed: VoiceSpeed,
        language: &str,
        registry: &TempRegistry,
    ) -> PipelineResult<ChunkOutcome> {
        let mut outcome = ChunkOutcome {
            index: chunk.index,
            ..Default::default()
        };
        let mut clips = Vec::with_capacity(chunk.len());

        for (i, unit) in chunk.units.iter().enumerate() {
            if !tokio::fs::try_exists(&unit.image).await.unwrap_or(false) {
                warn!(
                    chunk = chunk.index,
                    slide = i,
                    "Skipping slide: {}",
                    PipelineError::MissingImage(unit.image.clone())
                );
                outcome.skipped += 1;
                continue;
            }

            let artifact_id = format!("chunk{}_slide{}", chunk.index, i);
            let audio = self
                .audio
                .generate(&unit.narration, &artifact_id, scratch, speed, language, registry)
                .await?;

            let duration = match audio.path() {
                Some(path) => {
                    let probed = self.pool.run(self.media.probe_duration(path)).await?;
                    duration_or_default(probed, path)
                }
                None => DEFAULT_SLIDE_DURATION_SECS,
            };

            clips.push(SlideClip::new(unit.image.clone(), audio.path().cloned(), duration));
            if let SlideAudio::Silent(reason) = audio {
                outcome.silent.push(reason);
            }
        }

        outcome.rendered = clips.len();
        if clips.is_empty() {
            warn!(chunk = chunk.index, "{}", PipelineError::EmptyChunk(chunk.index));
            return Ok(outcome);
        }

        registry.register(&chunk.output);
        let rendered = self
            .pool
            .run(self.media.render_slides(&clips, &chunk.output, &self.profile))
            .await?;

        match rendered {
            Ok(()) if chunk.output.exists() => {
                info!(
                    chunk = chunk.index,
                    slides = clips.len(),
                    "Rendered chunk -> {}",
                    chunk.output.display()
                );
                outcome.output = Some(chunk.output.clone());
            }
            Ok(()) => {
                warn!(chunk = chunk.index, "Renderer reported success but produced no file");
            }
            Err(e) => {
                warn!(
                    chunk = chunk.index,
                    "Chunk render failed, chunk dropped: {}",
                    PipelineError::from(e)
                );
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan_chunks;
    use crate::test_support::{FakeMedia, FakeSynthesizer};
    use slidecast_models::SlideUnit;
    use tempfile::TempDir;

    fn assembler(media: Arc<FakeMedia>) -> ChunkAssembler {
        let pool = ToolPool::new(2);
        ChunkAssembler::new(
            SlideAudioGenerator::new(FakeSynthesizer::new(), pool.clone()),
            media,
            pool,
            EncodingProfile::default(),
        )
    }

    fn write_image(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"png").unwrap();
        path
    }

    #[tokio::test]
    async fn test_empty_narration_gives_three_second_silent_clip() {
        let dir = TempDir::new().unwrap();
        let media = FakeMedia::new();
        let image = write_image(dir.path(), "slide_1.png");
        let chunks = plan_chunks(vec![SlideUnit::new(&image, "")], dir.path());
        let registry = TempRegistry::new();

        let outcome = assembler(media.clone())
            .assemble(&chunks[0], dir.path(), VoiceSpeed::Normal, "en", &registry)
            .await
            .unwrap();

        assert_eq!(outcome.output, Some(chunks[0].output.clone()));
        assert_eq!(outcome.silent, vec![SilenceReason::EmptyNarration]);

        let renders = media.renders();
        assert_eq!(renders.len(), 1);
        let clip = &renders[0][0];
        assert!(clip.is_silent());
        assert_eq!(clip.duration_secs, 3.0);
        assert_eq!(media.probe_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_image_is_excluded() {
        let dir = TempDir::new().unwrap();
        let media = FakeMedia::new();
        let present = write_image(dir.path(), "slide_1.png");
        let absent = dir.path().join("slide_2.png");
        let units = vec![
            SlideUnit::new(&present, "first"),
            SlideUnit::new(&absent, "second"),
            SlideUnit::new(&present, "third"),
        ];
        let chunks = plan_chunks(units, dir.path());
        let registry = TempRegistry::new();

        let outcome = assembler(media.clone())
            .assemble(&chunks[0], dir.path(), VoiceSpeed::Normal, "en", &registry)
            .await
            .unwrap();

        assert_eq!(outcome.rendered, 2);
        assert_eq!(outcome.skipped, 1);
        let clips = &media.renders()[0];
        assert_eq!(clips.len(), 2);
        assert!(clips.iter().all(|c| c.image == present));
        assert!(clips.iter().all(|c| c.duration_secs == FakeMedia::AUDIO_SECS));
    }

    #[tokio::test]
    async fn test_all_images_missing_yields_no_output() {
        let dir = TempDir::new().unwrap();
        let media = FakeMedia::new();
        let chunks = plan_chunks(vec![SlideUnit::new(dir.path().join("gone.png"), "x")], dir.path());
        let registry = TempRegistry::new();

        let outcome = assembler(media.clone())
            .assemble(&chunks[0], dir.path(), VoiceSpeed::Normal, "en", &registry)
            .await
            .unwrap();

        assert!(outcome.output.is_none());
        assert!(media.renders().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_is_absorbed() {
        let dir = TempDir::new().unwrap();
        let media = FakeMedia::new();
        media.fail_renders();
        let image = write_image(dir.path(), "slide_1.png");
        let chunks = plan_chunks(vec![SlideUnit::new(&image, "hello")], dir.path());
        let registry = TempRegistry::new();

        let outcome = assembler(media)
            .assemble(&chunks[0], dir.path(), VoiceSpeed::Normal, "en", &registry)
            .await
            .unwrap();

        assert!(outcome.output.is_none());
        // audio track and chunk video were both registered
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_uses_default_duration() {
        let dir = TempDir::new().unwrap();
        let media = FakeMedia::new();
        media.fail_probes();
        let image = write_image(dir.path(), "slide_1.png");
        let chunks = plan_chunks(vec![SlideUnit::new(&image, "hello")], dir.path());

        assembler(media.clone())
            .assemble(&chunks[0], dir.path(), VoiceSpeed::Normal, "en", &TempRegistry::new())
            .await
            .unwrap();

        let clip = &media.renders()[0][0];
        assert!(!clip.is_silent());
        assert_eq!(clip.duration_secs, DEFAULT_SLIDE_DURATION_SECS);
    }
}
