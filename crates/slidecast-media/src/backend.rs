//! Media backend abstraction.
//!
//! The pipeline never shells out directly; it goes through `MediaBackend` so
//! rendering can be swapped for a fake in tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use slidecast_models::EncodingProfile;

use crate::command::FfmpegRunner;
use crate::concat::stream_copy_join;
use crate::error::MediaResult;
use crate::probe::probe_audio_duration;
use crate::render::{reencode_join, render_placeholder_slide, render_slides, SlideClip};

/// Operations the pipeline needs from a media toolchain.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Playback duration of an audio file in seconds.
    async fn probe_duration(&self, audio: &Path) -> MediaResult<f64>;

    /// Render still-image clips into one video.
    async fn render_slides(
        &self,
        clips: &[SlideClip],
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()>;

    /// Join the videos listed in a concat manifest without re-encoding.
    async fn concat_stream_copy(&self, manifest: &Path, output: &Path) -> MediaResult<()>;

    /// Join videos by decoding and re-encoding them.
    async fn concat_reencode(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()>;

    /// Render a labelled placeholder image for a slide.
    async fn render_placeholder(
        &self,
        label: &str,
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()>;
}

/// `MediaBackend` backed by the ffmpeg and ffprobe CLIs.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    runner: FfmpegRunner,
}

impl FfmpegBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any single ffmpeg invocation that runs longer than `secs`.
    pub fn with_timeout(secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(secs),
        }
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe_duration(&self, audio: &Path) -> MediaResult<f64> {
        probe_audio_duration(audio).await
    }

    async fn render_slides(
        &self,
        clips: &[SlideClip],
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()> {
        render_slides(&self.runner, clips, output, profile).await
    }

    async fn concat_stream_copy(&self, manifest: &Path, output: &Path) -> MediaResult<()> {
        stream_copy_join(&self.runner, manifest, output).await
    }

    async fn concat_reencode(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()> {
        reencode_join(&self.runner, inputs, output, profile).await
    }

    async fn render_placeholder(
        &self,
        label: &str,
        output: &Path,
        profile: &EncodingProfile,
    ) -> MediaResult<()> {
        render_placeholder_slide(&self.runner, label, output, profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires ffmpeg and ffprobe on PATH"]
    async fn test_render_and_probe_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = FfmpegBackend::new();
        let profile = EncodingProfile::default();

        let image = dir.path().join("slide.png");
        backend.render_placeholder("Slide 1", &image, &profile).await.unwrap();

        let video = dir.path().join("chunk.mp4");
        let clips = vec![SlideClip::new(&image, None, 3.0)];
        backend.render_slides(&clips, &video, &profile).await.unwrap();

        let duration = backend.probe_duration(&video).await.unwrap();
        assert!((duration - 3.0).abs() < 0.25, "duration was {}", duration);
    }

    /// Two rendered chunks of 2s and 3s.
    async fn render_chunks(backend: &FfmpegBackend, dir: &Path) -> Vec<PathBuf> {
        let profile = EncodingProfile::default();
        let mut chunks = Vec::new();

        for (i, secs) in [2.0, 3.0].into_iter().enumerate() {
            let image = dir.join(format!("slide_{}.png", i));
            let label = format!("Slide {}", i + 1);
            backend.render_placeholder(&label, &image, &profile).await.unwrap();

            let chunk = dir.join(format!("chunk_{}.mp4", i));
            let clips = vec![SlideClip::new(&image, None, secs)];
            backend.render_slides(&clips, &chunk, &profile).await.unwrap();
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg and ffprobe on PATH"]
    async fn test_stream_copy_join_sums_durations() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = FfmpegBackend::new();
        let chunks = render_chunks(&backend, dir.path()).await;

        let manifest = dir.path().join("concat.txt");
        crate::concat::write_manifest(&chunks, &manifest).await.unwrap();
        let output = dir.path().join("joined.mp4");
        backend.concat_stream_copy(&manifest, &output).await.unwrap();

        let duration = backend.probe_duration(&output).await.unwrap();
        assert!((duration - 5.0).abs() < 0.3, "duration was {}", duration);
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg and ffprobe on PATH"]
    async fn test_reencode_join_sums_durations() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = FfmpegBackend::new();
        let chunks = render_chunks(&backend, dir.path()).await;

        let output = dir.path().join("joined.mp4");
        backend
            .concat_reencode(&chunks, &output, &EncodingProfile::default())
            .await
            .unwrap();

        let duration = backend.probe_duration(&output).await.unwrap();
        assert!((duration - 5.0).abs() < 0.3, "duration was {}", duration);
    }
}
