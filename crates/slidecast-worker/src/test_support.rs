//! In-process fakes for pipeline tests. No ffmpeg or network required.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use slidecast_media::{MediaBackend, MediaError, MediaResult, SlideClip};
use slidecast_models::{EncodingProfile, JobId, JobRecord};
use slidecast_store::{JobStore, MemoryJobStore, StoreResult};
use slidecast_voice::{SpeechSynthesizer, VoiceError, VoiceResult};

use crate::error::PipelineResult;
use crate::extract::SlideExtractor;

/// Returns `audio:<text>`; text containing `FAIL` or `TOOLONG` fails with the
/// matching error kind.
#[derive(Default)]
pub struct FakeSynthesizer {
    calls: AtomicUsize,
    slow_calls: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn slow_calls(&self) -> usize {
        self.slow_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn synthesize(&self, text: &str, _language: &str, slow: bool) -> VoiceResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if slow {
            self.slow_calls.fetch_add(1, Ordering::SeqCst);
        }
        if text.contains("TOOLONG") {
            return Err(VoiceError::TextTooLong {
                len: text.len(),
                limit: 4,
            });
        }
        if text.contains("FAIL") {
            return Err(VoiceError::AllProvidersFailed {
                primary: Box::new(VoiceError::provider("google", "503")),
                fallback: Box::new(VoiceError::provider("openai", "401")),
            });
        }
        Ok(Bytes::from(format!("audio:{}", text)))
    }
}

/// Media backend writing plain-text "videos".
///
/// A rendered chunk holds one `image|duration|audio` line per clip, and joins
/// concatenate their inputs, so tests can read back slide order.
#[derive(Default)]
pub struct FakeMedia {
    renders: Mutex<Vec<Vec<SlideClip>>>,
    probe_calls: AtomicUsize,
    stream_copy_calls: AtomicUsize,
    reencode_calls: AtomicUsize,
    fail_renders: AtomicBool,
    fail_probes: AtomicBool,
    fail_stream_copy: AtomicBool,
    fail_reencode: AtomicBool,
    reversed_delay: AtomicBool,
}

impl FakeMedia {
    pub const AUDIO_SECS: f64 = 4.5;

    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn renders(&self) -> Vec<Vec<SlideClip>> {
        self.renders.lock().unwrap().clone()
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn stream_copy_calls(&self) -> usize {
        self.stream_copy_calls.load(Ordering::SeqCst)
    }

    pub fn reencode_calls(&self) -> usize {
        self.reencode_calls.load(Ordering::SeqCst)
    }

    pub fn fail_renders(&self) {
        self.fail_renders.store(true, Ordering::SeqCst);
    }

    pub fn fail_probes(&self) {
        self.fail_probes.store(true, Ordering::SeqCst);
    }

    pub fn fail_stream_copy(&self) {
        self.fail_stream_copy.store(true, Ordering::SeqCst);
    }

    pub fn fail_reencode(&self) {
        self.fail_reencode.store(true, Ordering::SeqCst);
    }

    /// Make earlier chunks render slower than later ones.
    pub fn set_render_delay_reversed(&self, on: bool) {
        self.reversed_delay.store(on, Ordering::SeqCst);
    }

    fn failure(what: &str) -> MediaError {
        MediaError::ffmpeg_failed(format!("{} failed", what), Some("simulated".into()), Some(1))
    }

    async fn write_joined(inputs: &[PathBuf], output: &Path) -> MediaResult<()> {
        let mut joined = Vec::new();
        for input in inputs {
            joined.extend(tokio::fs::read(input).await?);
        }
        tokio::fs::write(output, joined).await?;
        Ok(())
    }
}

fn chunk_index(output: &Path) -> u64 {
    output
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_prefix("chunk_"))
        .and_then(|s| s.split('_').next())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

fn parse_manifest(manifest: &str) -> Vec<PathBuf> {
    manifest
        .lines()
        .filter_map(|l| l.strip_prefix("file '")?.strip_suffix('\''))
        .map(|p| PathBuf::from(p.replace("'\\''", "'")))
        .collect()
}

#[async_trait]
impl MediaBackend for FakeMedia {
    async fn probe_duration(&self, audio: &Path) -> MediaResult<f64> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probes.load(Ordering::SeqCst) {
            return Err(MediaError::InvalidDuration("N/A".into()));
        }
        if !audio.exists() {
            return Err(MediaError::FileNotFound(audio.to_path_buf()));
        }
        Ok(Self::AUDIO_SECS)
    }

    async fn render_slides(
        &self,
        clips: &[SlideClip],
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        self.renders.lock().unwrap().push(clips.to_vec());

        if self.reversed_delay.load(Ordering::SeqCst) {
            let delay = 10u64.saturating_sub(chunk_index(output)) * 5;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_renders.load(Ordering::SeqCst) {
            return Err(Self::failure("render"));
        }

        let body: String = clips
            .iter()
            .map(|c| {
                let image = c.image.file_name().unwrap().to_string_lossy().to_string();
                let audio = if c.is_silent() { "silent" } else { "voiced" };
                format!("{}|{:.1}|{}\n", image, c.duration_secs, audio)
            })
            .collect();
        tokio::fs::write(output, body).await?;
        Ok(())
    }

    async fn concat_stream_copy(&self, manifest: &Path, output: &Path) -> MediaResult<()> {
        self.stream_copy_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stream_copy.load(Ordering::SeqCst) {
            tokio::fs::write(output, b"partial").await?;
            return Err(Self::failure("stream copy"));
        }
        let inputs = parse_manifest(&tokio::fs::read_to_string(manifest).await?);
        Self::write_joined(&inputs, output).await
    }

    async fn concat_reencode(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        self.reencode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reencode.load(Ordering::SeqCst) {
            tokio::fs::write(output, b"partial").await?;
            return Err(Self::failure("re-encode"));
        }
        Self::write_joined(inputs, output).await
    }

    async fn render_placeholder(
        &self,
        label: &str,
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        tokio::fs::write(output, format!("PNG {}", label)).await?;
        Ok(())
    }
}

/// Extractor returning fixed slide texts and writing fake images.
pub struct FakeExtractor {
    texts: Vec<String>,
    /// 1-based slide numbers whose image is never written
    missing: Vec<usize>,
    panic: bool,
}

impl FakeExtractor {
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts,
            missing: Vec::new(),
            panic: false,
        }
    }

    pub fn with_missing_images(mut self, slides: &[usize]) -> Self {
        self.missing = slides.to_vec();
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }
}

#[async_trait]
impl SlideExtractor for FakeExtractor {
    async fn extract_texts(&self, _deck: &Path) -> PipelineResult<Vec<String>> {
        if self.panic {
            panic!("extractor exploded");
        }
        Ok(self.texts.clone())
    }

    async fn extract_images(
        &self,
        _deck: &Path,
        out_dir: &Path,
        count: usize,
    ) -> PipelineResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;
        let mut images = Vec::new();
        for number in 1..=count {
            let path = out_dir.join(format!("slide_{}.png", number));
            if !self.missing.contains(&number) {
                tokio::fs::write(&path, b"png").await?;
            }
            images.push(path);
        }
        Ok(images)
    }
}

/// Memory store that keeps every saved snapshot.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryJobStore,
    history: Mutex<Vec<JobRecord>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn history(&self) -> Vec<JobRecord> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobStore for RecordingStore {
    async fn save(&self, record: &JobRecord) -> StoreResult<()> {
        self.history.lock().unwrap().push(record.clone());
        self.inner.save(record).await
    }

    async fn load(&self, job_id: &JobId) -> StoreResult<Option<JobRecord>> {
        self.inner.load(job_id).await
    }
}

/// Write a minimal PPTX archive with one slide per text.
pub fn write_pptx(path: &Path, slides: &[&str]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();

    for (i, text) in slides.iter().enumerate() {
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
            .unwrap();
        let body = if text.is_empty() {
            String::new()
        } else {
            format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", text)
        };
        write!(
            zip,
            r#"<p:sld xmlns:a="a"><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
            body
        )
        .unwrap();
    }
    zip.finish().unwrap();
}
