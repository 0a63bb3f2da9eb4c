//! Slide text and image extraction from PPTX decks.
//!
//! A PPTX file is a zip archive with one `ppt/slides/slideN.xml` part per
//! slide. Text is read from the DrawingML runs (`<a:t>`) of each paragraph.
//! Slide images are rendered as labelled placeholder frames.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::{Captures, Regex};
use slidecast_media::MediaBackend;
use slidecast_models::EncodingProfile;
use tracing::{info, warn};
use zip::ZipArchive;

use crate::error::{PipelineError, PipelineResult};
use crate::pool::ToolPool;

static SLIDE_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<a:p(?:\s[^>]*)?>(.*?)</a:p>").unwrap());
static TEXT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<a:t(?:\s[^>]*)?>(.*?)</a:t>").unwrap());
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

/// Source of per-slide text and images.
#[async_trait]
pub trait SlideExtractor: Send + Sync {
    /// Text of every slide, in slide order. Empty slides yield empty strings.
    async fn extract_texts(&self, deck: &Path) -> PipelineResult<Vec<String>>;

    /// One image per slide written under `out_dir`, in slide order.
    ///
    /// A slide whose image could not be produced still gets its path; the
    /// assembler skips paths that do not exist.
    async fn extract_images(
        &self,
        deck: &Path,
        out_dir: &Path,
        count: usize,
    ) -> PipelineResult<Vec<PathBuf>>;
}

/// Open `path` as a PPTX archive and return its slide count.
pub fn validate_deck(path: &Path) -> PipelineResult<usize> {
    let archive = open_archive(path)?;
    let count = slide_parts(&archive).len();
    if count == 0 {
        return Err(PipelineError::invalid_deck("presentation has no slides"));
    }
    Ok(count)
}

/// Read the text of every slide in `path`.
pub fn read_slide_texts(path: &Path) -> PipelineResult<Vec<String>> {
    let mut archive = open_archive(path)?;
    let parts = slide_parts(&archive);
    if parts.is_empty() {
        return Err(PipelineError::invalid_deck("presentation has no slides"));
    }

    let mut texts = Vec::with_capacity(parts.len());
    for part in parts {
        let mut xml = String::new();
        archive
            .by_name(&part)
            .map_err(|e| PipelineError::invalid_deck(format!("{}: {}", part, e)))?
            .read_to_string(&mut xml)?;
        texts.push(slide_text(&xml));
    }
    Ok(texts)
}

fn open_archive(path: &Path) -> PipelineResult<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file)
        .map_err(|e| PipelineError::invalid_deck(format!("not a PPTX archive: {}", e)))
}

/// Slide part names sorted by slide number.
fn slide_parts(archive: &ZipArchive<File>) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = SLIDE_PART.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    parts.sort_by_key(|(number, _)| *number);
    parts.into_iter().map(|(_, name)| name).collect()
}

/// Non-empty paragraphs of a slide, one per line.
fn slide_text(xml: &str) -> String {
    PARAGRAPH
        .captures_iter(xml)
        .filter_map(|paragraph| {
            let runs: String = TEXT_RUN
                .captures_iter(&paragraph[1])
                .map(|run| decode_entities(&run[1]))
                .collect();
            let line = runs.trim();
            (!line.is_empty()).then(|| line.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| entity[1..].parse())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Reads slide text from the archive and renders placeholder slide images.
pub struct PptxExtractor {
    media: Arc<dyn MediaBackend>,
    pool: ToolPool,
    profile: EncodingProfile,
}

impl PptxExtractor {
    pub fn new(media: Arc<dyn MediaBackend>, pool: ToolPool, profile: EncodingProfile) -> Self {
        Self {
            media,
            pool,
            profile,
        }
    }
}

#[async_trait]
impl SlideExtractor for PptxExtractor {
    async fn extract_texts(&self, deck: &Path) -> PipelineResult<Vec<String>> {
        let deck = deck.to_path_buf();
        let texts = self
            .pool
            .run(tokio::task::spawn_blocking(move || read_slide_texts(&deck)))
            .await?
            .map_err(|e| PipelineError::extraction(format!("text extraction task failed: {}", e)))??;

        info!("Extracted text from {} slides", texts.len());
        Ok(texts)
    }

    async fn extract_images(
        &self,
        _deck: &Path,
        out_dir: &Path,
        count: usize,
    ) -> PipelineResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;

        let mut images = Vec::with_capacity(count);
        for number in 1..=count {
            let path = out_dir.join(format!("slide_{}.png", number));
            let label = format!("Slide {}", number);
            let rendered = self
                .pool
                .run(self.media.render_placeholder(&label, &path, &self.profile))
                .await?;
            if let Err(e) = rendered {
                warn!(slide = number, "Failed to render slide image: {}", e);
            }
            images.push(path);
        }
        Ok(images)
    }
}
