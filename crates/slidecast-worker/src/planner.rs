//! Chunk planning.

use std::path::{Path, PathBuf};

use slidecast_models::SlideUnit;

/// Decks up to this size render as a single chunk.
const SINGLE_CHUNK_MAX: usize = 5;
/// Decks up to this size use medium chunks.
const MEDIUM_DECK_MAX: usize = 15;
const MEDIUM_CHUNK: usize = 5;
const LARGE_CHUNK: usize = 8;

/// Slides per chunk for a deck of `total` slides.
///
/// Small decks avoid join overhead entirely; larger decks are batched to bound
/// the size of a single render.
pub fn chunk_size(total: usize) -> usize {
    match total {
        0..=SINGLE_CHUNK_MAX => total.max(1),
        n if n <= MEDIUM_DECK_MAX => MEDIUM_CHUNK,
        _ => LARGE_CHUNK,
    }
}

/// A contiguous batch of slides rendered into one video.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub units: Vec<SlideUnit>,
    /// Temporary video path of this chunk
    pub output: PathBuf,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Split `units` into ordered chunks whose videos go under `work_dir`.
///
/// The chunks partition `units` exactly: no gaps, no overlap, order kept.
/// Output names carry the chunk index plus a random suffix, so two plans
/// over the same directory never share a path.
pub fn plan_chunks(units: Vec<SlideUnit>, work_dir: &Path) -> Vec<Chunk> {
    let size = chunk_size(units.len());
    let mut chunks = Vec::with_capacity(units.len().div_ceil(size));
    let mut units = units.into_iter().peekable();
    let mut index = 0;

    while units.peek().is_some() {
        let batch: Vec<SlideUnit> = units.by_ref().take(size).collect();
        let name = format!("chunk_{}_{}.mp4", index, uuid::Uuid::new_v4().simple());
        chunks.push(Chunk {
            index,
            units: batch,
            output: work_dir.join(name),
        });
        index += 1;
    }
    chunks
}
