//! Slide deck to video job pipeline.
//!
//! This crate provides:
//! - Chunk planning and per-chunk video assembly
//! - Per-slide speech audio with silent fallbacks
//! - Stream-copy concatenation with a re-encode fallback
//! - The job orchestrator that drives the job state machine

pub mod assembler;
pub mod audio;
pub mod cleanup;
pub mod concat;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod narration;
pub mod orchestrator;
pub mod planner;
pub mod pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembler::{ChunkAssembler, ChunkOutcome};
pub use audio::{SilenceReason, SlideAudio, SlideAudioGenerator};
pub use cleanup::{CleanupReport, TempRegistry};
pub use concat::Concatenator;
pub use config::{NarrationConfig, PipelineConfig};
pub use error::{PipelineError, PipelineResult, Severity};
pub use extract::{read_slide_texts, validate_deck, PptxExtractor, SlideExtractor};
pub use logging::JobLogger;
pub use narration::{
    narrator_from_config, NarrationError, NarrationWriter, OpenRouterNarrator, PassthroughNarrator,
};
pub use orchestrator::{
    download_url, spawn_job, JobRequest, Pipeline, PipelineComponents, DOWNLOAD_ROUTE,
};
pub use planner::{chunk_size, plan_chunks, Chunk};
pub use pool::ToolPool;
