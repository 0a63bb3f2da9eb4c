//! FFmpeg CLI wrapper for slide video rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Audio duration probing with a safe default
//! - Slide-chunk rendering and re-encode joins
//! - Concat-demuxer manifests and stream-copy joins
//! - The `MediaBackend` seam the pipeline renders through

pub mod backend;
pub mod command;
pub mod concat;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod render;

pub use backend::{FfmpegBackend, MediaBackend};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::{build_manifest, stream_copy_join, write_manifest};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{duration_or_default, probe_audio_duration, DEFAULT_SLIDE_DURATION_SECS};
pub use render::{reencode_join, render_placeholder_slide, render_slides, SlideClip};
