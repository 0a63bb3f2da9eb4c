//! Shared data models for the Slidecast backend.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers, stages and the persisted job record
//! - Slide units and voice settings
//! - The fixed video encoding profile

pub mod encoding;
pub mod job;
pub mod slide;

// Re-export common types
pub use encoding::EncodingProfile;
pub use job::{JobId, JobRecord, JobStage, JobStatus, TransitionError};
pub use slide::{SlideUnit, VoiceSpeed};
