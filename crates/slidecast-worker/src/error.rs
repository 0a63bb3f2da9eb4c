//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// How far a failure is allowed to travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Rejected before a job exists
    Validation,
    /// Absorbed with a safe default; never fails the job
    Degradable,
    /// Fails the job
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Validation => "validation",
            Severity::Degradable => "degradable",
            Severity::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid presentation: {0}")]
    InvalidDeck(String),

    #[error("Slide image not found: {}", .0.display())]
    MissingImage(PathBuf),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(#[from] slidecast_voice::VoiceError),

    #[error("Media error: {0}")]
    Media(#[from] slidecast_media::MediaError),

    #[error("Chunk {0} has no usable slides")]
    EmptyChunk(usize),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Concatenation failed (stream copy: {stream_copy}; re-encode: {reencode})")]
    ConcatFailed { stream_copy: String, reencode: String },

    #[error("Failed to finalize video: {0}")]
    Finalize(String),

    #[error("No slides could be rendered")]
    NoArtifacts,

    #[error("Job store error: {0}")]
    Store(#[from] slidecast_store::StoreError),

    #[error("Invalid job transition: {0}")]
    Transition(#[from] slidecast_models::TransitionError),

    #[error("Job task panicked: {0}")]
    TaskPanicked(String),

    #[error("Tool pool closed")]
    ToolPoolClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn invalid_deck(msg: impl Into<String>) -> Self {
        Self::InvalidDeck(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::InvalidDeck(_) => Severity::Validation,
            PipelineError::MissingImage(_)
            | PipelineError::Synthesis(_)
            | PipelineError::Media(_)
            | PipelineError::EmptyChunk(_) => Severity::Degradable,
            PipelineError::Extraction(_)
            | PipelineError::ConcatFailed { .. }
            | PipelineError::Finalize(_)
            | PipelineError::NoArtifacts
            | PipelineError::Store(_)
            | PipelineError::Transition(_)
            | PipelineError::TaskPanicked(_)
            | PipelineError::ToolPoolClosed
            | PipelineError::Io(_) => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}
