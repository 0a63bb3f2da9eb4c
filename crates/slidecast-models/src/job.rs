//! Job identifiers and the persisted job record.
//!
//! A job moves through a fixed sequence of stages. Every stage has a progress
//! milestone and a human-readable message, and every transition produces a new
//! snapshot that is written to the job store before work continues.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job.
///
/// Identifiers are time-derived (`slidecast_<unix-millis>_<8 hex>`) so that
/// they sort roughly by submission time, with a random suffix so that two
/// submissions in the same millisecond never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new job ID.
    pub fn new() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "slidecast_{}_{}",
            Utc::now().timestamp_millis(),
            &suffix[..8]
        ))
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is safe to use as a file name and URL segment.
    ///
    /// Valid format: ASCII alphanumerics, `_` and `-`, 8-96 chars.
    pub fn is_well_formed(&self) -> bool {
        let id = self.0.as_str();
        (8..=96).contains(&id.len())
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Client-visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is running (any non-terminal stage)
    Processing,
    /// Final video is available
    Completed,
    /// Job failed; see the error message
    Error,
    /// No record exists for the requested job ID
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Unknown => "unknown",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a job in the processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Queued,
    Extracting,
    Transcribing,
    Imaging,
    Rendering,
    Completed,
    Error,
}

impl JobStage {
    /// Stages in the order a successful job visits them.
    pub const SUCCESS_PATH: [JobStage; 6] = [
        JobStage::Queued,
        JobStage::Extracting,
        JobStage::Transcribing,
        JobStage::Imaging,
        JobStage::Rendering,
        JobStage::Completed,
    ];

    /// Progress milestone recorded on stage entry.
    pub fn progress(&self) -> u8 {
        match self {
            JobStage::Queued => 0,
            JobStage::Extracting => 10,
            JobStage::Transcribing => 30,
            JobStage::Imaging => 50,
            JobStage::Rendering => 70,
            JobStage::Completed => 100,
            JobStage::Error => 0,
        }
    }

    /// Default message shown to pollers on stage entry.
    pub fn message(&self) -> &'static str {
        match self {
            JobStage::Queued => "Starting processing",
            JobStage::Extracting => "Extracting text from slides",
            JobStage::Transcribing => "Generating transcripts with AI",
            JobStage::Imaging => "Extracting slide images",
            JobStage::Rendering => "Generating video with voiceovers",
            JobStage::Completed => "Video generation complete",
            JobStage::Error => "Error processing presentation",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Queued => "queued",
            JobStage::Extracting => "extracting",
            JobStage::Transcribing => "transcribing",
            JobStage::Imaging => "imaging",
            JobStage::Rendering => "rendering",
            JobStage::Completed => "completed",
            JobStage::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Error)
    }

    fn status(&self) -> JobStatus {
        match self {
            JobStage::Completed => JobStatus::Completed,
            JobStage::Error => JobStatus::Error,
            _ => JobStatus::Processing,
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected state-machine transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("job {job_id} is already {status} and cannot change")]
    Terminal { job_id: String, status: JobStatus },

    #[error("job {job_id} cannot move backwards from {from} to {to}")]
    Backwards {
        job_id: String,
        from: JobStage,
        to: JobStage,
    },
}

/// Persisted status snapshot for one job.
///
/// This is the flat record returned by the status endpoint and stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Absent only on `unknown` records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
    pub message: String,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    /// Create the initial record for a freshly accepted job.
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Processing,
            stage: Some(JobStage::Queued),
            message: JobStage::Queued.message().to_string(),
            progress: JobStage::Queued.progress(),
            video_path: None,
            download_url: None,
            error: None,
        }
    }

    /// Record returned for IDs the store has never seen.
    pub fn unknown(job_id: JobId) -> Self {
        Self {
            job_id,
            status: JobStatus::Unknown,
            stage: None,
            message: "Job not found".to_string(),
            progress: 0,
            video_path: None,
            download_url: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to the next non-terminal stage of the success path.
    pub fn advance(&mut self, stage: JobStage) -> Result<(), TransitionError> {
        self.check_mutable()?;
        if let Some(current) = self.stage {
            if stage < current || stage.is_terminal() {
                return Err(TransitionError::Backwards {
                    job_id: self.job_id.to_string(),
                    from: current,
                    to: stage,
                });
            }
        }
        self.stage = Some(stage);
        self.status = stage.status();
        self.progress = stage.progress();
        self.message = stage.message().to_string();
        Ok(())
    }

    /// Mark the job completed with the final artifact.
    pub fn complete(
        &mut self,
        video_path: impl Into<String>,
        download_url: impl Into<String>,
        message: Option<String>,
    ) -> Result<(), TransitionError> {
        self.check_mutable()?;
        self.stage = Some(JobStage::Completed);
        self.status = JobStatus::Completed;
        self.progress = JobStage::Completed.progress();
        self.message = message.unwrap_or_else(|| JobStage::Completed.message().to_string());
        self.video_path = Some(video_path.into());
        self.download_url = Some(download_url.into());
        Ok(())
    }

    /// Mark the job failed. Progress resets to 0 and no artifact is exposed.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.check_mutable()?;
        let error = error.into();
        self.stage = Some(JobStage::Error);
        self.status = JobStatus::Error;
        self.progress = JobStage::Error.progress();
        self.message = format!("{}: {}", JobStage::Error.message(), error);
        self.video_path = None;
        self.download_url = None;
        self.error = Some(error);
        Ok(())
    }

    fn check_mutable(&self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal {
                job_id: self.job_id.to_string(),
                status: self.status,
            });
        }
        Ok(())
    }
}
