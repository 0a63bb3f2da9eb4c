//! Structured job logging.
//!
//! Every event carries `job_id` and `operation` so a single deck can be
//! followed through the logs of a busy server.

use slidecast_models::{JobId, JobStage};
use tracing::{error, info, warn, Span};

use crate::cleanup::CleanupReport;
use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: &'static str,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, operation = self.operation, "Job started: {}", message);
    }

    /// Stage entry, logged after the stage has been persisted.
    pub fn log_stage(&self, stage: JobStage) {
        info!(
            job_id = %self.job_id,
            operation = self.operation,
            stage = stage.as_str(),
            progress = stage.progress(),
            "{}", stage.message()
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, operation = self.operation, "{}", message);
    }

    pub fn log_failure(&self, err: &PipelineError) {
        error!(
            job_id = %self.job_id,
            operation = self.operation,
            severity = err.severity().as_str(),
            "Job failed: {}", err
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, operation = self.operation, "Job completed: {}", message);
    }

    pub fn log_cleanup(&self, report: &CleanupReport) {
        if report.failed > 0 {
            warn!(
                job_id = %self.job_id,
                removed = report.removed,
                failed = report.failed,
                "Some temp artifacts could not be removed"
            );
        } else {
            info!(
                job_id = %self.job_id,
                removed = report.removed,
                missing = report.missing,
                "Temp artifacts removed"
            );
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span carrying the job context, for instrumenting whole job tasks.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, operation = self.operation)
    }
}
