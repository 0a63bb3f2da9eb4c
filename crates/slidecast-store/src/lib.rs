//! Job state persistence.
//!
//! Every status change of a job is written here as a full snapshot; readers
//! always see either the previous or the new record, never a partial one.

pub mod error;
pub mod file;
pub mod memory;

use async_trait::async_trait;
use slidecast_models::{JobId, JobRecord};

pub use error::{StoreError, StoreResult};
pub use file::FileJobStore;
pub use memory::MemoryJobStore;

/// Durable keyed storage of job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Replace the record for `record.job_id`.
    async fn save(&self, record: &JobRecord) -> StoreResult<()>;

    /// Latest saved record, if any.
    async fn load(&self, job_id: &JobId) -> StoreResult<Option<JobRecord>>;

    /// Latest record, or an `unknown` record when the job was never saved.
    async fn status(&self, job_id: &JobId) -> StoreResult<JobRecord> {
        Ok(self
            .load(job_id)
            .await?
            .unwrap_or_else(|| JobRecord::unknown(job_id.clone())))
    }
}
