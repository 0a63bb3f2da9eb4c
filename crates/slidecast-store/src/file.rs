//! One JSON file per job.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use slidecast_models::{JobId, JobRecord};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::JobStore;

/// Stores each record at `{dir}/{job_id}.json`.
///
/// Writes go to a uniquely named temporary file in the same directory which is
/// then renamed over the record, so a concurrent reader never observes a torn
/// write.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    dir: PathBuf,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the store directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).await?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, job_id: &JobId) -> StoreResult<PathBuf> {
        if !job_id.is_well_formed() {
            return Err(StoreError::InvalidJobId(job_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", job_id)))
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn save(&self, record: &JobRecord) -> StoreResult<()> {
        let path = self.record_path(&record.job_id)?;
        let payload = serde_json::to_vec_pretty(record)?;

        fs::create_dir_all(&self.dir).await?;
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", record.job_id, uuid::Uuid::new_v4().simple()));

        fs::write(&tmp, &payload).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            if let Err(cleanup) = fs::remove_file(&tmp).await {
                warn!("Failed to remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e.into());
        }

        debug!(
            job_id = %record.job_id,
            status = record.status.as_str(),
            progress = record.progress,
            "Saved job record"
        );
        Ok(())
    }

    async fn load(&self, job_id: &JobId) -> StoreResult<Option<JobRecord>> {
        let path = self.record_path(job_id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                job_id: job_id.to_string(),
                source,
            })
    }
}
