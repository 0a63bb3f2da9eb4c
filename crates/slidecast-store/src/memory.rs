//! In-process store, used by tests and single-node setups without a disk.

use std::collections::HashMap;

use async_trait::async_trait;
use slidecast_models::{JobId, JobRecord};
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::JobStore;

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record saved so far.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, record: &JobRecord) -> StoreResult<()> {
        self.records
            .write()
            .await
            .insert(record.job_id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, job_id: &JobId) -> StoreResult<Option<JobRecord>> {
        Ok(self.records.read().await.get(job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecast_models::JobStatus;

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryJobStore::new();
        let id = JobId::new();
        assert_eq!(store.status(&id).await.unwrap().status, JobStatus::Unknown);

        let mut record = JobRecord::new(id.clone());
        record.fail("boom").unwrap();
        store.save(&record).await.unwrap();

        let loaded = store.status(&id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Error);
        assert_eq!(store.len().await, 1);
    }
}
