//! Bounded pool for external tool invocations.
//!
//! Every ffmpeg, ffprobe and speech synthesis call holds a permit for its
//! whole duration. The pool is shared by all jobs in the process, so the total
//! number of running tools never exceeds its capacity.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone)]
pub struct ToolPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ToolPool {
    /// `capacity` is clamped to at least one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a permit.
    pub async fn acquire(&self) -> PipelineResult<OwnedSemaphorePermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::ToolPoolClosed)?;
        trace!("Tool permit acquired ({} left)", self.available());
        Ok(permit)
    }

    /// Run `fut` while holding a permit.
    pub async fn run<F, T>(&self, fut: F) -> PipelineResult<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(fut.await)
    }
}
