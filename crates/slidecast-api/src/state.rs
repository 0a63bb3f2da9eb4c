//! Application state.

use std::sync::Arc;

use slidecast_store::{FileJobStore, JobStore};
use slidecast_worker::{Pipeline, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create application state with the file-backed store and production pipeline.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pipeline_config = PipelineConfig::from_env();

        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&pipeline_config.output_dir).await?;
        tokio::fs::create_dir_all(&pipeline_config.work_dir).await?;

        let store: Arc<dyn JobStore> =
            Arc::new(FileJobStore::open(&pipeline_config.job_results_dir).await?);
        let pipeline = Pipeline::from_config(pipeline_config, store)?;

        Ok(Self::with_pipeline(config, Arc::new(pipeline)))
    }

    /// Wrap an already built pipeline; the state shares its store.
    pub fn with_pipeline(config: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            store: pipeline.store().clone(),
            pipeline,
        }
    }
}
