//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use slidecast_models::EncodingProfile;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where final videos are written
    pub output_dir: PathBuf,
    /// Where job records are persisted
    pub job_results_dir: PathBuf,
    /// Scratch space; each job gets its own subdirectory
    pub work_dir: PathBuf,
    /// Maximum concurrent external tool invocations, shared by all jobs
    pub max_tool_processes: usize,
    /// Maximum chunks assembled in parallel within a job
    pub chunk_concurrency: usize,
    /// Per-invocation ffmpeg timeout; unset means no limit
    pub tool_timeout_secs: Option<u64>,
    pub profile: EncodingProfile,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            job_results_dir: PathBuf::from("./job_results"),
            work_dir: std::env::temp_dir().join("slidecast"),
            max_tool_processes: 4,
            chunk_concurrency: 1,
            tool_timeout_secs: None,
            profile: EncodingProfile::default(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_dir: std::env::var("OUTPUT_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            job_results_dir: std::env::var("JOB_RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.job_results_dir),
            work_dir: std::env::var("PIPELINE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_tool_processes: std::env::var("PIPELINE_MAX_TOOL_PROCESSES")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_tool_processes),
            chunk_concurrency: std::env::var("PIPELINE_CHUNK_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.chunk_concurrency),
            tool_timeout_secs: std::env::var("PIPELINE_TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0),
            profile: defaults.profile,
        }
    }

    /// Scratch directory of one job.
    pub fn job_work_dir(&self, job_id: &str) -> PathBuf {
        self.work_dir.join(job_id)
    }

    /// Final video path of one job.
    pub fn output_path(&self, job_id: &str) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", job_id))
    }
}

/// Narration rewriting via an OpenRouter-compatible chat endpoint.
#[derive(Debug, Clone)]
pub struct NarrationConfig {
    /// Rewriting is skipped without a key
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout: Duration::from_secs(30),
        }
    }
}

impl NarrationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("OPENROUTER_MODEL").unwrap_or(defaults.model),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let config = PipelineConfig {
            output_dir: PathBuf::from("/srv/out"),
            work_dir: PathBuf::from("/tmp/sc"),
            ..Default::default()
        };
        assert_eq!(config.output_path("job_1"), PathBuf::from("/srv/out/job_1.mp4"));
        assert_eq!(config.job_work_dir("job_1"), PathBuf::from("/tmp/sc/job_1"));
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunk_concurrency, 1);
        assert_eq!(config.max_tool_processes, 4);
        assert!(config.tool_timeout_secs.is_none());
        assert_eq!(NarrationConfig::default().max_tokens, 500);
    }
}
