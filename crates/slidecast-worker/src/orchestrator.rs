//! Job orchestration.
//!
//! A job walks `queued -> extracting -> transcribing -> imaging -> rendering ->
//! completed`. Every stage entry is persisted before the stage does any work,
//! so a poller always sees the last stage that actually started. Any fatal
//! error moves the job to `error`; temporary artifacts are removed whatever
//! the outcome.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use slidecast_media::{FfmpegBackend, MediaBackend};
use slidecast_models::{JobId, JobRecord, JobStage, SlideUnit, VoiceSpeed};
use slidecast_store::JobStore;
use slidecast_voice::{FallbackSynthesizer, SpeechSynthesizer, VoiceConfig};
use tokio::task::JoinHandle;
use tracing::{error, warn, Instrument};

use crate::assembler::{ChunkAssembler, ChunkOutcome};
use crate::audio::{SilenceReason, SlideAudioGenerator};
use crate::cleanup::TempRegistry;
use crate::concat::Concatenator;
use crate::config::{NarrationConfig, PipelineConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::extract::{PptxExtractor, SlideExtractor};
use crate::logging::JobLogger;
use crate::narration::{narrator_from_config, NarrationWriter};
use crate::planner::plan_chunks;
use crate::pool::ToolPool;

const OPERATION: &str = "render_deck";

/// Route prefix under which finished videos are served.
pub const DOWNLOAD_ROUTE: &str = "/api/tts/download";

/// Download URL of a job's video.
pub fn download_url(job_id: &JobId) -> String {
    format!("{}/{}", DOWNLOAD_ROUTE, job_id)
}

/// One accepted submission.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: JobId,
    /// Uploaded presentation; deleted when the job ends
    pub deck: PathBuf,
    pub voice_speed: VoiceSpeed,
    pub language: String,
}

/// Collaborators the pipeline renders through.
pub struct PipelineComponents {
    pub media: Arc<dyn MediaBackend>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub extractor: Arc<dyn SlideExtractor>,
    pub narrator: Arc<dyn NarrationWriter>,
}

pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn JobStore>,
    pool: ToolPool,
    extractor: Arc<dyn SlideExtractor>,
    narrator: Arc<dyn NarrationWriter>,
    assembler: Arc<ChunkAssembler>,
    concatenator: Concatenator,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn JobStore>,
        pool: ToolPool,
        components: PipelineComponents,
    ) -> Self {
        let audio = SlideAudioGenerator::new(components.synthesizer, pool.clone());
        let assembler = Arc::new(ChunkAssembler::new(
            audio,
            components.media.clone(),
            pool.clone(),
            config.profile.clone(),
        ));
        let concatenator =
            Concatenator::new(components.media, pool.clone(), config.profile.clone());

        Self {
            config,
            store,
            pool,
            extractor: components.extractor,
            narrator: components.narrator,
            assembler,
            concatenator,
        }
    }

    /// Production wiring: ffmpeg, PPTX extraction and providers from the environment.
    pub fn from_config(config: PipelineConfig, store: Arc<dyn JobStore>) -> PipelineResult<Self> {
        let pool = ToolPool::new(config.max_tool_processes);
        let media: Arc<dyn MediaBackend> = Arc::new(match config.tool_timeout_secs {
            Some(secs) => FfmpegBackend::with_timeout(secs),
            None => FfmpegBackend::new(),
        });
        let synthesizer = Arc::new(FallbackSynthesizer::from_config(&VoiceConfig::from_env())?);
        let extractor = Arc::new(PptxExtractor::new(
            media.clone(),
            pool.clone(),
            config.profile.clone(),
        ));
        let narrator = narrator_from_config(NarrationConfig::from_env())?;

        let components = PipelineComponents {
            media,
            synthesizer,
            extractor,
            narrator,
        };
        Ok(Self::new(config, store, pool, components))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn pool(&self) -> &ToolPool {
        &self.pool
    }

    /// Run a job to completion or failure and return its final record.
    pub async fn run(&self, request: JobRequest) -> JobRecord {
        let registry = Arc::new(TempRegistry::new());
        self.run_with_registry(request, &registry).await
    }

    /// Like `run`, with temporary artifacts tracked in a caller-owned registry.
    pub async fn run_with_registry(
        &self,
        request: JobRequest,
        registry: &Arc<TempRegistry>,
    ) -> JobRecord {
        let logger = JobLogger::new(&request.job_id, OPERATION);
        logger.log_start(&format!(
            "deck={} voice_speed={} language={}",
            request.deck.display(),
            request.voice_speed,
            request.language
        ));

        let scratch = self.config.job_work_dir(request.job_id.as_str());
        registry.register(&request.deck);
        registry.register(&scratch);

        let mut record = JobRecord::new(request.job_id.clone());
        let result = match self.initial_record(&request.job_id).await {
            Ok(initial) if initial.is_terminal() => {
                logger.log_warning(&format!("Job already {}, not running again", initial.status));
                logger.log_cleanup(&registry.cleanup().await);
                return initial;
            }
            Ok(initial) => {
                record = initial;
                self.execute(&request, &scratch, &mut record, registry, &logger)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            logger.log_failure(&e);
            self.discard_output(&request.job_id).await;
            record = self.record_failure(record, &e).await;
        } else {
            metrics::counter!("slidecast_jobs_completed_total").increment(1);
            logger.log_completion(&record.message);
        }

        logger.log_cleanup(&registry.cleanup().await);
        record
    }

    /// Latest record of a job that is about to start, saving a fresh one if needed.
    async fn initial_record(&self, job_id: &JobId) -> PipelineResult<JobRecord> {
        match self.store.load(job_id).await? {
            Some(record) => Ok(record),
            None => {
                let record = JobRecord::new(job_id.clone());
                self.store.save(&record).await?;
                Ok(record)
            }
        }
    }

    async fn execute(
        &self,
        request: &JobRequest,
        scratch: &Path,
        record: &mut JobRecord,
        registry: &Arc<TempRegistry>,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        tokio::fs::create_dir_all(scratch).await?;

        self.enter(record, JobStage::Extracting, logger).await?;
        let texts = self.extractor.extract_texts(&request.deck).await?;
        if texts.is_empty() {
            return Err(PipelineError::invalid_deck("presentation has no slides"));
        }

        self.enter(record, JobStage::Transcribing, logger).await?;
        let narrations = self.narrator.write(&texts).await;
        if narrations.len() < texts.len() {
            logger.log_warning(&format!(
                "Narrator returned {} of {} narrations, missing slides render silent",
                narrations.len(),
                texts.len()
            ));
        }

        self.enter(record, JobStage::Imaging, logger).await?;
        let images = self
            .extractor
            .extract_images(&request.deck, &scratch.join("images"), texts.len())
            .await?;

        self.enter(record, JobStage::Rendering, logger).await?;
        let units = SlideUnit::zip(images, narrations);
        let (video, summary) = self.render(request, units, scratch, registry, logger).await?;

        let mut finished = record.clone();
        finished.complete(
            video.to_string_lossy(),
            download_url(&request.job_id),
            Some(summary.completion_message()),
        )?;
        self.store.save(&finished).await?;
        *record = finished;
        Ok(())
    }

    async fn enter(
        &self,
        record: &mut JobRecord,
        stage: JobStage,
        logger: &JobLogger,
    ) -> PipelineResult<()> {
        record.advance(stage)?;
        self.store.save(record).await?;
        logger.log_stage(stage);
        Ok(())
    }

    /// Assemble every chunk, then join the chunk videos into the final video.
    async fn render(
        &self,
        request: &JobRequest,
        units: Vec<SlideUnit>,
        scratch: &Path,
        registry: &Arc<TempRegistry>,
        logger: &JobLogger,
    ) -> PipelineResult<(PathBuf, RenderSummary)> {
        let slides = units.len();
        let chunks = plan_chunks(units, scratch);
        logger.log_progress(&format!(
            "Rendering {} slides in {} chunks (concurrency {})",
            slides,
            chunks.len(),
            self.config.chunk_concurrency
        ));

        // Each task owns its inputs so the job future stays Send across spawn
        let tasks: Vec<_> = chunks
            .into_iter()
            .map(|chunk| {
                let assembler = self.assembler.clone();
                let registry = registry.clone();
                let scratch = scratch.to_path_buf();
                let language = request.language.clone();
                let speed = request.voice_speed;
                async move {
                    assembler
                        .assemble(&chunk, &scratch, speed, &language, &registry)
                        .await
                }
            })
            .collect();

        let mut outcomes: Vec<ChunkOutcome> = stream::iter(tasks)
            .buffer_unordered(self.config.chunk_concurrency.max(1))
            .try_collect()
            .await?;
        outcomes.sort_by_key(|o| o.index);

        let summary = RenderSummary::from_outcomes(slides, &outcomes);
        let artifacts: Vec<PathBuf> = outcomes.into_iter().filter_map(|o| o.output).collect();

        let output = self.config.output_path(request.job_id.as_str());
        let video = self
            .concatenator
            .join(&artifacts, &output, scratch, registry)
            .await?
            .ok_or(PipelineError::NoArtifacts)?;
        Ok((video, summary))
    }

    async fn record_failure(&self, mut record: JobRecord, err: &PipelineError) -> JobRecord {
        metrics::counter!("slidecast_jobs_failed_total").increment(1);

        if let Err(e) = record.fail(err.to_string()) {
            warn!("Not recording failure: {}", e);
            return record;
        }
        if let Err(e) = self.store.save(&record).await {
            error!(job_id = %record.job_id, "Failed to persist job failure: {}", e);
        }
        record
    }

    /// Mark a job failed from outside its task.
    async fn fail_job(&self, job_id: &JobId, err: &PipelineError) {
        let record = match self.store.load(job_id).await {
            Ok(Some(record)) => record,
            Ok(None) => JobRecord::new(job_id.clone()),
            Err(e) => {
                error!(job_id = %job_id, "Failed to load job record: {}", e);
                JobRecord::new(job_id.clone())
            }
        };
        if record.is_terminal() {
            return;
        }
        self.record_failure(record, err).await;
    }

    async fn discard_output(&self, job_id: &JobId) {
        let output = self.config.output_path(job_id.as_str());
        match tokio::fs::remove_file(&output).await {
            Ok(()) => warn!(job_id = %job_id, "Removed partial output {}", output.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(job_id = %job_id, "Failed to remove {}: {}", output.display(), e),
        }
    }
}

/// Start a job in the background.
///
/// The job runs in its own task; a panic inside it is caught here, recorded as
/// a job failure, and followed by cleanup of everything the job registered.
pub fn spawn_job(pipeline: Arc<Pipeline>, request: JobRequest) -> JoinHandle<()> {
    let logger = JobLogger::new(&request.job_id, OPERATION);
    let span = logger.create_span();

    tokio::spawn(
        async move {
            let job_id = request.job_id.clone();
            let registry = Arc::new(TempRegistry::new());

            let task = {
                let pipeline = pipeline.clone();
                let registry = registry.clone();
                tokio::spawn(
                    async move {
                        pipeline.run_with_registry(request, &registry).await;
                    }
                    .in_current_span(),
                )
            };

            let Err(join_err) = task.await else {
                return;
            };

            let reason = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            error!(job_id = %job_id, "Job task aborted: {}", reason);

            pipeline.discard_output(&job_id).await;
            pipeline
                .fail_job(&job_id, &PipelineError::TaskPanicked(reason))
                .await;
            logger.log_cleanup(&registry.cleanup().await);
        }
        .instrument(span),
    )
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// What made it into the final video, for the completion message.
#[derive(Debug, Default, Clone, PartialEq)]
struct RenderSummary {
    slides: usize,
    rendered: usize,
    /// Image missing
    skipped: usize,
    /// Lost with a chunk that failed to render
    dropped: usize,
    silent: Vec<SilenceReason>,
}

impl RenderSummary {
    fn from_outcomes(slides: usize, outcomes: &[ChunkOutcome]) -> Self {
        let mut summary = Self {
            slides,
            ..Default::default()
        };
        for outcome in outcomes {
            summary.skipped += outcome.skipped;
            if outcome.output.is_some() {
                summary.rendered += outcome.rendered;
                summary.silent.extend(outcome.silent.iter().cloned());
            } else {
                summary.dropped += outcome.rendered;
            }
        }
        summary
    }

    fn completion_message(&self) -> String {
        let mut notes = Vec::new();

        if !self.silent.is_empty() {
            let mut reasons: BTreeMap<&str, usize> = BTreeMap::new();
            for reason in &self.silent {
                *reasons.entry(reason.describe()).or_default() += 1;
            }
            let reasons: Vec<String> = reasons
                .into_iter()
                .map(|(reason, count)| format!("{}: {}", reason, count))
                .collect();
            notes.push(format!(
                "{} of {} slides silent ({})",
                self.silent.len(),
                self.rendered,
                reasons.join(", ")
            ));
        }
        if self.skipped > 0 {
            notes.push(format!("{} slides skipped, image missing", self.skipped));
        }
        if self.dropped > 0 {
            notes.push(format!("{} slides dropped, chunk render failed", self.dropped));
        }

        let base = JobStage::Completed.message();
        if notes.is_empty() {
            base.to_string()
        } else {
            format!("{} ({})", base, notes.join("; "))
        }
    }
}
