//! Deck submission, job status and video download handlers.

use std::path::{Path as FsPath, PathBuf};
use std::str::FromStr;

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use slidecast_models::{JobId, JobRecord, JobStatus, VoiceSpeed};
use slidecast_worker::{spawn_job, validate_deck, JobRequest};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_LANGUAGE: &str = "en";

/// Query parameters of a deck submission.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProcessDeckQuery {
    pub voice_speed: Option<String>,
    /// Speech language tag, e.g. `en` or `pt-BR`
    #[validate(length(min = 2, max = 16))]
    pub language: Option<String>,
}

impl ProcessDeckQuery {
    fn voice_speed(&self) -> ApiResult<VoiceSpeed> {
        match self.voice_speed.as_deref() {
            None => Ok(VoiceSpeed::default()),
            Some(raw) => VoiceSpeed::from_str(raw).map_err(ApiError::validation),
        }
    }

    fn language(&self) -> ApiResult<String> {
        let language = self
            .language
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_LANGUAGE);
        if !is_valid_language(language) {
            return Err(ApiError::validation(format!(
                "unsupported language tag: {}",
                language
            )));
        }
        Ok(language.to_string())
    }
}

/// Accept a presentation and start rendering it.
///
/// Returns:
/// - 202: Initial job record (`processing`, progress 0)
/// - 400: Bad query values or an unreadable presentation
/// - 413: Upload exceeds the size limit
/// - 415: File is not a `.pptx`
pub async fn submit_deck(
    State(state): State<AppState>,
    Query(query): Query<ProcessDeckQuery>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    query
        .validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;
    let voice_speed = query.voice_speed()?;
    let language = query.language()?;

    let job_id = JobId::new();
    let deck = state.config.upload_dir.join(format!("{}.pptx", job_id));

    let mut uploaded = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            uploaded = Some(receive_upload(field, &deck, state.config.max_upload_size).await?);
            break;
        }
    }
    let size = uploaded.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let slides = match check_deck(&deck).await {
        Ok(slides) => slides,
        Err(e) => {
            remove_upload(&deck).await;
            return Err(e);
        }
    };

    let record = JobRecord::new(job_id.clone());
    if let Err(e) = state.store.save(&record).await {
        remove_upload(&deck).await;
        return Err(e.into());
    }

    info!(
        job_id = %job_id,
        slides,
        size,
        voice_speed = %voice_speed,
        language = %language,
        "Deck accepted"
    );
    metrics::record_job_submitted(voice_speed.as_str(), size);

    spawn_job(
        state.pipeline.clone(),
        JobRequest {
            job_id,
            deck,
            voice_speed,
            language,
        },
    );

    Ok((StatusCode::ACCEPTED, Json(record)))
}

/// Current record of a job; never-seen IDs yield an `unknown` record.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    let job_id = JobId::from(job_id);
    if !job_id.is_well_formed() {
        return Err(ApiError::bad_request("Invalid job ID format"));
    }

    Ok(Json(state.store.status(&job_id).await?))
}

/// Stream the finished video as an attachment.
pub async fn download_video(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId::from(job_id);
    if !job_id.is_well_formed() {
        return Err(ApiError::not_found("Job not found"));
    }

    let record = state
        .store
        .load(&job_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;

    let video = match (record.status, record.video_path.as_deref()) {
        (JobStatus::Completed, Some(path)) => PathBuf::from(path),
        _ => return Err(ApiError::not_found("Video not available")),
    };

    let file = match tokio::fs::File::open(&video).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(job_id = %job_id, "Completed job has no video at {}", video.display());
            return Err(ApiError::not_found("Video file not found"));
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    let headers = [
        (header::CONTENT_TYPE, "video/mp4".to_string()),
        (header::CONTENT_LENGTH, length.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.mp4\"", job_id),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

// ============================================================================
// Helpers
// ============================================================================

/// Stream one multipart field to `dest`, enforcing the extension and size limit.
async fn receive_upload(mut field: Field<'_>, dest: &FsPath, limit: usize) -> ApiResult<u64> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    if !is_pptx(&file_name) {
        return Err(ApiError::unsupported_media_type(
            "Only .pptx presentations are supported",
        ));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written: u64 = 0;

    let result = async {
        while let Some(chunk) = field.chunk().await? {
            written += chunk.len() as u64;
            if written > limit as u64 {
                return Err(ApiError::payload_too_large(format!(
                    "Presentation exceeds {} bytes",
                    limit
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(written)
    }
    .await;

    if result.is_err() {
        drop(file);
        remove_upload(dest).await;
    }
    result
}

/// Confirm the upload is a readable presentation; returns its slide count.
async fn check_deck(deck: &FsPath) -> ApiResult<usize> {
    let deck = deck.to_path_buf();
    let slides = tokio::task::spawn_blocking(move || validate_deck(&deck))
        .await
        .map_err(|e| ApiError::internal(format!("Deck validation aborted: {}", e)))??;
    Ok(slides)
}

async fn remove_upload(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove upload {}: {}", path.display(), e);
        }
    }
}

fn is_pptx(file_name: &str) -> bool {
    FsPath::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pptx"))
}

/// Language tags: ASCII letters, digits and `-`, starting with a letter.
fn is_valid_language(tag: &str) -> bool {
    (2..=16).contains(&tag.len())
        && tag.starts_with(|c: char| c.is_ascii_alphabetic())
        && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
