//! Router tests against an in-memory store and fake media tools.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::Value;
use slidecast_api::{create_router, ApiConfig, AppState};
use slidecast_media::{MediaBackend, MediaError, MediaResult, SlideClip};
use slidecast_models::{EncodingProfile, JobId, JobRecord};
use slidecast_store::{JobStore, MemoryJobStore};
use slidecast_voice::{SpeechSynthesizer, VoiceResult};
use slidecast_worker::{
    PassthroughNarrator, Pipeline, PipelineComponents, PipelineConfig, PptxExtractor, ToolPool,
};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "slidecast-test-boundary";

/// Writes the rendered image names, one per line, as the "video".
struct TestMedia;

#[async_trait]
impl MediaBackend for TestMedia {
    async fn probe_duration(&self, _audio: &Path) -> MediaResult<f64> {
        Ok(2.0)
    }

    async fn render_slides(
        &self,
        clips: &[SlideClip],
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        let names: Vec<String> = clips
            .iter()
            .map(|c| c.image.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        tokio::fs::write(output, names.join("\n")).await?;
        Ok(())
    }

    async fn concat_stream_copy(&self, _manifest: &Path, _output: &Path) -> MediaResult<()> {
        Err(MediaError::EmptyInput("stream copy not supported".to_string()))
    }

    async fn concat_reencode(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        let mut joined = Vec::new();
        for input in inputs {
            joined.push(tokio::fs::read_to_string(input).await?);
        }
        tokio::fs::write(output, joined.join("\n")).await?;
        Ok(())
    }

    async fn render_placeholder(
        &self,
        label: &str,
        output: &Path,
        _profile: &EncodingProfile,
    ) -> MediaResult<()> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(output, format!("PNG {}", label)).await?;
        Ok(())
    }
}

struct TestSynthesizer;

#[async_trait]
impl SpeechSynthesizer for TestSynthesizer {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn synthesize(&self, text: &str, _language: &str, _slow: bool) -> VoiceResult<Bytes> {
        Ok(Bytes::from(format!("ID3 {}", text)))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryJobStore>,
    upload_dir: PathBuf,
    _dir: TempDir,
}

fn test_app(max_upload_size: usize) -> TestApp {
    let dir = TempDir::new().unwrap();
    let upload_dir = dir.path().join("uploads");
    std::fs::create_dir_all(&upload_dir).unwrap();

    let pipeline_config = PipelineConfig {
        output_dir: dir.path().join("output"),
        job_results_dir: dir.path().join("job_results"),
        work_dir: dir.path().join("work"),
        ..Default::default()
    };
    std::fs::create_dir_all(&pipeline_config.job_results_dir).unwrap();

    let store = Arc::new(MemoryJobStore::new());
    let pool = ToolPool::new(2);
    let media: Arc<dyn MediaBackend> = Arc::new(TestMedia);
    let extractor = Arc::new(PptxExtractor::new(
        media.clone(),
        pool.clone(),
        pipeline_config.profile.clone(),
    ));
    let components = PipelineComponents {
        media,
        synthesizer: Arc::new(TestSynthesizer),
        extractor,
        narrator: Arc::new(PassthroughNarrator),
    };
    let pipeline = Pipeline::new(pipeline_config, store.clone(), pool, components);

    let config = ApiConfig {
        upload_dir: upload_dir.clone(),
        max_upload_size,
        ..Default::default()
    };
    let state = AppState::with_pipeline(config, Arc::new(pipeline));

    TestApp {
        router: create_router(state, None),
        store,
        upload_dir,
        _dir: dir,
    }
}

fn pptx_bytes(slides: &[&str]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();
    for (i, text) in slides.iter().enumerate() {
        zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
            .unwrap();
        write!(
            zip,
            r#"<p:sld><p:cSld><p:spTree><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:spTree></p:cSld></p:sld>"#,
            text
        )
        .unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn multipart_body(field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    write!(
        body,
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        BOUNDARY, field, file_name
    )
    .unwrap();
    body.extend_from_slice(content);
    write!(body, "\r\n--{}--\r\n", BOUNDARY).unwrap();
    body
}

fn upload_request(query: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/tts/process-pptx{}", query))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn uploads_left(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_health() {
    let app = test_app(1024 * 1024);
    let response = app.router.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_status_of_unseen_job_is_unknown() {
    let app = test_app(1024 * 1024);
    let response = app
        .router
        .oneshot(get("/api/tts/job-status/slidecast_1700000000000_deadbeef"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "unknown");
    assert_eq!(json["progress"], 0);
    assert_eq!(json["job_id"], "slidecast_1700000000000_deadbeef");
}

#[tokio::test]
async fn test_status_rejects_malformed_id() {
    let app = test_app(1024 * 1024);
    let response = app
        .router
        .oneshot(get("/api/tts/job-status/short"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .contains("Invalid job ID"));
}

#[tokio::test]
async fn test_download_requires_completed_job() {
    let app = test_app(1024 * 1024);

    let response = app
        .router
        .clone()
        .oneshot(get("/api/tts/download/slidecast_1700000000000_deadbeef"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let running = JobRecord::new(JobId::from_string("slidecast_1700000000000_cafef00d"));
    app.store.save(&running).await.unwrap();
    let response = app
        .router
        .oneshot(get("/api/tts/download/slidecast_1700000000000_cafef00d"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_missing_video_file() {
    let app = test_app(1024 * 1024);
    let mut record = JobRecord::new(JobId::from_string("slidecast_1700000000000_0badf11e"));
    record
        .complete("/no/such/video.mp4", "/api/tts/download/x", None)
        .unwrap();
    app.store.save(&record).await.unwrap();

    let response = app
        .router
        .oneshot(get("/api/tts/download/slidecast_1700000000000_0badf11e"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_rejects_other_extensions() {
    let app = test_app(1024 * 1024);
    let body = multipart_body("file", "deck.key", &pptx_bytes(&["Hello"]));

    let response = app.router.oneshot(upload_request("", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(uploads_left(&app.upload_dir), 0);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_submit_rejects_oversized_upload() {
    let app = test_app(64);
    let body = multipart_body("file", "deck.pptx", &pptx_bytes(&["Hello"]));

    let response = app.router.oneshot(upload_request("", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(uploads_left(&app.upload_dir), 0);
}

#[tokio::test]
async fn test_submit_rejects_unreadable_deck() {
    let app = test_app(1024 * 1024);
    let body = multipart_body("file", "deck.pptx", b"definitely not a zip archive");

    let response = app.router.oneshot(upload_request("", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(uploads_left(&app.upload_dir), 0);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_submit_rejects_bad_query_values() {
    let app = test_app(1024 * 1024);

    let body = multipart_body("file", "deck.pptx", &pptx_bytes(&["Hello"]));
    let response = app
        .router
        .clone()
        .oneshot(upload_request("?voice_speed=warp", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = multipart_body("file", "deck.pptx", &pptx_bytes(&["Hello"]));
    let response = app
        .router
        .oneshot(upload_request("?language=x", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(uploads_left(&app.upload_dir), 0);
}

#[tokio::test]
async fn test_submit_requires_file_field() {
    let app = test_app(1024 * 1024);
    let body = multipart_body("attachment", "deck.pptx", &pptx_bytes(&["Hello"]));

    let response = app.router.oneshot(upload_request("", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_renders_and_serves_video() {
    let app = test_app(1024 * 1024);
    let body = multipart_body("file", "Lecture.PPTX", &pptx_bytes(&["Welcome", "Thanks"]));

    let response = app
        .router
        .clone()
        .oneshot(upload_request("?voice_speed=slow&language=en", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let accepted = body_json(response).await;
    assert_eq!(accepted["status"], "processing");
    assert_eq!(accepted["progress"], 0);
    let job_id = accepted["job_id"].as_str().unwrap().to_string();

    let mut finished = None;
    for _ in 0..200 {
        let response = app
            .router
            .clone()
            .oneshot(get(&format!("/api/tts/job-status/{}", job_id)))
            .await
            .unwrap();
        let json = body_json(response).await;
        if json["status"] != "processing" && uploads_left(&app.upload_dir) == 0 {
            finished = Some(json);
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    let finished = finished.expect("job did not finish");
    assert_eq!(finished["status"], "completed", "record: {}", finished);
    assert_eq!(finished["progress"], 100);
    assert_eq!(
        finished["download_url"],
        format!("/api/tts/download/{}", job_id)
    );

    let response = app
        .router
        .oneshot(get(&format!("/api/tts/download/{}", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"{}.mp4\"", job_id).as_str()
    );

    let video = String::from_utf8(body_bytes(response).await).unwrap();
    let first = video.find("slide_1.png").unwrap();
    let second = video.find("slide_2.png").unwrap();
    assert!(first < second);
}
