//! Integration tests for the conversion API.
//!
//! Drives the full router with a mock inference backend:
//! - stage endpoints orchestrate job state correctly
//! - validation rejects bad uploads before any job is created
//! - downstream failures become observable `error` jobs

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use server_core::kernel::test_dependencies::{MockInference, MOCK_AUDIO};
use server_core::kernel::{
    BaseJobStore, Job, JobId, JobPatch, JobStatus, MemoryJobStore, StoreError,
};
use server_core::server::{build_app, UploadLimits};

// =============================================================================
// Test Helpers
// =============================================================================

const BOUNDARY: &str = "test-boundary";

fn test_app_with(mock: MockInference) -> (Router, Arc<MemoryJobStore>, Arc<MockInference>) {
    let store = Arc::new(MemoryJobStore::new());
    let mock = Arc::new(mock);
    let app = build_app(store.clone(), mock.clone(), UploadLimits::default());
    (app, store, mock)
}

fn test_app() -> (Router, Arc<MemoryJobStore>, Arc<MockInference>) {
    test_app_with(MockInference::new())
}

/// Build a multipart body with one `images` field per payload.
fn multipart_images(images: &[&[u8]]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (index, image) in images.iter().enumerate() {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"page{}.png\"\r\n",
                index + 1
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
        body.extend_from_slice(image);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}

async fn upload_images(app: &Router, images: &[&[u8]]) -> axum::response::Response {
    let (content_type, body) = multipart_images(images);
    app.clone()
        .oneshot(
            Request::post("/api/extract-text")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn post_json(app: &Router, path: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(app: &Router, path: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

// =============================================================================
// Extraction
// =============================================================================

#[tokio::test]
async fn extract_returns_page_texts_in_input_order() {
    let (app, _store, mock) = test_app();

    let response = upload_images(&app, &[b"first image", b"second image"]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "completed");
    assert!(body["jobId"].as_str().is_some());

    let texts = body["extractedTexts"].as_array().unwrap();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0]["pageNumber"], 1);
    assert_eq!(texts[1]["pageNumber"], 2);

    assert_eq!(mock.extract_calls(), vec![2]);
}

#[tokio::test]
async fn extract_advances_job_to_extracting_completed() {
    let (app, _store, _mock) = test_app();

    let body = body_json(upload_images(&app, &[b"a", b"b"]).await).await;
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let status = body_json(get(&app, &format!("/api/jobs/{}", job_id)).await).await;
    assert_eq!(status["status"], "extracting_completed");
    assert_eq!(status["stage"], 0);
    assert_eq!(status["currentItem"], 2);
    assert_eq!(status["totalItems"], 2);
}

#[tokio::test]
async fn empty_upload_is_rejected_without_creating_a_job() {
    let (app, store, mock) = test_app();

    let response = upload_images(&app, &[]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(store.list().await.is_empty());
    assert!(mock.extract_calls().is_empty());
}

#[tokio::test]
async fn upload_over_the_image_cap_is_rejected() {
    let (app, store, mock) = test_app();

    let images: Vec<Vec<u8>> = (0..51).map(|i| vec![i as u8]).collect();
    let refs: Vec<&[u8]> = images.iter().map(|image| image.as_slice()).collect();

    let response = upload_images(&app, &refs).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("50"));

    assert!(store.list().await.is_empty());
    assert!(mock.extract_calls().is_empty());
}

#[tokio::test]
async fn oversized_image_is_rejected() {
    let store = Arc::new(MemoryJobStore::new());
    let mock = Arc::new(MockInference::new());
    let app = build_app(
        store.clone(),
        mock.clone(),
        UploadLimits {
            max_images: 50,
            max_image_bytes: 8,
        },
    );

    let response = upload_images(&app, &[b"this image is oversized"]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.list().await.is_empty());
}

#[tokio::test]
async fn extract_is_not_idempotent_across_calls() {
    let (app, store, mock) = test_app();

    upload_images(&app, &[b"page"]).await;
    upload_images(&app, &[b"page"]).await;

    // Each upload is a fresh job and a fresh downstream call.
    assert_eq!(store.list().await.len(), 2);
    assert_eq!(mock.extract_calls(), vec![1, 1]);
}

// =============================================================================
// Downstream health and failure
// =============================================================================

#[tokio::test]
async fn unhealthy_backend_gives_503_without_calling_extract() {
    let (app, store, mock) = test_app_with(MockInference::new().unhealthy());

    let response = upload_images(&app, &[b"page"]).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(mock.extract_calls().is_empty());

    // The job was created before the pre-flight check and is observable
    // as failed.
    let jobs = store.list().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Error);
    assert!(jobs[0].error_message.is_some());
}

#[tokio::test]
async fn downstream_failure_marks_the_job_error() {
    let (app, store, _mock) = test_app_with(MockInference::new().failing("model exploded"));

    let response = upload_images(&app, &[b"page"]).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("model exploded"));

    let job_id = store.list().await[0].id;
    let status = body_json(get(&app, &format!("/api/jobs/{}", job_id)).await).await;
    assert_eq!(status["status"], "error");
    assert!(!status["errorMessage"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_downstream_state() {
    let (app, _store, _mock) = test_app();
    let response = get(&app, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["downstream"], "ok");

    let (app, _store, _mock) = test_app_with(MockInference::new().unhealthy());
    let response = get(&app, "/api/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["services"]["downstream"], "unavailable");
    assert_eq!(body["services"]["self"], "ok");
}

// =============================================================================
// Refinement and generation
// =============================================================================

#[tokio::test]
async fn refine_requires_an_existing_job() {
    let (app, _store, mock) = test_app();

    let response = post_json(
        &app,
        "/api/refine-text",
        json!({
            "jobId": uuid::Uuid::new_v4().to_string(),
            "extractedTexts": ["some text"],
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(mock.refine_calls().is_empty());
}

#[tokio::test]
async fn refine_with_missing_fields_is_rejected() {
    let (app, _store, _mock) = test_app();

    let response = post_json(&app, "/api/refine-text", json!({"jobId": null})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(upload_images(&app, &[b"page"]).await).await;
    let response = post_json(
        &app,
        "/api/refine-text",
        json!({"jobId": body["jobId"], "extractedTexts": []}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeating_a_stage_is_rejected_before_the_downstream_call() {
    let (app, _store, mock) = test_app();

    let body = body_json(upload_images(&app, &[b"page"]).await).await;
    let request = json!({"jobId": body["jobId"], "extractedTexts": ["text"]});

    let first = post_json(&app, "/api/refine-text", request.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);

    // The job has already moved past refinement; the FSM rejects going
    // backward and no second downstream call happens.
    let second = post_json(&app, "/api/refine-text", request).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.refine_calls().len(), 1);
}

#[tokio::test]
async fn generate_with_empty_text_is_rejected() {
    let (app, _store, _mock) = test_app();
    let body = body_json(upload_images(&app, &[b"page"]).await).await;

    let response = post_json(
        &app,
        "/api/generate-audio",
        json!({"jobId": body["jobId"], "text": "   "}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generate_passes_voice_and_rate_through() {
    let (app, _store, mock) = test_app();
    let body = body_json(upload_images(&app, &[b"page"]).await).await;

    let response = post_json(
        &app,
        "/api/generate-audio",
        json!({
            "jobId": body["jobId"],
            "text": "read this aloud",
            "voice": "en-gb",
            "rate": 180,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let calls = mock.synthesize_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].text, "read this aloud");
    assert_eq!(calls[0].voice.as_deref(), Some("en-gb"));
    assert_eq!(calls[0].rate, Some(180));
}

/// Store double whose update applies the status change but loses the
/// audio payload, simulating a corrupted completed record.
struct AudioLosingStore {
    job: std::sync::Mutex<Job>,
}

#[async_trait::async_trait]
impl BaseJobStore for AudioLosingStore {
    async fn create(&self, _total_images: u32) -> Result<Job, StoreError> {
        Ok(self.job.lock().unwrap().clone())
    }

    async fn get(&self, _id: JobId) -> Result<Job, StoreError> {
        Ok(self.job.lock().unwrap().clone())
    }

    async fn update(&self, _id: JobId, patch: JobPatch) -> Result<Job, StoreError> {
        let mut job = self.job.lock().unwrap();
        if let Some(status) = patch.status {
            job.status = status;
        }
        job.audio = None;
        Ok(job.clone())
    }

    async fn delete(&self, _id: JobId) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self) -> Vec<Job> {
        vec![self.job.lock().unwrap().clone()]
    }
}

#[tokio::test]
async fn completed_job_without_audio_is_a_server_error_not_a_panic() {
    let mut job = Job::new(1);
    job.status = JobStatus::RefiningCompleted;
    let job_id = job.id;

    let store = Arc::new(AudioLosingStore {
        job: std::sync::Mutex::new(job),
    });
    let app = build_app(store, Arc::new(MockInference::new()), UploadLimits::default());

    let response = post_json(
        &app,
        "/api/generate-audio",
        json!({"jobId": job_id.to_string(), "text": "narration"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("audio"));
}

// =============================================================================
// Status and audio download
// =============================================================================

#[tokio::test]
async fn status_of_unknown_job_is_404() {
    let (app, _store, _mock) = test_app();

    let response = get(&app, &format!("/api/jobs/{}", uuid::Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Non-UUID ids were never created either.
    let response = get(&app, "/api/jobs/not-a-job").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audio_before_generation_is_404() {
    let (app, _store, _mock) = test_app();
    let body = body_json(upload_images(&app, &[b"page"]).await).await;
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let response = get(&app, &format!("/api/audio/{}", job_id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_and_list_jobs() {
    let (app, _store, _mock) = test_app();
    let body = body_json(upload_images(&app, &[b"page"]).await).await;
    let job_id = body["jobId"].as_str().unwrap().to_string();

    let listed = body_json(get(&app, "/api/jobs").await).await;
    assert_eq!(listed["count"], 1);

    let response = app
        .clone()
        .oneshot(
            Request::delete(format!("/api/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let listed = body_json(get(&app, "/api/jobs").await).await;
    assert_eq!(listed["count"], 0);
}

// =============================================================================
// End-to-end
// =============================================================================

#[tokio::test]
async fn two_images_end_to_end_to_audio_download() {
    let (app, _store, _mock) = test_app();

    // Stage 1: upload two page images.
    let extract = body_json(upload_images(&app, &[b"page one", b"page two"]).await).await;
    let job_id = extract["jobId"].as_str().unwrap().to_string();
    let texts: Vec<String> = extract["extractedTexts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|page| page["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts.len(), 2);

    // Stage 2: refine into one narration text.
    let refine = body_json(
        post_json(
            &app,
            "/api/refine-text",
            json!({"jobId": job_id, "extractedTexts": texts}),
        )
        .await,
    )
    .await;
    let refined = refine["refinedText"].as_str().unwrap().to_string();
    assert!(refined.contains("Text of page 1"));
    assert!(refined.contains("Text of page 2"));

    // Stage 3: synthesize audio.
    let generate = body_json(
        post_json(
            &app,
            "/api/generate-audio",
            json!({"jobId": job_id, "text": refined}),
        )
        .await,
    )
    .await;
    assert_eq!(generate["status"], "completed");
    let audio_url = generate["audioUrl"].as_str().unwrap().to_string();
    assert_eq!(generate["durationMs"], 1234);

    // Job is terminal.
    let status = body_json(get(&app, &format!("/api/jobs/{}", job_id)).await).await;
    assert_eq!(status["status"], "completed");
    assert_eq!(status["stage"], 2);

    // Download the exact synthesized bytes.
    let response = get(&app, &audio_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "audio/mpeg"
    );
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .starts_with("attachment"));
    assert_eq!(body_bytes(response).await, MOCK_AUDIO);
}
