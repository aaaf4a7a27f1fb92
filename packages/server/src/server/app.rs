//! Application setup and server configuration.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::{BaseInference, BaseJobStore, PipelineService};
use crate::server::routes::{
    delete_job_handler, extract_text_handler, generate_audio_handler, get_audio_handler,
    get_job_status_handler, health_handler, list_jobs_handler, refine_text_handler,
};

/// Upload validation limits for the extract endpoint.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_images: usize,
    pub max_image_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_images: 50,
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BaseJobStore>,
    pub inference: Arc<dyn BaseInference>,
    pub pipeline: Arc<PipelineService>,
    pub limits: UploadLimits,
}

/// Build the Axum application router
pub fn build_app(
    store: Arc<dyn BaseJobStore>,
    inference: Arc<dyn BaseInference>,
    limits: UploadLimits,
) -> Router {
    let pipeline = Arc::new(PipelineService::new(store.clone(), inference.clone()));

    let app_state = AppState {
        store,
        inference,
        pipeline,
        limits,
    };

    // CORS configuration - the browser client is served from a separate
    // origin in development
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    // The extract endpoint receives the whole upload in one request.
    let body_limit = limits.max_images * limits.max_image_bytes + 1024 * 1024;

    Router::new()
        .route("/api/extract-text", post(extract_text_handler))
        .route("/api/refine-text", post(refine_text_handler))
        .route("/api/generate-audio", post(generate_audio_handler))
        .route(
            "/api/jobs/:job_id",
            get(get_job_status_handler).delete(delete_job_handler),
        )
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/audio/:job_id", get(get_audio_handler))
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
