//! Job status polling and administrative job endpoints.

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::kernel::{Job, JobId};
use crate::server::app::AppState;
use crate::server::error::ApiError;

/// Coarse progress view the browser polls between stages.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_id: JobId,
    /// 0 = extraction, 1 = refinement, 2 = generation/completed.
    pub stage: u8,
    pub current_item: u32,
    pub total_items: u32,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&Job> for JobStatusResponse {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id,
            stage: job.stage(),
            current_item: job.current_image,
            total_items: job.total_images,
            status: job.status.as_str(),
            error_message: job.error_message.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobStatusResponse>,
    pub count: usize,
}

/// `GET /api/jobs/:job_id`
pub async fn get_job_status_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    let job = state.store.get(id).await?;
    Ok(Json(JobStatusResponse::from(&job)))
}

/// `GET /api/jobs` (administrative)
pub async fn list_jobs_handler(
    Extension(state): Extension<AppState>,
) -> Json<JobListResponse> {
    let jobs = state.store.list().await;
    Json(JobListResponse {
        count: jobs.len(),
        jobs: jobs.iter().map(JobStatusResponse::from).collect(),
    })
}

/// `DELETE /api/jobs/:job_id` (administrative)
pub async fn delete_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    state.store.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
