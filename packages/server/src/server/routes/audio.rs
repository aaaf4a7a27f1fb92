//! Stage 3: audio generation, plus download of the finished audio.

use axum::extract::{Extension, Path};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::kernel::JobId;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAudioRequest {
    pub job_id: Option<String>,
    pub text: Option<String>,
    pub voice: Option<String>,
    pub rate: Option<u32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateAudioResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub audio_url: String,
    pub duration_ms: u64,
}

/// `POST /api/generate-audio`
///
/// Synthesizes speech for the refined text and completes the job. The
/// audio stays in memory on the job record; the response carries the URL
/// it can be downloaded from.
pub async fn generate_audio_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<GenerateAudioRequest>,
) -> Result<Json<GenerateAudioResponse>, ApiError> {
    let job_id = request
        .job_id
        .ok_or_else(|| ApiError::Validation("No jobId provided".to_string()))?;
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::Validation(format!("Invalid jobId: {}", job_id)))?;

    let text = request
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("No text provided".to_string()))?;

    let job = state
        .pipeline
        .run_generate(job_id, text, request.voice, request.rate)
        .await?;

    // The store guarantees completed jobs carry audio; a record that
    // lost it anyway is a server fault, not a caller error.
    let audio = job.audio.as_ref().ok_or_else(|| {
        ApiError::Processing(format!("Job {} completed without an audio payload", job.id))
    })?;

    Ok(Json(GenerateAudioResponse {
        job_id: job.id,
        status: "completed",
        audio_url: format!("/api/audio/{}", job.id),
        duration_ms: audio.duration_ms,
    }))
}

/// `GET /api/audio/:job_id`
///
/// Serves the stored audio bytes. 404 until generation has completed.
pub async fn get_audio_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    let job = state.store.get(id).await?;
    let audio = job
        .audio
        .ok_or_else(|| ApiError::NotFound(format!("No audio available for job {}", id)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.mp3\"", id),
            ),
        ],
        audio.bytes,
    )
        .into_response())
}
