//! Stage 2: refinement of extracted texts into one narration text.

use axum::extract::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::kernel::JobId;
use crate::server::app::AppState;
use crate::server::error::ApiError;

// Fields are optional so missing ones surface as 400s with a useful
// message instead of a deserialization rejection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineTextRequest {
    pub job_id: Option<String>,
    pub extracted_texts: Option<Vec<String>>,
    pub refinement_instructions: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineTextResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub refined_text: String,
}

/// `POST /api/refine-text`
///
/// The job must have been created by a prior extract call; an unknown
/// `jobId` is a 404, not a correlation token.
pub async fn refine_text_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<RefineTextRequest>,
) -> Result<Json<RefineTextResponse>, ApiError> {
    let job_id = request
        .job_id
        .ok_or_else(|| ApiError::Validation("No jobId provided".to_string()))?;
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::Validation(format!("Invalid jobId: {}", job_id)))?;

    let texts = request
        .extracted_texts
        .filter(|texts| !texts.is_empty())
        .ok_or_else(|| ApiError::Validation("No text provided".to_string()))?;

    let (job, refined) = state
        .pipeline
        .run_refine(job_id, texts, request.refinement_instructions)
        .await?;

    Ok(Json(RefineTextResponse {
        job_id: job.id,
        status: "completed",
        refined_text: refined,
    }))
}
