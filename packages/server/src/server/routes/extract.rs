//! Stage 1: text extraction from uploaded page images.

use axum::extract::{Extension, Multipart};
use axum::Json;
use inference_client::ExtractedPage;
use serde::Serialize;
use tracing::info;

use crate::kernel::JobId;
use crate::server::app::AppState;
use crate::server::error::ApiError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractTextResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub extracted_texts: Vec<ExtractedPage>,
    pub total_pages: u32,
}

/// `POST /api/extract-text`
///
/// Multipart upload, one `images` field per page image, in page order.
/// Validation rejects empty uploads, uploads over the image cap, and
/// oversized files outright; no job is created for an invalid upload.
pub async fn extract_text_handler(
    Extension(state): Extension<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractTextResponse>, ApiError> {
    let mut images: Vec<Vec<u8>> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("images") {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read image upload: {}", e)))?;

        if data.len() > state.limits.max_image_bytes {
            return Err(ApiError::Validation(format!(
                "Image {} exceeds the {} byte limit",
                images.len() + 1,
                state.limits.max_image_bytes
            )));
        }

        images.push(data.to_vec());

        if images.len() > state.limits.max_images {
            return Err(ApiError::Validation(format!(
                "At most {} images per upload",
                state.limits.max_images
            )));
        }
    }

    if images.is_empty() {
        return Err(ApiError::Validation("No images provided".to_string()));
    }

    info!(images = images.len(), "Received image upload");

    let (job, pages) = state.pipeline.run_extract(images).await?;

    Ok(Json(ExtractTextResponse {
        job_id: job.id,
        status: "completed",
        extracted_texts: pages,
        total_pages: job.total_images,
    }))
}
