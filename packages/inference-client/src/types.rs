//! Wire types for the inference backend's JSON API.

use serde::{Deserialize, Serialize};

/// Request body for `POST /api/extract-text`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub job_id: String,
    /// Base64-encoded image payloads, one per page, in page order.
    pub images: Vec<String>,
}

/// Response body for `POST /api/extract-text`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub extracted_texts: Vec<ExtractedPage>,
}

/// Text extracted from a single page image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPage {
    pub page_number: u32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

/// Request body for `POST /api/refine-text`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub job_id: String,
    pub extracted_texts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement_instructions: Option<String>,
}

/// Response body for `POST /api/refine-text`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineResponse {
    pub refined_text: String,
    #[serde(default)]
    pub processing_time_ms: Option<u64>,
}

/// Request body for `POST /api/generate-audio`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest {
    pub job_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<u32>,
}

/// Response body for `POST /api/generate-audio`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResponse {
    /// Base64-encoded audio bytes.
    pub audio_data: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Decoded audio output of `generate_audio`.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub audio: Vec<u8>,
    pub duration_ms: u64,
}
