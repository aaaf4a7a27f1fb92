// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. Stage
// orchestration lives in the pipeline service and talks to the outside
// world exclusively through these seams.
//
// Naming convention: Base* for trait names (e.g., BaseJobStore)

use anyhow::Result;
use async_trait::async_trait;
use inference_client::{ExtractedPage, Synthesis};

use super::jobs::{Job, JobId, JobPatch, StoreError};

// =============================================================================
// Job Store Trait
// =============================================================================

/// Storage seam for job records. The in-memory implementation is the only
/// one today; a persistent backend slots in here without handler changes.
#[async_trait]
pub trait BaseJobStore: Send + Sync {
    /// Allocate a new job tracking `total_images` page images.
    async fn create(&self, total_images: u32) -> Result<Job, StoreError>;

    /// Fetch a job by id.
    async fn get(&self, id: JobId) -> Result<Job, StoreError>;

    /// Merge `patch` into the job. The merge is atomic per call and
    /// rejects status transitions the FSM does not allow.
    async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, StoreError>;

    /// Remove a job (administrative).
    async fn delete(&self, id: JobId) -> Result<(), StoreError>;

    /// All jobs, oldest first (administrative).
    async fn list(&self) -> Vec<Job>;
}

// =============================================================================
// Inference Trait (the downstream ML backend)
// =============================================================================

#[async_trait]
pub trait BaseInference: Send + Sync {
    /// Check backend liveness. Never errors; a failed check is `false`.
    async fn is_healthy(&self) -> bool;

    /// Extract text from page images (vision model).
    async fn extract_pages(&self, job_id: &str, images: &[Vec<u8>]) -> Result<Vec<ExtractedPage>>;

    /// Refine extracted page texts into one narration text (language model).
    async fn refine(
        &self,
        job_id: &str,
        texts: &[String],
        instructions: Option<&str>,
    ) -> Result<String>;

    /// Synthesize speech for the given text (TTS).
    async fn synthesize(
        &self,
        job_id: &str,
        text: &str,
        voice: Option<&str>,
        rate: Option<u32>,
    ) -> Result<Synthesis>;
}
