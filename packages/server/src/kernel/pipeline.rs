//! Pipeline service - per-stage orchestration of one conversion job.
//!
//! Each stage endpoint validates at the HTTP boundary, then calls into
//! here: transition the job to the stage's in-progress status, invoke the
//! inference backend, merge the output, transition to the stage's
//! completed status. Any downstream failure marks the job `error` before
//! the caller sees the failure, so a later status poll reflects it even
//! if the triggering response is lost.
//!
//! Progression between stages is driven entirely by the external caller;
//! there is no background worker.

use std::sync::Arc;

use chrono::Utc;
use inference_client::ExtractedPage;
use thiserror::Error;
use tracing::{error, info, warn};

use super::jobs::{AudioPayload, Job, JobId, JobPatch, JobStatus, StoreError};
use super::traits::{BaseInference, BaseJobStore};

/// Failures surfaced by pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pre-flight health check against the inference backend failed.
    #[error("Inference backend unavailable: {0}")]
    Unavailable(String),

    /// The downstream call failed (after the client's internal retries).
    #[error("{0}")]
    Downstream(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates the three downstream stages for a job.
pub struct PipelineService {
    store: Arc<dyn BaseJobStore>,
    inference: Arc<dyn BaseInference>,
}

impl PipelineService {
    pub fn new(store: Arc<dyn BaseJobStore>, inference: Arc<dyn BaseInference>) -> Self {
        Self { store, inference }
    }

    /// Stage 1: create a job for the upload and extract text from the
    /// images. The one stage that originates a job.
    ///
    /// The job is created before the pre-flight health check so that an
    /// unavailable backend leaves an observable `error` record.
    pub async fn run_extract(
        &self,
        images: Vec<Vec<u8>>,
    ) -> Result<(Job, Vec<ExtractedPage>), PipelineError> {
        let job = self.store.create(images.len() as u32).await?;
        info!(job_id = %job.id, images = images.len(), "Starting extraction");

        if !self.inference.is_healthy().await {
            let message = "Inference backend is not reachable".to_string();
            self.mark_error(job.id, &message).await;
            return Err(PipelineError::Unavailable(message));
        }

        self.store
            .update(job.id, JobPatch::status(JobStatus::Extracting))
            .await?;

        let job_id = job.id.to_string();
        match self.inference.extract_pages(&job_id, &images).await {
            Ok(pages) => {
                let job = self
                    .store
                    .update(
                        job.id,
                        JobPatch {
                            status: Some(JobStatus::ExtractingCompleted),
                            current_image: Some(images.len() as u32),
                            extracted_texts: Some(pages.clone()),
                            ..JobPatch::default()
                        },
                    )
                    .await?;
                info!(job_id = %job.id, pages = pages.len(), "Extraction complete");
                Ok((job, pages))
            }
            Err(e) => {
                let message = format!("Text extraction failed: {}", e);
                self.mark_error(job.id, &message).await;
                Err(PipelineError::Downstream(message))
            }
        }
    }

    /// Stage 2: refine extracted texts into one narration text. The job
    /// must already exist; stage 1 is the only origin of jobs.
    pub async fn run_refine(
        &self,
        id: JobId,
        texts: Vec<String>,
        instructions: Option<String>,
    ) -> Result<(Job, String), PipelineError> {
        self.store.get(id).await?;
        info!(job_id = %id, pages = texts.len(), "Starting refinement");

        self.store
            .update(id, JobPatch::status(JobStatus::Refining))
            .await?;

        let job_id = id.to_string();
        match self
            .inference
            .refine(&job_id, &texts, instructions.as_deref())
            .await
        {
            Ok(refined) => {
                let job = self
                    .store
                    .update(
                        id,
                        JobPatch {
                            status: Some(JobStatus::RefiningCompleted),
                            refined_text: Some(refined.clone()),
                            ..JobPatch::default()
                        },
                    )
                    .await?;
                info!(job_id = %id, chars = refined.len(), "Refinement complete");
                Ok((job, refined))
            }
            Err(e) => {
                let message = format!("Text refinement failed: {}", e);
                self.mark_error(id, &message).await;
                Err(PipelineError::Downstream(message))
            }
        }
    }

    /// Stage 3: synthesize speech and complete the job.
    pub async fn run_generate(
        &self,
        id: JobId,
        text: String,
        voice: Option<String>,
        rate: Option<u32>,
    ) -> Result<Job, PipelineError> {
        self.store.get(id).await?;
        info!(job_id = %id, chars = text.len(), "Starting audio generation");

        self.store
            .update(id, JobPatch::status(JobStatus::Generating))
            .await?;

        let job_id = id.to_string();
        match self
            .inference
            .synthesize(&job_id, &text, voice.as_deref(), rate)
            .await
        {
            Ok(synthesis) => {
                let job = self
                    .store
                    .update(
                        id,
                        JobPatch {
                            status: Some(JobStatus::Completed),
                            audio: Some(AudioPayload {
                                bytes: synthesis.audio,
                                duration_ms: synthesis.duration_ms,
                            }),
                            completed_at: Some(Utc::now()),
                            ..JobPatch::default()
                        },
                    )
                    .await?;
                info!(
                    job_id = %id,
                    duration_ms = synthesis.duration_ms,
                    "Audio generation complete"
                );
                Ok(job)
            }
            Err(e) => {
                let message = format!("Audio generation failed: {}", e);
                self.mark_error(id, &message).await;
                Err(PipelineError::Downstream(message))
            }
        }
    }

    /// Persist the error state before the failure propagates. A store
    /// failure here is logged, not surfaced; the original error wins.
    async fn mark_error(&self, id: JobId, message: &str) {
        warn!(job_id = %id, message, "Marking job as failed");
        if let Err(e) = self.store.update(id, JobPatch::error(message)).await {
            error!(job_id = %id, error = %e, "Failed to persist job error state");
        }
    }
}
