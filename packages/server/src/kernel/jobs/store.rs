//! In-memory job store.
//!
//! Jobs live for the process lifetime only; there is no persistence by
//! design. The store sits behind [`BaseJobStore`] so a persistent backend
//! can replace it without touching handler logic.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use super::job::{Job, JobId, JobPatch, JobStatus};
use crate::kernel::traits::BaseJobStore;

/// Errors from job store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    /// A patch would produce a record violating a status invariant
    /// (completed without audio, error without a message).
    #[error("Job {status:?} requires {missing}")]
    IncompleteRecord {
        status: JobStatus,
        missing: &'static str,
    },
}

/// RwLock-over-HashMap store. Updates to different jobs do not interfere
/// beyond lock contention; a poll concurrent with an update sees either
/// the old record or the new one, never a partial merge.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(job: &mut Job, patch: JobPatch) -> Result<(), StoreError> {
        // Terminal jobs accept no updates at all, not even field-only
        // merges or a re-assertion of their current status.
        if job.status.is_terminal() {
            return Err(StoreError::IllegalTransition {
                from: job.status,
                to: patch.status.unwrap_or(job.status),
            });
        }
        if let Some(next) = patch.status {
            if next != job.status && !job.status.can_transition_to(next) {
                return Err(StoreError::IllegalTransition {
                    from: job.status,
                    to: next,
                });
            }
        }

        if let Some(current_image) = patch.current_image {
            job.current_image = current_image;
        }
        if let Some(texts) = patch.extracted_texts {
            job.extracted_texts = Some(texts);
        }
        if let Some(text) = patch.refined_text {
            job.refined_text = Some(text);
        }
        if let Some(audio) = patch.audio {
            job.audio = Some(audio);
        }
        if let Some(message) = patch.error_message {
            job.error_message = Some(message);
        }
        if let Some(completed_at) = patch.completed_at {
            job.completed_at = Some(completed_at);
        }
        if let Some(next) = patch.status {
            // Status invariants hold against the merged record.
            if next == JobStatus::Completed && job.audio.is_none() {
                return Err(StoreError::IncompleteRecord {
                    status: next,
                    missing: "an audio payload",
                });
            }
            if next == JobStatus::Error && job.error_message.is_none() {
                return Err(StoreError::IncompleteRecord {
                    status: next,
                    missing: "an error message",
                });
            }
            job.status = next;
        }

        Ok(())
    }
}

#[async_trait]
impl BaseJobStore for MemoryJobStore {
    async fn create(&self, total_images: u32) -> Result<Job, StoreError> {
        let job = Job::new(total_images);
        let mut jobs = self.jobs.write().expect("job map lock poisoned");
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: JobId) -> Result<Job, StoreError> {
        let jobs = self.jobs.read().expect("job map lock poisoned");
        jobs.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: JobId, patch: JobPatch) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().expect("job map lock poisoned");
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        // Validate against a copy so a rejected patch leaves the record
        // untouched even when it fails after partial field merges.
        let mut updated = job.clone();
        Self::apply(&mut updated, patch)?;
        *job = updated.clone();

        Ok(updated)
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().expect("job map lock poisoned");
        jobs.remove(&id).map(|_| ()).ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Vec<Job> {
        let jobs = self.jobs.read().expect("job map lock poisoned");
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by_key(|job| job.created_at);
        all
    }
}
