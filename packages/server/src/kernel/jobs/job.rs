//! Job model for image-to-audiobook conversions.
//!
//! A job tracks one upload through the three downstream stages (extract,
//! refine, synthesize). Status moves forward only; the legal transition
//! set is encoded here and enforced by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use inference_client::ExtractedPage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Opaque job identifier, allocated at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Uploading,
    Extracting,
    ExtractingCompleted,
    Refining,
    RefiningCompleted,
    Generating,
    Completed,
    Error,
}

impl JobStatus {
    /// Position along the forward chain; Error has no rank.
    fn rank(&self) -> Option<u8> {
        match self {
            JobStatus::Uploading => Some(0),
            JobStatus::Extracting => Some(1),
            JobStatus::ExtractingCompleted => Some(2),
            JobStatus::Refining => Some(3),
            JobStatus::RefiningCompleted => Some(4),
            JobStatus::Generating => Some(5),
            JobStatus::Completed => Some(6),
            JobStatus::Error => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether moving from `self` to `next` is legal.
    ///
    /// Forward moves along the chain are allowed (including skips, since
    /// stage ordering is the caller's responsibility); backward moves are
    /// not. Error is reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobStatus::Error {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    /// Coarse phase index for status polling: 0 = extraction,
    /// 1 = refinement, 2 = generation/completed.
    pub fn stage(&self) -> Option<u8> {
        match self {
            JobStatus::Uploading | JobStatus::Extracting | JobStatus::ExtractingCompleted => {
                Some(0)
            }
            JobStatus::Refining | JobStatus::RefiningCompleted => Some(1),
            JobStatus::Generating | JobStatus::Completed => Some(2),
            JobStatus::Error => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Uploading => "uploading",
            JobStatus::Extracting => "extracting",
            JobStatus::ExtractingCompleted => "extracting_completed",
            JobStatus::Refining => "refining",
            JobStatus::RefiningCompleted => "refining_completed",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// Synthesized audio attached to a job once generation completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub duration_ms: u64,
}

/// Canonical record for one conversion. Owned by the store; handlers
/// read-modify-write it through [`JobPatch`].
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub total_images: u32,
    pub current_image: u32,
    pub extracted_texts: Option<Vec<ExtractedPage>>,
    pub refined_text: Option<String>,
    pub audio: Option<AudioPayload>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(total_images: u32) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Uploading,
            total_images,
            current_image: 0,
            extracted_texts: None,
            refined_text: None,
            audio: None,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Coarse phase for polling. Error jobs report the phase they had
    /// reached when they failed, derived from the payloads present.
    pub fn stage(&self) -> u8 {
        match self.status.stage() {
            Some(stage) => stage,
            None => {
                if self.refined_text.is_some() {
                    2
                } else if self.extracted_texts.is_some() {
                    1
                } else {
                    0
                }
            }
        }
    }
}

/// Field-level merge applied by `BaseJobStore::update`. Absent fields are
/// left untouched; the merge is atomic per update call.
#[derive(Debug, Default, Clone)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub current_image: Option<u32>,
    pub extracted_texts: Option<Vec<ExtractedPage>>,
    pub refined_text: Option<String>,
    pub audio: Option<AudioPayload>,
    pub error_message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch that moves a job to the terminal error state.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_legal() {
        use JobStatus::*;
        let chain = [
            Uploading,
            Extracting,
            ExtractingCompleted,
            Refining,
            RefiningCompleted,
            Generating,
            Completed,
        ];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn backward_transitions_are_rejected() {
        use JobStatus::*;
        assert!(!Extracting.can_transition_to(Uploading));
        assert!(!RefiningCompleted.can_transition_to(Refining));
        assert!(!Generating.can_transition_to(ExtractingCompleted));
    }

    #[test]
    fn forward_skips_are_legal() {
        // Stage ordering is the caller's responsibility; the FSM only
        // forbids going backward.
        assert!(JobStatus::ExtractingCompleted.can_transition_to(JobStatus::Generating));
    }

    #[test]
    fn error_is_reachable_from_non_terminal_only() {
        use JobStatus::*;
        assert!(Uploading.can_transition_to(Error));
        assert!(Generating.can_transition_to(Error));
        assert!(!Completed.can_transition_to(Error));
        assert!(!Error.can_transition_to(Error));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        use JobStatus::*;
        assert!(!Completed.can_transition_to(Refining));
        assert!(!Error.can_transition_to(Extracting));
    }

    #[test]
    fn stage_maps_status_to_phase() {
        assert_eq!(JobStatus::Uploading.stage(), Some(0));
        assert_eq!(JobStatus::ExtractingCompleted.stage(), Some(0));
        assert_eq!(JobStatus::Refining.stage(), Some(1));
        assert_eq!(JobStatus::Completed.stage(), Some(2));
    }

    #[test]
    fn error_job_reports_phase_it_died_in() {
        let mut job = Job::new(2);
        job.status = JobStatus::Error;
        assert_eq!(job.stage(), 0);

        job.extracted_texts = Some(vec![]);
        assert_eq!(job.stage(), 1);

        job.refined_text = Some("text".into());
        assert_eq!(job.stage(), 2);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::ExtractingCompleted).unwrap();
        assert_eq!(json, "\"extracting_completed\"");
    }
}
