//! Kernel module - server infrastructure and dependencies.

pub mod inference;
pub mod jobs;
pub mod pipeline;
pub mod test_dependencies;
pub mod traits;

pub use inference::InferenceAdapter;
pub use jobs::{AudioPayload, Job, JobId, JobPatch, JobStatus, MemoryJobStore, StoreError};
pub use pipeline::{PipelineError, PipelineService};
pub use test_dependencies::MockInference;
pub use traits::*;
