//! Job tracking for conversion requests.

pub mod job;
pub mod store;

pub use job::{AudioPayload, Job, JobId, JobPatch, JobStatus};
pub use store::{MemoryJobStore, StoreError};
