// Inkvoice - API Core
//
// This crate provides the backend API for converting uploaded page images
// into a single audio narration. Model inference (vision OCR, text
// refinement, speech synthesis) is delegated to an external inference
// backend; this server owns job tracking and stage orchestration.

pub mod config;
pub mod kernel;
pub mod server;

pub use config::*;
