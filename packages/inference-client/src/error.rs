//! Error types for the inference client.

use thiserror::Error;

/// Result type for inference client operations.
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Inference client errors.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Configuration error (bad base URL, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response from the inference backend)
    #[error("Inference API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, bad base64 payload)
    #[error("Parse error: {0}")]
    Parse(String),

    /// All retry attempts failed; carries the last attempt's error text
    #[error("Inference call failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}
