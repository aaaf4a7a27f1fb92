//! Retry policy for calls to the inference backend.
//!
//! The backend runs model inference and fails transiently under load, so
//! every operation is retried with a linearly increasing backoff. Each
//! call is all-or-nothing; a retried attempt re-sends the full request.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{InferenceError, Result};

/// Retry policy: up to `max_attempts` tries, sleeping `attempt * base_delay`
/// after the n-th failure (1s, 2s, 3s with the defaults).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    ///
    /// Any error counts as retryable; after the last failure the error is
    /// wrapped in [`InferenceError::Exhausted`] with the last error text.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Inference call attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.base_delay * attempt).await;
            }
        }

        Err(InferenceError::Exhausted {
            attempts: self.max_attempts,
            last: last_error,
        })
    }
}
