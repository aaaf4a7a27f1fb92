//! Pure REST client for the inference backend
//!
//! A minimal client for the ML microservice that performs the actual model
//! work: vision text extraction, text refinement, and speech synthesis.
//! No domain logic lives here; the server's pipeline layer owns job state.
//!
//! # Example
//!
//! ```rust,ignore
//! use inference_client::InferenceClient;
//!
//! let client = InferenceClient::from_env()?;
//!
//! if client.is_healthy().await {
//!     let pages = client.extract_text("job-1", &[image_bytes]).await?;
//!     let refined = client.refine_text("job-1", &texts, None).await?;
//!     let audio = client.generate_audio("job-1", &refined, None, None).await?;
//! }
//! ```
//!
//! Every operation retries transparently with linear backoff (see
//! [`RetryPolicy`]); callers see either a success or an
//! [`InferenceError::Exhausted`] carrying the last underlying error.

pub mod error;
pub mod retry;
pub mod types;

pub use error::{InferenceError, Result};
pub use retry::RetryPolicy;
pub use types::*;

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Default per-attempt timeout. Deliberately long: the backend blocks on
/// model inference and routinely takes tens of seconds per request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the health check; a slow health endpoint is a down one.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the inference backend's REST API.
#[derive(Clone)]
pub struct InferenceClient {
    http_client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl InferenceClient {
    /// Create a new client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new client with an explicit per-attempt timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Create from environment variables.
    ///
    /// Reads `INFERENCE_BASE_URL` (default `http://localhost:5001`),
    /// `INFERENCE_TIMEOUT_MS`, `INFERENCE_MAX_RETRIES`, and
    /// `INFERENCE_RETRY_BASE_DELAY_MS`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("INFERENCE_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5001".to_string());

        let timeout = match std::env::var("INFERENCE_TIMEOUT_MS") {
            Ok(ms) => Duration::from_millis(ms.parse().map_err(|_| {
                InferenceError::Config("INFERENCE_TIMEOUT_MS must be a number".into())
            })?),
            Err(_) => DEFAULT_TIMEOUT,
        };

        let max_attempts = match std::env::var("INFERENCE_MAX_RETRIES") {
            Ok(n) => n.parse().map_err(|_| {
                InferenceError::Config("INFERENCE_MAX_RETRIES must be a number".into())
            })?,
            Err(_) => RetryPolicy::default().max_attempts,
        };

        let base_delay = match std::env::var("INFERENCE_RETRY_BASE_DELAY_MS") {
            Ok(ms) => Duration::from_millis(ms.parse().map_err(|_| {
                InferenceError::Config("INFERENCE_RETRY_BASE_DELAY_MS must be a number".into())
            })?),
            Err(_) => RetryPolicy::default().base_delay,
        };

        Ok(Self::with_timeout(base_url, timeout)?
            .with_retry(RetryPolicy::new(max_attempts, base_delay)))
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Hit the backend's health endpoint.
    ///
    /// Returns `false` on any network error, timeout, or non-2xx response;
    /// never fails. Not retried: callers use this as a cheap pre-flight.
    pub async fn is_healthy(&self) -> bool {
        let url = format!("{}/api/health", self.base_url);
        match self
            .http_client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Inference backend health check failed");
                false
            }
        }
    }

    /// Extract text from page images via the backend's vision model.
    ///
    /// Images are base64-encoded into a single JSON request; the backend
    /// returns one entry per image, tagged with 1-based page numbers in
    /// input order.
    pub async fn extract_text(&self, job_id: &str, images: &[Vec<u8>]) -> Result<Vec<ExtractedPage>> {
        let request = ExtractRequest {
            job_id: job_id.to_string(),
            images: images.iter().map(|bytes| BASE64.encode(bytes)).collect(),
        };

        debug!(job_id, images = images.len(), "Requesting text extraction");

        let response: ExtractResponse = self
            .retry
            .run("extract_text", || {
                self.post_json("/api/extract-text", &request)
            })
            .await?;

        Ok(response.extracted_texts)
    }

    /// Refine extracted page texts into one continuous narration text.
    pub async fn refine_text(
        &self,
        job_id: &str,
        texts: &[String],
        instructions: Option<&str>,
    ) -> Result<String> {
        let request = RefineRequest {
            job_id: job_id.to_string(),
            extracted_texts: texts.to_vec(),
            refinement_instructions: instructions.map(str::to_string),
        };

        debug!(job_id, pages = texts.len(), "Requesting text refinement");

        let response: RefineResponse = self
            .retry
            .run("refine_text", || self.post_json("/api/refine-text", &request))
            .await?;

        Ok(response.refined_text)
    }

    /// Synthesize speech for the given text.
    ///
    /// `voice` and `rate` fall through to the backend's defaults
    /// ("default" voice at 150 wpm) when not given.
    pub async fn generate_audio(
        &self,
        job_id: &str,
        text: &str,
        voice: Option<&str>,
        rate: Option<u32>,
    ) -> Result<Synthesis> {
        let request = AudioRequest {
            job_id: job_id.to_string(),
            text: text.to_string(),
            voice: voice.map(str::to_string),
            rate,
        };

        debug!(job_id, chars = text.len(), "Requesting audio synthesis");

        let response: AudioResponse = self
            .retry
            .run("generate_audio", || {
                self.post_json("/api/generate-audio", &request)
            })
            .await?;

        let audio = BASE64
            .decode(&response.audio_data)
            .map_err(|e| InferenceError::Parse(format!("Invalid base64 audio payload: {}", e)))?;

        Ok(Synthesis {
            audio,
            duration_ms: response.duration_ms,
        })
    }

    /// POST a JSON body and parse a JSON response. One attempt, no retry;
    /// retrying is the caller's concern.
    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%status, path, "Inference API returned an error");
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| InferenceError::Parse(format!("Failed to parse response: {}", e)))
    }
}
