//! Adapter implementing [`BaseInference`] over the inference-client crate.

use anyhow::Result;
use async_trait::async_trait;
use inference_client::{ExtractedPage, InferenceClient, Synthesis};

use super::traits::BaseInference;

/// Wrapper around [`InferenceClient`] that implements the BaseInference
/// trait. Retry and timeout behavior live in the client.
pub struct InferenceAdapter(InferenceClient);

impl InferenceAdapter {
    pub fn new(client: InferenceClient) -> Self {
        Self(client)
    }
}

#[async_trait]
impl BaseInference for InferenceAdapter {
    async fn is_healthy(&self) -> bool {
        self.0.is_healthy().await
    }

    async fn extract_pages(&self, job_id: &str, images: &[Vec<u8>]) -> Result<Vec<ExtractedPage>> {
        self.0
            .extract_text(job_id, images)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn refine(
        &self,
        job_id: &str,
        texts: &[String],
        instructions: Option<&str>,
    ) -> Result<String> {
        self.0
            .refine_text(job_id, texts, instructions)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }

    async fn synthesize(
        &self,
        job_id: &str,
        text: &str,
        voice: Option<&str>,
        rate: Option<u32>,
    ) -> Result<Synthesis> {
        self.0
            .generate_audio(job_id, text, voice, rate)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))
    }
}
