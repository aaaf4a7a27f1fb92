// MockInference - mock inference backend for testing
//
// Records every call and returns scripted results, so tests can assert
// both on responses and on which downstream operations actually ran.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use inference_client::{ExtractedPage, Synthesis};

use super::traits::BaseInference;

/// Audio bytes every mock synthesis returns.
pub const MOCK_AUDIO: &[u8] = b"ID3mock-audio-frames";

/// Arguments captured from a synthesize call
#[derive(Debug, Clone)]
pub struct SynthesizeCallArgs {
    pub text: String,
    pub voice: Option<String>,
    pub rate: Option<u32>,
}

pub struct MockInference {
    healthy: AtomicBool,
    fail_with: Mutex<Option<String>>,
    extract_calls: Mutex<Vec<usize>>,
    refine_calls: Mutex<Vec<Vec<String>>>,
    synthesize_calls: Mutex<Vec<SynthesizeCallArgs>>,
}

impl MockInference {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            fail_with: Mutex::new(None),
            extract_calls: Mutex::new(Vec::new()),
            refine_calls: Mutex::new(Vec::new()),
            synthesize_calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the health check report the backend as down.
    pub fn unhealthy(self) -> Self {
        self.healthy.store(false, Ordering::SeqCst);
        self
    }

    /// Make every operation fail with the given message.
    pub fn failing(self, message: &str) -> Self {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Image counts passed to extract calls, in order.
    pub fn extract_calls(&self) -> Vec<usize> {
        self.extract_calls.lock().unwrap().clone()
    }

    /// Text batches passed to refine calls, in order.
    pub fn refine_calls(&self) -> Vec<Vec<String>> {
        self.refine_calls.lock().unwrap().clone()
    }

    /// Arguments of every synthesize call, in order.
    pub fn synthesize_calls(&self) -> Vec<SynthesizeCallArgs> {
        self.synthesize_calls.lock().unwrap().clone()
    }

    fn scripted_failure(&self) -> Option<anyhow::Error> {
        self.fail_with
            .lock()
            .unwrap()
            .as_ref()
            .map(|message| anyhow::anyhow!("{}", message))
    }
}

impl Default for MockInference {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseInference for MockInference {
    async fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn extract_pages(&self, _job_id: &str, images: &[Vec<u8>]) -> Result<Vec<ExtractedPage>> {
        self.extract_calls.lock().unwrap().push(images.len());

        if let Some(e) = self.scripted_failure() {
            return Err(e);
        }

        Ok(images
            .iter()
            .enumerate()
            .map(|(index, _)| ExtractedPage {
                page_number: index as u32 + 1,
                text: format!("Text of page {}", index + 1),
                processing_time_ms: Some(5),
            })
            .collect())
    }

    async fn refine(
        &self,
        _job_id: &str,
        texts: &[String],
        _instructions: Option<&str>,
    ) -> Result<String> {
        self.refine_calls.lock().unwrap().push(texts.to_vec());

        if let Some(e) = self.scripted_failure() {
            return Err(e);
        }

        Ok(texts.join("\n\n"))
    }

    async fn synthesize(
        &self,
        _job_id: &str,
        text: &str,
        voice: Option<&str>,
        rate: Option<u32>,
    ) -> Result<Synthesis> {
        self.synthesize_calls.lock().unwrap().push(SynthesizeCallArgs {
            text: text.to_string(),
            voice: voice.map(str::to_string),
            rate,
        });

        if let Some(e) = self.scripted_failure() {
            return Err(e);
        }

        Ok(Synthesis {
            audio: MOCK_AUDIO.to_vec(),
            duration_ms: 1234,
        })
    }
}
