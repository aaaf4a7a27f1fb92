use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub inference_base_url: String,
    pub inference_timeout_ms: u64,
    pub inference_max_retries: u32,
    pub inference_retry_base_delay_ms: u64,
    pub max_upload_images: usize,
    pub max_image_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            inference_base_url: env::var("INFERENCE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5001".to_string()),
            inference_timeout_ms: env::var("INFERENCE_TIMEOUT_MS")
                .unwrap_or_else(|_| "120000".to_string())
                .parse()
                .context("INFERENCE_TIMEOUT_MS must be a valid number")?,
            inference_max_retries: env::var("INFERENCE_MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("INFERENCE_MAX_RETRIES must be a valid number")?,
            inference_retry_base_delay_ms: env::var("INFERENCE_RETRY_BASE_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("INFERENCE_RETRY_BASE_DELAY_MS must be a valid number")?,
            max_upload_images: env::var("MAX_UPLOAD_IMAGES")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("MAX_UPLOAD_IMAGES must be a valid number")?,
            max_image_bytes: env::var("MAX_IMAGE_BYTES")
                .unwrap_or_else(|_| (5 * 1024 * 1024).to_string())
                .parse()
                .context("MAX_IMAGE_BYTES must be a valid number")?,
        })
    }
}
