// Main entry point for API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use inference_client::{InferenceClient, RetryPolicy};
use server_core::server::{build_app, UploadLimits};
use server_core::kernel::{InferenceAdapter, MemoryJobStore};
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Inkvoice API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Create the inference backend client
    let client = InferenceClient::with_timeout(
        config.inference_base_url.clone(),
        Duration::from_millis(config.inference_timeout_ms),
    )
    .context("Failed to create inference client")?
    .with_retry(RetryPolicy::new(
        config.inference_max_retries,
        Duration::from_millis(config.inference_retry_base_delay_ms),
    ));

    let inference = Arc::new(InferenceAdapter::new(client));
    let store = Arc::new(MemoryJobStore::new());

    // Build application
    let app = build_app(
        store,
        inference,
        UploadLimits {
            max_images: config.max_upload_images,
            max_image_bytes: config.max_image_bytes,
        },
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Inference backend: {}", config.inference_base_url);
    tracing::info!("Health check: http://localhost:{}/api/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
