//! inkvoice - drive an image-to-audiobook conversion from the terminal.

mod poller;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Value};

use crate::poller::JobPoller;

#[derive(Parser)]
#[command(name = "inkvoice", about = "Convert page images into an audiobook")]
struct Cli {
    /// Base URL of the inkvoice API server
    #[arg(long, default_value = "http://localhost:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload images and run the full pipeline to an audio file
    Convert {
        /// Page images, in reading order
        images: Vec<PathBuf>,

        /// Voice passed through to speech synthesis
        #[arg(long)]
        voice: Option<String>,

        /// Speech rate in words per minute
        #[arg(long)]
        rate: Option<u32>,

        /// Extra instructions for the text refinement step
        #[arg(long)]
        instructions: Option<String>,

        /// Where to write the audio
        #[arg(short, long, default_value = "audiobook.mp3")]
        output: PathBuf,
    },

    /// Show the status of a job
    Status { job_id: String },

    /// Check server and inference backend health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    match cli.command {
        Commands::Convert {
            images,
            voice,
            rate,
            instructions,
            output,
        } => convert(&server, images, voice, rate, instructions, output).await,
        Commands::Status { job_id } => status(&server, &job_id).await,
        Commands::Health => health(&server).await,
    }
}

async fn convert(
    server: &str,
    images: Vec<PathBuf>,
    voice: Option<String>,
    rate: Option<u32>,
    instructions: Option<String>,
    output: PathBuf,
) -> Result<()> {
    if images.is_empty() {
        bail!("no images given");
    }

    let client = reqwest::Client::new();
    let poller = JobPoller::new(server);

    // Stage 1: upload and extract.
    println!(
        "{} {} page image(s)...",
        "Uploading".bright_blue().bold(),
        images.len()
    );

    let mut form = reqwest::multipart::Form::new();
    for path in &images {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page.png".to_string());
        form = form.part(
            "images",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );
    }

    let extract = request_json(
        client
            .post(format!("{}/api/extract-text", server))
            .multipart(form),
    )
    .await
    .context("Text extraction failed")?;

    let job_id = extract["jobId"]
        .as_str()
        .context("Server response is missing jobId")?
        .to_string();
    let texts: Vec<String> = extract["extractedTexts"]
        .as_array()
        .context("Server response is missing extractedTexts")?
        .iter()
        .filter_map(|page| page["text"].as_str().map(str::to_string))
        .collect();

    poller.wait_past_stage(&job_id, 0).await?;
    println!(
        "{} extracted text from {} page(s) (job {})",
        "✓".green().bold(),
        texts.len(),
        job_id
    );

    // Stage 2: refine.
    println!("{} extracted text...", "Refining".bright_blue().bold());
    let refine = request_json(client.post(format!("{}/api/refine-text", server)).json(&json!({
        "jobId": job_id,
        "extractedTexts": texts,
        "refinementInstructions": instructions,
    })))
    .await
    .context("Text refinement failed")?;

    let refined = refine["refinedText"]
        .as_str()
        .context("Server response is missing refinedText")?
        .to_string();

    poller.wait_past_stage(&job_id, 1).await?;
    println!(
        "{} refined into {} characters of narration",
        "✓".green().bold(),
        refined.len()
    );

    // Stage 3: synthesize.
    println!("{} audio...", "Generating".bright_blue().bold());
    let generate = request_json(
        client
            .post(format!("{}/api/generate-audio", server))
            .json(&json!({
                "jobId": job_id,
                "text": refined,
                "voice": voice,
                "rate": rate,
            })),
    )
    .await
    .context("Audio generation failed")?;

    let audio_url = generate["audioUrl"]
        .as_str()
        .context("Server response is missing audioUrl")?;

    // Download the finished audio.
    let audio = client
        .get(format!("{}{}", server, audio_url))
        .send()
        .await
        .context("Audio download failed")?
        .error_for_status()
        .context("Audio download failed")?
        .bytes()
        .await
        .context("Audio download failed")?;

    std::fs::write(&output, &audio)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} wrote {} bytes to {}",
        "✓".green().bold(),
        audio.len(),
        output.display().to_string().bright_white()
    );

    Ok(())
}

async fn status(server: &str, job_id: &str) -> Result<()> {
    let poller = JobPoller::new(server);
    let progress = poller.fetch(job_id).await?;

    println!(
        "job {} — stage {}/2, {} ({}/{} items)",
        progress.job_id.bright_white(),
        progress.stage,
        progress.status.bold(),
        progress.current_item,
        progress.total_items
    );
    if let Some(message) = progress.error_message {
        println!("{} {}", "error:".red().bold(), message);
    }

    Ok(())
}

async fn health(server: &str) -> Result<()> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/api/health", server))
        .send()
        .await
        .context("Health request failed")?;

    let degraded = !response.status().is_success();
    let body: Value = response.json().await.context("Malformed health response")?;

    let label = if degraded {
        "degraded".yellow().bold()
    } else {
        "healthy".green().bold()
    };
    println!(
        "{} (self: {}, downstream: {})",
        label,
        body["services"]["self"].as_str().unwrap_or("unknown"),
        body["services"]["downstream"].as_str().unwrap_or("unknown")
    );

    Ok(())
}

/// Send a request and parse a JSON body, turning non-2xx responses into
/// errors carrying the server's message.
async fn request_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .unwrap_or_else(|_| json!({"message": "no response body"}));

    if !status.is_success() {
        bail!(
            "{} ({})",
            body["message"].as_str().unwrap_or("request failed"),
            status
        );
    }

    Ok(body)
}
