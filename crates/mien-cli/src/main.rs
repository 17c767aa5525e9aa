use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mien_core::upload::MAX_IMAGE_BYTES;
use mien_core::{render_text, AnalysisMode, AnalysisReport, ImageUpload, LabelOptions};
use mien_rekognition::RekognitionAnalyzer;

const DEFAULT_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "mien", about = "Mien image analysis CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an image locally without sending it anywhere
    Check {
        /// Path to a JPEG or PNG image
        path: PathBuf,
    },
    /// Analyze an image directly with AWS Rekognition
    Analyze {
        path: PathBuf,
        /// faces, labels or all
        #[arg(short, long, default_value_t = AnalysisMode::Faces)]
        mode: AnalysisMode,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
        /// AWS region (defaults to the SDK's region chain)
        #[arg(long)]
        region: Option<String>,
        #[arg(long, default_value_t = LabelOptions::default().max_labels)]
        max_labels: u32,
        #[arg(long, default_value_t = LabelOptions::default().min_confidence)]
        min_confidence: f32,
        /// Seconds to wait for Rekognition, retries included
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Send an image to a running miend
    Submit {
        path: PathBuf,
        /// Daemon base URL
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
        /// faces, labels or all (daemon default when omitted)
        #[arg(short, long)]
        mode: Option<AnalysisMode>,
        #[arg(long)]
        json: bool,
    },
    /// Show daemon health
    Status {
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { path } => {
            let image = load_image(&path)?;
            println!("{}: ok", path.display());
            println!("  format:     {}", image.format);
            println!("  dimensions: {}x{}", image.width, image.height);
            println!("  size:       {} bytes", image.size_bytes());
            println!("  sha256:     {}", image.sha256);
        }
        Commands::Analyze {
            path,
            mode,
            json,
            region,
            max_labels,
            min_confidence,
            timeout,
        } => {
            let image = load_image(&path)?;
            let analyzer =
                RekognitionAnalyzer::from_env(region, Duration::from_secs(timeout)).await;
            let options = LabelOptions {
                max_labels,
                min_confidence,
            };
            let report = mien_core::analyze(&analyzer, &image, mode, &options)
                .await
                .context("analysis failed")?;
            print_report(&report, json)?;
        }
        Commands::Submit {
            path,
            url,
            mode,
            json,
        } => {
            let image = load_image(&path)?;
            let report = submit(&url, image, mode).await?;
            print_report(&report, json)?;
        }
        Commands::Status { url } => {
            let endpoint = format!("{}/health", url.trim_end_matches('/'));
            let response = reqwest::get(&endpoint)
                .await
                .with_context(|| format!("miend not reachable at {url}"))?;
            let health: serde_json::Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}

/// Read and validate an image file.
fn load_image(path: &Path) -> Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    ImageUpload::validate(bytes, file_name, MAX_IMAGE_BYTES)
        .with_context(|| format!("{} cannot be analyzed", path.display()))
}

async fn submit(
    url: &str,
    image: ImageUpload,
    mode: Option<AnalysisMode>,
) -> Result<AnalysisReport> {
    let mime = image.format.mime_type();
    let file_name = image
        .file_name
        .clone()
        .unwrap_or_else(|| format!("upload.{}", image.format));
    let part = reqwest::multipart::Part::bytes(image.into_bytes())
        .file_name(file_name)
        .mime_str(mime)?;
    let mut form = reqwest::multipart::Form::new().part("image", part);
    if let Some(mode) = mode {
        form = form.text("mode", mode.to_string());
    }

    let endpoint = format!("{}/api/v1/analyze", url.trim_end_matches('/'));
    tracing::debug!(%endpoint, "submitting image");
    let response = reqwest::Client::new()
        .post(&endpoint)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("miend not reachable at {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body["error"].as_str().unwrap_or("no error message");
        bail!("miend returned {status}: {message}");
    }

    Ok(response.json().await.context("invalid report from miend")?)
}

fn print_report(report: &AnalysisReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    Ok(())
}
