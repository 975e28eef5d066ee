//! PixelForge CLI Tool
//!
//! Command-line interface for background removal and text watermarking.

use super::{config::CliConfigBuilder, progress::create_cli_progress_reporter};
use crate::{
    backends::{create_backend, BackendType},
    config::{ExecutionProvider, WatermarkConfig},
    processor::BackgroundRemovalProcessor,
    services::{FileSink, ImageIOService, InputImage, ResultSink},
    session::RemovalSession,
    tracing_config::{init_cli_tracing, spans, TracingFormat},
    watermark::WatermarkSession,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Client-side image tools: background removal and watermarking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "pixelforge")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (console, compact, json)
    #[arg(long, value_name = "FORMAT", default_value = "console", global = true)]
    pub log_format: TracingFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Remove the background from an image using a local segmentation model
    RemoveBg(RemoveBgArgs),
    /// Draw a text watermark on an image
    Watermark(WatermarkArgs),
    /// List inference backends and execution providers with availability
    Providers,
}

#[derive(Args, Debug)]
pub struct RemoveBgArgs {
    /// Input PNG or JPEG image
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Path to the ONNX segmentation model
    #[arg(short, long, value_name = "PATH")]
    pub model: PathBuf,

    /// Inference backend (tract, onnx)
    #[arg(short, long, default_value_t = BackendType::default())]
    pub backend: BackendType,

    /// Output file or directory [default: ./background-removed.png]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Side length of the model's square input [default: 1024]
    #[arg(long, value_name = "N")]
    pub model_size: Option<u32>,

    /// Bound the input to this many pixels per side before inference [default: 2048]
    #[arg(long, value_name = "N")]
    pub max_dimension: Option<u32>,

    /// Execution provider for the onnx backend (auto, cpu, cuda, coreml)
    #[arg(long)]
    pub provider: Option<ExecutionProvider>,

    /// Number of intra-op threads (0 = auto)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Show a progress bar instead of log lines
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args, Debug)]
pub struct WatermarkArgs {
    /// Input PNG or JPEG image
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file or directory [default: ./watermarked-image.png]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// JSON file with watermark settings; flags below override it
    #[arg(short, long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Watermark text
    #[arg(long)]
    pub text: Option<String>,

    /// Position (top-left, top-right, bottom-left, bottom-right, center, tile)
    #[arg(short, long)]
    pub position: Option<String>,

    /// Font size in pixels at full resolution
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Text color as #RRGGBB
    #[arg(short, long)]
    pub color: Option<String>,

    /// Opacity percentage (0-100)
    #[arg(long)]
    pub opacity: Option<u8>,

    /// Font family name
    #[arg(long)]
    pub font: Option<String>,

    /// Also write the scaled preview to this path
    #[arg(long, value_name = "PATH")]
    pub preview: Option<PathBuf>,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;

    match cli.command {
        Command::RemoveBg(args) => run_remove_bg(args, cli.verbose > 0).await,
        Command::Watermark(args) => run_watermark(&args).await,
        Command::Providers => {
            show_providers();
            Ok(())
        }
    }
}

/// `(name, available, description)` for every backend and execution provider
fn provider_table() -> Vec<(String, bool, String)> {
    let mut providers = Vec::new();

    #[cfg(feature = "tract")]
    providers.push((
        "tract:cpu".to_string(),
        true,
        "Pure Rust inference on the CPU".to_string(),
    ));
    #[cfg(not(feature = "tract"))]
    providers.push((
        "tract:cpu".to_string(),
        false,
        "Pure Rust inference on the CPU (feature disabled)".to_string(),
    ));

    #[cfg(feature = "onnx")]
    providers.extend(
        crate::backends::OnnxBackend::list_providers()
            .into_iter()
            .map(|(name, available, description)| {
                (format!("onnx:{}", name.to_lowercase()), available, description)
            }),
    );
    #[cfg(not(feature = "onnx"))]
    providers.push((
        "onnx".to_string(),
        false,
        "ONNX Runtime (feature disabled)".to_string(),
    ));

    providers
}

fn show_providers() {
    println!("Execution providers:");
    for (name, available, description) in provider_table() {
        let status = if available { "available" } else { "not available" };
        println!("  {name}: {status} - {description}");
    }
}

async fn run_remove_bg(args: RemoveBgArgs, verbose: bool) -> Result<()> {
    let config = CliConfigBuilder::removal_config(&args)?;
    let span = spans::remove_background(&args.input, &args.backend.to_string());

    async move {
        info!(
            "Loading {} model from {}",
            args.backend,
            args.model.display()
        );
        let backend = create_backend(args.backend, &args.model, &config)
            .with_context(|| format!("Failed to load model {}", args.model.display()))?;

        let max_input_bytes = config.max_input_bytes;
        let processor = BackgroundRemovalProcessor::new(backend, config)
            .context("Failed to create processor")?
            .with_reporter(create_cli_progress_reporter(args.progress, verbose));
        let mut session = RemovalSession::new(Arc::new(processor));

        let input = InputImage::from_path(&args.input, max_input_bytes)
            .await
            .with_context(|| format!("Failed to read {}", args.input.display()))?;

        let result = session
            .process(&input)
            .await
            .with_context(|| format!("Failed to process {}", args.input.display()))?;
        let (width, height) = result.dimensions();
        info!(
            "Foreground covers {:.1}% of {}x{} output",
            result.foreground_ratio * 100.0,
            width,
            height
        );

        let sink = FileSink::new(CliConfigBuilder::output_target(args.output.as_deref()));
        session.deliver(&sink).context("Failed to write result")?;
        session.reset();
        Ok(())
    }
    .instrument(span)
    .await
}

async fn run_watermark(args: &WatermarkArgs) -> Result<()> {
    let settings = CliConfigBuilder::watermark_settings(args)?;
    let config = WatermarkConfig::default();
    let input = InputImage::from_path(&args.input, config.max_input_bytes)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let _span = spans::watermark(&args.input, settings.position.as_str()).entered();

    let mut session = WatermarkSession::new(config);
    let (width, height) = session
        .load(&input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;
    info!("Watermarking {}x{} image at {}", width, height, settings.position);

    if let Some(preview_path) = &args.preview {
        let preview = session
            .preview(&settings)
            .context("Failed to render preview")?;
        let png = ImageIOService::encode_png(&preview.image)?;
        std::fs::write(preview_path, png)
            .with_context(|| format!("Failed to write preview {}", preview_path.display()))?;
        info!(
            "Wrote {}x{} preview (font size {}) to {}",
            preview.image.width(),
            preview.image.height(),
            preview.plan.font_size,
            preview_path.display()
        );
    }

    let asset = session.export(&settings).context("Failed to render watermark")?;
    FileSink::new(CliConfigBuilder::output_target(args.output.as_deref()))
        .deliver(&asset)
        .context("Failed to write result")?;
    Ok(())
}
