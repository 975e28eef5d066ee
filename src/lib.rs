#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # PixelForge
//!
//! Client-side image tools: AI background removal and text watermarking.
//!
//! Background removal bounds the input to 2048 px, packs it into a
//! normalized `(1, 3, S, S)` tensor, runs a segmentation model through a
//! pluggable [`InferenceBackend`] and writes the resampled mask into the
//! alpha channel. Watermarking draws text at one of five anchors or as a
//! rotated tile pattern, rendered once as a scaled preview and once at full
//! resolution for export.
//!
//! ## Features
//!
//! - **Multiple Backends**: Tract (pure Rust, default) and ONNX Runtime
//! - **Format Support**: PNG and JPEG input, PNG output
//! - **Hardware Acceleration**: CUDA and `CoreML` execution providers (ONNX Runtime)
//! - **Software Watermarking**: embedded bitmap font with rotation and drop shadows
//! - **CLI Integration**: Optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pixelforge::{backends::{create_backend, BackendType}, remove_background, RemovalConfig};
//! use pixelforge::services::InputImage;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RemovalConfig::default();
//! let backend = create_backend(BackendType::Tract, "models/rmbg.onnx", &config)?;
//!
//! let input = InputImage::from_path("photo.jpg", config.max_input_bytes).await?;
//! let result = remove_background(&input, backend, config).await?;
//! std::fs::write("background-removed.png", &result.png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ```rust,no_run
//! use pixelforge::{watermark_image, WatermarkConfig, WatermarkPosition, WatermarkSettings};
//! use pixelforge::services::InputImage;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = WatermarkSettings {
//!     text: "Draft".to_string(),
//!     position: WatermarkPosition::Tile,
//!     ..WatermarkSettings::default()
//! };
//! let config = WatermarkConfig::default();
//! let input = InputImage::from_path("photo.png", config.max_input_bytes).await?;
//! let asset = watermark_image(&input, &settings, &config)?;
//! std::fs::write(&asset.file_name, &asset.bytes)?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Pure Rust inference backend
//! - `onnx`: ONNX Runtime backend with GPU acceleration support
//! - `cli` (default): Command-line interface and progress reporting
//! - `tracing-json`: JSON log output for the CLI
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! pixelforge = { version = "0.1", default-features = false, features = ["tract"] }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod inference;
pub mod processor;
pub mod services;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;
pub mod watermark;

use std::sync::Arc;
use tokio::io::AsyncRead;

pub use backends::{create_backend, BackendType};
pub use color::{to_rgba, TextColor};
pub use compositor::MaskCompositor;
pub use config::{
    ExecutionProvider, RemovalConfig, RemovalConfigBuilder, WatermarkConfig, WatermarkPosition,
    WatermarkSettings,
};
pub use error::{PixelForgeError, Result};
pub use inference::InferenceBackend;
pub use processor::BackgroundRemovalProcessor;
pub use services::{
    ExportAsset, FileSink, ImageIOService, InputFormat, InputImage, ProcessingStage,
    ProgressReporter, ResultSink,
};
pub use session::RemovalSession;
pub use types::{ProcessingTimings, RasterImage, RemovalResult, SegmentationMask, Tensor};
pub use watermark::{WatermarkEngine, WatermarkSession};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Remove the background from one encoded image
///
/// Builds a one-shot [`BackgroundRemovalProcessor`] around `backend`.
///
/// # Errors
/// - `InvalidConfig` if `config` does not match the backend
/// - Any pipeline error from [`BackgroundRemovalProcessor::process`]
pub async fn remove_background(
    input: &InputImage,
    backend: Arc<dyn InferenceBackend>,
    config: RemovalConfig,
) -> Result<RemovalResult> {
    let processor = BackgroundRemovalProcessor::new(backend, config)?;
    processor.process(input).await
}

/// Remove the background from an image read from any async reader
///
/// The declared type is checked before reading, and at most
/// `config.max_input_bytes + 1` bytes are pulled from `reader`.
///
/// # Errors
/// - `UnsupportedFormat` or `OversizeInput` from [`InputImage::from_reader`]
/// - `Io` if reading fails
/// - Same as [`remove_background`]
pub async fn remove_background_from_reader<R: AsyncRead + Unpin>(
    reader: R,
    mime_type: &str,
    backend: Arc<dyn InferenceBackend>,
    config: RemovalConfig,
) -> Result<RemovalResult> {
    let input = InputImage::from_reader(reader, mime_type, config.max_input_bytes).await?;
    remove_background(&input, backend, config).await
}

/// Watermark one encoded image at full resolution
///
/// # Errors
/// - Input errors from [`WatermarkSession::load`]
/// - Settings and encoding errors from [`WatermarkSession::export`]
pub fn watermark_image(
    input: &InputImage,
    settings: &WatermarkSettings,
    config: &WatermarkConfig,
) -> Result<ExportAsset> {
    let mut session = WatermarkSession::new(config.clone());
    session.load(input)?;
    session.export(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;
    use image::Rgba;

    fn png_input(width: u32, height: u32) -> InputImage {
        let image = RasterImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
        InputImage::new(ImageIOService::encode_png(&image).unwrap(), "image/png")
    }

    fn small_config() -> RemovalConfig {
        RemovalConfig::builder().model_input_size(8).build().unwrap()
    }

    #[tokio::test]
    async fn test_remove_background_from_reader() {
        let input = png_input(16, 12);
        let backend = Arc::new(MockBackend::constant(8, 1.0));

        let result = remove_background_from_reader(
            std::io::Cursor::new(input.bytes.clone()),
            "image/png",
            backend,
            small_config(),
        )
        .await
        .unwrap();

        assert_eq!(result.dimensions(), (16, 12));
        assert!(result.image.pixels().all(|p| p[3] == 255));
    }

    #[tokio::test]
    async fn test_remove_background_from_reader_bounds_the_stream() {
        let backend = Arc::new(MockBackend::constant(8, 1.0));
        let config = RemovalConfig::builder()
            .model_input_size(8)
            .max_input_bytes(64)
            .build()
            .unwrap();
        let mut stream = std::io::Cursor::new(vec![0u8; 4096]);

        let err = remove_background_from_reader(&mut stream, "image/png", backend.clone(), config)
            .await
            .unwrap_err();
        assert!(matches!(err, PixelForgeError::OversizeInput { size: 65, limit: 64 }));
        assert_eq!(stream.position(), 65);

        let mut stream = std::io::Cursor::new(vec![0u8; 4096]);
        let err = remove_background_from_reader(&mut stream, "image/gif", backend, small_config())
            .await
            .unwrap_err();
        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
        assert_eq!(stream.position(), 0);
    }

    #[tokio::test]
    async fn test_remove_background_rejects_mismatched_backend() {
        let backend = Arc::new(MockBackend::constant(4, 1.0));
        let err = remove_background(&png_input(4, 4), backend, small_config())
            .await
            .unwrap_err();
        assert!(matches!(err, PixelForgeError::InvalidConfig(_)));
    }

    #[test]
    fn test_watermark_image() {
        let asset = watermark_image(
            &png_input(64, 48),
            &WatermarkSettings::default(),
            &WatermarkConfig::default(),
        )
        .unwrap();
        assert_eq!(asset.file_name, "watermarked-image.png");
        assert!(!asset.bytes.is_empty());
    }
}
