//! Conversion of CLI arguments into library configuration

use crate::cli::main_impl::{RemoveBgArgs, WatermarkArgs};
use crate::config::{RemovalConfig, WatermarkPosition, WatermarkSettings};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Convert CLI arguments to library configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build a `RemovalConfig` from `remove-bg` arguments
    pub(crate) fn removal_config(args: &RemoveBgArgs) -> Result<RemovalConfig> {
        let mut builder = RemovalConfig::builder();
        if let Some(size) = args.model_size {
            builder = builder.model_input_size(size);
        }
        if let Some(dimension) = args.max_dimension {
            builder = builder.max_image_dimension(dimension);
        }
        if let Some(provider) = args.provider {
            builder = builder.execution_provider(provider);
        }
        if let Some(threads) = args.threads {
            builder = builder.intra_threads(threads);
        }
        builder.build().context("Invalid background removal configuration")
    }

    /// Build `WatermarkSettings` from an optional JSON file plus flag overrides
    pub(crate) fn watermark_settings(args: &WatermarkArgs) -> Result<WatermarkSettings> {
        let mut settings = match &args.settings {
            Some(path) => Self::load_settings(path)?,
            None => WatermarkSettings::default(),
        };

        if let Some(text) = &args.text {
            settings.text.clone_from(text);
        }
        if let Some(position) = &args.position {
            settings.position = position.parse().unwrap_or_else(|_| {
                log::warn!("Unknown position '{}', using bottom-right", position);
                WatermarkPosition::BottomRight
            });
        }
        if let Some(font_size) = args.font_size {
            settings.font_size = font_size;
        }
        if let Some(color) = &args.color {
            settings.color.clone_from(color);
        }
        if let Some(opacity) = args.opacity {
            settings.opacity = opacity;
        }
        if let Some(font) = &args.font {
            settings.font.clone_from(font);
        }

        settings.validate().context("Invalid watermark settings")?;
        Ok(settings)
    }

    /// Read watermark settings from a JSON file; missing fields take defaults
    pub(crate) fn load_settings(path: &Path) -> Result<WatermarkSettings> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    /// Output target: the explicit path, or the current directory so the
    /// asset's fixed file name is used
    pub(crate) fn output_target(output: Option<&Path>) -> PathBuf {
        output.map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}
