//! Configuration types for background removal and watermarking

use crate::error::{PixelForgeError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Declared MIME types accepted by both tools
pub const SUPPORTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Upper bound on raw input size (50 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: usize = 50 * 1024 * 1024;

/// Fallback watermark text used for defaults and empty input
pub const DEFAULT_WATERMARK_TEXT: &str = "© PixelForge";

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = PixelForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            other => Err(PixelForgeError::invalid_config(format!(
                "Unknown execution provider '{}'. Valid: auto, cpu, cuda, coreml",
                other
            ))),
        }
    }
}

/// Configuration for background removal operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Side length S of the model's square input (and mask output)
    pub model_input_size: u32,

    /// Decoded images are bounded to this dimension before inference
    pub max_image_dimension: u32,

    /// Inputs larger than this many bytes are rejected before decode
    pub max_input_bytes: usize,

    /// File name used for the downloadable result
    pub output_file_name: String,

    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            model_input_size: 1024,
            max_image_dimension: 2048,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            output_file_name: "background-removed.png".to_string(),
            execution_provider: ExecutionProvider::default(),
            intra_threads: 0,
        }
    }
}

impl RemovalConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pixelforge::RemovalConfig;
    ///
    /// let config = RemovalConfig::builder()
    ///     .model_input_size(320)
    ///     .max_image_dimension(1024)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.model_input_size, 320);
    /// ```
    #[must_use]
    pub fn builder() -> RemovalConfigBuilder {
        RemovalConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Zero model input size
    /// - Zero maximum image dimension
    /// - Zero input byte cap
    /// - Empty output file name
    pub fn validate(&self) -> Result<()> {
        if self.model_input_size == 0 {
            return Err(PixelForgeError::config_value_error(
                "model input size",
                self.model_input_size,
                "1 or greater",
                Some(1024),
            ));
        }

        if self.max_image_dimension == 0 {
            return Err(PixelForgeError::config_value_error(
                "maximum image dimension",
                self.max_image_dimension,
                "1 or greater",
                Some(2048),
            ));
        }

        if self.max_input_bytes == 0 {
            return Err(PixelForgeError::config_value_error(
                "maximum input bytes",
                self.max_input_bytes,
                "1 or greater",
                Some(DEFAULT_MAX_INPUT_BYTES),
            ));
        }

        if self.output_file_name.trim().is_empty() {
            return Err(PixelForgeError::invalid_config(
                "Output file name must not be empty",
            ));
        }

        Ok(())
    }
}

/// Builder for `RemovalConfig`
#[derive(Debug, Default)]
pub struct RemovalConfigBuilder {
    config: RemovalConfig,
}

impl RemovalConfigBuilder {
    /// Set the model's square input size
    #[must_use]
    pub fn model_input_size(mut self, size: u32) -> Self {
        self.config.model_input_size = size;
        self
    }

    /// Set the bounding dimension applied before inference
    #[must_use]
    pub fn max_image_dimension(mut self, dimension: u32) -> Self {
        self.config.max_image_dimension = dimension;
        self
    }

    /// Set the input byte cap
    #[must_use]
    pub fn max_input_bytes(mut self, bytes: usize) -> Self {
        self.config.max_input_bytes = bytes;
        self
    }

    /// Set the result file name
    #[must_use]
    pub fn output_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.output_file_name = name.into();
        self
    }

    /// Set execution provider
    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    /// Set number of intra-op threads
    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    /// - Any rule checked by [`RemovalConfig::validate`]
    pub fn build(self) -> Result<RemovalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration for the watermark tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Maximum preview width
    pub preview_max_width: u32,
    /// Maximum preview height
    pub preview_max_height: u32,
    /// Inputs larger than this many bytes are rejected before decode
    pub max_input_bytes: usize,
    /// File name used for the exported image
    pub output_file_name: String,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            preview_max_width: 600,
            preview_max_height: 400,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            output_file_name: "watermarked-image.png".to_string(),
        }
    }
}

/// Named watermark placement
///
/// Serialized as its kebab-case name; unknown names deserialize to bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
    /// Repeated across a rotated grid
    Tile,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 6] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
        Self::Center,
        Self::Tile,
    ];

    /// Parse a position name, falling back to bottom-right for unknown names
    #[must_use]
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::debug!("Unknown watermark position '{}', using bottom-right", name);
            Self::BottomRight
        })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Center => "center",
            Self::Tile => "tile",
        }
    }
}

impl std::fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WatermarkPosition {
    fn from(name: String) -> Self {
        Self::parse_lenient(&name)
    }
}

impl From<WatermarkPosition> for String {
    fn from(position: WatermarkPosition) -> Self {
        position.as_str().to_string()
    }
}

impl FromStr for WatermarkPosition {
    type Err = PixelForgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|position| position.as_str() == s.trim())
            .ok_or_else(|| {
                PixelForgeError::invalid_config(format!("Unknown watermark position '{}'", s))
            })
    }
}

/// User-facing watermark parameters, re-read on every render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkSettings {
    pub text: String,
    pub position: WatermarkPosition,
    /// Font size in px at full resolution
    pub font_size: u32,
    /// `#RRGGBB`
    pub color: String,
    /// 0-100
    pub opacity: u8,
    pub font: String,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            text: DEFAULT_WATERMARK_TEXT.to_string(),
            position: WatermarkPosition::BottomRight,
            font_size: 32,
            color: "#ffffff".to_string(),
            opacity: 50,
            font: "Inter".to_string(),
        }
    }
}

impl WatermarkSettings {
    /// Text to draw; empty input falls back to the default text
    #[must_use]
    pub fn effective_text(&self) -> &str {
        if self.text.is_empty() {
            DEFAULT_WATERMARK_TEXT
        } else {
            &self.text
        }
    }

    /// Validate numeric ranges
    ///
    /// Color format is checked when the color is resolved for drawing.
    ///
    /// # Errors
    /// - Font size of zero
    /// - Opacity above 100
    pub fn validate(&self) -> Result<()> {
        if self.font_size == 0 {
            return Err(PixelForgeError::config_value_error(
                "font size",
                self.font_size,
                "1 or greater",
                Some(32),
            ));
        }
        if self.opacity > 100 {
            return Err(PixelForgeError::config_value_error(
                "opacity",
                self.opacity,
                "0-100",
                Some(50),
            ));
        }
        Ok(())
    }
}
