//! Error types for background removal and watermarking operations

use thiserror::Error;

/// Result type alias for pixelforge operations
pub type Result<T> = std::result::Result<T, PixelForgeError>;

/// Error taxonomy shared by both tools
///
/// Every failure is terminal for the operation that produced it. Nothing in
/// the crate retries automatically.
#[derive(Error, Debug)]
pub enum PixelForgeError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared input type is not PNG or JPEG
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Input exceeds the configured byte cap
    #[error("Input too large: {size} bytes exceeds the {limit} byte limit")]
    OversizeInput { size: usize, limit: usize },

    /// Bytes could not be turned into a raster
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// The inference engine failed or returned unusable output
    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    /// Malformed `#RRGGBB` color string
    #[error("Invalid color '{0}': expected #RRGGBB")]
    InvalidColor(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// PNG encoding failed
    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    /// Model loading or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// A background removal operation is already running
    #[error("A background removal operation is already in progress")]
    Busy,

    /// Watermark rendering requested before an image was loaded
    #[error("No image loaded")]
    NoImageLoaded,
}

impl PixelForgeError {
    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(format: S) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Create a new decode failure
    pub fn decode_failure<S: Into<String>>(msg: S) -> Self {
        Self::DecodeFailure(msg.into())
    }

    /// Create a new inference failure
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::InferenceFailure(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new encode failure
    pub fn encode_failure<S: Into<String>>(msg: S) -> Self {
        Self::EncodeFailure(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create model error with the offending path and troubleshooting hints
    pub fn model_error_with_context<P: AsRef<std::path::Path>>(
        operation: &str,
        model_path: P,
        error: &str,
        suggestions: &[&str],
    ) -> Self {
        let suggestion_text = if suggestions.is_empty() {
            String::new()
        } else {
            format!(" Suggestions: {}", suggestions.join(", "))
        };

        Self::Model(format!(
            "Failed to {} model '{}': {}.{}",
            operation,
            model_path.as_ref().display(),
            error,
            suggestion_text
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Whether the error was raised by input validation before any decoding
    #[must_use]
    pub fn is_input_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat(_) | Self::OversizeInput { .. }
        )
    }
}
