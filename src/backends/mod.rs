//! Backend implementations for different inference engines
//!
//! - Tract backend (pure Rust, no external dependencies, default)
//! - ONNX Runtime backend (GPU acceleration, feature `onnx`)

#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(feature = "tract")]
pub mod tract;

// Test utilities for backend testing
#[cfg(test)]
pub mod test_utils;

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

use crate::{
    config::RemovalConfig,
    error::{PixelForgeError, Result},
    inference::InferenceBackend,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr, sync::Arc};

/// Available inference engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Tract,
    Onnx,
}

impl Default for BackendType {
    fn default() -> Self {
        if cfg!(feature = "tract") {
            Self::Tract
        } else {
            Self::Onnx
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tract => write!(f, "tract"),
            Self::Onnx => write!(f, "onnx"),
        }
    }
}

impl FromStr for BackendType {
    type Err = PixelForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tract" => Ok(Self::Tract),
            "onnx" | "ort" => Ok(Self::Onnx),
            other => Err(PixelForgeError::invalid_config(format!(
                "Unknown backend '{other}'. Valid: tract, onnx"
            ))),
        }
    }
}

impl BackendType {
    /// Whether support for this backend was compiled in
    #[must_use]
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Tract => cfg!(feature = "tract"),
            Self::Onnx => cfg!(feature = "onnx"),
        }
    }
}

/// Create a backend of the requested type for a local model file
///
/// # Errors
/// - `InvalidConfig` if the backend was not compiled in or the config is invalid
/// - `Model` if the model cannot be loaded
#[allow(unused_variables)]
pub fn create_backend<P: AsRef<Path>>(
    backend_type: BackendType,
    model_path: P,
    config: &RemovalConfig,
) -> Result<Arc<dyn InferenceBackend>> {
    config.validate()?;

    match backend_type {
        #[cfg(feature = "tract")]
        BackendType::Tract => Ok(Arc::new(TractBackend::from_path(
            model_path,
            config.model_input_size,
        )?)),
        #[cfg(feature = "onnx")]
        BackendType::Onnx => Ok(Arc::new(OnnxBackend::from_path(model_path, config)?)),
        #[allow(unreachable_patterns)]
        other => Err(PixelForgeError::invalid_config(format!(
            "Backend '{other}' is not enabled in this build"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_parsing() {
        assert_eq!("tract".parse::<BackendType>().unwrap(), BackendType::Tract);
        assert_eq!("ONNX".parse::<BackendType>().unwrap(), BackendType::Onnx);
        assert!("torch".parse::<BackendType>().is_err());
        assert_eq!(BackendType::Onnx.to_string(), "onnx");
    }

    #[test]
    fn test_create_backend_rejects_invalid_config() {
        let config = RemovalConfig {
            model_input_size: 0,
            ..RemovalConfig::default()
        };
        let result = create_backend(BackendType::default(), "model.onnx", &config);
        assert!(matches!(result, Err(PixelForgeError::InvalidConfig(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_disabled_backend_reported() {
        let result = create_backend(BackendType::Onnx, "model.onnx", &RemovalConfig::default());
        assert!(matches!(result, Err(PixelForgeError::InvalidConfig(_))));
        assert!(!BackendType::Onnx.is_enabled());
    }
}
