//! Tract backend for the segmentation model
//!
//! Pure Rust ONNX inference with no native dependencies. The model graph is
//! specialized to the fixed `(1, 3, S, S)` input before optimization.

use crate::error::{PixelForgeError, Result};
use crate::inference::{check_input_shape, InferenceBackend};
use crate::types;
use async_trait::async_trait;
use instant::Instant;
use std::path::Path;
use std::sync::Arc;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend running a local ONNX segmentation model
#[derive(Debug, Clone)]
pub struct TractBackend {
    model: Arc<TractModel>,
    input_size: u32,
}

impl TractBackend {
    /// Load and optimize an ONNX model file for an S x S input
    ///
    /// # Errors
    /// - `Model` if the file cannot be read, parsed or optimized
    pub fn from_path<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let load_start = Instant::now();
        let side = input_size as usize;

        log::info!(
            "Loading Tract model from {} (input {}x{})",
            model_path.display(),
            input_size,
            input_size
        );

        let model = onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                PixelForgeError::model_error_with_context(
                    "load",
                    model_path,
                    &e.to_string(),
                    &["check the file is an ONNX model", "check the path exists"],
                )
            })?
            .with_input_fact(0, f32::fact([1, 3, side, side]).into())
            .map_err(|e| PixelForgeError::model(format!("Failed to set input shape: {e}")))?
            .into_optimized()
            .map_err(|e| PixelForgeError::model(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| {
                PixelForgeError::model(format!("Failed to create runnable model: {e}"))
            })?;

        log::info!(
            "Tract backend ready in {}ms",
            load_start.elapsed().as_millis()
        );

        Ok(Self {
            model: Arc::new(model),
            input_size,
        })
    }

    fn run_blocking(model: &TractModel, input: types::Tensor) -> Result<Vec<f32>> {
        let outputs = model
            .run(tvec![Tensor::from(input).into()])
            .map_err(|e| PixelForgeError::inference(format!("Tract inference failed: {e}")))?;

        let output = outputs
            .first()
            .ok_or_else(|| PixelForgeError::inference("No output tensor found"))?;

        let view = output.to_array_view::<f32>().map_err(|e| {
            PixelForgeError::inference(format!("Failed to convert output tensor: {e}"))
        })?;

        Ok(view.iter().copied().collect())
    }
}

#[async_trait]
impl InferenceBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_size(&self) -> u32 {
        self.input_size
    }

    async fn infer(&self, input: types::Tensor) -> Result<Vec<f32>> {
        check_input_shape(&input, self.input_size)?;
        log::debug!("Running Tract inference on {:?}", input.shape());

        let model = Arc::clone(&self.model);
        let start = Instant::now();
        let values = tokio::task::spawn_blocking(move || Self::run_blocking(&model, input))
            .await
            .map_err(|e| PixelForgeError::inference(format!("Inference task failed: {e}")))??;

        log::debug!(
            "Tract inference produced {} values in {}ms",
            values.len(),
            start.elapsed().as_millis()
        );
        Ok(values)
    }
}
