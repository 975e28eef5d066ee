//! Inference backend abstraction

use crate::{error::Result, types::Tensor};
use async_trait::async_trait;

/// Name of the model's single input tensor
pub const INPUT_NAME: &str = "input";

/// Name of the model's single output tensor
pub const OUTPUT_NAME: &str = "output";

/// Trait for segmentation inference engines
///
/// Implementations take one `(1, 3, S, S)` tensor and return the flat
/// row-major mask of length `S * S`. The engine is the only suspension point
/// of the background removal pipeline.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Side length S of the square model input
    fn input_size(&self) -> u32;

    /// Run inference on the packed input tensor
    ///
    /// # Errors
    /// - Model inference failures
    /// - Output tensor missing or not convertible to `f32`
    async fn infer(&self, input: Tensor) -> Result<Vec<f32>>;
}

/// Check an input tensor against the `(1, 3, S, S)` layout a backend expects
///
/// # Errors
/// - `InferenceFailure` on any shape mismatch
pub fn check_input_shape(input: &Tensor, size: u32) -> Result<()> {
    let side = size as usize;
    let expected = [1, 3, side, side];
    if input.shape() == expected {
        Ok(())
    } else {
        Err(crate::error::PixelForgeError::inference(format!(
            "Input tensor shape {:?} does not match expected {:?}",
            input.shape(),
            expected
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackend;
    use crate::error::PixelForgeError;

    #[test]
    fn test_check_input_shape() {
        assert!(check_input_shape(&Tensor::zeros((1, 3, 8, 8)), 8).is_ok());

        let err = check_input_shape(&Tensor::zeros((1, 3, 8, 4)), 8).unwrap_err();
        assert!(matches!(err, PixelForgeError::InferenceFailure(_)));
        assert!(check_input_shape(&Tensor::zeros((2, 3, 8, 8)), 8).is_err());
    }

    #[tokio::test]
    async fn test_backend_as_trait_object() {
        let backend: Box<dyn InferenceBackend> = Box::new(MockBackend::constant(4, 0.75));
        assert_eq!(backend.name(), "mock");
        assert_eq!(backend.input_size(), 4);

        let mask = backend.infer(Tensor::zeros((1, 3, 4, 4))).await.unwrap();
        assert_eq!(mask.len(), 16);
        assert!(mask.iter().all(|&v| (v - 0.75).abs() < f32::EPSILON));
    }
}
