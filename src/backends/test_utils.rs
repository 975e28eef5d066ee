//! Mock inference backend for unit tests
//!
//! Produces deterministic masks without model files so the pipeline can be
//! exercised end to end.

use crate::{
    error::{PixelForgeError, Result},
    inference::{check_input_shape, InferenceBackend},
    types::Tensor,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy)]
enum MaskPattern {
    Constant(f32),
    /// Soft disc centered in the frame
    Circle,
}

/// Mock backend with call recording and optional failure or gating
#[derive(Debug, Clone)]
pub struct MockBackend {
    size: u32,
    pattern: MaskPattern,
    should_fail: bool,
    /// Inference blocks until this is notified
    gate: Option<Arc<Notify>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    fn with_pattern(size: u32, pattern: MaskPattern) -> Self {
        Self {
            size,
            pattern,
            should_fail: false,
            gate: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every mask value equals `value`
    #[must_use]
    pub fn constant(size: u32, value: f32) -> Self {
        Self::with_pattern(size, MaskPattern::Constant(value))
    }

    /// Disc of foreground in the middle of the frame
    #[must_use]
    pub fn circle(size: u32) -> Self {
        Self::with_pattern(size, MaskPattern::Circle)
    }

    /// Backend whose inference always fails
    #[must_use]
    pub fn failing(size: u32) -> Self {
        let mut backend = Self::constant(size, 0.0);
        backend.should_fail = true;
        backend
    }

    /// Hold every inference call until `gate` is notified
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Number of inference calls made so far
    pub fn call_count(&self) -> usize {
        self.call_history.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    fn record_call(&self, input: &Tensor) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(format!("infer {:?}", input.shape()));
        }
    }

    fn generate_mask(&self) -> Vec<f32> {
        let side = self.size as usize;
        match self.pattern {
            MaskPattern::Constant(value) => vec![value; side * side],
            MaskPattern::Circle => {
                let center = side as f32 / 2.0;
                let radius = (side as f32 / 3.0).max(1.0);
                (0..side * side)
                    .map(|i| {
                        let dx = (i % side) as f32 + 0.5 - center;
                        let dy = (i / side) as f32 + 0.5 - center;
                        let distance = (dx * dx + dy * dy).sqrt();
                        ((radius - distance) / radius).clamp(0.0, 1.0)
                    })
                    .collect()
            },
        }
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn input_size(&self) -> u32 {
        self.size
    }

    async fn infer(&self, input: Tensor) -> Result<Vec<f32>> {
        self.record_call(&input);
        check_input_shape(&input, self.size)?;

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.should_fail {
            return Err(PixelForgeError::inference("Mock inference failure"));
        }
        Ok(self.generate_mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_circle_mask_shape() {
        let backend = MockBackend::circle(16);
        let mask = backend.infer(Tensor::zeros((1, 3, 16, 16))).await.unwrap();

        assert_eq!(mask.len(), 256);
        assert!(mask[8 * 16 + 8] > 0.5);
        assert_eq!(mask[0], 0.0);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_backend_records_call() {
        let backend = MockBackend::failing(4);
        let result = backend.infer(Tensor::zeros((1, 3, 4, 4))).await;

        assert!(matches!(result, Err(PixelForgeError::InferenceFailure(_))));
        assert_eq!(backend.get_call_history(), vec!["infer [1, 3, 4, 4]".to_string()]);
    }
}
