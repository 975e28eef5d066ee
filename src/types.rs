//! Core data types shared by the pixel pipeline

use crate::error::{PixelForgeError, Result};
use image::RgbaImage;
use ndarray::Array4;
use serde::{Deserialize, Serialize};

/// Interleaved RGBA8, row-major; buffer length is always `width * height * 4`
pub type RasterImage = RgbaImage;

/// Planar float tensor in (batch, channel, height, width) layout
pub type Tensor = Array4<f32>;

/// Raw model confidence at model-input resolution
///
/// Values carry no range guarantee; consumers clamp before use.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    values: Vec<f32>,
    size: u32,
}

impl SegmentationMask {
    /// Wrap a flat row-major model output of length `size * size`
    ///
    /// # Errors
    /// - `InferenceFailure` when the length does not match `size * size`
    pub fn from_model_output(values: Vec<f32>, size: u32) -> Result<Self> {
        let expected = (size as usize) * (size as usize);
        if values.len() != expected {
            return Err(PixelForgeError::inference(format!(
                "Model output has {} values, expected {} for a {}x{} mask",
                values.len(),
                expected,
                size,
                size
            )));
        }
        Ok(Self { values, size })
    }

    /// Side length S
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Fraction of values above 0.5 after clamping
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let foreground = self
            .values
            .iter()
            .filter(|v| v.clamp(0.0, 1.0) > 0.5)
            .count();
        foreground as f32 / self.values.len() as f32
    }
}

/// Timing breakdown for one background removal run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Validation and decoding of the input bytes
    pub image_decode_ms: u64,

    /// Bounding resize and tensor packing
    pub preprocessing_ms: u64,

    /// Awaiting the inference engine
    pub inference_ms: u64,

    /// Mask upsampling and alpha compositing
    pub postprocessing_ms: u64,

    /// PNG encoding of the composite
    pub image_encode_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Share of total time spent in inference
    #[must_use]
    pub fn inference_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.inference_ms as f64 / self.total_ms as f64
        }
    }

    /// Single-line human summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "decode {}ms, preprocess {}ms, inference {}ms, composite {}ms, encode {}ms, total {}ms",
            self.image_decode_ms,
            self.preprocessing_ms,
            self.inference_ms,
            self.postprocessing_ms,
            self.image_encode_ms,
            self.total_ms
        )
    }
}

/// Output of a background removal run
#[derive(Debug, Clone)]
pub struct RemovalResult {
    /// Decoded input at its original resolution, for before/after views
    pub original: RasterImage,

    /// Bounded-resolution raster with the computed alpha channel
    pub image: RasterImage,

    /// PNG encoding of `image`
    pub png: Vec<u8>,

    /// Fraction of the mask classified as subject
    pub foreground_ratio: f32,

    pub timings: ProcessingTimings,
}

impl RemovalResult {
    /// Dimensions of the composited output
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Dimensions of the decoded input
    #[must_use]
    pub fn original_dimensions(&self) -> (u32, u32) {
        self.original.dimensions()
    }
}
