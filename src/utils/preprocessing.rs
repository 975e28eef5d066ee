//! Raster to model-input tensor packing

use crate::{
    error::{PixelForgeError, Result},
    types::{RasterImage, Tensor},
};
use image::imageops::{self, FilterType};

/// Tensor packing for the segmentation model
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Pack `image` into a `(1, 3, S, S)` planar tensor with values in `[0, 1]`
    ///
    /// The image is stretched onto the S x S grid without letterboxing, so
    /// non-square inputs are distorted. Alpha is dropped.
    ///
    /// # Errors
    /// - `DecodeFailure` if the source surface is empty
    /// - `InvalidConfig` if `size` is zero
    // Safe: tensor dimensions pre-allocated to match the resampled surface
    #[allow(clippy::indexing_slicing)]
    pub fn pack(image: &RasterImage, size: u32) -> Result<Tensor> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PixelForgeError::decode_failure(
                "Cannot read pixels from an empty surface",
            ));
        }
        if size == 0 {
            return Err(PixelForgeError::config_value_error(
                "model input size",
                size,
                "1 or greater",
                Some(1024),
            ));
        }

        let surface = if (width, height) == (size, size) {
            image.clone()
        } else {
            imageops::resize(image, size, size, FilterType::Triangle)
        };

        let side = size as usize;
        let mut tensor = Tensor::zeros((1, 3, side, side));
        for (y, row) in surface.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                tensor[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
                tensor[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
                tensor[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
            }
        }

        Ok(tensor)
    }
}
