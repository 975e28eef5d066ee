//! Mask decoding and alpha compositing

use crate::{
    error::{PixelForgeError, Result},
    types::{RasterImage, SegmentationMask},
    watermark::DrawingSurface,
};
use image::{
    imageops::{self, FilterType},
    GrayImage, Luma,
};
use tracing::instrument;

/// Writes a model mask into the alpha channel of a raster
pub struct MaskCompositor;

impl MaskCompositor {
    /// Quantize a mask to an S x S grayscale surface
    ///
    /// Each value is clamped to `[0, 1]` and mapped to `round(v * 255)`.
    /// Non-finite values are treated as 0.
    ///
    /// # Errors
    /// - `InferenceFailure` if the mask buffer does not fill an S x S surface
    pub fn mask_to_surface(mask: &SegmentationMask) -> Result<GrayImage> {
        let data = mask
            .values()
            .iter()
            .map(|&value| {
                let value = if value.is_finite() { value } else { 0.0 };
                (value.clamp(0.0, 1.0) * 255.0).round() as u8
            })
            .collect();

        GrayImage::from_raw(mask.size(), mask.size(), data).ok_or_else(|| {
            PixelForgeError::inference("Mask values do not fill a square surface")
        })
    }

    /// Replace the alpha channel of `raster` with the upsampled mask
    ///
    /// The mask surface is resampled to the raster's dimensions with the
    /// triangle (bilinear) kernel. Red, green and blue are left untouched and
    /// the raster keeps its dimensions.
    ///
    /// # Errors
    /// - `InferenceFailure` if the mask cannot be materialized
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height(), mask_size = mask.size()))]
    pub fn composite(raster: &mut RasterImage, mask: &SegmentationMask) -> Result<()> {
        let surface = Self::mask_to_surface(mask)?;
        let (width, height) = raster.dimensions();

        let alpha = if surface.dimensions() == (width, height) {
            surface
        } else {
            imageops::resize(&surface, width, height, FilterType::Triangle)
        };

        for (pixel, &Luma([value])) in raster.pixels_mut().zip(alpha.pixels()) {
            pixel[3] = value;
        }

        log::debug!(
            "Applied {}x{} mask to {}x{} raster",
            mask.size(),
            mask.size(),
            width,
            height
        );
        Ok(())
    }

    /// Composite onto whatever `surface` currently holds
    ///
    /// # Errors
    /// - Same as [`Self::composite`]
    pub fn composite_onto<S: DrawingSurface + ?Sized>(
        surface: &mut S,
        mask: &SegmentationMask,
    ) -> Result<()> {
        let mut pixels = surface.pixels().clone();
        Self::composite(&mut pixels, mask)?;
        surface.replace_pixels(pixels)
    }
}
