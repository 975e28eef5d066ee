//! Aspect-preserving dimension fitting

use crate::types::RasterImage;
use image::imageops::{self, FilterType};

/// Fit `(width, height)` so neither side exceeds `max_dim`
///
/// Dimensions already within the bound are returned unchanged. Otherwise the
/// larger side becomes `max_dim` and the smaller side is
/// `round(smaller * max_dim / larger)`, never below 1. Never upsizes.
///
/// # Examples
///
/// ```rust
/// use pixelforge::utils::fit_dimensions;
///
/// assert_eq!(fit_dimensions(2000, 1000, 1024), (1024, 512));
/// assert_eq!(fit_dimensions(800, 600, 1024), (800, 600));
/// ```
#[must_use]
pub fn fit_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width <= max_dim && height <= max_dim {
        return (width, height);
    }

    let scaled = |smaller: u32, larger: u32| -> u32 {
        let value = (f64::from(smaller) * f64::from(max_dim) / f64::from(larger)).round();
        (value as u32).max(1)
    };

    if width > height {
        (max_dim, scaled(height, width))
    } else {
        (scaled(width, height), max_dim)
    }
}

/// Fit `(width, height)` inside a `max_width` x `max_height` box
///
/// Uses a single ratio `min(max_width / width, max_height / height)` applied
/// to both sides with rounding. Used for the watermark preview.
#[must_use]
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Resample `image` so it fits within `max_dim`
///
/// Returns a copy when no resize is needed. Resampling uses the triangle
/// (bilinear) kernel.
#[must_use]
pub fn resize_to_bound(image: &RasterImage, max_dim: u32) -> RasterImage {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = fit_dimensions(width, height, max_dim);

    if (new_width, new_height) == (width, height) {
        return image.clone();
    }

    log::debug!(
        "Bounding {}x{} image to {}x{} (max dimension {})",
        width,
        height,
        new_width,
        new_height,
        max_dim
    );
    imageops::resize(image, new_width, new_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_landscape_scenario() {
        assert_eq!(fit_dimensions(2000, 1000, 1024), (1024, 512));
    }

    #[test]
    fn test_portrait_and_square() {
        assert_eq!(fit_dimensions(1000, 3000, 2048), (683, 2048));
        assert_eq!(fit_dimensions(4096, 4096, 2048), (2048, 2048));
    }

    #[test]
    fn test_never_upsizes() {
        assert_eq!(fit_dimensions(10, 20, 2048), (10, 20));
        assert_eq!(fit_dimensions(2048, 2048, 2048), (2048, 2048));
    }

    #[test]
    fn test_bound_and_ratio_property() {
        let cases = [(3000, 2000), (2049, 17), (5000, 4999), (1234, 4321), (7, 9000)];
        for (width, height) in cases {
            let (w, h) = fit_dimensions(width, height, 1024);
            assert_eq!(w.max(h), 1024, "{width}x{height}");

            // Aspect ratio preserved to within one rounding unit on the smaller side
            let expected_small = f64::from(width.min(height)) * 1024.0 / f64::from(width.max(height));
            let actual_small = f64::from(w.min(h));
            assert!((actual_small - expected_small).abs() <= 1.0, "{width}x{height}");
        }
    }

    #[test]
    fn test_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_dimensions(10_000, 1, 100), (100, 1));
    }

    #[test]
    fn test_fit_within_preview_box() {
        assert_eq!(fit_within(1200, 800, 600, 400), (600, 400));
        assert_eq!(fit_within(1000, 1000, 600, 400), (400, 400));
        assert_eq!(fit_within(3000, 1000, 600, 400), (600, 200));
        assert_eq!(fit_within(500, 300, 600, 400), (500, 300));
    }

    #[test]
    fn test_resize_to_bound_dimensions() {
        let image = RasterImage::from_pixel(300, 150, Rgba([10, 20, 30, 255]));
        let bounded = resize_to_bound(&image, 100);
        assert_eq!(bounded.dimensions(), (100, 50));

        let untouched = resize_to_bound(&image, 400);
        assert_eq!(untouched, image);
    }
}
