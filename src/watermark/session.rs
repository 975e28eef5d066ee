//! Watermark session: one loaded image, any number of previews and exports

use super::{
    engine::{RenderPlan, RenderTarget, WatermarkEngine},
    raster::RasterSurface,
    surface::DrawingSurface,
};
use crate::{
    config::{WatermarkConfig, WatermarkSettings},
    error::{PixelForgeError, Result},
    services::{ExportAsset, ImageIOService, InputImage},
    types::RasterImage,
    utils::fit_within,
};

/// A rendered preview and the geometry it was drawn with
#[derive(Debug, Clone)]
pub struct WatermarkPreview {
    pub image: RasterImage,
    pub plan: RenderPlan,
}

/// Explicit per-user context for watermarking
///
/// Settings are passed to every render rather than stored, so preview and
/// export always reflect the caller's current values.
#[derive(Debug, Clone, Default)]
pub struct WatermarkSession {
    config: WatermarkConfig,
    source: Option<RasterImage>,
}

impl WatermarkSession {
    #[must_use]
    pub fn new(config: WatermarkConfig) -> Self {
        Self {
            config,
            source: None,
        }
    }

    /// Validate and decode `input` as the new source image
    ///
    /// Any previously loaded image is dropped first, even if loading fails.
    ///
    /// # Errors
    /// - `UnsupportedFormat` / `OversizeInput` before decoding
    /// - `DecodeFailure` for undecodable bytes
    pub fn load(&mut self, input: &InputImage) -> Result<(u32, u32)> {
        self.source = None;
        let raster = ImageIOService::load(input, self.config.max_input_bytes)?;
        let dimensions = raster.dimensions();
        log::info!(
            "Loaded {}x{} image for watermarking",
            dimensions.0,
            dimensions.1
        );
        self.source = Some(raster);
        Ok(dimensions)
    }

    /// Dimensions of the loaded source image
    #[must_use]
    pub fn source_dimensions(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(RasterImage::dimensions)
    }

    /// Render a preview that fits the configured preview bounds
    ///
    /// # Errors
    /// - `NoImageLoaded` if nothing has been loaded
    /// - Settings errors from [`WatermarkEngine::render`]
    pub fn preview(&self, settings: &WatermarkSettings) -> Result<WatermarkPreview> {
        let source = self.source()?;
        let (width, height) = fit_within(
            source.width(),
            source.height(),
            self.config.preview_max_width,
            self.config.preview_max_height,
        );

        let mut surface = RasterSurface::new(width, height);
        surface.draw_image(source, 0, 0, width, height);
        let plan = WatermarkEngine::render(
            &mut surface,
            settings,
            RenderTarget::Preview {
                source_width: source.width(),
            },
        )?;

        Ok(WatermarkPreview {
            image: surface.into_pixels(),
            plan,
        })
    }

    /// Render at full resolution and encode as PNG
    ///
    /// # Errors
    /// - `NoImageLoaded` if nothing has been loaded
    /// - Settings errors from [`WatermarkEngine::render`]
    /// - `EncodeFailure` if PNG encoding fails
    pub fn export(&self, settings: &WatermarkSettings) -> Result<ExportAsset> {
        let image = self.render_full(settings)?;
        let png = ImageIOService::encode_png(&image)?;
        log::info!(
            "Exported {}x{} watermarked image ({} bytes)",
            image.width(),
            image.height(),
            png.len()
        );
        Ok(ExportAsset::new(self.config.output_file_name.clone(), png))
    }

    /// Full-resolution render without encoding
    ///
    /// # Errors
    /// - Same as [`Self::export`] minus encoding
    pub fn render_full(&self, settings: &WatermarkSettings) -> Result<RasterImage> {
        let mut surface = RasterSurface::from_image(self.source()?.clone());
        WatermarkEngine::render(&mut surface, settings, RenderTarget::Export)?;
        Ok(surface.into_pixels())
    }

    /// Drop the loaded image
    pub fn reset(&mut self) {
        self.source = None;
    }

    fn source(&self) -> Result<&RasterImage> {
        self.source.as_ref().ok_or(PixelForgeError::NoImageLoaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatermarkPosition;
    use image::Rgba;

    fn png_input(width: u32, height: u32) -> InputImage {
        let image = RasterImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        InputImage::new(ImageIOService::encode_png(&image).unwrap(), "image/png")
    }

    #[test]
    fn test_render_before_load() {
        let session = WatermarkSession::default();
        let err = session.preview(&WatermarkSettings::default()).unwrap_err();
        assert!(matches!(err, PixelForgeError::NoImageLoaded));
        assert!(session.export(&WatermarkSettings::default()).is_err());
    }

    #[test]
    fn test_preview_fits_bounds_and_scales_font() {
        let mut session = WatermarkSession::default();
        assert_eq!(session.load(&png_input(1200, 800)).unwrap(), (1200, 800));

        let settings = WatermarkSettings {
            font_size: 64,
            ..WatermarkSettings::default()
        };
        let preview = session.preview(&settings).unwrap();
        assert_eq!(preview.image.dimensions(), (600, 400));
        assert_eq!(preview.plan.font_size, 32);
        assert_eq!(preview.plan.padding, 32.0);
    }

    #[test]
    fn test_export_keeps_resolution_and_name() {
        let mut session = WatermarkSession::default();
        session.load(&png_input(300, 200)).unwrap();

        let asset = session.export(&WatermarkSettings::default()).unwrap();
        assert_eq!(asset.file_name, "watermarked-image.png");

        let decoded = image::load_from_memory(&asset.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 200));
    }

    #[test]
    fn test_failed_load_clears_source() {
        let mut session = WatermarkSession::default();
        session.load(&png_input(10, 10)).unwrap();

        let err = session
            .load(&InputImage::new(vec![0; 4], "image/bmp"))
            .unwrap_err();
        assert!(matches!(err, PixelForgeError::UnsupportedFormat(_)));
        assert_eq!(session.source_dimensions(), None);
    }

    #[test]
    fn test_invalid_color_rejected() {
        let mut session = WatermarkSession::default();
        session.load(&png_input(50, 50)).unwrap();
        let settings = WatermarkSettings {
            color: "red".to_string(),
            position: WatermarkPosition::Center,
            ..WatermarkSettings::default()
        };
        assert!(matches!(
            session.render_full(&settings),
            Err(PixelForgeError::InvalidColor(_))
        ));
    }

    #[test]
    fn test_reset() {
        let mut session = WatermarkSession::default();
        session.load(&png_input(10, 10)).unwrap();
        session.reset();
        assert!(session.source_dimensions().is_none());
    }
}
