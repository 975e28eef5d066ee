//! Software drawing surface over an RGBA8 buffer
//!
//! Text uses the embedded 8x8 bitmap face, scaled so one glyph cell spans the
//! font size in both directions. Every family name resolves to this face.

use super::surface::{DrawingSurface, FontSpec, Shadow, TextAlign, TextBaseline, TextStyle};
use crate::{
    color::TextColor,
    error::{PixelForgeError, Result},
    types::RasterImage,
};
use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{
    imageops::{self, FilterType},
    GrayImage, Luma, Rgba,
};
use imageproc::filter::gaussian_blur_f32;

/// Bitmap rows and columns per glyph
const GLYPH_CELLS: f64 = 8.0;

/// Canvas-style affine transform: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Post-multiply by a rotation, as a canvas `rotate` call does
    fn rotated(self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: self.a * cos + self.c * sin,
            b: self.b * cos + self.d * sin,
            c: self.c * cos - self.a * sin,
            d: self.d * cos - self.b * sin,
            ..self
        }
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        Some(Self {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }
}

/// Half-open integer rectangle in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelRect {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl PixelRect {
    fn of_size(width: u32, height: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: i64::from(width),
            y1: i64::from(height),
        }
    }

    fn intersect(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }

    fn expand(&self, margin: i64) -> Self {
        Self {
            x0: self.x0 - margin,
            y0: self.y0 - margin,
            x1: self.x1 + margin,
            y1: self.y1 + margin,
        }
    }

    fn translate(&self, dx: i64, dy: i64) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    fn width(&self) -> u32 {
        (self.x1 - self.x0).max(0) as u32
    }

    fn height(&self) -> u32 {
        (self.y1 - self.y0).max(0) as u32
    }
}

fn glyph_for(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// A run of glyphs placed in user space
struct TextLayout {
    left: f64,
    top: f64,
    glyph_size: f64,
    glyphs: Vec<[u8; 8]>,
}

impl TextLayout {
    fn new(text: &str, x: f32, y: f32, style: &TextStyle) -> Self {
        let glyph_size = f64::from(style.font.size_px.max(0.0));
        let glyphs: Vec<[u8; 8]> = text.chars().map(glyph_for).collect();
        let width = glyph_size * glyphs.len() as f64;

        let (x, y) = (f64::from(x), f64::from(y));
        let left = match style.align {
            TextAlign::Left => x,
            TextAlign::Right => x - width,
            TextAlign::Center => x - width / 2.0,
        };
        let top = match style.baseline {
            TextBaseline::Top => y,
            TextBaseline::Middle => y - glyph_size / 2.0,
        };

        Self {
            left,
            top,
            glyph_size,
            glyphs,
        }
    }

    fn width(&self) -> f64 {
        self.glyph_size * self.glyphs.len() as f64
    }

    fn is_empty(&self) -> bool {
        self.glyphs.is_empty() || self.glyph_size <= 0.0
    }

    /// Whether the user-space point lands on a set glyph bit
    fn covers(&self, u: f64, v: f64) -> bool {
        let du = u - self.left;
        let dv = v - self.top;
        if du < 0.0 || dv < 0.0 || du >= self.width() || dv >= self.glyph_size {
            return false;
        }

        let index = (du / self.glyph_size).floor() as usize;
        let cell = self.glyph_size / GLYPH_CELLS;
        let col = (((du - index as f64 * self.glyph_size) / cell).floor() as usize).min(7);
        let row = ((dv / cell).floor() as usize).min(7);

        self.glyphs
            .get(index)
            .and_then(|glyph| glyph.get(row))
            .is_some_and(|bits| (bits >> col) & 1 == 1)
    }

    /// Device-space bounding box of the text rectangle under `transform`
    fn device_bounds(&self, transform: &Affine) -> PixelRect {
        let right = self.left + self.width();
        let bottom = self.top + self.glyph_size;
        let corners = [
            transform.apply(self.left, self.top),
            transform.apply(right, self.top),
            transform.apply(self.left, bottom),
            transform.apply(right, bottom),
        ];

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        PixelRect {
            x0: min_x.floor() as i64,
            y0: min_y.floor() as i64,
            x1: max_x.ceil() as i64,
            y1: max_y.ceil() as i64,
        }
    }
}

/// Software [`DrawingSurface`] on an owned RGBA8 raster
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RasterImage,
    transform: Affine,
    saved: Vec<Affine>,
}

impl RasterSurface {
    /// Transparent surface of the given size
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RasterImage::new(width, height))
    }

    /// Surface drawing directly onto `pixels`
    #[must_use]
    pub fn from_image(pixels: RasterImage) -> Self {
        Self {
            pixels,
            transform: Affine::IDENTITY,
            saved: Vec::new(),
        }
    }

    #[must_use]
    pub fn into_pixels(self) -> RasterImage {
        self.pixels
    }

    #[must_use]
    pub fn is_identity_transform(&self) -> bool {
        self.transform == Affine::IDENTITY
    }

    /// Number of transforms on the save stack
    #[must_use]
    pub fn saved_states(&self) -> usize {
        self.saved.len()
    }

    fn coverage(layout: &TextLayout, inverse: &Affine, region: PixelRect) -> GrayImage {
        GrayImage::from_fn(region.width(), region.height(), |i, j| {
            let px = (region.x0 + i64::from(i)) as f64 + 0.5;
            let py = (region.y0 + i64::from(j)) as f64 + 0.5;
            let (u, v) = inverse.apply(px, py);
            Luma([if layout.covers(u, v) { 255 } else { 0 }])
        })
    }

    fn draw_shadow(
        &mut self,
        layout: &TextLayout,
        inverse: &Affine,
        text_box: PixelRect,
        shadow: &Shadow,
        fill_alpha: f32,
    ) {
        let alpha = shadow.color.alpha * fill_alpha;
        if alpha <= 0.0 {
            return;
        }

        let sigma = shadow.blur / 2.0;
        let margin = if sigma > 0.0 {
            (sigma * 3.0).ceil() as i64
        } else {
            0
        };
        let dx = shadow.offset_x.round() as i64;
        let dy = shadow.offset_y.round() as i64;

        // Only coverage that can land on the surface after the offset matters
        let reach = PixelRect::of_size(self.pixels.width(), self.pixels.height())
            .translate(-dx, -dy)
            .expand(margin);
        let region = text_box.expand(margin).intersect(&reach);
        if region.is_empty() {
            return;
        }

        let mut layer = Self::coverage(layout, inverse, region);
        if sigma > 0.0 {
            layer = gaussian_blur_f32(&layer, sigma);
        }
        self.blend_layer(&layer, region.x0 + dx, region.y0 + dy, shadow.color, alpha);
    }

    /// Source-over blend of `color` through a coverage layer placed at `(x0, y0)`
    fn blend_layer(&mut self, layer: &GrayImage, x0: i64, y0: i64, color: TextColor, alpha: f32) {
        let (width, height) = (
            i64::from(self.pixels.width()),
            i64::from(self.pixels.height()),
        );

        for (i, j, &Luma([coverage])) in layer.enumerate_pixels() {
            if coverage == 0 {
                continue;
            }
            let x = x0 + i64::from(i);
            let y = y0 + i64::from(j);
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }
            let source_alpha = alpha * f32::from(coverage) / 255.0;
            blend_pixel(self.pixels.get_pixel_mut(x as u32, y as u32), color, source_alpha);
        }
    }
}

fn blend_pixel(dst: &mut Rgba<u8>, color: TextColor, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let alpha = alpha.min(1.0);
    let dst_alpha = f32::from(dst[3]) / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return;
    }

    let mix = |src: u8, below: u8| -> u8 {
        let value =
            (f32::from(src) * alpha + f32::from(below) * dst_alpha * (1.0 - alpha)) / out_alpha;
        value.round().clamp(0.0, 255.0) as u8
    };

    *dst = Rgba([
        mix(color.r, dst[0]),
        mix(color.g, dst[1]),
        mix(color.b, dst[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ]);
}

impl DrawingSurface for RasterSurface {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn draw_image(&mut self, source: &RasterImage, x: i64, y: i64, width: u32, height: u32) {
        if width == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
            return;
        }
        if source.dimensions() == (width, height) {
            imageops::overlay(&mut self.pixels, source, x, y);
        } else {
            let scaled = imageops::resize(source, width, height, FilterType::Triangle);
            imageops::overlay(&mut self.pixels, &scaled, x, y);
        }
    }

    fn pixels(&self) -> &RasterImage {
        &self.pixels
    }

    fn replace_pixels(&mut self, pixels: RasterImage) -> Result<()> {
        if pixels.dimensions() != self.pixels.dimensions() {
            return Err(PixelForgeError::invalid_config(format!(
                "Pixel buffer is {}x{} but surface is {}x{}",
                pixels.width(),
                pixels.height(),
                self.pixels.width(),
                self.pixels.height()
            )));
        }
        self.pixels = pixels;
        Ok(())
    }

    fn measure_text(&self, text: &str, font: &FontSpec) -> f32 {
        font.size_px.max(0.0) * text.chars().count() as f32
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle) {
        let layout = TextLayout::new(text, x, y, style);
        if layout.is_empty() {
            return;
        }
        let Some(inverse) = self.transform.inverse() else {
            return;
        };

        let text_box = layout.device_bounds(&self.transform);
        if let Some(shadow) = &style.shadow {
            self.draw_shadow(&layout, &inverse, text_box, shadow, style.color.alpha);
        }

        let region =
            text_box.intersect(&PixelRect::of_size(self.pixels.width(), self.pixels.height()));
        if region.is_empty() {
            return;
        }
        let coverage = Self::coverage(&layout, &inverse, region);
        self.blend_layer(&coverage, region.x0, region.y0, style.color, style.color.alpha);
    }

    fn save(&mut self) {
        self.saved.push(self.transform);
    }

    fn restore(&mut self) {
        if let Some(transform) = self.saved.pop() {
            self.transform = transform;
        }
    }

    fn rotate(&mut self, radians: f32) {
        self.transform = self.transform.rotated(f64::from(radians));
    }
}
