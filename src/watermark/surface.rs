//! Drawing surface capability used by the watermark engine

use crate::{color::TextColor, error::Result, types::RasterImage};
use std::ops::{Deref, DerefMut};

/// Font family and pixel size
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    /// Requested family name; surfaces may substitute their own face
    pub family: String,
    pub size_px: f32,
}

impl FontSpec {
    #[must_use]
    pub fn new(family: impl Into<String>, size_px: f32) -> Self {
        Self {
            family: family.into(),
            size_px,
        }
    }
}

/// Horizontal alignment of text relative to its anchor x
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Right,
    Center,
}

/// Vertical placement of text relative to its anchor y
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextBaseline {
    Top,
    /// Anchor y is the vertical center of the em box
    Middle,
}

/// Blurred copy of the text drawn beneath it, offset in device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub color: TextColor,
}

/// Legibility shadow used for anchored watermarks
pub const DROP_SHADOW: Shadow = Shadow {
    offset_x: 2.0,
    offset_y: 2.0,
    blur: 4.0,
    color: TextColor::new(0, 0, 0, 0.5),
};

/// Everything needed to fill one run of text
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: FontSpec,
    pub color: TextColor,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub shadow: Option<Shadow>,
}

/// 2D raster and text drawing capability
///
/// Coordinates are in user space and pass through the current transform,
/// except `draw_image` and shadow offsets which work in device pixels.
pub trait DrawingSurface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Scale `source` into the `width` x `height` region at `(x, y)`, blending over
    fn draw_image(&mut self, source: &RasterImage, x: i64, y: i64, width: u32, height: u32);

    /// Current pixel buffer
    fn pixels(&self) -> &RasterImage;

    /// Replace the pixel buffer with one of the same dimensions
    ///
    /// # Errors
    /// - `InvalidConfig` if the dimensions differ
    fn replace_pixels(&mut self, pixels: RasterImage) -> Result<()>;

    /// Advance width of `text` in user units
    fn measure_text(&self, text: &str, font: &FontSpec) -> f32;

    /// Fill `text` anchored at `(x, y)`
    fn fill_text(&mut self, text: &str, x: f32, y: f32, style: &TextStyle);

    /// Push the current transform
    fn save(&mut self);

    /// Pop the most recently saved transform; no-op on an empty stack
    fn restore(&mut self);

    /// Rotate the current transform about the user-space origin
    fn rotate(&mut self, radians: f32);
}

/// Saves the surface transform on creation and restores it on drop
///
/// ```rust
/// use pixelforge::watermark::{DrawingSurface, RasterSurface, TransformScope};
///
/// let mut surface = RasterSurface::new(4, 4);
/// {
///     let mut scoped = TransformScope::new(&mut surface);
///     scoped.rotate(0.5);
/// }
/// assert!(surface.is_identity_transform());
/// ```
pub struct TransformScope<'a, S: DrawingSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: DrawingSurface + ?Sized> TransformScope<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<S: DrawingSurface + ?Sized> Deref for TransformScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> DerefMut for TransformScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> Drop for TransformScope<'_, S> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}
