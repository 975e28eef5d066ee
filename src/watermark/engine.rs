//! Watermark placement geometry and rendering

use super::surface::{
    DrawingSurface, FontSpec, TextAlign, TextBaseline, TextStyle, TransformScope, DROP_SHADOW,
};
use crate::{
    color::to_rgba,
    config::{WatermarkPosition, WatermarkSettings},
    error::Result,
};
use tracing::instrument;

/// Minimum effective font size for scaled previews
pub const MIN_PREVIEW_FONT_SIZE: u32 = 12;

/// Rotation applied before stamping tiles (-30 degrees)
pub const TILE_ROTATION: f32 = -std::f32::consts::FRAC_PI_6;

/// Which of the two renders is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// Down-scaled canvas; font size follows `canvas_width / source_width`
    Preview { source_width: u32 },
    /// Full-resolution canvas; font size is used unchanged
    Export,
}

impl RenderTarget {
    /// Font size to draw with on a canvas `canvas_width` pixels wide
    ///
    /// ```rust
    /// use pixelforge::watermark::RenderTarget;
    ///
    /// let preview = RenderTarget::Preview { source_width: 2400 };
    /// assert_eq!(preview.effective_font_size(32, 600), 12);
    /// assert_eq!(preview.effective_font_size(96, 600), 24);
    /// assert_eq!(RenderTarget::Export.effective_font_size(32, 2400), 32);
    /// ```
    #[must_use]
    pub fn effective_font_size(self, font_size: u32, canvas_width: u32) -> u32 {
        match self {
            Self::Preview { source_width } if source_width > 0 => {
                let scaled = (f64::from(font_size) * f64::from(canvas_width)
                    / f64::from(source_width))
                .round() as u32;
                scaled.max(MIN_PREVIEW_FONT_SIZE)
            },
            Self::Preview { .. } => font_size.max(MIN_PREVIEW_FONT_SIZE),
            Self::Export => font_size,
        }
    }
}

/// Single-stamp placement for the five anchored positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPlacement {
    pub x: f32,
    pub y: f32,
    pub align: TextAlign,
}

/// Repeating grid stamped on the rotated surface
///
/// Rows run over `[-height, 2 * height)` and columns over `[-width, 2 * width)`
/// in rotated user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub step_x: f32,
    pub step_y: f32,
    pub width: f32,
    pub height: f32,
}

impl TileGrid {
    /// Row coordinates, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = f32> {
        Self::axis(-self.height, 2.0 * self.height, self.step_y)
    }

    /// Column coordinates, left to right
    pub fn columns(&self) -> impl Iterator<Item = f32> {
        Self::axis(-self.width, 2.0 * self.width, self.step_x)
    }

    /// Every stamp position as `(x, y)`, row by row
    pub fn positions(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.rows()
            .flat_map(move |row| self.columns().map(move |col| (col, row)))
    }

    fn axis(start: f32, end: f32, step: f32) -> impl Iterator<Item = f32> {
        let count = if step > 0.0 && end > start {
            ((end - start) / step).ceil() as usize
        } else {
            0
        };
        (0..count)
            .map(move |i| start + i as f32 * step)
            .filter(move |v| *v < end)
    }
}

/// Where the watermark text goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WatermarkLayout {
    Anchored(AnchorPlacement),
    Tiled(TileGrid),
}

/// Geometry resolved for one render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub font_size: u32,
    /// Equal to the effective font size
    pub padding: f32,
    pub text_width: f32,
    pub layout: WatermarkLayout,
}

/// Stateless watermark geometry and rendering
pub struct WatermarkEngine;

impl WatermarkEngine {
    /// Resolve placement for text `text_width` wide on a `width` x `height` canvas
    #[must_use]
    pub fn layout(
        position: WatermarkPosition,
        width: u32,
        height: u32,
        font_size: u32,
        text_width: f32,
    ) -> WatermarkLayout {
        let (width, height) = (width as f32, height as f32);
        let font_size = font_size as f32;
        let padding = font_size;
        let top = padding + font_size / 2.0;
        let bottom = height - padding - font_size / 2.0;

        let anchored = |x: f32, y: f32, align: TextAlign| {
            WatermarkLayout::Anchored(AnchorPlacement { x, y, align })
        };

        match position {
            WatermarkPosition::Tile => WatermarkLayout::Tiled(TileGrid {
                step_x: text_width + padding * 2.0,
                step_y: font_size * 3.0,
                width,
                height,
            }),
            WatermarkPosition::TopLeft => anchored(padding, top, TextAlign::Left),
            WatermarkPosition::TopRight => anchored(width - padding, top, TextAlign::Right),
            WatermarkPosition::BottomLeft => anchored(padding, bottom, TextAlign::Left),
            WatermarkPosition::Center => anchored(width / 2.0, height / 2.0, TextAlign::Center),
            WatermarkPosition::BottomRight => anchored(width - padding, bottom, TextAlign::Right),
        }
    }

    /// Draw the watermark described by `settings` onto `surface`
    ///
    /// Anchored positions get a drop shadow; tiles are stamped without one
    /// inside a scoped rotation, so the surface transform is unchanged on
    /// return.
    ///
    /// # Errors
    /// - `InvalidConfig` for out-of-range settings
    /// - `InvalidColor` for a malformed color
    #[instrument(skip_all, fields(position = %settings.position, width = surface.width(), height = surface.height()))]
    pub fn render<S: DrawingSurface + ?Sized>(
        surface: &mut S,
        settings: &WatermarkSettings,
        target: RenderTarget,
    ) -> Result<RenderPlan> {
        settings.validate()?;
        let color = to_rgba(&settings.color, settings.opacity)?;
        let text = settings.effective_text();

        let (width, height) = (surface.width(), surface.height());
        let font_size = target.effective_font_size(settings.font_size, width);
        let font = FontSpec::new(settings.font.clone(), font_size as f32);
        let text_width = surface.measure_text(text, &font);
        let layout = Self::layout(settings.position, width, height, font_size, text_width);

        match layout {
            WatermarkLayout::Tiled(grid) => {
                let style = TextStyle {
                    font,
                    color,
                    align: TextAlign::Center,
                    baseline: TextBaseline::Middle,
                    shadow: None,
                };
                let mut scoped = TransformScope::new(surface);
                scoped.rotate(TILE_ROTATION);
                let mut stamps = 0usize;
                for (x, y) in grid.positions() {
                    scoped.fill_text(text, x, y, &style);
                    stamps += 1;
                }
                log::debug!(
                    "Stamped {} tiles (step {:.1}x{:.1}) at font size {}",
                    stamps,
                    grid.step_x,
                    grid.step_y,
                    font_size
                );
            },
            WatermarkLayout::Anchored(anchor) => {
                let style = TextStyle {
                    font,
                    color,
                    align: anchor.align,
                    baseline: TextBaseline::Middle,
                    shadow: Some(DROP_SHADOW),
                };
                surface.fill_text(text, anchor.x, anchor.y, &style);
                log::debug!(
                    "Drew watermark at ({:.1}, {:.1}) font size {}",
                    anchor.x,
                    anchor.y,
                    font_size
                );
            },
        }

        Ok(RenderPlan {
            font_size,
            padding: font_size as f32,
            text_width,
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_font_size_floor() {
        let target = RenderTarget::Preview { source_width: 3000 };
        assert_eq!(target.effective_font_size(32, 600), 12);
        assert_eq!(target.effective_font_size(200, 600), 40);
        assert_eq!(
            RenderTarget::Preview { source_width: 0 }.effective_font_size(5, 600),
            12
        );
    }

    #[test]
    fn test_preview_font_size_rounds() {
        // 50 * 600 / 1000 = 30; 45 * 600 / 1000 = 27
        let target = RenderTarget::Preview { source_width: 1000 };
        assert_eq!(target.effective_font_size(50, 600), 30);
        assert_eq!(target.effective_font_size(45, 600), 27);
        // 25 * 400 / 600 = 16.67 -> 17
        let target = RenderTarget::Preview { source_width: 600 };
        assert_eq!(target.effective_font_size(25, 400), 17);
    }

    #[test]
    fn test_anchor_table() {
        let cases = [
            (WatermarkPosition::TopLeft, 20.0, 30.0, TextAlign::Left),
            (WatermarkPosition::TopRight, 780.0, 30.0, TextAlign::Right),
            (WatermarkPosition::BottomLeft, 20.0, 570.0, TextAlign::Left),
            (WatermarkPosition::BottomRight, 780.0, 570.0, TextAlign::Right),
            (WatermarkPosition::Center, 400.0, 300.0, TextAlign::Center),
        ];
        for (position, x, y, align) in cases {
            let layout = WatermarkEngine::layout(position, 800, 600, 20, 100.0);
            assert_eq!(
                layout,
                WatermarkLayout::Anchored(AnchorPlacement { x, y, align }),
                "{position}"
            );
        }
    }

    #[test]
    fn test_odd_font_size_half_offsets() {
        let layout = WatermarkEngine::layout(WatermarkPosition::TopLeft, 100, 100, 13, 10.0);
        assert_eq!(
            layout,
            WatermarkLayout::Anchored(AnchorPlacement {
                x: 13.0,
                y: 19.5,
                align: TextAlign::Left
            })
        );
    }

    #[test]
    fn test_tile_steps() {
        let layout = WatermarkEngine::layout(WatermarkPosition::Tile, 300, 200, 10, 80.0);
        let WatermarkLayout::Tiled(grid) = layout else {
            panic!("expected tiled layout");
        };
        assert_eq!(grid.step_x, 100.0);
        assert_eq!(grid.step_y, 30.0);
    }

    #[test]
    fn test_tile_iteration_bounds() {
        let grid = TileGrid {
            step_x: 100.0,
            step_y: 30.0,
            width: 300.0,
            height: 200.0,
        };
        let rows: Vec<f32> = grid.rows().collect();
        let columns: Vec<f32> = grid.columns().collect();

        assert_eq!(rows.first(), Some(&-200.0));
        assert!(rows.iter().all(|r| *r < 400.0));
        assert_eq!(rows.len(), 20);
        assert_eq!(columns, vec![-300.0, -200.0, -100.0, 0.0, 100.0, 200.0, 300.0, 400.0, 500.0]);
        assert_eq!(grid.positions().count(), rows.len() * columns.len());
    }

    #[test]
    fn test_tile_grid_covers_rotated_center() {
        // The canvas center in rotated user space must fall inside the grid span
        let (width, height) = (640.0_f32, 480.0_f32);
        let (cx, cy) = (width / 2.0, height / 2.0);
        let (sin, cos) = (-TILE_ROTATION).sin_cos();
        let u = cx * cos - cy * sin;
        let v = cx * sin + cy * cos;
        assert!((-width..2.0 * width).contains(&u));
        assert!((-height..2.0 * height).contains(&v));
    }
}
