//! Hex color parsing for watermark fills

use crate::error::{PixelForgeError, Result};

/// RGB color with a fractional alpha, as used by the drawing surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0.0 (transparent) to 1.0 (opaque)
    pub alpha: f32,
}

impl TextColor {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self { r, g, b, alpha }
    }

    /// Alpha scaled to 0-255
    #[must_use]
    pub fn alpha_u8(&self) -> u8 {
        (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Same color with alpha multiplied by `factor`
    #[must_use]
    pub fn scaled_alpha(self, factor: f32) -> Self {
        Self {
            alpha: (self.alpha * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

impl std::fmt::Display for TextColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.alpha)
    }
}

/// Convert `#RRGGBB` plus an opacity percentage into a color with alpha
///
/// Alpha is `opacity_percent / 100`, clamped to `[0, 1]`.
///
/// # Errors
/// - `InvalidColor` when `hex` is not exactly `#` followed by six hex digits
///
/// # Examples
///
/// ```rust
/// use pixelforge::color::to_rgba;
///
/// let color = to_rgba("#ffffff", 50).unwrap();
/// assert_eq!((color.r, color.g, color.b), (255, 255, 255));
/// assert!((color.alpha - 0.5).abs() < f32::EPSILON);
/// ```
pub fn to_rgba(hex: &str, opacity_percent: u8) -> Result<TextColor> {
    let digits = hex
        .strip_prefix('#')
        .filter(|digits| digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| PixelForgeError::InvalidColor(hex.to_string()))?;

    let channel = |range: std::ops::Range<usize>| -> Result<u8> {
        digits
            .get(range)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .ok_or_else(|| PixelForgeError::InvalidColor(hex.to_string()))
    };

    Ok(TextColor {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
        alpha: (f32::from(opacity_percent) / 100.0).min(1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_half_opacity() {
        let color = to_rgba("#ffffff", 50).unwrap();
        assert_eq!((color.r, color.g, color.b), (255, 255, 255));
        assert!((color.alpha - 0.5).abs() < f32::EPSILON);
        assert_eq!(color.alpha_u8(), 128);
    }

    #[test]
    fn test_mixed_case_and_channels() {
        let color = to_rgba("#1A2b3C", 100).unwrap();
        assert_eq!((color.r, color.g, color.b), (0x1a, 0x2b, 0x3c));
        assert!((color.alpha - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_zero_opacity_is_transparent() {
        let color = to_rgba("#000000", 0).unwrap();
        assert_eq!(color.alpha, 0.0);
        assert_eq!(color.alpha_u8(), 0);
    }

    #[test]
    fn test_malformed_hex_rejected() {
        for bad in ["ffffff", "#fff", "#gggggg", "#ffffff00", "", "#ff ff f"] {
            let result = to_rgba(bad, 50);
            assert!(
                matches!(result, Err(PixelForgeError::InvalidColor(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_display_matches_css_rgba() {
        let color = to_rgba("#ff0000", 25).unwrap();
        assert_eq!(color.to_string(), "rgba(255, 0, 0, 0.25)");
    }
}
