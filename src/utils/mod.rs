//! Pixel utilities feeding the segmentation model

pub mod preprocessing;
pub mod resize;

pub use preprocessing::ImagePreprocessor;
pub use resize::{fit_dimensions, fit_within, resize_to_bound};
