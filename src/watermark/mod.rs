//! Text watermarking
//!
//! [`WatermarkEngine`] owns the placement geometry and draws through the
//! [`DrawingSurface`] capability; [`RasterSurface`] is the software surface
//! used for both the scaled preview and the full-resolution export.

pub mod engine;
pub mod raster;
pub mod session;
pub mod surface;

pub use engine::{
    AnchorPlacement, RenderPlan, RenderTarget, TileGrid, WatermarkEngine, WatermarkLayout,
};
pub use raster::RasterSurface;
pub use session::{WatermarkPreview, WatermarkSession};
pub use surface::{
    DrawingSurface, FontSpec, Shadow, TextAlign, TextBaseline, TextStyle, TransformScope,
    DROP_SHADOW,
};
