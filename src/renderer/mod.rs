//! Software rendering module
//!
//! Everything is drawn on the CPU with vello_cpu into premultiplied bitmaps:
//! masks are rasterized once and cached, then the compositor erases them out
//! of the veil with a destination-out blend.

pub mod compositor;
pub mod mask;
pub mod raster;
pub mod surface;

pub use compositor::{Compositor, DrawStats};
pub use mask::{Mask, MaskCache, MaskHandle, MaskKey};
pub use surface::{PixelSurface, RenderSurface};
