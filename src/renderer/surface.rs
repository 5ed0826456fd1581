//! Drawing surface
//!
//! The veil lives in a premultiplied RGBA8 bitmap owned by the host. The
//! engine only reaches it through [`RenderSurface`], which may be detached at
//! any time; a detached surface makes the frame skip drawing, not fail.

use image::{ImageResult, RgbaImage};
use std::path::Path;

/// Premultiplied RGBA8 pixel
pub type PremulRgba8 = [u8; 4];

/// Host-owned drawing surface
pub trait RenderSurface {
    /// False once the host removed the surface
    fn is_attached(&self) -> bool;

    /// Current size in device pixels
    fn size(&self) -> (u32, u32);

    /// Reallocate to `width` x `height` device pixels (contents undefined)
    fn resize(&mut self, width: u32, height: u32);

    /// Pixel access for this frame, `None` while detached
    fn pixels_mut(&mut self) -> Option<&mut RgbaImage>;

    /// Called once the frame's drawing is complete
    fn present(&mut self) {}

    /// Free any backing store; the engine calls this on destroy
    fn release(&mut self) {}
}

/// In-memory surface used by the native binary and the tests
#[derive(Debug, Clone)]
pub struct PixelSurface {
    image: RgbaImage,
    attached: bool,
    presented: u64,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            attached: true,
            presented: 0,
        }
    }

    /// Simulate the host removing the surface
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    /// Write the veil composited over `background` as a PNG
    pub fn save_reveal_png(&self, background: &RgbaImage, path: impl AsRef<Path>) -> ImageResult<()> {
        reveal_over(background, &self.image).save(path)
    }
}

impl RenderSurface for PixelSurface {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    fn pixels_mut(&mut self) -> Option<&mut RgbaImage> {
        if self.attached {
            Some(&mut self.image)
        } else {
            None
        }
    }

    fn present(&mut self) {
        self.presented += 1;
    }

    fn release(&mut self) {
        self.image = RgbaImage::new(0, 0);
    }
}

pub fn premultiply(c: [u8; 4]) -> PremulRgba8 {
    let a = u16::from(c[3]);
    [
        mul_div255(u16::from(c[0]), a),
        mul_div255(u16::from(c[1]), a),
        mul_div255(u16::from(c[2]), a),
        c[3],
    ]
}

/// Flat veil fill over the whole surface
pub fn fill_veil(image: &mut RgbaImage, color: [u8; 4]) {
    let px = premultiply(color);
    for p in image.pixels_mut() {
        p.0 = px;
    }
}

/// True when every pixel holds the veil color
pub fn is_flat_veil(image: &RgbaImage, color: [u8; 4]) -> bool {
    let px = premultiply(color);
    image.pixels().all(|p| p.0 == px)
}

/// Source-over on premultiplied pixels
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(src[3]);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = src[i].saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Destination-out: remove `strength` (0..1) of the pixel's coverage
#[inline]
pub fn erase(dst: &mut PremulRgba8, strength: f32) {
    let a = ((strength.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if a == 0 {
        return;
    }
    let inv = 255 - a;
    for c in dst.iter_mut() {
        *c = mul_div255(u16::from(*c), inv);
    }
}

/// Veil composited over an opaque background (what the viewer sees)
pub fn reveal_over(background: &RgbaImage, veil: &RgbaImage) -> RgbaImage {
    let (w, h) = veil.dimensions();
    RgbaImage::from_fn(w, h, |x, y| {
        let bg = if x < background.width() && y < background.height() {
            premultiply(background.get_pixel(x, y).0)
        } else {
            [0, 0, 0, 255]
        };
        image::Rgba(over(bg, veil.get_pixel(x, y).0))
    })
}

#[inline]
fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
