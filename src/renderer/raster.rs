//! Coverage rasterizer on vello_cpu
//!
//! Everything is drawn white-on-transparent into a premultiplied pixmap whose
//! alpha channel is the coverage. Shapes composite source-over, so overlapping
//! parts of a silhouette never exceed full opacity.

use std::sync::Arc;

use glam::Vec2;
use image::GrayImage;
use vello_cpu::kurbo::{Affine, BezPath, Circle, Point, Rect, Shape};
use vello_cpu::peniko::color::PremulRgba8;
use vello_cpu::peniko::{Color, Gradient, ImageSampler};
use vello_cpu::{Image, ImageSource, Pixmap, RenderContext};

/// Flattening tolerance for circles (px)
const TOLERANCE: f64 = 0.1;

#[inline]
fn point(p: Vec2) -> Point {
    Point::new(f64::from(p.x), f64::from(p.y))
}

fn white(alpha: f32) -> Color {
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgba8(255, 255, 255, a)
}

/// Closed outline through `points`, rounded with quadratic segments
///
/// Each vertex becomes the control point of a curve running between the
/// midpoints of its two edges.
pub fn contour_path(points: &[Vec2]) -> BezPath {
    let mut path = BezPath::new();
    let n = points.len();
    if n < 3 {
        return path;
    }
    let mid = |i: usize| point((points[i] + points[(i + 1) % n]) * 0.5);
    path.move_to(mid(n - 1));
    for i in 0..n {
        path.quad_to(point(points[i]), mid(i));
    }
    path.close_path();
    path
}

/// Coverage bitmap as an image paint (premultiplied white, alpha = coverage)
pub fn coverage_paint(coverage: &GrayImage) -> Option<Image> {
    let w = u16::try_from(coverage.width()).ok()?;
    let h = u16::try_from(coverage.height()).ok()?;
    let pixels = coverage
        .as_raw()
        .iter()
        .map(|&a| PremulRgba8 { r: a, g: a, b: a, a })
        .collect();
    let pixmap = Pixmap::from_parts_with_opacity(pixels, w, h, true);
    Some(Image {
        image: ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: ImageSampler::default(),
    })
}

/// Fixed-size drawing target that yields coverage
pub struct Canvas {
    ctx: RenderContext,
    width: u16,
    height: u16,
}

impl Canvas {
    /// `None` when a side is zero or does not fit a pixmap
    pub fn new(width: u32, height: u32) -> Option<Self> {
        let w = u16::try_from(width).ok().filter(|w| *w > 0)?;
        let h = u16::try_from(height).ok().filter(|h| *h > 0)?;
        let mut ctx = RenderContext::new(w, h);
        ctx.set_paint_transform(Affine::IDENTITY);
        Some(Self {
            ctx,
            width: w,
            height: h,
        })
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    /// Rounded closed contour
    pub fn fill_contour(&mut self, points: &[Vec2], alpha: f32) {
        if points.len() < 3 || !(alpha > 0.0) {
            return;
        }
        self.ctx.set_transform(Affine::IDENTITY);
        self.ctx.set_paint(white(alpha));
        self.ctx.fill_path(&contour_path(points));
    }

    /// Soft radial blot: full out to `inner`, fading linearly to zero at `outer`
    pub fn fill_radial(&mut self, center: Vec2, inner: f32, outer: f32, alpha: f32) {
        if !(outer > 0.0) || !(alpha > 0.0) || !center.is_finite() {
            return;
        }
        let core = (inner / outer).clamp(0.0, 1.0);
        let gradient = Gradient::new_radial(point(center), outer).with_stops([
            (0.0, white(alpha)),
            (core, white(alpha)),
            (1.0, white(0.0)),
        ]);
        self.ctx.set_transform(Affine::IDENTITY);
        self.ctx.set_paint(gradient);
        self.ctx
            .fill_path(&Circle::new(point(center), f64::from(outer)).to_path(TOLERANCE));
    }

    /// Solid disc
    pub fn fill_disc(&mut self, center: Vec2, radius: f32, alpha: f32) {
        if !(radius > 0.0) || !(alpha > 0.0) || !center.is_finite() {
            return;
        }
        self.ctx.set_transform(Affine::IDENTITY);
        self.ctx.set_paint(white(alpha));
        self.ctx
            .fill_path(&Circle::new(point(center), f64::from(radius)).to_path(TOLERANCE));
    }

    /// Paint `image` (`size` px in its own space) through `transform`
    pub fn draw_image(&mut self, image: &Image, size: (u32, u32), transform: Affine) {
        self.ctx.set_transform(transform);
        self.ctx.set_paint(image.clone());
        self.ctx
            .fill_rect(&Rect::new(0.0, 0.0, f64::from(size.0), f64::from(size.1)));
    }

    /// Render and return one coverage byte per pixel, row-major
    pub fn render(mut self) -> Vec<u8> {
        let mut pixmap = Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        pixmap.data_as_u8_slice().chunks_exact(4).map(|px| px[3]).collect()
    }

    /// Render into a coverage bitmap, blurred by `feather` px when at least one
    pub fn into_coverage(self, feather: f32) -> GrayImage {
        let (w, h) = (self.width(), self.height());
        let bytes = self.render();
        let mut coverage: Vec<f32> = bytes.iter().map(|&a| f32::from(a) / 255.0).collect();
        if feather >= 1.0 {
            box_blur(&mut coverage, w as usize, h as usize, feather.round() as usize);
        }
        GrayImage::from_fn(w, h, |x, y| {
            let c = coverage[(y * w + x) as usize];
            image::Luma([(c * 255.0).round().clamp(0.0, 255.0) as u8])
        })
    }
}

/// Separable box blur on a coverage buffer (two passes approximate a tent)
pub fn box_blur(buf: &mut [f32], w: usize, h: usize, radius: usize) {
    if radius == 0 || w == 0 || h == 0 || buf.len() != w * h {
        return;
    }
    let mut tmp = vec![0.0f32; buf.len()];
    for _ in 0..2 {
        blur_pass(buf, &mut tmp, w, h, radius, true);
        blur_pass(&tmp, buf, w, h, radius, false);
    }
}

fn blur_pass(src: &[f32], dst: &mut [f32], w: usize, h: usize, radius: usize, horizontal: bool) {
    let (lines, len) = if horizontal { (h, w) } else { (w, h) };
    let idx = |line: usize, i: usize| if horizontal { line * w + i } else { i * w + line };
    let window = (2 * radius + 1) as f32;

    for line in 0..lines {
        // Running sum with clamped edges
        let mut sum = 0.0;
        for i in 0..=radius {
            sum += src[idx(line, i.min(len - 1))];
        }
        sum += src[idx(line, 0)] * radius as f32;

        for i in 0..len {
            dst[idx(line, i)] = sum / window;
            let add = (i + radius + 1).min(len - 1);
            let sub = i.saturating_sub(radius);
            sum += src[idx(line, add)] - src[idx(line, sub)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn coverage_sum(mask: &GrayImage) -> f32 {
        mask.as_raw().iter().map(|&v| v as f32 / 255.0).sum()
    }

    fn ring(center: Vec2, radius: f32, n: usize) -> Vec<Vec2> {
        (0..n)
            .map(|i| center + Vec2::from_angle(i as f32 / n as f32 * TAU) * radius)
            .collect()
    }

    #[test]
    fn test_contour_path_is_closed_curve() {
        let path = contour_path(&ring(Vec2::ZERO, 10.0, 8));
        // move + one quad per vertex + close
        assert_eq!(path.elements().len(), 10);
        assert!(contour_path(&[Vec2::ZERO, Vec2::ONE]).elements().is_empty());
    }

    #[test]
    fn test_round_contour_area() {
        let mut canvas = Canvas::new(40, 40).unwrap();
        canvas.fill_contour(&ring(Vec2::splat(20.0), 10.0, 64), 1.0);
        let mask = canvas.into_coverage(0.0);
        let area = coverage_sum(&mask);
        assert!((area - 314.16).abs() < 12.0, "area {area}");
        assert_eq!(mask.get_pixel(20, 20).0[0], 255);
        assert_eq!(mask.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn test_feather_softens_but_keeps_area() {
        let contour = ring(Vec2::splat(20.0), 10.0, 48);
        let mut hard = Canvas::new(40, 40).unwrap();
        hard.fill_contour(&contour, 1.0);
        let hard = hard.into_coverage(0.0);
        let mut soft = Canvas::new(40, 40).unwrap();
        soft.fill_contour(&contour, 1.0);
        let soft = soft.into_coverage(2.0);

        assert!((coverage_sum(&hard) - coverage_sum(&soft)).abs() < 8.0);
        assert!(soft.get_pixel(9, 20).0[0] > hard.get_pixel(9, 20).0[0]);
    }

    #[test]
    fn test_radial_falls_off() {
        let mut canvas = Canvas::new(41, 41).unwrap();
        canvas.fill_radial(Vec2::splat(20.5), 2.0, 20.0, 1.0);
        let mask = canvas.into_coverage(0.0);
        let center = mask.get_pixel(20, 20).0[0];
        let mid = mask.get_pixel(30, 20).0[0];
        let edge = mask.get_pixel(39, 20).0[0];
        assert!(center >= 250);
        assert!(mid < center && mid > edge);
    }

    #[test]
    fn test_overlap_saturates() {
        let mut canvas = Canvas::new(10, 10).unwrap();
        for _ in 0..10 {
            canvas.fill_disc(Vec2::splat(5.0), 3.0, 0.7);
        }
        let mask = canvas.into_coverage(0.0);
        assert!(mask.get_pixel(5, 5).0[0] >= 250);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_degenerate_inputs_are_noops() {
        assert!(Canvas::new(0, 10).is_none());
        assert!(Canvas::new(70_000, 10).is_none());

        let mut canvas = Canvas::new(10, 10).unwrap();
        canvas.fill_contour(&[Vec2::ZERO, Vec2::ONE], 1.0);
        canvas.fill_radial(Vec2::splat(5.0), 0.0, 0.0, 1.0);
        canvas.fill_disc(Vec2::splat(5.0), -1.0, 1.0);
        canvas.fill_disc(Vec2::splat(-50.0), 3.0, 1.0);
        canvas.fill_disc(Vec2::NAN, 3.0, 1.0);
        assert!(canvas.render().iter().all(|&a| a == 0));
    }

    #[test]
    fn test_image_paint_follows_transform() {
        // Left half covered
        let src = GrayImage::from_fn(10, 10, |x, _| image::Luma([if x < 5 { 255 } else { 0 }]));
        let paint = coverage_paint(&src).unwrap();

        let mut canvas = Canvas::new(40, 20).unwrap();
        canvas.draw_image(&paint, (10, 10), Affine::translate((20.0, 0.0)) * Affine::scale(2.0));
        let out = canvas.into_coverage(0.0);
        assert!(out.get_pixel(24, 10).0[0] > 240);
        assert_eq!(out.get_pixel(36, 10).0[0], 0);
        assert_eq!(out.get_pixel(5, 10).0[0], 0);
    }

    #[test]
    fn test_box_blur_preserves_constant() {
        let mut buf = vec![0.5f32; 25];
        box_blur(&mut buf, 5, 5, 2);
        assert!(buf.iter().all(|v| (v - 0.5).abs() < 1e-5));
    }
}
