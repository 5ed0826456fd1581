//! Offscreen mask cache
//!
//! Shapes are rasterized once per size class into coverage bitmaps and painted
//! at any scale and rotation afterwards. Splash and brush masks are
//! handed out as [`MaskHandle`]s that the owning entity must give back with
//! [`MaskCache::release`]; the last release frees the bitmap. Ghosts all share
//! one lazily built mask that lives until it is invalidated.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use glam::Vec2;
use image::GrayImage;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use vello_cpu::Image;

use super::raster::{self, Canvas};
use crate::consts::{MASK_BUCKET_PX, MASK_PADDING_PX, MAX_MASK_EDGE_PX};
use crate::settings::RevealConfig;
use crate::sim::shape::{self, OrganicShape, ShapeParams};

/// Core blot opacity is flat out to this fraction of the blot radius
const BLOT_CORE: f32 = 0.35;

/// A rasterized silhouette
pub struct Mask {
    coverage: GrayImage,
    /// The same coverage as a premultiplied image paint
    paint: Image,
    /// Shape origin in mask pixels
    center: Vec2,
    /// Mask pixels spanned by the shape's base radius
    unit_radius: f32,
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("center", &self.center)
            .field("unit_radius", &self.unit_radius)
            .finish()
    }
}

impl Mask {
    /// Rasterize `shape` into a square bitmap of `edge` pixels
    ///
    /// The shape is scaled by `scale` (capped so its extent fits inside the
    /// padding). Returns `None` for degenerate shapes.
    pub fn rasterize(shape: &OrganicShape, edge: u32, scale: f32, feather: f32) -> Option<Self> {
        let extent = shape.extent();
        if shape.is_empty() || !(extent > 0.0) || edge <= 2 * MASK_PADDING_PX {
            return None;
        }
        let half = edge as f32 * 0.5;
        let fit = (half - MASK_PADDING_PX as f32) / extent;
        let scale = if scale > 0.0 { scale.min(fit) } else { fit };
        let center = Vec2::splat(half);

        let mut canvas = Canvas::new(edge, edge)?;
        let contour: Vec<Vec2> = shape.contour.iter().map(|p| center + *p * scale).collect();
        canvas.fill_contour(&contour, 1.0);
        for blot in &shape.blots {
            let outer = blot.radius * scale;
            canvas.fill_radial(center + blot.offset * scale, outer * BLOT_CORE, outer, blot.weight);
        }
        for dot in &shape.dots {
            canvas.fill_disc(center + dot.pos * scale, dot.radius * scale, dot.alpha);
        }

        let coverage = canvas.into_coverage(feather);
        let paint = raster::coverage_paint(&coverage)?;
        Some(Self {
            coverage,
            paint,
            center,
            unit_radius: shape.base_radius * scale,
        })
    }

    pub fn width(&self) -> u32 {
        self.coverage.width()
    }

    pub fn height(&self) -> u32 {
        self.coverage.height()
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn unit_radius(&self) -> f32 {
        self.unit_radius
    }

    pub fn coverage(&self) -> &GrayImage {
        &self.coverage
    }

    pub fn paint(&self) -> &Image {
        &self.paint
    }

    /// Coverage (0..1) of one pixel; zero outside the bitmap
    pub fn coverage_at(&self, x: i64, y: i64) -> f32 {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return 0.0;
        }
        f32::from(self.coverage.get_pixel(x as u32, y as u32).0[0]) / 255.0
    }

    /// Bitmap memory in bytes (coverage plus the RGBA paint)
    pub fn bytes(&self) -> usize {
        self.coverage.as_raw().len() * 5
    }

    /// Farthest drawn pixel from the center, in base-radius units
    pub fn reach(&self) -> f32 {
        if self.unit_radius > 0.0 {
            self.center.max_element() / self.unit_radius
        } else {
            0.0
        }
    }
}

/// Cache key: one bitmap per size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskKey {
    /// Splash silhouette, `variant` picks among a few seeded shapes
    Shape { bucket: u32, variant: u32 },
    /// Round brush for strokes
    Brush { bucket: u32 },
}

impl MaskKey {
    pub fn bucket_for(radius: f32) -> u32 {
        ((radius / MASK_BUCKET_PX).ceil() as u32).max(1)
    }

    /// Radius the bitmap is rasterized at
    pub fn radius(&self) -> f32 {
        match self {
            MaskKey::Shape { bucket, .. } | MaskKey::Brush { bucket } => *bucket as f32 * MASK_BUCKET_PX,
        }
    }

    /// Stable RNG seed so a key always rasterizes the same silhouette
    fn seed(&self, salt: u64) -> u64 {
        let raw = match self {
            MaskKey::Shape { bucket, variant } => ((*bucket as u64) << 32) | *variant as u64,
            MaskKey::Brush { bucket } => (1 << 63) | *bucket as u64,
        };
        raw ^ salt
    }
}

/// Exclusive reference to a cached mask; return it with [`MaskCache::release`]
#[derive(Debug)]
pub struct MaskHandle {
    key: MaskKey,
    mask: Arc<Mask>,
}

impl MaskHandle {
    pub fn key(&self) -> MaskKey {
        self.key
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }
}

/// Per-size masks plus the shared ghost mask
#[derive(Debug, Default)]
pub struct MaskCache {
    entries: HashMap<MaskKey, Arc<Mask>>,
    ghost: Option<Arc<Mask>>,
    salt: u64,
    /// Bitmaps rasterized since construction
    rasterized: u64,
}

impl MaskCache {
    pub fn new(salt: u64) -> Self {
        Self {
            salt,
            ..Default::default()
        }
    }

    /// Cached mask for `key`, building it on a miss
    ///
    /// `build` receives a generator seeded from the key. A `None` from the
    /// builder is not cached; the caller falls back to a primitive.
    pub fn get_or_create<F>(&mut self, key: MaskKey, build: F) -> Option<MaskHandle>
    where
        F: FnOnce(&mut Pcg32) -> Option<Mask>,
    {
        if let Some(mask) = self.entries.get(&key) {
            return Some(MaskHandle {
                key,
                mask: Arc::clone(mask),
            });
        }

        let mut rng = Pcg32::seed_from_u64(key.seed(self.salt));
        let mask = Arc::new(build(&mut rng)?);
        self.rasterized += 1;
        log::debug!(
            "Rasterized mask {:?}: {}x{} ({} bytes)",
            key,
            mask.width(),
            mask.height(),
            mask.bytes()
        );
        self.entries.insert(key, Arc::clone(&mask));
        Some(MaskHandle { key, mask })
    }

    /// Organic splash silhouette for an entity of `radius`
    pub fn splash_mask(&mut self, radius: f32, jitter_seed: u64, cfg: &RevealConfig) -> Option<MaskHandle> {
        if !cfg.use_offscreen_cache || !(radius > 0.0) {
            return None;
        }
        let key = MaskKey::Shape {
            bucket: MaskKey::bucket_for(radius),
            variant: (jitter_seed % cfg.mask_variants.max(1) as u64) as u32,
        };
        let res = cfg.offscreen_resolution;
        self.get_or_create(key, |rng| {
            let r = key.radius();
            let params = ShapeParams {
                base_radius: r,
                point_count: cfg.point_count,
                jitter: cfg.jitter,
                roughness: cfg.edge_roughness,
                smoothing_passes: cfg.smoothing_passes,
                blob_count: cfg.blob_count(),
                noise_dots: shape::splash_noise_count(r, cfg.noise_factor, cfg.max_noise_per_splash),
                max_noise_dots: cfg.max_noise_dots,
            };
            let shape = shape::generate(&params, rng);
            let edge = edge_for(shape.extent() * res);
            Mask::rasterize(&shape, edge, res, feather(r) * res)
        })
    }

    /// Round soft brush stamped along stroke paths
    pub fn brush_mask(&mut self, radius: f32, cfg: &RevealConfig) -> Option<MaskHandle> {
        if !cfg.use_offscreen_cache || !(radius > 0.0) {
            return None;
        }
        let key = MaskKey::Brush {
            bucket: MaskKey::bucket_for(radius),
        };
        let res = cfg.offscreen_resolution;
        self.get_or_create(key, |rng| {
            let r = key.radius();
            let params = ShapeParams {
                base_radius: r,
                point_count: cfg.point_count.max(24),
                jitter: 0.0,
                roughness: 0.0,
                smoothing_passes: 0,
                blob_count: 0,
                noise_dots: 0,
                max_noise_dots: 0,
            };
            let shape = shape::generate(&params, rng);
            let edge = edge_for(shape.extent() * res);
            Mask::rasterize(&shape, edge, res, feather(r) * res)
        })
    }

    /// The shared ghost mask, rasterized on first use at `ghost.cache_size`
    pub fn ghost_mask(&mut self, cfg: &RevealConfig) -> Option<Arc<Mask>> {
        if !cfg.use_offscreen_cache {
            return None;
        }
        if let Some(mask) = &self.ghost {
            return Some(Arc::clone(mask));
        }

        let size = cfg.ghost.cache_size;
        let mut rng = Pcg32::seed_from_u64(self.salt ^ 0x6705_7000 ^ size as u64);
        let base = size as f32 * 0.25;
        let shape = OrganicShape {
            base_radius: base,
            contour: Vec::new(),
            blots: shape::blot_layout(base, cfg.ghost_blob_parts(), cfg.ghost.jitter, &mut rng),
            dots: shape::noise_dots(
                base * 0.9,
                shape::ghost_noise_count(size).min(cfg.max_noise_dots),
                (base * 0.03).max(0.6),
                0.5,
                &mut rng,
            ),
        };
        let mask = Arc::new(Mask::rasterize(&shape, size, 1.0, 0.0)?);
        self.rasterized += 1;
        log::debug!("Rasterized shared ghost mask at {}px", size);
        self.ghost = Some(Arc::clone(&mask));
        Some(mask)
    }

    /// Give back an entity's mask; the last holder frees the bitmap
    pub fn release(&mut self, handle: MaskHandle) {
        let MaskHandle { key, mask } = handle;
        let last = self
            .entries
            .get(&key)
            .is_some_and(|cached| Arc::ptr_eq(cached, &mask) && Arc::strong_count(cached) == 2);
        drop(mask);
        if last {
            self.entries.remove(&key);
            log::debug!("Freed mask {:?}", key);
        }
    }

    /// Drop the shared ghost mask; the next ghost draw rebuilds it
    pub fn invalidate_ghost(&mut self) {
        if self.ghost.take().is_some() {
            log::debug!("Invalidated shared ghost mask");
        }
    }

    /// Forget every per-size mask; outstanding handles keep their bitmap alive
    pub fn invalidate_shapes(&mut self) {
        self.entries.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.ghost = None;
    }

    /// Cached per-size masks (the ghost mask is not counted)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.ghost.is_none()
    }

    pub fn has_ghost(&self) -> bool {
        self.ghost.is_some()
    }

    /// Edge (px) of the cached ghost mask, if one is built
    pub fn ghost_edge(&self) -> Option<u32> {
        self.ghost.as_ref().map(|m| m.width())
    }

    /// Bitmap memory held by the cache itself
    pub fn bytes(&self) -> usize {
        self.entries.values().map(|m| m.bytes()).sum::<usize>()
            + self.ghost.as_ref().map_or(0, |m| m.bytes())
    }

    pub fn rasterized(&self) -> u64 {
        self.rasterized
    }
}

/// Square bitmap edge for a shape of `extent` mask pixels
fn edge_for(extent: f32) -> u32 {
    let wanted = (extent * 2.0).ceil() as u32 + 2 * MASK_PADDING_PX;
    wanted.clamp(2 * MASK_PADDING_PX + 2, MAX_MASK_EDGE_PX)
}

/// Edge feather for a shape of `radius`
fn feather(radius: f32) -> f32 {
    (radius * 0.02).max(1.0)
}
