//! Compositor
//!
//! Picks a bounded subset of live entities and erases their coverage out of
//! the veil. Each entity's stamps are painted into one coverage patch and the
//! patch is erased once, so overlapping brush stamps inside one stroke never
//! erase more than full coverage.

use glam::Vec2;
use image::RgbaImage;
use serde::Serialize;
use vello_cpu::kurbo::Affine;

use super::mask::{Mask, MaskCache};
use super::raster::Canvas;
use super::surface;
use crate::settings::{Caps, RevealConfig};
use crate::sim::entity::{Category, Entity};

/// Soft-circle coverage is flat out to this fraction of the radius
const SOFT_CORE: f32 = 0.7;
/// Brush stamp spacing as a fraction of the brush radius
const STAMP_SPACING: f32 = 0.35;
const MAX_STAMPS_PER_SEGMENT: usize = 64;

/// Per-frame drawing counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrawStats {
    /// Entities that erased at least one pixel
    pub drawn: usize,
    /// Below `small_radius_skip`
    pub skipped_small: usize,
    /// Non-positive target size or fully faded
    pub skipped_degenerate: usize,
    /// Left out by the per-category draw caps
    pub culled: usize,
    /// Soft circle because no mask was available
    pub fallback: usize,
    /// Soft circle because the entity is at or below `blur_threshold`
    pub cheap: usize,
}

/// Entities to draw this frame, in draw order, plus how many were culled
///
/// Autonomous entities go first, oldest first, up to the autonomous cap;
/// interactive entities follow, largest first, up to `max_concurrent_draw`.
pub fn select<'a>(entities: &'a [Entity], caps: &Caps) -> (Vec<&'a Entity>, usize) {
    let (mut autonomous, mut interactive): (Vec<&Entity>, Vec<&Entity>) = entities
        .iter()
        .filter(|e| !e.finished)
        .partition(|e| e.category() == Category::Autonomous);
    let total = autonomous.len() + interactive.len();

    autonomous.sort_by(|a, b| a.created_at_ms.total_cmp(&b.created_at_ms));
    autonomous.truncate(caps.autonomous);

    interactive.sort_by(|a, b| b.current_size.total_cmp(&a.current_size));
    interactive.truncate(caps.max_concurrent_draw);

    let mut selected = autonomous;
    selected.extend(interactive);
    let culled = total - selected.len();
    (selected, culled)
}

/// Draws entities into the veil
#[derive(Debug, Default)]
pub struct Compositor {
    warned_fallback: bool,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Erase the selected entities out of `target` (device pixels at `dpr`)
    pub fn draw(
        &mut self,
        target: &mut RgbaImage,
        entities: &[Entity],
        cache: &mut MaskCache,
        cfg: &RevealConfig,
        dpr: f32,
    ) -> DrawStats {
        let (selected, culled) = select(entities, &cfg.caps);
        let mut stats = DrawStats {
            culled,
            ..Default::default()
        };

        for entity in selected {
            if !(entity.target_size > 0.0) || !entity.current_size.is_finite() || entity.alpha <= 0.0 {
                stats.skipped_degenerate += 1;
                continue;
            }
            if entity.current_size < cfg.small_radius_skip {
                stats.skipped_small += 1;
                continue;
            }

            let cheap = entity.current_size <= cfg.blur_threshold;
            // Ghosts fetch the shared mask per draw so invalidation shows up immediately
            let shared = if entity.is_ghost() && !cheap {
                cache.ghost_mask(cfg)
            } else {
                None
            };
            let mask = if cheap {
                None
            } else if entity.is_ghost() {
                shared.as_deref()
            } else {
                entity.mask.as_ref().map(|h| h.mask())
            };

            if cheap {
                stats.cheap += 1;
            } else if mask.is_none() {
                stats.fallback += 1;
                if !self.warned_fallback {
                    log::warn!("Mask unavailable, falling back to soft circles");
                    self.warned_fallback = true;
                }
            }

            let radius = entity.current_size * dpr;
            let drew = match entity.stroke() {
                Some(path) if !path.points.is_empty() => {
                    let stamp = Stamp::new(mask, radius, 0.0);
                    let points: Vec<Vec2> = path.points.iter().map(|p| *p * dpr).collect();
                    erase_stamps(target, &stamp, &points, entity.alpha)
                }
                _ => {
                    let stamp = Stamp::new(mask, radius, entity.rotation);
                    erase_stamps(target, &stamp, &[entity.position * dpr], entity.alpha)
                }
            };
            if drew {
                stats.drawn += 1;
            }
        }

        log::trace!("Composited {:?}", stats);
        stats
    }
}

/// One silhouette placed at a device-pixel radius and rotation
struct Stamp<'m> {
    mask: Option<&'m Mask>,
    radius: f32,
    rotation: f32,
}

impl<'m> Stamp<'m> {
    fn new(mask: Option<&'m Mask>, radius: f32, rotation: f32) -> Self {
        Self { mask, radius, rotation }
    }

    /// Distance beyond which coverage is zero
    fn reach(&self) -> f32 {
        match self.mask {
            Some(mask) => mask.reach() * self.radius * std::f32::consts::SQRT_2,
            None => self.radius,
        }
    }

    fn spacing(&self) -> f32 {
        (self.radius * STAMP_SPACING).max(1.0)
    }

    /// Draw the stamp centered at `center` (canvas pixels)
    fn paint(&self, canvas: &mut Canvas, center: Vec2) {
        match self.mask {
            Some(mask) => {
                let origin = mask.center();
                let transform = Affine::translate((f64::from(center.x), f64::from(center.y)))
                    * Affine::rotate(f64::from(self.rotation))
                    * Affine::scale(f64::from(self.radius / mask.unit_radius()))
                    * Affine::translate((-f64::from(origin.x), -f64::from(origin.y)));
                canvas.draw_image(mask.paint(), (mask.width(), mask.height()), transform);
            }
            // Soft circle: flat core, linear falloff to the rim
            None => canvas.fill_radial(center, self.radius * SOFT_CORE, self.radius, 1.0),
        }
    }
}

/// Stamp along `points` (a single stamp for one point) and erase the union
fn erase_stamps(target: &mut RgbaImage, stamp: &Stamp, points: &[Vec2], alpha: f32) -> bool {
    let reach = stamp.reach();
    if points.is_empty() || !(reach > 0.0) || !(stamp.radius > 0.0) {
        return false;
    }

    let (lo, hi) = points.iter().fold(
        (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    );
    let x0 = ((lo.x - reach).floor() as i64).max(0);
    let y0 = ((lo.y - reach).floor() as i64).max(0);
    let x1 = ((hi.x + reach).ceil() as i64).min(target.width() as i64);
    let y1 = ((hi.y + reach).ceil() as i64).min(target.height() as i64);
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    let Some(mut canvas) = Canvas::new((x1 - x0) as u32, (y1 - y0) as u32) else {
        log::debug!("Stamp patch {}x{} too large, skipped", x1 - x0, y1 - y0);
        return false;
    };
    let w = canvas.width() as usize;
    let origin = Vec2::new(x0 as f32, y0 as f32);

    let spacing = stamp.spacing();
    stamp.paint(&mut canvas, points[0] - origin);
    for pair in points.windows(2) {
        let (a, b) = (pair[0] - origin, pair[1] - origin);
        let n = ((a.distance(b) / spacing).ceil() as usize).clamp(1, MAX_STAMPS_PER_SEGMENT);
        for i in 1..=n {
            stamp.paint(&mut canvas, a.lerp(b, i as f32 / n as f32));
        }
    }

    let mut touched = false;
    for (i, cov) in canvas.render().into_iter().enumerate() {
        if cov == 0 {
            continue;
        }
        let x = (x0 as usize + i % w) as u32;
        let y = (y0 as usize + i / w) as u32;
        surface::erase(&mut target.get_pixel_mut(x, y).0, f32::from(cov) / 255.0 * alpha);
        touched = true;
    }
    touched
}
