//! Procedural organic shapes
//!
//! Pure functions of their parameters plus a random source. Feeding the same
//! seeded RNG reproduces the same silhouette, which is what the tests rely on.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::{polar_to_cartesian, uniform};

/// Fewest contour vertices we will generate
pub const MIN_POINT_COUNT: usize = 3;

/// Inputs for [`generate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeParams {
    pub base_radius: f32,
    pub point_count: usize,
    /// Secondary blob offset as a fraction of the radius; `<= 0` means round
    pub jitter: f32,
    /// Per-vertex radial noise as a fraction of the radius
    pub roughness: f32,
    pub smoothing_passes: u32,
    /// Secondary soft blobs breaking circular symmetry
    pub blob_count: usize,
    /// Requested noise dots (capped by `max_noise_dots`)
    pub noise_dots: usize,
    pub max_noise_dots: usize,
}

/// A soft radial blot, offset from the shape center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blot {
    pub offset: Vec2,
    pub radius: f32,
    /// Peak opacity at the blot center (0..1)
    pub weight: f32,
}

/// A small texture dot inside the silhouette
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseDot {
    pub pos: Vec2,
    pub radius: f32,
    pub alpha: f32,
}

/// A generated silhouette centered on the origin
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrganicShape {
    pub base_radius: f32,
    /// Closed polygon (last vertex connects to the first)
    pub contour: Vec<Vec2>,
    pub blots: Vec<Blot>,
    pub dots: Vec<NoiseDot>,
}

impl OrganicShape {
    /// Degenerate shapes must not be drawn
    pub fn is_empty(&self) -> bool {
        self.contour.is_empty() && self.blots.is_empty()
    }

    /// Farthest extent of any part of the shape from its center
    pub fn extent(&self) -> f32 {
        let contour = self.contour.iter().map(|p| p.length()).fold(0.0, f32::max);
        let blots = self
            .blots
            .iter()
            .map(|b| b.offset.length() + b.radius)
            .fold(0.0, f32::max);
        let dots = self
            .dots
            .iter()
            .map(|d| d.pos.length() + d.radius)
            .fold(0.0, f32::max);
        contour.max(blots).max(dots)
    }
}

/// Generate an irregular blob of roughly `base_radius`
pub fn generate<R: Rng>(params: &ShapeParams, rng: &mut R) -> OrganicShape {
    if !(params.base_radius > 0.0) {
        return OrganicShape::default();
    }

    let base = params.base_radius;
    let count = params.point_count.max(MIN_POINT_COUNT);
    let round = params.jitter <= 0.0;
    let roughness = if round { 0.0 } else { params.roughness.max(0.0) };

    // Radial perturbation around evenly spaced angles
    let mut radii: Vec<f32> = (0..count)
        .map(|_| base * (1.0 + roughness * uniform(rng, -1.0, 1.0)))
        .collect();

    for _ in 0..params.smoothing_passes {
        radii = smooth_ring(&radii);
    }

    let contour = radii
        .iter()
        .enumerate()
        .map(|(i, r)| polar_to_cartesian(r.max(0.0), TAU * i as f32 / count as f32))
        .collect();

    // Secondary blobs: 15-50% of base, offset by jitter * base
    let blots = if round {
        Vec::new()
    } else {
        (0..params.blob_count)
            .map(|_| {
                let angle = uniform(rng, 0.0, TAU);
                let dist = params.jitter * base * uniform(rng, 0.6, 1.0);
                Blot {
                    offset: polar_to_cartesian(dist, angle),
                    radius: base * uniform(rng, 0.15, 0.5),
                    weight: 1.0,
                }
            })
            .collect()
    };

    let dots = noise_dots(
        base * 0.9,
        params.noise_dots.min(params.max_noise_dots),
        (base * 0.02).max(0.6),
        0.5,
        rng,
    );

    OrganicShape {
        base_radius: base,
        contour,
        blots,
        dots,
    }
}

/// One pass of circular neighbor averaging (1-2-1 kernel)
fn smooth_ring(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    (0..n)
        .map(|i| {
            let prev = values[(i + n - 1) % n];
            let next = values[(i + 1) % n];
            (prev + 2.0 * values[i] + next) * 0.25
        })
        .collect()
}

/// Cluster of soft radial blots approximating a blob of `base_radius`
pub fn blot_layout<R: Rng>(base_radius: f32, parts: usize, jitter: f32, rng: &mut R) -> Vec<Blot> {
    if !(base_radius > 0.0) {
        return Vec::new();
    }
    let parts = parts.max(1);
    (0..parts)
        .map(|i| {
            let angle = TAU * i as f32 / parts as f32 + uniform(rng, -0.4, 0.4);
            let dist = base_radius * (0.2 + uniform(rng, 0.0, jitter.max(0.0)));
            Blot {
                offset: polar_to_cartesian(dist, angle),
                radius: (base_radius * uniform(rng, 0.35, 1.05)).max(2.0),
                weight: 1.0,
            }
        })
        .collect()
}

/// Scatter `count` small dots within `radius` of the origin
pub fn noise_dots<R: Rng>(
    radius: f32,
    count: usize,
    max_dot_radius: f32,
    alpha: f32,
    rng: &mut R,
) -> Vec<NoiseDot> {
    (0..count)
        .map(|_| {
            let angle = uniform(rng, 0.0, TAU);
            let r = uniform(rng, 0.0, radius) * uniform(rng, 0.6, 1.0);
            NoiseDot {
                pos: polar_to_cartesian(r, angle),
                radius: uniform(rng, 0.3, max_dot_radius.max(0.3)),
                alpha,
            }
        })
        .collect()
}

/// Noise dot count for a splash of `radius`
pub fn splash_noise_count(radius: f32, noise_factor: f32, max_per_splash: usize) -> usize {
    let wanted = (radius * noise_factor).round().max(0.0) as usize;
    wanted.max(6).min(max_per_splash)
}

/// Noise dot count for a shared ghost mask of edge `size`
pub fn ghost_noise_count(size: u32) -> usize {
    ((size as f32 * 0.08).round() as usize).clamp(8, 180)
}

/// A meandering path for idle strokes, kept inside `[min, max]`
pub fn wander_path<R: Rng>(
    start: Vec2,
    points: usize,
    step: f32,
    turn_jitter: f32,
    min: Vec2,
    max: Vec2,
    rng: &mut R,
) -> Vec<Vec2> {
    let mut path = Vec::with_capacity(points);
    if points == 0 {
        return path;
    }
    let center = (min + max) * 0.5;
    let mut heading = uniform(rng, 0.0, TAU);
    let mut pos = start.clamp(min, max);
    path.push(pos);

    for _ in 1..points {
        heading += uniform(rng, -turn_jitter, turn_jitter);
        let mut next = pos + polar_to_cartesian(step, heading);
        if next.cmplt(min).any() || next.cmpgt(max).any() {
            // Steer back toward the middle instead of clipping along the edge
            let to_center = center - pos;
            heading = to_center.y.atan2(to_center.x) + uniform(rng, -0.3, 0.3);
            next = (pos + polar_to_cartesian(step, heading)).clamp(min, max);
        }
        pos = next;
        path.push(pos);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn params() -> ShapeParams {
        ShapeParams {
            base_radius: 100.0,
            point_count: 20,
            jitter: 0.45,
            roughness: 0.26,
            smoothing_passes: 2,
            blob_count: 3,
            noise_dots: 20,
            max_noise_dots: 180,
        }
    }

    #[test]
    fn test_same_seed_same_shape() {
        let a = generate(&params(), &mut Pcg32::seed_from_u64(7));
        let b = generate(&params(), &mut Pcg32::seed_from_u64(7));
        assert_eq!(a, b);

        let c = generate(&params(), &mut Pcg32::seed_from_u64(8));
        assert_ne!(a.contour, c.contour);
    }

    #[test]
    fn test_point_count_clamped() {
        let p = ShapeParams {
            point_count: 1,
            ..params()
        };
        let shape = generate(&p, &mut Pcg32::seed_from_u64(1));
        assert_eq!(shape.contour.len(), MIN_POINT_COUNT);
    }

    #[test]
    fn test_zero_jitter_is_round() {
        let p = ShapeParams {
            jitter: 0.0,
            ..params()
        };
        let shape = generate(&p, &mut Pcg32::seed_from_u64(3));
        assert!(shape.blots.is_empty());
        for v in &shape.contour {
            assert!((v.length() - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_degenerate_radius_is_empty() {
        let p = ShapeParams {
            base_radius: 0.0,
            ..params()
        };
        let shape = generate(&p, &mut Pcg32::seed_from_u64(3));
        assert!(shape.is_empty());
        assert_eq!(shape.extent(), 0.0);

        let p = ShapeParams {
            base_radius: -5.0,
            ..params()
        };
        assert!(generate(&p, &mut Pcg32::seed_from_u64(3)).is_empty());
    }

    #[test]
    fn test_noise_dots_capped_by_ceiling() {
        let p = ShapeParams {
            noise_dots: 10_000,
            max_noise_dots: 40,
            ..params()
        };
        let shape = generate(&p, &mut Pcg32::seed_from_u64(5));
        assert_eq!(shape.dots.len(), 40);
    }

    #[test]
    fn test_roughness_bounds_contour() {
        let shape = generate(&params(), &mut Pcg32::seed_from_u64(11));
        for v in &shape.contour {
            let r = v.length();
            assert!(r >= 100.0 * (1.0 - 0.26) - 1e-3);
            assert!(r <= 100.0 * (1.0 + 0.26) + 1e-3);
        }
    }

    #[test]
    fn test_blot_layout_count() {
        let blots = blot_layout(50.0, 6, 0.35, &mut Pcg32::seed_from_u64(2));
        assert_eq!(blots.len(), 6);
        assert!(blots.iter().all(|b| b.radius >= 2.0));
    }

    #[test]
    fn test_noise_count_rules() {
        assert_eq!(splash_noise_count(0.0, 0.36, 20), 6);
        assert_eq!(splash_noise_count(1000.0, 0.36, 20), 20);
        assert_eq!(ghost_noise_count(64), 8);
        assert_eq!(ghost_noise_count(256), 20);
        assert_eq!(ghost_noise_count(4096), 180);
    }

    #[test]
    fn test_wander_path_stays_in_bounds() {
        let min = Vec2::new(20.0, 20.0);
        let max = Vec2::new(300.0, 200.0);
        let path = wander_path(
            Vec2::new(150.0, 100.0),
            200,
            9.0,
            0.45,
            min,
            max,
            &mut Pcg32::seed_from_u64(9),
        );
        assert_eq!(path.len(), 200);
        for p in path {
            assert!(p.x >= min.x && p.x <= max.x);
            assert!(p.y >= min.y && p.y <= max.y);
        }
    }
}
