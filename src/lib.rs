//! Ink Veil - an interactive reveal engine
//!
//! A flat veil covers a background image. Organic blots and brush strokes,
//! spawned by the pointer and by an autonomous idle generator, punch holes
//! through it with an erase blend.
//!
//! Core modules:
//! - `sim`: Entity model, lifecycle state machine, spawner, shape generator
//! - `renderer`: Software rasterizer, mask cache, compositor, drawing surface
//! - `platform`: Host abstractions (frame scheduler, clock)
//! - `settings`: Typed, range-validated configuration
//! - `engine`: The frame loop and the public API

pub mod engine;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use engine::{FrameHook, FrameOutcome, FrameStats, RevealEngine};
pub use error::{RevealError, RevealResult};
pub use settings::{ActivationMode, ConfigPatch, RevealConfig};
pub use sim::input::Viewport;

use glam::Vec2;

/// Engine-wide constants
pub mod consts {
    /// Pointer travel (px) between down and up still counted as a click
    pub const CLICK_MOVE_THRESHOLD: f32 = 8.0;
    /// A hold-activation spawn is suppressed if the newest splash is younger than this (ms)
    pub const HOLD_RECENT_SPLASH_MS: f64 = 250.0;
    /// Delay before hold activation re-arms after firing (ms)
    pub const HOLD_REARM_MS: f64 = 80.0;

    /// Size below which an entity counts as fully shrunk
    pub const SIZE_EPSILON: f32 = 0.5;
    /// Margin (px) kept from the viewport edges for autonomous spawns
    pub const SPAWN_MARGIN: f32 = 20.0;

    /// Ghost lifetime split: grow / hold / shrink fractions
    pub const GHOST_GROW_FRACTION: f64 = 0.55;
    pub const GHOST_HOLD_FRACTION: f64 = 0.15;
    pub const GHOST_SHRINK_FRACTION: f64 = 0.30;
    /// Ghost lifetime jitter multiplier range
    pub const GHOST_LIFETIME_JITTER: (f64, f64) = (0.8, 1.6);
    /// Smallest ghost target radius
    pub const GHOST_MIN_RADIUS: f32 = 20.0;

    /// Mask radius bucket (px) used as the per-size cache key
    pub const MASK_BUCKET_PX: f32 = 8.0;
    /// Transparent padding (px) around a rasterized mask
    pub const MASK_PADDING_PX: u32 = 4;
    /// Largest mask edge we are willing to rasterize
    pub const MAX_MASK_EDGE_PX: u32 = 2048;
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Uniform sample in `[lo, hi)`, tolerant of empty or inverted ranges
#[inline]
pub fn uniform<R: rand::Rng>(rng: &mut R, lo: f32, hi: f32) -> f32 {
    if hi <= lo {
        lo
    } else {
        lo + (hi - lo) * rng.random::<f32>()
    }
}
