//! Engine configuration
//!
//! Plain typed configuration passed in at construction and patched at
//! runtime. Every numeric bound is clamped here, at the boundary, so the rest
//! of the engine can trust the values it reads.

use serde::{Deserialize, Serialize};

use crate::error::RevealResult;
use crate::sim::ease::Ease;

/// How interactive splashes are triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// Pointer down then up with little movement
    #[default]
    Click,
    /// Pointer stationary beyond `hold_time_ms`
    Hold,
}

impl ActivationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivationMode::Click => "click",
            ActivationMode::Hold => "hold",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "click" | "tap" => Some(ActivationMode::Click),
            "hold" => Some(ActivationMode::Hold),
            _ => None,
        }
    }
}

/// Concurrency caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caps {
    /// Live interactive entities (splashes + pointer strokes)
    pub interactive: usize,
    /// Live autonomous entities (ghosts + idle strokes)
    pub autonomous: usize,
    /// Interactive entities composited per frame
    pub max_concurrent_draw: usize,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            interactive: 3,
            autonomous: 3,
            max_concurrent_draw: 3,
        }
    }
}

/// Autonomous "ghost" ripples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    pub enabled: bool,
    /// Average spawns per second
    pub rate_per_sec: f64,
    /// Upper bound of the random target radius
    pub max_radius: f32,
    /// Erase strength when cutting the veil (0..1)
    pub alpha: f32,
    /// Drift speed range (px/sec)
    pub drift: f32,
    /// Approximate lifetime (ms), jittered per ghost
    pub lifetime_ms: f64,
    /// Shape jitter for the shared ghost mask
    pub jitter: f32,
    /// Edge (px) of the shared ghost mask bitmap
    pub cache_size: u32,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_per_sec: 0.6,
            max_radius: 120.0,
            alpha: 0.36,
            drift: 6.0,
            lifetime_ms: 2200.0,
            jitter: 0.35,
            cache_size: 256,
        }
    }
}

/// Brush parameters shared by pointer and idle strokes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeConfig {
    /// Full brush radius (px)
    pub brush_radius: f32,
    /// Radius of the initial seed dot (px)
    pub seed_radius: f32,
    /// Minimum distance between appended path points (px)
    pub min_spacing_px: f32,
    /// Minimum time between appended path points (ms)
    pub sample_interval_ms: f64,
    /// Hard ceiling on path points per stroke
    pub max_points: usize,
    /// Seed-growth duration (ms)
    pub grow_duration_ms: f64,
    /// Shrink/fade duration once painting finished (ms)
    pub shrink_duration_ms: f64,
}

impl Default for StrokeConfig {
    fn default() -> Self {
        Self {
            brush_radius: 48.0,
            seed_radius: 6.0,
            min_spacing_px: 6.0,
            sample_interval_ms: 16.0,
            max_points: 240,
            grow_duration_ms: 420.0,
            shrink_duration_ms: 1400.0,
        }
    }
}

/// Autonomous strokes traced along procedurally generated paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleStrokeConfig {
    pub enabled: bool,
    /// Average spawns per second
    pub rate_per_sec: f64,
    /// Points in each generated path
    pub path_points: usize,
    /// Distance between generated points (px)
    pub step_px: f32,
    /// Maximum heading change per step (radians)
    pub turn_jitter: f32,
    /// Seeds must stay this far from the pointer and from other idle seeds
    pub min_seed_distance: f32,
    /// Seed candidates tried before the spawn is dropped
    pub max_seed_attempts: u32,
}

impl Default for IdleStrokeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_per_sec: 0.25,
            path_points: 48,
            step_px: 9.0,
            turn_jitter: 0.45,
            min_seed_distance: 160.0,
            max_seed_attempts: 12,
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    // === Visual ===
    /// Veil fill color as `#RRGGBB` or `#RRGGBBAA`
    pub veil_color: String,

    // === Activation ===
    pub activation: ActivationMode,
    /// Stationary time before a hold spawn (ms)
    pub hold_time_ms: f64,

    // === Splash lifecycle ===
    pub grow_duration_ms: f64,
    /// Steady hold before auto-shrink (ms)
    pub lifetime_ms: f64,
    pub shrink_duration_ms: f64,
    pub grow_ease: Ease,
    pub shrink_ease: Ease,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Lock splashes open once they reach full size
    pub permanent_on_max: bool,

    // === Shape ===
    /// Contour vertices
    pub point_count: usize,
    /// Secondary soft blobs scattered around the contour
    pub blobs: usize,
    pub max_blob_parts: usize,
    pub jitter: f32,
    /// Edge roughness of the contour (fraction of radius)
    pub edge_roughness: f32,
    /// Neighbor-averaging passes over the contour
    pub smoothing_passes: u32,
    pub noise_factor: f32,
    pub max_noise_per_splash: usize,
    /// Absolute ceiling on noise dots in any generated shape
    pub max_noise_dots: usize,

    // === Render cost ===
    /// Entities larger than this use the feathered mask
    pub blur_threshold: f32,
    /// Entities smaller than this are not drawn
    pub small_radius_skip: f32,
    /// Offscreen mask resolution scale (quality vs. cost)
    pub offscreen_resolution: f32,
    /// Disabling this forces the soft-circle fallback everywhere
    pub use_offscreen_cache: bool,
    /// Distinct silhouettes per radius bucket
    pub mask_variants: u32,

    // === Concurrency ===
    pub caps: Caps,

    // === Autonomous ===
    /// Master switch for the idle generators
    pub autonomous_enabled: bool,
    pub ghost: GhostConfig,
    pub idle_stroke: IdleStrokeConfig,
    pub stroke: StrokeConfig,

    // === Lifecycle ===
    /// Begin the frame loop at construction
    pub auto_start: bool,
    /// Fixed RNG seed (random when absent)
    pub seed: Option<u64>,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            veil_color: "#E9E6E4".to_string(),

            activation: ActivationMode::Click,
            hold_time_ms: 600.0,

            grow_duration_ms: 1100.0,
            lifetime_ms: 2400.0,
            shrink_duration_ms: 1600.0,
            grow_ease: Ease::OutCubic,
            shrink_ease: Ease::InOutQuad,
            min_radius: 120.0,
            max_radius: 360.0,
            permanent_on_max: false,

            point_count: 20,
            blobs: 2,
            max_blob_parts: 10,
            jitter: 0.45,
            edge_roughness: 0.26,
            smoothing_passes: 2,
            noise_factor: 0.36,
            max_noise_per_splash: 20,
            max_noise_dots: 180,

            blur_threshold: 6.0,
            small_radius_skip: 2.0,
            offscreen_resolution: 1.0,
            use_offscreen_cache: true,
            mask_variants: 4,

            caps: Caps::default(),

            autonomous_enabled: true,
            ghost: GhostConfig::default(),
            idle_stroke: IdleStrokeConfig::default(),
            stroke: StrokeConfig::default(),

            auto_start: false,
            seed: None,
        }
    }
}

/// Non-negative, finite duration or rate
fn non_negative(v: f64, fallback: f64) -> f64 {
    if v.is_finite() { v.max(0.0) } else { fallback }
}

fn non_negative_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { fallback }
}

/// Parse `#RRGGBB` / `#RRGGBBAA` into RGBA
pub fn parse_hex_color(s: &str) -> Option<[u8; 4]> {
    let hex = s.trim().strip_prefix('#')?;
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some([channel(0)?, channel(2)?, channel(4)?, 255]),
        8 => Some([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
        _ => None,
    }
}

impl RevealConfig {
    /// Return a copy with every bound clamped to a safe range
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        if parse_hex_color(&self.veil_color).is_none() {
            log::warn!("Invalid veil color {:?}, using default", self.veil_color);
            self.veil_color = d.veil_color.clone();
        }

        self.hold_time_ms = non_negative(self.hold_time_ms, d.hold_time_ms);
        self.grow_duration_ms = non_negative(self.grow_duration_ms, d.grow_duration_ms);
        self.lifetime_ms = non_negative(self.lifetime_ms, d.lifetime_ms);
        self.shrink_duration_ms = non_negative(self.shrink_duration_ms, d.shrink_duration_ms);

        self.max_radius = non_negative_f32(self.max_radius, d.max_radius).max(1.0);
        self.min_radius = non_negative_f32(self.min_radius, d.min_radius)
            .max(1.0)
            .min(self.max_radius);

        self.point_count = self.point_count.max(3);
        self.max_blob_parts = self.max_blob_parts.max(3);
        self.blobs = self.blobs.min(self.max_blob_parts);
        self.jitter = non_negative_f32(self.jitter, d.jitter);
        self.edge_roughness = non_negative_f32(self.edge_roughness, d.edge_roughness).min(0.9);
        self.smoothing_passes = self.smoothing_passes.min(4);
        self.noise_factor = non_negative_f32(self.noise_factor, d.noise_factor);
        self.max_noise_per_splash = self.max_noise_per_splash.min(self.max_noise_dots);

        self.blur_threshold = non_negative_f32(self.blur_threshold, d.blur_threshold);
        self.small_radius_skip = non_negative_f32(self.small_radius_skip, d.small_radius_skip);
        self.offscreen_resolution = if self.offscreen_resolution.is_finite() {
            self.offscreen_resolution.clamp(0.25, 4.0)
        } else {
            d.offscreen_resolution
        };
        self.mask_variants = self.mask_variants.clamp(1, 16);

        self.caps.interactive = self.caps.interactive.max(1);
        self.caps.autonomous = self.caps.autonomous.max(1);
        self.caps.max_concurrent_draw = self.caps.max_concurrent_draw.max(1);

        let g = &mut self.ghost;
        g.rate_per_sec = non_negative(g.rate_per_sec, d.ghost.rate_per_sec);
        g.max_radius = non_negative_f32(g.max_radius, d.ghost.max_radius).max(crate::consts::GHOST_MIN_RADIUS);
        g.alpha = if g.alpha.is_finite() { g.alpha.clamp(0.0, 1.0) } else { d.ghost.alpha };
        g.drift = non_negative_f32(g.drift, d.ghost.drift);
        g.lifetime_ms = non_negative(g.lifetime_ms, d.ghost.lifetime_ms);
        g.jitter = non_negative_f32(g.jitter, d.ghost.jitter);
        g.cache_size = g.cache_size.clamp(64, 1024);

        let s = &mut self.stroke;
        s.brush_radius = non_negative_f32(s.brush_radius, d.stroke.brush_radius).max(1.0);
        s.seed_radius = non_negative_f32(s.seed_radius, d.stroke.seed_radius).min(s.brush_radius);
        s.min_spacing_px = non_negative_f32(s.min_spacing_px, d.stroke.min_spacing_px);
        s.sample_interval_ms = non_negative(s.sample_interval_ms, d.stroke.sample_interval_ms);
        s.max_points = s.max_points.max(2);
        s.grow_duration_ms = non_negative(s.grow_duration_ms, d.stroke.grow_duration_ms);
        s.shrink_duration_ms = non_negative(s.shrink_duration_ms, d.stroke.shrink_duration_ms);

        let i = &mut self.idle_stroke;
        i.rate_per_sec = non_negative(i.rate_per_sec, d.idle_stroke.rate_per_sec);
        i.path_points = i.path_points.clamp(2, self.stroke.max_points);
        i.step_px = non_negative_f32(i.step_px, d.idle_stroke.step_px).max(1.0);
        i.turn_jitter = non_negative_f32(i.turn_jitter, d.idle_stroke.turn_jitter);
        i.min_seed_distance = non_negative_f32(i.min_seed_distance, d.idle_stroke.min_seed_distance);
        i.max_seed_attempts = i.max_seed_attempts.max(1);

        self
    }

    /// Veil color as RGBA
    pub fn veil_rgba(&self) -> [u8; 4] {
        parse_hex_color(&self.veil_color).unwrap_or([0xE9, 0xE6, 0xE4, 0xFF])
    }

    /// Secondary blobs per splash (clamped to `[3, max_blob_parts]`)
    pub fn blob_count(&self) -> usize {
        self.blobs.clamp(3, self.max_blob_parts.max(3))
    }

    /// Radial parts in the shared ghost blot cluster
    pub fn ghost_blob_parts(&self) -> usize {
        ((self.blobs as f32 / 1.5).floor() as usize).clamp(4, 16)
    }

    /// Merge a partial patch, re-sanitize, and report what went stale
    pub fn apply(&mut self, patch: &ConfigPatch) -> AppliedChanges {
        let before = self.clone();
        patch.merge_into(self);
        *self = std::mem::take(self).sanitized();

        AppliedChanges {
            ghost_mask_stale: before.ghost.cache_size != self.ghost.cache_size
                || before.ghost.jitter != self.ghost.jitter
                || before.blobs != self.blobs
                || before.use_offscreen_cache != self.use_offscreen_cache,
            shape_masks_stale: before.point_count != self.point_count
                || before.blobs != self.blobs
                || before.jitter != self.jitter
                || before.edge_roughness != self.edge_roughness
                || before.smoothing_passes != self.smoothing_passes
                || before.noise_factor != self.noise_factor
                || before.max_noise_per_splash != self.max_noise_per_splash
                || before.offscreen_resolution != self.offscreen_resolution
                || before.mask_variants != self.mask_variants
                || before.use_offscreen_cache != self.use_offscreen_cache
                || before.stroke.brush_radius != self.stroke.brush_radius,
            veil_changed: before.veil_color != self.veil_color,
        }
    }
}

/// What a patch invalidated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    /// The shared ghost mask must be re-rasterized
    pub ghost_mask_stale: bool,
    /// Per-size splash/brush masks must be dropped
    pub shape_masks_stale: bool,
    /// The veil must be refilled with a new color
    pub veil_changed: bool,
}

/// Partial ghost settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GhostPatch {
    pub enabled: Option<bool>,
    pub rate_per_sec: Option<f64>,
    pub max_radius: Option<f32>,
    pub alpha: Option<f32>,
    pub drift: Option<f32>,
    pub lifetime_ms: Option<f64>,
    pub jitter: Option<f32>,
    pub cache_size: Option<u32>,
}

/// Partial idle-stroke settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdleStrokePatch {
    pub enabled: Option<bool>,
    pub rate_per_sec: Option<f64>,
    pub path_points: Option<usize>,
    pub step_px: Option<f32>,
    pub turn_jitter: Option<f32>,
    pub min_seed_distance: Option<f32>,
    pub max_seed_attempts: Option<u32>,
}

/// Partial stroke settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrokePatch {
    pub brush_radius: Option<f32>,
    pub seed_radius: Option<f32>,
    pub min_spacing_px: Option<f32>,
    pub sample_interval_ms: Option<f64>,
    pub max_points: Option<usize>,
    pub grow_duration_ms: Option<f64>,
    pub shrink_duration_ms: Option<f64>,
}

/// Partial cap settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CapsPatch {
    pub interactive: Option<usize>,
    pub autonomous: Option<usize>,
    pub max_concurrent_draw: Option<usize>,
}

/// Runtime option overlay: every field optional, unknown keys rejected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub veil_color: Option<String>,
    pub activation: Option<ActivationMode>,
    pub hold_time_ms: Option<f64>,
    pub grow_duration_ms: Option<f64>,
    pub lifetime_ms: Option<f64>,
    pub shrink_duration_ms: Option<f64>,
    pub grow_ease: Option<Ease>,
    pub shrink_ease: Option<Ease>,
    pub min_radius: Option<f32>,
    pub max_radius: Option<f32>,
    pub permanent_on_max: Option<bool>,
    pub point_count: Option<usize>,
    pub blobs: Option<usize>,
    pub max_blob_parts: Option<usize>,
    pub jitter: Option<f32>,
    pub edge_roughness: Option<f32>,
    pub smoothing_passes: Option<u32>,
    pub noise_factor: Option<f32>,
    pub max_noise_per_splash: Option<usize>,
    pub max_noise_dots: Option<usize>,
    pub blur_threshold: Option<f32>,
    pub small_radius_skip: Option<f32>,
    pub offscreen_resolution: Option<f32>,
    pub use_offscreen_cache: Option<bool>,
    pub mask_variants: Option<u32>,
    pub autonomous_enabled: Option<bool>,
    pub caps: Option<CapsPatch>,
    pub ghost: Option<GhostPatch>,
    pub idle_stroke: Option<IdleStrokePatch>,
    pub stroke: Option<StrokePatch>,
}

fn set<T: Clone>(dst: &mut T, src: &Option<T>) {
    if let Some(v) = src {
        *dst = v.clone();
    }
}

impl ConfigPatch {
    /// Parse a JSON overlay such as `{"ghost": {"cache_size": 512}}`
    pub fn from_json(json: &str) -> RevealResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Shorthand for the common "resize the ghost mask" patch
    pub fn mask_cache_size(size: u32) -> Self {
        Self {
            ghost: Some(GhostPatch {
                cache_size: Some(size),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn merge_into(&self, cfg: &mut RevealConfig) {
        set(&mut cfg.veil_color, &self.veil_color);
        set(&mut cfg.activation, &self.activation);
        set(&mut cfg.hold_time_ms, &self.hold_time_ms);
        set(&mut cfg.grow_duration_ms, &self.grow_duration_ms);
        set(&mut cfg.lifetime_ms, &self.lifetime_ms);
        set(&mut cfg.shrink_duration_ms, &self.shrink_duration_ms);
        set(&mut cfg.grow_ease, &self.grow_ease);
        set(&mut cfg.shrink_ease, &self.shrink_ease);
        set(&mut cfg.min_radius, &self.min_radius);
        set(&mut cfg.max_radius, &self.max_radius);
        set(&mut cfg.permanent_on_max, &self.permanent_on_max);
        set(&mut cfg.point_count, &self.point_count);
        set(&mut cfg.blobs, &self.blobs);
        set(&mut cfg.max_blob_parts, &self.max_blob_parts);
        set(&mut cfg.jitter, &self.jitter);
        set(&mut cfg.edge_roughness, &self.edge_roughness);
        set(&mut cfg.smoothing_passes, &self.smoothing_passes);
        set(&mut cfg.noise_factor, &self.noise_factor);
        set(&mut cfg.max_noise_per_splash, &self.max_noise_per_splash);
        set(&mut cfg.max_noise_dots, &self.max_noise_dots);
        set(&mut cfg.blur_threshold, &self.blur_threshold);
        set(&mut cfg.small_radius_skip, &self.small_radius_skip);
        set(&mut cfg.offscreen_resolution, &self.offscreen_resolution);
        set(&mut cfg.use_offscreen_cache, &self.use_offscreen_cache);
        set(&mut cfg.mask_variants, &self.mask_variants);
        set(&mut cfg.autonomous_enabled, &self.autonomous_enabled);

        if let Some(c) = &self.caps {
            set(&mut cfg.caps.interactive, &c.interactive);
            set(&mut cfg.caps.autonomous, &c.autonomous);
            set(&mut cfg.caps.max_concurrent_draw, &c.max_concurrent_draw);
        }
        if let Some(g) = &self.ghost {
            set(&mut cfg.ghost.enabled, &g.enabled);
            set(&mut cfg.ghost.rate_per_sec, &g.rate_per_sec);
            set(&mut cfg.ghost.max_radius, &g.max_radius);
            set(&mut cfg.ghost.alpha, &g.alpha);
            set(&mut cfg.ghost.drift, &g.drift);
            set(&mut cfg.ghost.lifetime_ms, &g.lifetime_ms);
            set(&mut cfg.ghost.jitter, &g.jitter);
            set(&mut cfg.ghost.cache_size, &g.cache_size);
        }
        if let Some(i) = &self.idle_stroke {
            set(&mut cfg.idle_stroke.enabled, &i.enabled);
            set(&mut cfg.idle_stroke.rate_per_sec, &i.rate_per_sec);
            set(&mut cfg.idle_stroke.path_points, &i.path_points);
            set(&mut cfg.idle_stroke.step_px, &i.step_px);
            set(&mut cfg.idle_stroke.turn_jitter, &i.turn_jitter);
            set(&mut cfg.idle_stroke.min_seed_distance, &i.min_seed_distance);
            set(&mut cfg.idle_stroke.max_seed_attempts, &i.max_seed_attempts);
        }
        if let Some(s) = &self.stroke {
            set(&mut cfg.stroke.brush_radius, &s.brush_radius);
            set(&mut cfg.stroke.seed_radius, &s.seed_radius);
            set(&mut cfg.stroke.min_spacing_px, &s.min_spacing_px);
            set(&mut cfg.stroke.sample_interval_ms, &s.sample_interval_ms);
            set(&mut cfg.stroke.max_points, &s.max_points);
            set(&mut cfg.stroke.grow_duration_ms, &s.grow_duration_ms);
            set(&mut cfg.stroke.shrink_duration_ms, &s.shrink_duration_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_survive_sanitizing() {
        let cfg = RevealConfig::default();
        assert_eq!(cfg.clone().sanitized(), cfg);
    }

    #[test]
    fn test_caps_clamped_to_one() {
        let mut cfg = RevealConfig::default();
        cfg.caps.interactive = 0;
        cfg.caps.autonomous = 0;
        cfg.caps.max_concurrent_draw = 0;
        let cfg = cfg.sanitized();
        assert_eq!(cfg.caps.interactive, 1);
        assert_eq!(cfg.caps.autonomous, 1);
        assert_eq!(cfg.caps.max_concurrent_draw, 1);
    }

    #[test]
    fn test_radius_bounds() {
        let cfg = RevealConfig {
            min_radius: 500.0,
            max_radius: -3.0,
            ..Default::default()
        }
        .sanitized();
        assert!(cfg.max_radius >= 1.0);
        assert!(cfg.min_radius <= cfg.max_radius);
    }

    #[test]
    fn test_non_finite_values_fall_back() {
        let cfg = RevealConfig {
            grow_duration_ms: f64::NAN,
            jitter: f32::INFINITY,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.grow_duration_ms, 1100.0);
        assert_eq!(cfg.jitter, 0.45);
    }

    #[test]
    fn test_point_count_minimum() {
        let cfg = RevealConfig {
            point_count: 1,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.point_count, 3);
    }

    #[test]
    fn test_ghost_cache_size_clamped() {
        let mut cfg = RevealConfig::default();
        cfg.ghost.cache_size = 8;
        assert_eq!(cfg.clone().sanitized().ghost.cache_size, 64);
        cfg.ghost.cache_size = 100_000;
        assert_eq!(cfg.sanitized().ghost.cache_size, 1024);
    }

    #[test]
    fn test_blob_counts_clamped() {
        let cfg = RevealConfig::default();
        assert_eq!(cfg.blob_count(), 3);
        assert_eq!(cfg.ghost_blob_parts(), 4);

        let cfg = RevealConfig {
            blobs: 40,
            max_blob_parts: 10,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.blob_count(), 10);
        assert_eq!(cfg.ghost_blob_parts(), 6);
    }

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(parse_hex_color("#E9E6E4"), Some([0xE9, 0xE6, 0xE4, 0xFF]));
        assert_eq!(parse_hex_color("#00000080"), Some([0, 0, 0, 0x80]));
        assert_eq!(parse_hex_color("E9E6E4"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_activation_mode_from_str() {
        assert_eq!(ActivationMode::from_str("HOLD"), Some(ActivationMode::Hold));
        assert_eq!(ActivationMode::from_str("click"), Some(ActivationMode::Click));
        assert_eq!(ActivationMode::from_str("drag"), None);
        assert_eq!(ActivationMode::Hold.as_str(), "hold");
    }

    #[test]
    fn test_patch_reports_ghost_mask_stale() {
        let mut cfg = RevealConfig::default();
        let changes = cfg.apply(&ConfigPatch::mask_cache_size(512));
        assert!(changes.ghost_mask_stale);
        assert!(!changes.shape_masks_stale);
        assert_eq!(cfg.ghost.cache_size, 512);

        // Same value again is not a change
        let changes = cfg.apply(&ConfigPatch::mask_cache_size(512));
        assert!(!changes.ghost_mask_stale);
    }

    #[test]
    fn test_patch_resanitizes() {
        let mut cfg = RevealConfig::default();
        let patch = ConfigPatch {
            caps: Some(CapsPatch {
                interactive: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        cfg.apply(&patch);
        assert_eq!(cfg.caps.interactive, 1);
    }

    #[test]
    fn test_patch_from_json() {
        let patch =
            ConfigPatch::from_json(r#"{"activation":"hold","ghost":{"cache_size":128}}"#).unwrap();
        assert_eq!(patch.activation, Some(ActivationMode::Hold));
        assert_eq!(patch.ghost.unwrap().cache_size, Some(128));

        assert!(ConfigPatch::from_json(r#"{"no_such_option":1}"#).is_err());
    }

    #[test]
    fn test_config_json_roundtrip_with_defaults() {
        let cfg: RevealConfig = serde_json::from_str(r#"{"max_radius": 200}"#).unwrap();
        assert_eq!(cfg.max_radius, 200.0);
        assert_eq!(cfg.min_radius, 120.0);
    }
}
