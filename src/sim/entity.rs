//! Reveal entities
//!
//! One record per active reveal unit: interactive splashes and strokes,
//! autonomous ghosts and idle strokes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::renderer::mask::MaskHandle;

/// Opaque entity identifier, never reused within one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Lifecycle phase
///
/// Splashes and ghosts go `Growing -> Steady -> Shrinking`, strokes go
/// `Growing -> Painting -> Shrinking`. Transitions never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Growing,
    Steady,
    Painting,
    Shrinking,
}

impl Phase {
    /// Position in the one-directional ordering
    pub fn rank(self) -> u8 {
        match self {
            Phase::Growing => 0,
            Phase::Steady | Phase::Painting => 1,
            Phase::Shrinking => 2,
        }
    }
}

/// Which concurrency cap an entity counts against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Interactive,
    Autonomous,
}

/// Where a stroke's points come from
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeSource {
    /// Appended by the frame tick while the pointer drags
    Pointer,
    /// Traced from a pre-generated path, one point per sample interval
    Idle { planned: Vec<Vec2>, next: usize },
}

/// Path state of a stroke entity
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePath {
    pub points: Vec<Vec2>,
    pub source: StrokeSource,
    /// Still receiving points
    pub emitting: bool,
    pub last_emit_ms: f64,
    pub max_points: usize,
}

impl StrokePath {
    pub fn pointer(start: Vec2, now_ms: f64, max_points: usize) -> Self {
        Self {
            points: vec![start],
            source: StrokeSource::Pointer,
            emitting: true,
            last_emit_ms: now_ms,
            max_points,
        }
    }

    pub fn idle(planned: Vec<Vec2>, now_ms: f64, max_points: usize) -> Self {
        let first = planned.first().copied();
        Self {
            points: first.into_iter().collect(),
            source: StrokeSource::Idle { planned, next: 1 },
            emitting: true,
            last_emit_ms: now_ms,
            max_points,
        }
    }

    /// Append `p` if it respects the spacing and interval; returns whether it was kept
    pub fn try_append(&mut self, p: Vec2, now_ms: f64, min_spacing: f32, interval_ms: f64) -> bool {
        if !self.emitting || !p.is_finite() {
            return false;
        }
        if self.points.len() >= self.max_points {
            self.emitting = false;
            return false;
        }
        if now_ms - self.last_emit_ms < interval_ms {
            return false;
        }
        if let Some(last) = self.points.last() {
            if last.distance(p) < min_spacing {
                return false;
            }
        }
        self.points.push(p);
        self.last_emit_ms = now_ms;
        if self.points.len() >= self.max_points {
            self.emitting = false;
        }
        true
    }

    /// Stop accepting points
    pub fn finish(&mut self) {
        self.emitting = false;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.source, StrokeSource::Idle { .. })
    }
}

/// Variant-specific state
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// Interactive blot at a fixed position
    Splash,
    /// Autonomous ripple drifting at a fixed velocity (px/sec)
    Ghost { velocity: Vec2 },
    /// Brush path; `size` is the brush radius
    Stroke(StrokePath),
}

/// Per-entity phase durations (ms)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub grow_ms: f64,
    pub hold_ms: f64,
    pub shrink_ms: f64,
}

/// A live reveal unit
#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    /// Asymptotic radius (or brush radius for strokes)
    pub target_size: f32,
    /// Size used for drawing this frame
    pub current_size: f32,
    /// Starting size of a stroke's seed growth
    pub seed_size: f32,
    pub phase: Phase,
    pub phase_start_ms: f64,
    pub phase_duration_ms: f64,
    /// Size when the current phase began (shrink starts from here)
    pub phase_start_size: f32,
    pub created_at_ms: f64,
    pub timing: Timing,
    /// Fixed at spawn for stable appearance
    pub rotation: f32,
    pub jitter_seed: u64,
    /// Exempt from auto-shrink and soft eviction
    pub permanent: bool,
    /// Peak erase strength (ghosts cut at partial alpha)
    pub base_alpha: f32,
    /// Erase strength this frame
    pub alpha: f32,
    /// Set once shrinking completes; pruned before drawing
    pub finished: bool,
    /// Exclusively owned mask; ghosts draw from the shared cache instead
    pub mask: Option<MaskHandle>,
}

impl Entity {
    /// Fresh entity in `Growing`, anchored at `now_ms`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EntityId,
        kind: EntityKind,
        position: Vec2,
        target_size: f32,
        seed_size: f32,
        timing: Timing,
        now_ms: f64,
        rotation: f32,
        jitter_seed: u64,
        base_alpha: f32,
    ) -> Self {
        let fades_in = matches!(kind, EntityKind::Stroke(_));
        let seed_size = seed_size.clamp(0.0, target_size.max(0.0));
        Self {
            id,
            kind,
            position,
            target_size,
            current_size: seed_size,
            seed_size,
            phase: Phase::Growing,
            phase_start_ms: now_ms,
            phase_duration_ms: timing.grow_ms,
            phase_start_size: seed_size,
            created_at_ms: now_ms,
            timing,
            rotation,
            jitter_seed,
            permanent: false,
            base_alpha,
            alpha: if fades_in { 0.0 } else { base_alpha },
            finished: false,
            mask: None,
        }
    }

    pub fn category(&self) -> Category {
        match &self.kind {
            EntityKind::Splash => Category::Interactive,
            EntityKind::Ghost { .. } => Category::Autonomous,
            EntityKind::Stroke(path) if path.is_idle() => Category::Autonomous,
            EntityKind::Stroke(_) => Category::Interactive,
        }
    }

    pub fn is_splash(&self) -> bool {
        matches!(self.kind, EntityKind::Splash)
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self.kind, EntityKind::Ghost { .. })
    }

    pub fn is_stroke(&self) -> bool {
        matches!(self.kind, EntityKind::Stroke(_))
    }

    pub fn stroke(&self) -> Option<&StrokePath> {
        match &self.kind {
            EntityKind::Stroke(path) => Some(path),
            _ => None,
        }
    }

    pub fn stroke_mut(&mut self) -> Option<&mut StrokePath> {
        match &mut self.kind {
            EntityKind::Stroke(path) => Some(path),
            _ => None,
        }
    }

    /// Counts against its category cap (shrinking entities are vacating)
    pub fn occupies_slot(&self) -> bool {
        self.phase != Phase::Shrinking && !self.finished
    }

    /// Move to `phase` if that is a forward transition; returns whether it happened
    pub fn enter_phase(&mut self, phase: Phase, now_ms: f64, duration_ms: f64) -> bool {
        if phase.rank() <= self.phase.rank() {
            return false;
        }
        self.phase = phase;
        self.phase_start_ms = now_ms;
        self.phase_duration_ms = duration_ms.max(0.0);
        self.phase_start_size = self.current_size.max(0.0);
        true
    }

    /// Evict: jump straight to `Shrinking` from wherever we are
    pub fn force_shrink(&mut self, now_ms: f64) -> bool {
        if let Some(path) = self.stroke_mut() {
            path.finish();
        }
        self.permanent = false;
        self.enter_phase(Phase::Shrinking, now_ms, self.timing.shrink_ms)
    }

    /// Read-only copy for diagnostics and host UI sync
    pub fn snapshot(&self) -> EntitySnapshot {
        let (kind, path) = match &self.kind {
            EntityKind::Splash => (EntityKindTag::Splash, Vec::new()),
            EntityKind::Ghost { .. } => (EntityKindTag::Ghost, Vec::new()),
            EntityKind::Stroke(p) => (EntityKindTag::Stroke, p.points.clone()),
        };
        EntitySnapshot {
            id: self.id,
            kind,
            category: self.category(),
            position: self.position,
            target_size: self.target_size,
            current_size: self.current_size,
            phase: self.phase,
            alpha: self.alpha,
            rotation: self.rotation,
            created_at_ms: self.created_at_ms,
            permanent: self.permanent,
            has_mask: self.mask.is_some(),
            path,
        }
    }
}

/// Variant name without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKindTag {
    Splash,
    Ghost,
    Stroke,
}

/// Serializable view of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKindTag,
    pub category: Category,
    pub position: Vec2,
    pub target_size: f32,
    pub current_size: f32,
    pub phase: Phase,
    pub alpha: f32,
    pub rotation: f32,
    pub created_at_ms: f64,
    pub permanent: bool,
    pub has_mask: bool,
    /// Stroke points (empty for other kinds)
    pub path: Vec<Vec2>,
}
