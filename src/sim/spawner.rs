//! Spawner
//!
//! Decides when entities come into existence. Interactive spawns always win:
//! at the cap the oldest non-permanent entity is forced into `Shrinking`, and
//! if everything is permanent the oldest is dropped outright. Autonomous
//! spawns follow a discretized Poisson process and are simply rejected at the
//! cap.
//!
//! All timers live on the [`Spawner`] instance and every method takes the
//! frame timestamp explicitly, so engines never share state and tests can
//! drive synthetic time.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::f32::consts::TAU;

use super::entity::{Category, Entity, EntityId, EntityKind, StrokePath, Timing};
use super::input::Viewport;
use super::shape;
use crate::consts::{
    GHOST_GROW_FRACTION, GHOST_HOLD_FRACTION, GHOST_LIFETIME_JITTER, GHOST_MIN_RADIUS,
    GHOST_SHRINK_FRACTION, SPAWN_MARGIN,
};
use crate::renderer::mask::MaskCache;
use crate::settings::RevealConfig;
use crate::uniform;

/// One Poisson trial: fires with probability `rate * dt`, clamped to 1
pub fn poisson_trial<R: Rng>(rng: &mut R, rate_per_sec: f64, dt_ms: f64) -> bool {
    if !(rate_per_sec > 0.0) || !(dt_ms > 0.0) {
        return false;
    }
    let p = (rate_per_sec * dt_ms / 1000.0).min(1.0);
    rng.random::<f64>() < p
}

/// Live entities of `category` that hold a slot
pub fn slot_count(entities: &[Entity], category: Category) -> usize {
    entities
        .iter()
        .filter(|e| e.category() == category && e.occupies_slot())
        .count()
}

/// Index of the oldest slot holder in `category`
fn oldest_in_slot(entities: &[Entity], category: Category, include_permanent: bool) -> Option<usize> {
    entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.category() == category && e.occupies_slot())
        .filter(|(_, e)| include_permanent || !e.permanent)
        .min_by(|(_, a), (_, b)| a.created_at_ms.total_cmp(&b.created_at_ms))
        .map(|(i, _)| i)
}

/// Drop an entity for good, handing its mask back to the cache
pub fn retire(entity: Entity, masks: &mut MaskCache) {
    if let Some(handle) = entity.mask {
        masks.release(handle);
    }
}

/// Spawn decisions plus the state they need between frames
#[derive(Debug)]
pub struct Spawner {
    rng: Pcg32,
    next_id: u64,
    /// Last autonomous evaluation per generator (`None` until the first frame)
    ghost_clock: Option<f64>,
    idle_clock: Option<f64>,
}

impl Spawner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            next_id: 1,
            ghost_clock: None,
            idle_clock: None,
        }
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Forget autonomous timers so a re-enable does not burst
    pub fn reset_clocks(&mut self) {
        self.ghost_clock = None;
        self.idle_clock = None;
    }

    /// Free a slot in `category` for an incoming interactive spawn
    ///
    /// Returns the number of entities evicted (soft or hard).
    pub fn make_room(
        entities: &mut Vec<Entity>,
        masks: &mut MaskCache,
        category: Category,
        cap: usize,
        now_ms: f64,
    ) -> usize {
        let mut evicted = 0;
        while slot_count(entities, category) >= cap.max(1) {
            if let Some(i) = oldest_in_slot(entities, category, false) {
                let e = &mut entities[i];
                e.force_shrink(now_ms);
                log::debug!("Evicted {:?} into Shrinking", e.id);
            } else if let Some(i) = oldest_in_slot(entities, category, true) {
                let e = entities.remove(i);
                log::debug!("Dropped permanent {:?} to make room", e.id);
                retire(e, masks);
            } else {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    /// Interactive splash at `pos`; `None` only for an unusable position
    pub fn spawn_splash(
        &mut self,
        entities: &mut Vec<Entity>,
        masks: &mut MaskCache,
        pos: Vec2,
        now_ms: f64,
        cfg: &RevealConfig,
    ) -> Option<EntityId> {
        if !pos.is_finite() {
            return None;
        }
        Self::make_room(entities, masks, Category::Interactive, cfg.caps.interactive, now_ms);

        let id = self.next_entity_id();
        let radius = uniform(&mut self.rng, cfg.min_radius, cfg.max_radius);
        let rotation = uniform(&mut self.rng, 0.0, TAU);
        let jitter_seed: u64 = self.rng.random();
        let timing = Timing {
            grow_ms: cfg.grow_duration_ms,
            hold_ms: cfg.lifetime_ms,
            shrink_ms: cfg.shrink_duration_ms,
        };

        let mut entity = Entity::new(
            id,
            EntityKind::Splash,
            pos,
            radius,
            0.0,
            timing,
            now_ms,
            rotation,
            jitter_seed,
            1.0,
        );
        entity.mask = masks.splash_mask(radius, jitter_seed, cfg);
        log::debug!("Spawned splash {:?} at ({:.0}, {:.0}) r={:.0}", id, pos.x, pos.y, radius);
        entities.push(entity);
        Some(id)
    }

    /// Interactive stroke painted by a pointer drag starting at `pos`
    pub fn spawn_pointer_stroke(
        &mut self,
        entities: &mut Vec<Entity>,
        masks: &mut MaskCache,
        pos: Vec2,
        now_ms: f64,
        cfg: &RevealConfig,
    ) -> Option<EntityId> {
        if !pos.is_finite() {
            return None;
        }
        Self::make_room(entities, masks, Category::Interactive, cfg.caps.interactive, now_ms);

        let id = self.next_entity_id();
        let path = StrokePath::pointer(pos, now_ms, cfg.stroke.max_points);
        let entity = self.stroke_entity(id, path, pos, now_ms, cfg, masks);
        log::debug!("Spawned pointer stroke {:?}", id);
        entities.push(entity);
        Some(id)
    }

    fn stroke_entity(
        &mut self,
        id: EntityId,
        path: StrokePath,
        pos: Vec2,
        now_ms: f64,
        cfg: &RevealConfig,
        masks: &mut MaskCache,
    ) -> Entity {
        let s = &cfg.stroke;
        let timing = Timing {
            grow_ms: s.grow_duration_ms,
            hold_ms: 0.0,
            shrink_ms: s.shrink_duration_ms,
        };
        let jitter_seed: u64 = self.rng.random();
        let mut entity = Entity::new(
            id,
            EntityKind::Stroke(path),
            pos,
            s.brush_radius,
            s.seed_radius,
            timing,
            now_ms,
            0.0,
            jitter_seed,
            1.0,
        );
        entity.mask = masks.brush_mask(s.brush_radius, cfg);
        entity
    }

    /// Evaluate both autonomous generators for this frame
    pub fn autonomous(
        &mut self,
        entities: &mut Vec<Entity>,
        masks: &mut MaskCache,
        now_ms: f64,
        cfg: &RevealConfig,
        viewport: &Viewport,
        pointer: Option<Vec2>,
    ) -> Vec<EntityId> {
        let mut spawned = Vec::new();
        if !cfg.autonomous_enabled {
            self.reset_clocks();
            return spawned;
        }

        if cfg.ghost.enabled {
            let dt = now_ms - self.ghost_clock.unwrap_or(now_ms);
            self.ghost_clock = Some(now_ms);
            if poisson_trial(&mut self.rng, cfg.ghost.rate_per_sec, dt) {
                spawned.extend(self.spawn_ghost(entities, now_ms, cfg, viewport));
            }
        } else {
            self.ghost_clock = None;
        }

        if cfg.idle_stroke.enabled {
            let dt = now_ms - self.idle_clock.unwrap_or(now_ms);
            self.idle_clock = Some(now_ms);
            if poisson_trial(&mut self.rng, cfg.idle_stroke.rate_per_sec, dt) {
                spawned.extend(self.spawn_idle_stroke(entities, masks, now_ms, cfg, viewport, pointer));
            }
        } else {
            self.idle_clock = None;
        }

        spawned
    }

    /// Drifting ghost ripple somewhere inside the viewport margin
    pub fn spawn_ghost(
        &mut self,
        entities: &mut Vec<Entity>,
        now_ms: f64,
        cfg: &RevealConfig,
        viewport: &Viewport,
    ) -> Option<EntityId> {
        if slot_count(entities, Category::Autonomous) >= cfg.caps.autonomous {
            log::trace!("Ghost rejected: autonomous cap reached");
            return None;
        }
        let g = &cfg.ghost;
        let (min, max) = viewport.inner_bounds(SPAWN_MARGIN);
        let pos = Vec2::new(
            uniform(&mut self.rng, min.x, max.x),
            uniform(&mut self.rng, min.y, max.y),
        );

        let (lo, hi) = GHOST_LIFETIME_JITTER;
        let life = g.lifetime_ms * (lo + (hi - lo) * self.rng.random::<f64>());
        let timing = Timing {
            grow_ms: life * GHOST_GROW_FRACTION,
            hold_ms: life * GHOST_HOLD_FRACTION,
            shrink_ms: life * GHOST_SHRINK_FRACTION,
        };
        let radius = uniform(&mut self.rng, GHOST_MIN_RADIUS, g.max_radius);
        let velocity = Vec2::new(
            uniform(&mut self.rng, -0.5, 0.5) * g.drift,
            uniform(&mut self.rng, -0.5, 0.5) * g.drift,
        );
        let rotation = uniform(&mut self.rng, 0.0, TAU);
        let jitter_seed: u64 = self.rng.random();

        let id = self.next_entity_id();
        entities.push(Entity::new(
            id,
            EntityKind::Ghost { velocity },
            pos,
            radius,
            0.0,
            timing,
            now_ms,
            rotation,
            jitter_seed,
            g.alpha,
        ));
        log::debug!("Spawned ghost {:?} r={:.0} life={:.0}ms", id, radius, life);
        Some(id)
    }

    /// Autonomous stroke along a wandering path
    pub fn spawn_idle_stroke(
        &mut self,
        entities: &mut Vec<Entity>,
        masks: &mut MaskCache,
        now_ms: f64,
        cfg: &RevealConfig,
        viewport: &Viewport,
        pointer: Option<Vec2>,
    ) -> Option<EntityId> {
        if slot_count(entities, Category::Autonomous) >= cfg.caps.autonomous {
            log::trace!("Idle stroke rejected: autonomous cap reached");
            return None;
        }
        let Some(seed) = self.find_seed(entities, cfg, viewport, pointer) else {
            log::trace!("Idle stroke dropped: no valid seed");
            return None;
        };

        let i = &cfg.idle_stroke;
        let (min, max) = viewport.inner_bounds(SPAWN_MARGIN);
        let planned = shape::wander_path(seed, i.path_points, i.step_px, i.turn_jitter, min, max, &mut self.rng);

        let id = self.next_entity_id();
        let path = StrokePath::idle(planned, now_ms, cfg.stroke.max_points);
        let entity = self.stroke_entity(id, path, seed, now_ms, cfg, masks);
        log::debug!("Spawned idle stroke {:?} at ({:.0}, {:.0})", id, seed.x, seed.y);
        entities.push(entity);
        Some(id)
    }

    /// Random seed point away from the pointer and from other idle seeds
    pub fn find_seed(
        &mut self,
        entities: &[Entity],
        cfg: &RevealConfig,
        viewport: &Viewport,
        pointer: Option<Vec2>,
    ) -> Option<Vec2> {
        let i = &cfg.idle_stroke;
        let (min, max) = viewport.inner_bounds(SPAWN_MARGIN);
        let others: Vec<Vec2> = entities
            .iter()
            .filter(|e| e.stroke().is_some_and(|p| p.is_idle()) && !e.finished)
            .map(|e| e.position)
            .collect();

        for _ in 0..i.max_seed_attempts {
            let candidate = Vec2::new(
                uniform(&mut self.rng, min.x, max.x),
                uniform(&mut self.rng, min.y, max.y),
            );
            let near_pointer = pointer.is_some_and(|p| p.distance(candidate) < i.min_seed_distance);
            let near_other = others.iter().any(|o| o.distance(candidate) < i.min_seed_distance);
            if !near_pointer && !near_other {
                return Some(candidate);
            }
        }
        None
    }
}
