//! Reveal engine
//!
//! Owns the entity list, the spawner, the mask cache and the drawing surface,
//! and runs one frame per [`RevealEngine::tick`] in a fixed order:
//!
//! 1. sample pointer state (clicks, hold, drag strokes)
//! 2. evaluate autonomous spawns
//! 3. advance every entity's lifecycle
//! 4. prune finished entities and release their masks
//! 5. redraw the flat veil
//! 6. composite the bounded entity subset
//!
//! Input handlers only write pointer state; every spawn and transition
//! happens inside the tick.

use std::error::Error;
use std::panic::{AssertUnwindSafe, catch_unwind};

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use crate::consts::{HOLD_REARM_MS, HOLD_RECENT_SPLASH_MS, SIZE_EPSILON};
use crate::error::{RevealError, RevealResult};
use crate::platform::FrameScheduler;
use crate::renderer::compositor::{Compositor, DrawStats};
use crate::renderer::mask::MaskCache;
use crate::renderer::surface::{self, RenderSurface};
use crate::settings::{ActivationMode, ConfigPatch, RevealConfig};
use crate::sim::entity::{Category, Entity, EntityId, EntitySnapshot, Phase};
use crate::sim::input::{PointerCursor, PointerState, Viewport};
use crate::sim::lifecycle::{self, LifecycleParams};
use crate::sim::spawner::{self, Spawner};

/// Host callback run at the end of every drawn frame
pub type FrameHook = Box<dyn FnMut(&FrameStats) -> Result<(), Box<dyn Error>>>;

/// What a call to [`RevealEngine::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Loop not running; nothing happened
    Idle,
    /// Full frame drawn
    Drawn,
    /// Entities advanced but the surface was missing, drawing skipped
    SurfaceMissing,
    /// Engine torn down
    Destroyed,
}

/// Diagnostics for the most recent frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub frame: u64,
    pub now_ms: f64,
    /// Slot holders per category
    pub interactive: usize,
    pub autonomous: usize,
    /// Every live entity, shrinking ones included
    pub entities: usize,
    pub spawned: usize,
    pub pruned: usize,
    pub draw: DrawStats,
    pub mask_entries: usize,
    pub mask_bytes: usize,
    pub masks_rasterized: u64,
}

/// The reveal engine
pub struct RevealEngine<S: RenderSurface, F: FrameScheduler> {
    config: RevealConfig,
    veil: [u8; 4],
    viewport: Viewport,
    surface: S,
    scheduler: F,

    entities: Vec<Entity>,
    spawner: Spawner,
    masks: MaskCache,
    compositor: Compositor,

    pointer: PointerState,
    cursor: PointerCursor,
    /// Input listeners attached (cleared by destroy)
    listening: bool,
    /// Hold activation stays disarmed until this time
    hold_rearm_ms: f64,
    /// Pointer stroke currently receiving points
    active_stroke: Option<EntityId>,
    /// Press that already produced a drag stroke
    stroke_press: u64,

    running: bool,
    destroyed: bool,
    last_frame_ms: Option<f64>,
    surface_missing: bool,
    hook: Option<FrameHook>,
    stats: FrameStats,
}

impl<S: RenderSurface, F: FrameScheduler> RevealEngine<S, F> {
    /// Build an engine over `surface`; fails only if the surface is unusable
    pub fn new(
        config: RevealConfig,
        mut surface: S,
        scheduler: F,
        viewport: Viewport,
        now_ms: f64,
    ) -> RevealResult<Self> {
        if !surface.is_attached() {
            return Err(RevealError::SurfaceUnavailable);
        }
        let (w, h) = viewport.pixel_size();
        surface.resize(w, h);
        let (sw, sh) = surface.size();
        if sw == 0 || sh == 0 {
            return Err(RevealError::InvalidSurfaceSize { width: sw, height: sh });
        }

        let config = config.sanitized();
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        log::info!(
            "Reveal engine created: {}x{} @{}x, activation={}, seed={}",
            viewport.width,
            viewport.height,
            viewport.dpr,
            config.activation.as_str(),
            seed
        );

        let mut engine = Self {
            veil: config.veil_rgba(),
            viewport,
            surface,
            scheduler,
            entities: Vec::new(),
            spawner: Spawner::new(seed),
            masks: MaskCache::new(seed),
            compositor: Compositor::new(),
            pointer: PointerState::new(viewport.center(), now_ms),
            cursor: PointerCursor::default(),
            listening: true,
            hold_rearm_ms: now_ms,
            active_stroke: None,
            stroke_press: 0,
            running: false,
            destroyed: false,
            last_frame_ms: None,
            surface_missing: false,
            hook: None,
            stats: FrameStats::default(),
            config,
        };
        engine.redraw_veil();
        if engine.config.auto_start {
            engine.start();
        }
        Ok(engine)
    }

    // === Loop control ===

    /// Begin the frame loop (idempotent)
    pub fn start(&mut self) {
        if self.destroyed || self.running {
            return;
        }
        self.running = true;
        self.last_frame_ms = None;
        // Time spent stopped never counts toward a Poisson trial
        self.spawner.reset_clocks();
        self.scheduler.request_frame();
        log::info!("Reveal loop started");
    }

    /// Halt the frame loop (idempotent); entities are kept
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.cancel_frame();
        log::info!("Reveal loop stopped");
    }

    /// Full teardown (idempotent): halt, detach input, release every bitmap
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        self.destroyed = true;
        self.listening = false;
        self.active_stroke = None;
        for entity in self.entities.drain(..) {
            spawner::retire(entity, &mut self.masks);
        }
        self.masks.clear();
        self.surface.release();
        self.hook = None;
        log::info!("Reveal engine destroyed");
    }

    /// Clear every entity and show the flat veil; the loop keeps running
    pub fn reset_all(&mut self) {
        if self.destroyed {
            return;
        }
        let cleared = self.entities.len();
        for entity in self.entities.drain(..) {
            spawner::retire(entity, &mut self.masks);
        }
        self.active_stroke = None;
        self.redraw_veil();
        log::info!("Reset: cleared {} entities", cleared);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Run one frame at `now_ms`
    pub fn tick(&mut self, now_ms: f64) -> FrameOutcome {
        if self.destroyed {
            return FrameOutcome::Destroyed;
        }
        if !self.running {
            return FrameOutcome::Idle;
        }

        let dt_ms = (now_ms - self.last_frame_ms.unwrap_or(now_ms)).max(0.0);
        self.last_frame_ms = Some(now_ms);
        let mut stats = FrameStats {
            frame: self.stats.frame + 1,
            now_ms,
            ..Default::default()
        };

        // 1. Pointer
        stats.spawned += self.sample_pointer(now_ms);

        // 2. Autonomous spawns
        let pointer = self.pointer.present.then_some(self.pointer.position);
        stats.spawned += self
            .spawner
            .autonomous(
                &mut self.entities,
                &mut self.masks,
                now_ms,
                &self.config,
                &self.viewport,
                pointer,
            )
            .len();

        // 3. Lifecycle
        let params = self.lifecycle_params();
        for entity in self.entities.iter_mut() {
            if let Some(change) = lifecycle::update(entity, now_ms, dt_ms, &params) {
                log::trace!("{:?} {:?} -> {:?}", entity.id, change.from, change.to);
            }
            if !entity.current_size.is_finite() {
                log::warn!("{:?} produced a non-finite size, removing it", entity.id);
                entity.finished = true;
            }
        }

        // 4. Prune before drawing
        stats.pruned = self.prune();

        // 5 + 6. Veil and composite
        let outcome = match self.surface.pixels_mut() {
            Some(pixels) => {
                if self.surface_missing {
                    log::info!("Drawing surface is back");
                    self.surface_missing = false;
                }
                surface::fill_veil(pixels, self.veil);
                stats.draw = self.compositor.draw(
                    pixels,
                    &self.entities,
                    &mut self.masks,
                    &self.config,
                    self.viewport.dpr,
                );
                self.surface.present();
                FrameOutcome::Drawn
            }
            None => {
                if !self.surface_missing {
                    log::warn!("Drawing surface missing, skipping draw until it returns");
                    self.surface_missing = true;
                }
                FrameOutcome::SurfaceMissing
            }
        };

        stats.interactive = spawner::slot_count(&self.entities, Category::Interactive);
        stats.autonomous = spawner::slot_count(&self.entities, Category::Autonomous);
        stats.entities = self.entities.len();
        stats.mask_entries = self.masks.len();
        stats.mask_bytes = self.masks.bytes();
        stats.masks_rasterized = self.masks.rasterized();
        log::trace!("Frame {}: {:?}", stats.frame, stats);
        self.stats = stats;

        self.run_hook();

        if self.running {
            self.scheduler.request_frame();
        }
        outcome
    }

    fn lifecycle_params(&self) -> LifecycleParams {
        LifecycleParams {
            grow_ease: self.config.grow_ease,
            shrink_ease: self.config.shrink_ease,
            permanent_on_max: self.config.permanent_on_max,
            sample_interval_ms: self.config.stroke.sample_interval_ms,
        }
    }

    /// Drop finished entities (or fully shrunk ones) and release their masks
    fn prune(&mut self) -> usize {
        let (gone, kept): (Vec<Entity>, Vec<Entity>) = std::mem::take(&mut self.entities)
            .into_iter()
            .partition(|e| e.finished || (e.phase == Phase::Shrinking && e.current_size < SIZE_EPSILON));
        self.entities = kept;

        let pruned = gone.len();
        for entity in gone {
            if self.active_stroke == Some(entity.id) {
                self.active_stroke = None;
            }
            spawner::retire(entity, &mut self.masks);
        }
        pruned
    }

    fn run_hook(&mut self) {
        let Some(hook) = self.hook.as_mut() else {
            return;
        };
        let stats = &self.stats;
        match catch_unwind(AssertUnwindSafe(|| hook(stats))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("Frame hook failed: {}", err),
            Err(_) => log::warn!("Frame hook panicked; continuing"),
        }
    }

    // === Pointer sampling (frame step 1) ===

    /// Turn pending pointer state into spawns; returns how many were created
    fn sample_pointer(&mut self, now_ms: f64) -> usize {
        let mut spawned = 0;
        let pressed = self.cursor.take_press(&self.pointer);
        let click = self.cursor.take_click(&self.pointer);

        match self.config.activation {
            ActivationMode::Click => {
                if pressed {
                    log::trace!("Pointer down at {:?}", self.pointer.position);
                }
                spawned += self.sample_drag(now_ms);
                if let Some(pos) = click {
                    spawned += self
                        .spawner
                        .spawn_splash(&mut self.entities, &mut self.masks, pos, now_ms, &self.config)
                        .is_some() as usize;
                }
            }
            ActivationMode::Hold => {
                spawned += self.sample_hold(now_ms) as usize;
            }
        }
        spawned
    }

    /// Drag painting: start, extend or finish the pointer stroke
    fn sample_drag(&mut self, now_ms: f64) -> usize {
        let mut spawned = 0;
        if self.active_stroke.is_none()
            && self.pointer.is_dragging()
            && self.stroke_press != self.pointer.press_seq
        {
            self.stroke_press = self.pointer.press_seq;
            self.active_stroke = self.spawner.spawn_pointer_stroke(
                &mut self.entities,
                &mut self.masks,
                self.pointer.down_pos,
                now_ms,
                &self.config,
            );
            spawned += self.active_stroke.is_some() as usize;
        }

        let Some(id) = self.active_stroke else {
            return spawned;
        };
        let s = &self.config.stroke;
        let (down, pos) = (self.pointer.down, self.pointer.position);
        let mut path = self
            .entities
            .iter_mut()
            .find(|e| e.id == id)
            .and_then(|e| e.stroke_mut());
        if let Some(path) = path.as_deref_mut().filter(|_| spawned > 0) {
            // Join the press point to where the drag threshold was crossed
            path.try_append(pos, now_ms, s.min_spacing_px, 0.0);
        }
        match path {
            Some(path) if down && path.emitting => {
                path.try_append(pos, now_ms, s.min_spacing_px, s.sample_interval_ms);
            }
            Some(path) => {
                path.finish();
                self.active_stroke = None;
            }
            None => self.active_stroke = None,
        }
        spawned
    }

    /// Hold activation: spawn once the pointer has rested long enough
    fn sample_hold(&mut self, now_ms: f64) -> bool {
        if !self.pointer.present {
            return false;
        }
        let armed_since = self.pointer.last_move_ms.max(self.hold_rearm_ms);
        if now_ms - armed_since < self.config.hold_time_ms {
            return false;
        }
        let newest_splash = self
            .entities
            .iter()
            .filter(|e| e.is_splash())
            .map(|e| e.created_at_ms)
            .fold(f64::NEG_INFINITY, f64::max);
        if now_ms - newest_splash < HOLD_RECENT_SPLASH_MS {
            return false;
        }

        self.hold_rearm_ms = now_ms + HOLD_REARM_MS;
        let pos = self.pointer.position;
        self.spawner
            .spawn_splash(&mut self.entities, &mut self.masks, pos, now_ms, &self.config)
            .is_some()
    }

    // === Input entry points (write pointer state only) ===

    pub fn pointer_move(&mut self, x: f32, y: f32, now_ms: f64) {
        if self.listening {
            self.pointer.on_move(Vec2::new(x, y), now_ms);
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, now_ms: f64) {
        if self.listening {
            self.pointer.on_down(Vec2::new(x, y), now_ms);
        }
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, now_ms: f64) {
        if self.listening {
            self.pointer.on_move(Vec2::new(x, y), now_ms);
            self.pointer.on_up();
        }
    }

    // === Host operations ===

    /// New logical size and device pixel ratio; entities are untouched
    pub fn resize(&mut self, width: f32, height: f32, dpr: f32) {
        if self.destroyed {
            return;
        }
        self.viewport = Viewport::new(width, height, dpr);
        let (w, h) = self.viewport.pixel_size();
        self.surface.resize(w, h);
        self.redraw_veil();
        log::info!(
            "Resized to {}x{} @{}x ({}x{} px)",
            self.viewport.width,
            self.viewport.height,
            self.viewport.dpr,
            w,
            h
        );
    }

    /// Programmatic interactive spawn, bypassing pointer checks
    pub fn spawn_at(&mut self, x: f32, y: f32, now_ms: f64) -> Option<EntityId> {
        if self.destroyed {
            return None;
        }
        self.spawner
            .spawn_splash(&mut self.entities, &mut self.masks, Vec2::new(x, y), now_ms, &self.config)
    }

    /// Remove the most recently created entity (undo)
    pub fn remove_last(&mut self) -> Option<EntityId> {
        let idx = self
            .entities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.created_at_ms
                    .total_cmp(&b.created_at_ms)
                    .then(a.id.cmp(&b.id))
            })
            .map(|(i, _)| i)?;
        let entity = self.entities.remove(idx);
        let id = entity.id;
        if self.active_stroke == Some(id) {
            self.active_stroke = None;
        }
        spawner::retire(entity, &mut self.masks);
        log::debug!("Removed {:?}", id);
        Some(id)
    }

    /// Snapshot of every live entity
    pub fn entities(&self) -> Vec<EntitySnapshot> {
        self.entities.iter().map(Entity::snapshot).collect()
    }

    pub fn strokes(&self) -> Vec<EntitySnapshot> {
        self.entities
            .iter()
            .filter(|e| e.is_stroke())
            .map(Entity::snapshot)
            .collect()
    }

    pub fn splashes(&self) -> Vec<EntitySnapshot> {
        self.entities
            .iter()
            .filter(|e| e.is_splash())
            .map(Entity::snapshot)
            .collect()
    }

    /// Merge a runtime patch, invalidating whatever masks it made stale
    pub fn set_options(&mut self, patch: &ConfigPatch) {
        let changes = self.config.apply(patch);
        if changes.ghost_mask_stale {
            self.masks.invalidate_ghost();
        }
        if changes.shape_masks_stale {
            self.masks.invalidate_shapes();
        }
        if changes.veil_changed {
            self.veil = self.config.veil_rgba();
            self.redraw_veil();
        }
        log::info!("Options updated: {:?}", changes);
    }

    /// [`set_options`](Self::set_options) from a JSON overlay
    pub fn set_options_json(&mut self, json: &str) -> RevealResult<()> {
        let patch = ConfigPatch::from_json(json)?;
        self.set_options(&patch);
        Ok(())
    }

    /// Toggle the autonomous generators without touching anything else
    pub fn set_autonomous_enabled(&mut self, enabled: bool) {
        if self.config.autonomous_enabled != enabled {
            self.config.autonomous_enabled = enabled;
            log::info!("Autonomous spawning {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn set_frame_hook(&mut self, hook: FrameHook) {
        self.hook = Some(hook);
    }

    pub fn clear_frame_hook(&mut self) {
        self.hook = None;
    }

    // === Accessors ===

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn mask_cache(&self) -> &MaskCache {
        &self.masks
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    /// Flat veil, drawn right away
    fn redraw_veil(&mut self) {
        if let Some(pixels) = self.surface.pixels_mut() {
            surface::fill_veil(pixels, self.veil);
            self.surface.present();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualScheduler;
    use crate::renderer::surface::PixelSurface;
    use std::cell::Cell;
    use std::rc::Rc;

    type TestEngine = RevealEngine<PixelSurface, ManualScheduler>;

    fn config() -> RevealConfig {
        RevealConfig {
            seed: Some(7),
            autonomous_enabled: false,
            use_offscreen_cache: false,
            min_radius: 20.0,
            max_radius: 30.0,
            ..Default::default()
        }
    }

    fn engine(cfg: RevealConfig) -> (TestEngine, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        let engine = RevealEngine::new(
            cfg,
            PixelSurface::new(1, 1),
            scheduler.clone(),
            Viewport::new(200.0, 150.0, 1.0),
            0.0,
        )
        .unwrap();
        (engine, scheduler)
    }

    #[test]
    fn test_detached_surface_is_fatal() {
        let mut surface = PixelSurface::new(10, 10);
        surface.detach();
        let result = RevealEngine::new(
            config(),
            surface,
            ManualScheduler::new(),
            Viewport::new(10.0, 10.0, 1.0),
            0.0,
        );
        assert!(matches!(result, Err(RevealError::SurfaceUnavailable)));
    }

    #[test]
    fn test_construction_sizes_surface_and_draws_veil() {
        let (e, sched) = engine(config());
        assert_eq!(e.surface().size(), (200, 150));
        assert!(surface::is_flat_veil(e.surface().image(), e.config().veil_rgba()));
        assert!(!e.is_running());
        assert!(!sched.is_pending());
    }

    #[test]
    fn test_auto_start() {
        let (e, sched) = engine(RevealConfig {
            auto_start: true,
            ..config()
        });
        assert!(e.is_running());
        assert!(sched.is_pending());
    }

    #[test]
    fn test_tick_requests_next_frame_only_while_running() {
        let (mut e, sched) = engine(config());
        assert_eq!(e.tick(0.0), FrameOutcome::Idle);
        e.start();
        assert!(sched.take());
        assert_eq!(e.tick(16.0), FrameOutcome::Drawn);
        assert!(sched.take());
        e.stop();
        assert_eq!(e.tick(32.0), FrameOutcome::Idle);
        assert!(!sched.is_pending());
    }

    #[test]
    fn test_click_spawns_splash() {
        let (mut e, _) = engine(config());
        e.start();
        e.pointer_down(50.0, 50.0, 1.0);
        e.pointer_up(52.0, 51.0, 2.0);
        e.tick(16.0);
        let splashes = e.splashes();
        assert_eq!(splashes.len(), 1);
        assert_eq!(splashes[0].position, Vec2::new(52.0, 51.0));
        assert_eq!(e.stats().spawned, 1);
    }

    #[test]
    fn test_drag_paints_stroke() {
        let (mut e, _) = engine(config());
        e.start();
        e.pointer_down(10.0, 10.0, 0.0);
        e.pointer_move(40.0, 10.0, 5.0);
        e.tick(16.0);
        let strokes = e.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].position, Vec2::new(10.0, 10.0), "starts at the press");
        assert_eq!(strokes[0].path, vec![Vec2::new(10.0, 10.0), Vec2::new(40.0, 10.0)]);

        e.pointer_move(80.0, 10.0, 20.0);
        e.tick(40.0);
        assert_eq!(e.strokes()[0].path.len(), 3);

        e.pointer_up(80.0, 10.0, 50.0);
        e.tick(60.0);
        assert!(e.splashes().is_empty(), "a drag is not a click");
        assert!(e.active_stroke.is_none());
    }

    #[test]
    fn test_hold_activation() {
        let (mut e, _) = engine(RevealConfig {
            activation: ActivationMode::Hold,
            hold_time_ms: 300.0,
            ..config()
        });
        e.start();
        e.pointer_move(100.0, 75.0, 0.0);
        e.tick(100.0);
        assert!(e.splashes().is_empty());
        e.tick(300.0);
        assert_eq!(e.splashes().len(), 1);
        // Re-arm delay plus hold time must pass again
        e.tick(500.0);
        assert_eq!(e.splashes().len(), 1);
        e.tick(700.0);
        assert_eq!(e.splashes().len(), 2);
    }

    #[test]
    fn test_hook_errors_and_panics_do_not_stop_loop() {
        let (mut e, sched) = engine(config());
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        e.set_frame_hook(Box::new(move |_| {
            seen.set(seen.get() + 1);
            match seen.get() {
                1 => Err("host failure".into()),
                2 => panic!("host bug"),
                _ => Ok(()),
            }
        }));
        e.start();
        for i in 0..3 {
            assert_eq!(e.tick(i as f64 * 16.0), FrameOutcome::Drawn);
            assert!(sched.take());
        }
        assert_eq!(calls.get(), 3);

        e.clear_frame_hook();
        assert_eq!(e.tick(48.0), FrameOutcome::Drawn);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_restart_does_not_burst_ghosts() {
        let mut cfg = config();
        cfg.autonomous_enabled = true;
        cfg.ghost.rate_per_sec = 1_000.0;
        cfg.idle_stroke.enabled = false;
        let (mut e, _) = engine(cfg);
        e.start();
        e.tick(0.0);
        assert_eq!(e.stats().spawned, 0);

        // A long pause while stopped must not feed the next trial
        e.stop();
        e.start();
        e.tick(100_000.0);
        assert_eq!(e.stats().spawned, 0);
        assert!(e.entities().is_empty());

        e.tick(100_016.0);
        assert_eq!(e.stats().spawned, 1);
    }

    #[test]
    fn test_remove_last_and_snapshots() {
        let (mut e, _) = engine(config());
        let a = e.spawn_at(10.0, 10.0, 0.0).unwrap();
        let b = e.spawn_at(20.0, 20.0, 1.0).unwrap();
        assert_eq!(e.entities().len(), 2);
        assert_eq!(e.remove_last(), Some(b));
        assert_eq!(e.remove_last(), Some(a));
        assert_eq!(e.remove_last(), None);
    }

    #[test]
    fn test_destroy_is_terminal() {
        let (mut e, sched) = engine(RevealConfig {
            use_offscreen_cache: true,
            ..config()
        });
        e.start();
        e.spawn_at(50.0, 50.0, 0.0);
        assert!(e.mask_cache().len() > 0);
        e.destroy();
        e.destroy();
        assert!(e.is_destroyed());
        assert!(!sched.is_pending());
        assert!(e.entities().is_empty());
        assert!(e.mask_cache().is_empty());
        assert_eq!(e.tick(100.0), FrameOutcome::Destroyed);
        e.start();
        assert!(!e.is_running());
        assert!(e.spawn_at(1.0, 1.0, 0.0).is_none());

        e.pointer_down(5.0, 5.0, 1.0);
        assert_eq!(e.pointer.press_seq, 0, "listeners detached");
    }

    #[test]
    fn test_set_options_json() {
        let (mut e, _) = engine(config());
        e.set_options_json(r##"{"veil_color": "#000000"}"##).unwrap();
        assert!(surface::is_flat_veil(e.surface().image(), [0, 0, 0, 255]));
        assert!(e.set_options_json("{not json").is_err());
        assert!(e.set_options_json(r#"{"bogus": true}"#).is_err());
    }

    #[test]
    fn test_set_autonomous_enabled() {
        let (mut e, _) = engine(config());
        assert!(!e.config().autonomous_enabled);
        e.set_autonomous_enabled(true);
        assert!(e.config().autonomous_enabled);
    }
}
