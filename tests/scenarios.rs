//! End-to-end behavior of the reveal engine against a synthetic clock

use ink_veil::platform::ManualScheduler;
use ink_veil::renderer::surface::{self, PixelSurface, RenderSurface};
use ink_veil::sim::{Category, Ease, Phase};
use ink_veil::{ConfigPatch, FrameOutcome, RevealConfig, RevealEngine, Viewport};

type Engine = RevealEngine<PixelSurface, ManualScheduler>;

fn quiet_config() -> RevealConfig {
    RevealConfig {
        seed: Some(11),
        autonomous_enabled: false,
        use_offscreen_cache: false,
        min_radius: 30.0,
        max_radius: 40.0,
        ..Default::default()
    }
}

fn engine(config: RevealConfig, width: f32, height: f32) -> Engine {
    let mut engine = RevealEngine::new(
        config,
        PixelSurface::new(1, 1),
        ManualScheduler::new(),
        Viewport::new(width, height, 1.0),
        0.0,
    )
    .unwrap();
    engine.start();
    engine
}

fn slots(engine: &Engine, category: Category) -> usize {
    engine
        .entities()
        .iter()
        .filter(|e| e.category == category && e.phase != Phase::Shrinking)
        .count()
}

#[test]
fn test_fourth_spawn_evicts_oldest() {
    let mut e = engine(quiet_config(), 200.0, 150.0);
    let first = e.spawn_at(20.0, 20.0, 0.0).unwrap();
    e.spawn_at(60.0, 20.0, 1.0).unwrap();
    e.spawn_at(100.0, 20.0, 2.0).unwrap();
    e.tick(500.0);
    assert_eq!(e.entities().len(), 3);

    // At the cap the fourth spawn still succeeds
    assert!(e.spawn_at(140.0, 20.0, 500.0).is_some());
    e.tick(516.0);
    let evicted = e.entities().into_iter().find(|s| s.id == first).unwrap();
    assert_eq!(evicted.phase, Phase::Shrinking);
    assert_eq!(slots(&e, Category::Interactive), 3);
    assert_eq!(e.stats().interactive, 3);

    // Gone once it has shrunk away
    e.tick(2_200.0);
    assert!(e.entities().iter().all(|s| s.id != first));
    assert_eq!(e.entities().len(), 3);
}

#[test]
fn test_ghost_rate_matches_expectation() {
    let trials = 100;
    let mut total = 0usize;
    for seed in 0..trials {
        let mut cfg = quiet_config();
        cfg.seed = Some(seed);
        cfg.autonomous_enabled = true;
        cfg.ghost.rate_per_sec = 0.6;
        cfg.caps.autonomous = 1_000;
        let mut e = engine(cfg, 48.0, 48.0);

        let mut now = 0.0;
        while now <= 10_000.0 {
            e.tick(now);
            total += e.stats().spawned;
            now += 16.0;
        }
    }
    let mean = total as f64 / trials as f64;
    assert!((mean - 6.0).abs() < 1.0, "mean ghost spawns {mean}");
}

#[test]
fn test_growth_follows_configured_easing() {
    let mut cfg = quiet_config();
    cfg.grow_duration_ms = 1_000.0;
    cfg.grow_ease = Ease::OutCubic;
    let mut e = engine(cfg, 200.0, 150.0);
    e.spawn_at(100.0, 75.0, 0.0).unwrap();

    e.tick(0.0);
    let s = &e.entities()[0];
    assert!(s.current_size.abs() < 1e-3);

    e.tick(500.0);
    let s = &e.entities()[0];
    let expected = s.target_size * Ease::OutCubic.apply(0.5);
    assert!((s.current_size - expected).abs() < 1e-2);
    assert!(s.current_size > s.target_size * 0.5);

    e.tick(1_000.0);
    let s = &e.entities()[0];
    assert!((s.current_size - s.target_size).abs() < 1e-3);
    assert_eq!(s.phase, Phase::Steady);
}

#[test]
fn test_resize_keeps_entities() {
    let mut e = engine(quiet_config(), 200.0, 150.0);
    e.spawn_at(50.0, 50.0, 0.0);
    e.spawn_at(150.0, 100.0, 10.0);
    e.tick(300.0);
    let before = e.entities();

    e.resize(320.0, 200.0, 2.0);
    assert_eq!(e.entities(), before);
    assert_eq!(e.surface().size(), (640, 400));
    assert!(surface::is_flat_veil(e.surface().image(), e.config().veil_rgba()));

    e.tick(316.0);
    for (a, b) in before.iter().zip(e.entities()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.position, b.position);
        assert!(b.phase.rank() >= a.phase.rank());
    }
}

#[test]
fn test_ghost_mask_rebuilt_after_cache_size_change() {
    let mut cfg = quiet_config();
    cfg.use_offscreen_cache = true;
    cfg.autonomous_enabled = true;
    cfg.ghost.rate_per_sec = 1_000.0;
    cfg.ghost.lifetime_ms = 1_000.0;
    cfg.caps.autonomous = 1;
    let mut e = engine(cfg, 240.0, 240.0);

    e.tick(0.0);
    e.tick(16.0);
    e.tick(416.0);
    assert_eq!(e.mask_cache().ghost_edge(), Some(256));
    let rasterized = e.stats().masks_rasterized;

    e.set_options(&ConfigPatch::mask_cache_size(512));
    assert_eq!(e.mask_cache().ghost_edge(), None);

    e.tick(432.0);
    assert_eq!(e.mask_cache().ghost_edge(), Some(512));
    assert_eq!(e.stats().masks_rasterized, rasterized + 1);
}

#[test]
fn test_stop_twice_matches_stop_once() {
    let mut e = engine(quiet_config(), 100.0, 100.0);
    e.spawn_at(50.0, 50.0, 0.0);
    e.tick(100.0);
    e.stop();
    let once = (e.is_running(), e.entities(), e.scheduler().is_pending());
    e.stop();
    let twice = (e.is_running(), e.entities(), e.scheduler().is_pending());
    assert_eq!(once, twice);
    assert_eq!(e.tick(200.0), FrameOutcome::Idle);
}

#[test]
fn test_reset_clears_and_redraws_opaque_veil() {
    let mut e = engine(quiet_config(), 100.0, 100.0);
    e.spawn_at(50.0, 50.0, 0.0);
    e.tick(600.0);
    assert!(!surface::is_flat_veil(e.surface().image(), e.config().veil_rgba()));

    e.reset_all();
    assert!(e.entities().is_empty());
    assert!(e.is_running());
    assert!(surface::is_flat_veil(e.surface().image(), e.config().veil_rgba()));
    assert!(e.surface().image().pixels().all(|p| p.0[3] == 255));
}

#[test]
fn test_missing_surface_skips_drawing_then_recovers() {
    let mut e = engine(quiet_config(), 100.0, 100.0);
    e.spawn_at(50.0, 50.0, 0.0);
    e.tick(0.0);
    let presented = e.surface().frames_presented();

    e.surface_mut().detach();
    assert_eq!(e.tick(200.0), FrameOutcome::SurfaceMissing);
    assert_eq!(e.surface().frames_presented(), presented);
    assert!(e.scheduler().is_pending(), "loop keeps going");
    let grown = e.entities()[0].current_size;
    assert!(grown > 0.0, "entities advance while undrawn");

    e.surface_mut().attach();
    assert_eq!(e.tick(216.0), FrameOutcome::Drawn);
    assert_eq!(e.surface().frames_presented(), presented + 1);
}

#[test]
fn test_destroy_halts_everything() {
    let mut cfg = quiet_config();
    cfg.use_offscreen_cache = true;
    let mut e = engine(cfg, 100.0, 100.0);
    e.spawn_at(50.0, 50.0, 0.0);
    e.tick(16.0);

    e.destroy();
    assert!(!e.scheduler().is_pending());
    assert!(e.mask_cache().is_empty());
    assert_eq!(e.surface().size(), (0, 0));
    assert_eq!(e.tick(32.0), FrameOutcome::Destroyed);

    e.pointer_down(10.0, 10.0, 40.0);
    e.pointer_up(10.0, 10.0, 41.0);
    e.start();
    assert_eq!(e.tick(48.0), FrameOutcome::Destroyed);
    assert!(e.entities().is_empty());
}

#[test]
fn test_remove_last_is_undo() {
    let mut e = engine(quiet_config(), 100.0, 100.0);
    e.spawn_at(10.0, 10.0, 0.0);
    let second = e.spawn_at(90.0, 90.0, 5.0).unwrap();
    assert_eq!(e.remove_last(), Some(second));
    assert_eq!(e.splashes().len(), 1);
    assert!(e.strokes().is_empty());
}

#[test]
fn test_snapshots_serialize() {
    let mut e = engine(quiet_config(), 100.0, 100.0);
    e.spawn_at(10.0, 10.0, 0.0);
    e.tick(16.0);
    let json = serde_json::to_string(&e.entities()).unwrap();
    assert!(json.contains("Splash"));
    let stats = serde_json::to_string(e.stats()).unwrap();
    assert!(stats.contains("mask_entries"));
}
