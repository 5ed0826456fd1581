//! Lifecycle updater
//!
//! Advances each entity's phase from wall-clock milliseconds, never from
//! frame counts, and derives the size and alpha drawn this frame.

use super::ease::{Ease, progress};
use super::entity::{Entity, EntityKind, Phase, StrokeSource};
use crate::lerp;

/// Per-frame parameters the updater needs from the config
#[derive(Debug, Clone, Copy)]
pub struct LifecycleParams {
    pub grow_ease: Ease,
    pub shrink_ease: Ease,
    /// Lock splashes open once they reach full size
    pub permanent_on_max: bool,
    /// Idle strokes emit one planned point per interval
    pub sample_interval_ms: f64,
}

/// A phase transition made during [`update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
}

/// Advance one entity to `now_ms`; `dt_ms` is the time since the previous frame
///
/// Returns the transition when the entity left its starting phase.
pub fn update(entity: &mut Entity, now_ms: f64, dt_ms: f64, params: &LifecycleParams) -> Option<PhaseChange> {
    if entity.finished {
        return None;
    }
    let dt_ms = dt_ms.max(0.0);
    let start_phase = entity.phase;

    if entity.phase != Phase::Shrinking {
        drift(entity, dt_ms);
        emit_idle_points(entity, now_ms, params.sample_interval_ms);
    }

    // A single frame may cross several phase boundaries after a long stall
    for _ in 0..3 {
        if !step_phase(entity, now_ms, params) {
            break;
        }
    }

    entity.current_size = entity.current_size.clamp(0.0, entity.target_size.max(0.0));

    (entity.phase != start_phase).then_some(PhaseChange {
        from: start_phase,
        to: entity.phase,
    })
}

/// Evaluate the current phase; returns true if it transitioned
fn step_phase(entity: &mut Entity, now_ms: f64, params: &LifecycleParams) -> bool {
    let elapsed = now_ms - entity.phase_start_ms;
    let t = progress(elapsed, entity.phase_duration_ms);

    match entity.phase {
        Phase::Growing => {
            let eased = params.grow_ease.apply(t);
            entity.current_size = lerp(entity.seed_size, entity.target_size, eased);
            entity.alpha = if entity.is_stroke() {
                entity.base_alpha * eased
            } else {
                entity.base_alpha
            };

            if t >= 1.0 {
                entity.current_size = entity.target_size;
                entity.alpha = entity.base_alpha;
                if entity.is_stroke() {
                    return entity.enter_phase(Phase::Painting, now_ms, 0.0);
                }
                if params.permanent_on_max && entity.is_splash() {
                    entity.permanent = true;
                }
                return entity.enter_phase(Phase::Steady, now_ms, entity.timing.hold_ms);
            }
            false
        }
        Phase::Steady => {
            entity.current_size = entity.target_size;
            entity.alpha = entity.base_alpha;
            if !entity.permanent && t >= 1.0 {
                return entity.enter_phase(Phase::Shrinking, now_ms, entity.timing.shrink_ms);
            }
            false
        }
        Phase::Painting => {
            entity.current_size = entity.target_size;
            entity.alpha = entity.base_alpha;
            // Seed growth is already complete here; emission is the remaining condition
            let emitting = entity.stroke().map(|p| p.emitting).unwrap_or(false);
            if !emitting {
                return entity.enter_phase(Phase::Shrinking, now_ms, entity.timing.shrink_ms);
            }
            false
        }
        Phase::Shrinking => {
            let eased = params.shrink_ease.apply(t);
            entity.current_size = entity.phase_start_size * (1.0 - eased);
            entity.alpha = entity.base_alpha * (1.0 - eased);
            if t >= 1.0 {
                entity.current_size = 0.0;
                entity.alpha = 0.0;
                entity.finished = true;
            }
            false
        }
    }
}

/// Autonomous ghosts drift at a fixed velocity
fn drift(entity: &mut Entity, dt_ms: f64) {
    if let EntityKind::Ghost { velocity } = entity.kind {
        entity.position += velocity * (dt_ms / 1000.0) as f32;
    }
}

/// Trace the next planned points of an idle stroke
fn emit_idle_points(entity: &mut Entity, now_ms: f64, interval_ms: f64) {
    let Some(path) = entity.stroke_mut() else {
        return;
    };
    if !path.emitting {
        return;
    }
    let StrokeSource::Idle { planned, next } = &mut path.source else {
        return;
    };

    // Catch up on every interval that elapsed since the last emission
    while *next < planned.len() && path.points.len() < path.max_points {
        let due = path.last_emit_ms + interval_ms;
        if now_ms < due {
            break;
        }
        path.points.push(planned[*next]);
        path.last_emit_ms = if interval_ms > 0.0 { due } else { now_ms };
        *next += 1;
    }

    if *next >= planned.len() || path.points.len() >= path.max_points {
        path.emitting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{EntityId, StrokePath, Timing};
    use glam::Vec2;

    fn params() -> LifecycleParams {
        LifecycleParams {
            grow_ease: Ease::OutCubic,
            shrink_ease: Ease::InOutQuad,
            permanent_on_max: false,
            sample_interval_ms: 10.0,
        }
    }

    fn splash(grow: f64, hold: f64, shrink: f64) -> Entity {
        Entity::new(
            EntityId(1),
            EntityKind::Splash,
            Vec2::new(100.0, 100.0),
            200.0,
            0.0,
            Timing {
                grow_ms: grow,
                hold_ms: hold,
                shrink_ms: shrink,
            },
            0.0,
            0.0,
            1,
            1.0,
        )
    }

    #[test]
    fn test_growth_follows_easing_curve() {
        let mut e = splash(1000.0, 500.0, 500.0);
        update(&mut e, 0.0, 0.0, &params());
        assert!(e.current_size.abs() < 1e-3);

        update(&mut e, 500.0, 500.0, &params());
        let expected = 200.0 * Ease::OutCubic.apply(0.5);
        assert!((e.current_size - expected).abs() < 1e-3);
        assert!(e.current_size > 100.0, "ease-out leads the linear midpoint");

        let change = update(&mut e, 1000.0, 500.0, &params());
        assert!((e.current_size - 200.0).abs() < 1e-3);
        assert_eq!(e.phase, Phase::Steady);
        assert_eq!(
            change,
            Some(PhaseChange {
                from: Phase::Growing,
                to: Phase::Steady
            })
        );
        assert_eq!(update(&mut e, 1010.0, 10.0, &params()), None);
    }

    #[test]
    fn test_full_lifecycle_to_finished() {
        let mut e = splash(100.0, 100.0, 100.0);
        update(&mut e, 100.0, 100.0, &params());
        assert_eq!(e.phase, Phase::Steady);
        update(&mut e, 200.0, 100.0, &params());
        assert_eq!(e.phase, Phase::Shrinking);
        update(&mut e, 250.0, 50.0, &params());
        assert!(e.current_size > 0.0 && e.current_size < 200.0);
        assert!(e.alpha < 1.0);
        update(&mut e, 300.0, 50.0, &params());
        assert!(e.finished);
        assert_eq!(e.current_size, 0.0);
    }

    #[test]
    fn test_zero_durations_complete_instantly() {
        let mut e = splash(0.0, 0.0, 0.0);
        update(&mut e, 0.0, 0.0, &params());
        // Growing -> Steady -> Shrinking -> finished within one frame
        assert_eq!(e.phase, Phase::Shrinking);
        assert!(e.finished);
    }

    #[test]
    fn test_negative_elapsed_is_clamped() {
        let mut e = splash(1000.0, 100.0, 100.0);
        update(&mut e, -500.0, -500.0, &params());
        assert_eq!(e.phase, Phase::Growing);
        assert_eq!(e.current_size, 0.0);
    }

    #[test]
    fn test_permanent_on_max_holds_forever() {
        let mut p = params();
        p.permanent_on_max = true;
        let mut e = splash(10.0, 10.0, 10.0);
        update(&mut e, 10.0, 10.0, &p);
        assert!(e.permanent);
        update(&mut e, 1_000_000.0, 999_990.0, &p);
        assert_eq!(e.phase, Phase::Steady);
    }

    #[test]
    fn test_ghost_drifts_until_shrinking() {
        let mut e = Entity::new(
            EntityId(2),
            EntityKind::Ghost {
                velocity: Vec2::new(10.0, -4.0),
            },
            Vec2::ZERO,
            50.0,
            0.0,
            Timing {
                grow_ms: 1000.0,
                hold_ms: 1000.0,
                shrink_ms: 1000.0,
            },
            0.0,
            0.0,
            2,
            0.36,
        );
        update(&mut e, 500.0, 500.0, &params());
        assert!((e.position - Vec2::new(5.0, -2.0)).length() < 1e-4);
        assert!((e.alpha - 0.36).abs() < 1e-6);

        e.force_shrink(600.0);
        let before = e.position;
        update(&mut e, 700.0, 100.0, &params());
        assert_eq!(e.position, before);
    }

    #[test]
    fn test_idle_stroke_paints_then_shrinks() {
        let planned: Vec<Vec2> = (0..5).map(|i| Vec2::new(i as f32 * 10.0, 0.0)).collect();
        let mut e = Entity::new(
            EntityId(3),
            EntityKind::Stroke(StrokePath::idle(planned, 0.0, 100)),
            Vec2::ZERO,
            20.0,
            2.0,
            Timing {
                grow_ms: 100.0,
                hold_ms: 0.0,
                shrink_ms: 100.0,
            },
            0.0,
            0.0,
            3,
            1.0,
        );

        // Growing fades in
        update(&mut e, 20.0, 20.0, &params());
        assert_eq!(e.phase, Phase::Growing);
        assert!(e.alpha > 0.0 && e.alpha < 1.0);
        assert!(e.current_size >= 2.0);
        assert_eq!(e.stroke().unwrap().points.len(), 3);

        // Emission completes during growth, but shrink waits for growth too
        update(&mut e, 60.0, 40.0, &params());
        assert!(!e.stroke().unwrap().emitting);
        assert_eq!(e.phase, Phase::Growing);

        update(&mut e, 100.0, 40.0, &params());
        assert_eq!(e.phase, Phase::Shrinking);
        update(&mut e, 200.0, 100.0, &params());
        assert!(e.finished);
    }

    #[test]
    fn test_pointer_stroke_paints_while_emitting() {
        let mut e = Entity::new(
            EntityId(4),
            EntityKind::Stroke(StrokePath::pointer(Vec2::ZERO, 0.0, 100)),
            Vec2::ZERO,
            20.0,
            2.0,
            Timing {
                grow_ms: 50.0,
                hold_ms: 0.0,
                shrink_ms: 50.0,
            },
            0.0,
            0.0,
            4,
            1.0,
        );
        update(&mut e, 60.0, 60.0, &params());
        assert_eq!(e.phase, Phase::Painting);
        update(&mut e, 5_000.0, 4_940.0, &params());
        assert_eq!(e.phase, Phase::Painting);

        e.stroke_mut().unwrap().finish();
        update(&mut e, 5_010.0, 10.0, &params());
        assert_eq!(e.phase, Phase::Shrinking);
    }
}
