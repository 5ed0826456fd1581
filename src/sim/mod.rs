//! Simulation module
//!
//! Entity state and everything that moves it forward:
//! - Wall-clock timing only (milliseconds passed in by the caller)
//! - Seeded RNG only
//! - No drawing-surface or platform dependencies

pub mod ease;
pub mod entity;
pub mod input;
pub mod lifecycle;
pub mod shape;
pub mod spawner;

pub use ease::Ease;
pub use entity::{Category, Entity, EntityId, EntityKind, EntityKindTag, EntitySnapshot, Phase, StrokePath};
pub use input::{PointerCursor, PointerState, Viewport};
pub use lifecycle::{LifecycleParams, PhaseChange};
pub use shape::OrganicShape;
pub use spawner::Spawner;
