//! Deterministic simulation module
//!
//! Racer motion and arena geometry. This module stays deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (roster order)
//! - No rendering or platform dependencies

pub mod arena;
pub mod collision;
pub mod curve;
pub mod drag;
pub mod motion;
pub mod state;

pub use arena::{Arena, ArenaLayout, Marker, closed_outline};
pub use collision::{Collider, ColliderOwner, ColliderSet, ContactHit, Shape, reflect_velocity};
pub use curve::{Easing, SpeedRecovery};
pub use drag::{Draggable, Dragging};
pub use motion::{MotionContext, MotionOutcome, advance_racer};
pub use state::{
    Facing, KissGate, RaceEvent, RacePhase, RaceState, Racer, RacerId, RacerProfile, TriggerZone,
    UiCue, ZoneKind,
};
