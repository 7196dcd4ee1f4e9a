//! Race lifecycle
//!
//! The orchestrator owns the racers, the arena and the prediction bridge and
//! sequences them through countdown, release, racing and resolution using
//! session-scoped continuations.

pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{DragCommand, RaceCommand, RaceOrchestrator};
pub use scheduler::{Scheduler, SessionToken};
