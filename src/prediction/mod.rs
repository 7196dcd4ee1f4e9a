//! Prediction (viewer wager) integration
//!
//! - `service`: the external service seam
//! - `bridge`: drives one wager per race through create, resolve and cancel
//! - `fake`: scripted in-process service

pub mod bridge;
pub mod fake;
pub mod service;

pub use bridge::{Prediction, PredictionBridge, PredictionStatus};
pub use fake::FakeService;
pub use service::{AuthInfo, AuthState, PredictionDefinition, PredictionHandle, PredictionService, Ticket};
