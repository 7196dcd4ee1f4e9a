//! Derby - a bouncing-racer arena race
//!
//! Core modules:
//! - `sim`: Racer motion, collision sweeps, arena geometry
//! - `race`: Race orchestrator and cancellable timed continuations
//! - `prediction`: Sync with an external prediction/wager service
//! - `settings`: Data-driven tuning loaded from JSON
//! - `assets`, `persistence`, `input`: collaborator boundaries

pub mod assets;
pub mod audio;
pub mod error;
pub mod input;
pub mod persistence;
pub mod prediction;
pub mod race;
pub mod settings;
pub mod sim;

pub use race::{RaceCommand, RaceOrchestrator};
pub use settings::RaceSettings;

use glam::Vec2;
use rand::Rng;

/// Race configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Racer defaults
    pub const RACER_RADIUS: f32 = 0.35;
    pub const RACER_BASE_SPEED: f32 = 2.0;

    /// Minimum simulated seconds between two accepted bounces of one racer
    pub const BOUNCE_DEBOUNCE: f32 = 0.1;
    /// Chance that a bounce adds random drift
    pub const PERTURB_CHANCE: f32 = 0.3;
    /// Maximum hits reported by a single sweep
    pub const MAX_SWEEP_HITS: usize = 3;

    /// Cross-racer cooldown between kiss effects
    pub const KISS_COOLDOWN: f32 = 0.5;
    pub const KISS_PARTICLES: u32 = 5;

    /// Bounce sound pitch range
    pub const BOUNCE_PITCH_MIN: f32 = 0.8;
    pub const BOUNCE_PITCH_MAX: f32 = 1.2;

    /// Lifecycle timings (simulated seconds)
    pub const COUNTDOWN_DELAY: f32 = 3.0;
    pub const MUSIC_DELAY: f32 = 1.0;
    pub const VICTORY_HOLD: f32 = 4.0;

    /// Prediction service polling interval (real seconds)
    pub const PREDICTION_POLL_INTERVAL: f32 = 1.0;
    /// Wager polls before a prediction that never appears is abandoned
    pub const PREDICTION_MAX_WAGER_POLLS: u32 = 30;
}

/// Uniformly distributed unit vector
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    let theta = rng.random_range(0.0..std::f32::consts::TAU);
    Vec2::from_angle(theta)
}

/// Uniformly distributed point inside the unit circle
pub fn random_in_unit_circle<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    loop {
        let p = Vec2::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0));
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}
