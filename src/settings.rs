//! Race settings
//!
//! Loaded from an optional JSON file; any field left out keeps its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SettingsError;
use crate::sim::curve::SpeedRecovery;

/// Racer motion tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// Speed given to every racer at release
    pub base_speed: f32,
    pub racer_radius: f32,
    /// Minimum seconds between accepted bounces of one racer
    pub bounce_debounce: f32,
    /// Chance (0-1) that a bounce adds random drift
    pub perturb_chance: f32,
    /// Maximum contacts considered per sweep
    pub max_hits: usize,
    pub kiss_cooldown: f32,
    pub kiss_particles: u32,
    /// Chance (0-1) that a kiss also plays a sound
    pub kiss_sound_chance: f32,
    /// Length of the bounce clip, used for the "already playing" check
    pub bounce_clip_secs: f32,
    pub speed_recovery: SpeedRecovery,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            base_speed: RACER_BASE_SPEED,
            racer_radius: RACER_RADIUS,
            bounce_debounce: BOUNCE_DEBOUNCE,
            perturb_chance: PERTURB_CHANCE,
            max_hits: MAX_SWEEP_HITS,
            kiss_cooldown: KISS_COOLDOWN,
            kiss_particles: KISS_PARTICLES,
            kiss_sound_chance: 1.0,
            bounce_clip_secs: 0.25,
            speed_recovery: SpeedRecovery::Instant,
        }
    }
}

/// Lifecycle delays in simulated seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Countdown cue to release
    pub countdown_delay: f32,
    /// Release to music start
    pub music_delay: f32,
    /// Win to results-ready
    pub victory_hold: f32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            countdown_delay: COUNTDOWN_DELAY,
            music_delay: MUSIC_DELAY,
            victory_hold: VICTORY_HOLD,
        }
    }
}

/// Prediction service tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionSettings {
    pub enabled: bool,
    pub title: String,
    /// How long viewers can vote
    pub window_secs: u32,
    /// Real seconds between service polls
    pub poll_interval: f32,
    /// Wager polls before creation is given up
    pub max_wager_polls: u32,
    /// OAuth scope requested when logging in
    pub auth_scope: String,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "Who will win?".to_string(),
            window_secs: 120,
            poll_interval: PREDICTION_POLL_INTERVAL,
            max_wager_polls: PREDICTION_MAX_WAGER_POLLS,
            auth_scope: "channel:manage:predictions".to_string(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    pub motion: MotionSettings,
    pub timing: TimingSettings,
    pub prediction: PredictionSettings,
    /// Random spread around the spawn point on restart
    pub spawn_radius: f32,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            motion: MotionSettings::default(),
            timing: TimingSettings::default(),
            prediction: PredictionSettings::default(),
            spawn_radius: 1.0,
        }
    }
}

impl RaceSettings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default settings ({})", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::curve::Easing;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{ "motion": { "base_speed": 3.5 }, "timing": { "countdown_delay": 4.0 } }"#;
        let settings: RaceSettings = serde_json::from_str(json).expect("parse");
        assert_eq!(settings.motion.base_speed, 3.5);
        assert_eq!(settings.motion.bounce_debounce, BOUNCE_DEBOUNCE);
        assert_eq!(settings.timing.countdown_delay, 4.0);
        assert_eq!(settings.timing.music_delay, MUSIC_DELAY);
        assert!(settings.prediction.enabled);
    }

    #[test]
    fn test_speed_recovery_from_json() {
        let json = r#"{ "motion": { "speed_recovery": { "mode": "eased", "floor": 0.5, "duration": 0.4, "easing": "QuadOut" } } }"#;
        let settings: RaceSettings = serde_json::from_str(json).expect("parse");
        assert_eq!(
            settings.motion.speed_recovery,
            SpeedRecovery::Eased {
                floor: 0.5,
                duration: 0.4,
                easing: Easing::QuadOut
            }
        );
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = RaceSettings::load_or_default(&dir.path().join("nope.json"));
        assert_eq!(settings.motion.max_hits, MAX_SWEEP_HITS);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut settings = RaceSettings::default();
        settings.motion.kiss_sound_chance = 0.25;
        settings.save(&path).expect("save");

        let loaded = RaceSettings::load(&path).expect("load");
        assert_eq!(loaded.motion.kiss_sound_chance, 0.25);
    }
}
