//! Post-bounce speed recovery curves
//!
//! Right after a bounce a racer may crawl for a moment and then ease back to
//! full speed. The curve maps seconds-since-bounce to a speed multiplier.

use serde::{Deserialize, Serialize};

/// Easing function type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Easing {
    /// Constant rate
    #[default]
    Linear,
    /// Slow start
    QuadIn,
    /// Slow end
    QuadOut,
    /// Slow start and end
    SineInOut,
    /// Stronger slow end
    CubicOut,
}

impl Easing {
    /// Apply to normalized `t` in [0, 1]. Every variant is monotonic.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::SineInOut => -((std::f32::consts::PI * t).cos() - 1.0) / 2.0,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// How speed comes back after a bounce
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpeedRecovery {
    /// Always full speed
    #[default]
    Instant,
    /// Start at `floor` and ease up to 1.0 over `duration` seconds
    Eased {
        floor: f32,
        duration: f32,
        easing: Easing,
    },
}

impl SpeedRecovery {
    /// Speed multiplier `since_bounce` seconds after the last bounce
    pub fn multiplier(&self, since_bounce: f32) -> f32 {
        match *self {
            SpeedRecovery::Instant => 1.0,
            SpeedRecovery::Eased {
                floor,
                duration,
                easing,
            } => {
                if duration <= 0.0 {
                    return 1.0;
                }
                let t = since_bounce / duration;
                floor + (1.0 - floor) * easing.apply(t)
            }
        }
    }
}
