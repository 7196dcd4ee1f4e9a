//! Sound cues and per-racer voices
//!
//! The simulation never touches an audio device. It emits cues through
//! `RaceEvent::Sound` and tracks just enough playback state to honour
//! "don't restart a bounce while the last one is still playing".

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Three-two-one before release
    Countdown,
    /// Racer hits a wall or another racer
    Bounce,
    /// Two racers touch inside a kiss zone
    Kiss,
    /// Winner announcement
    Winner,
    /// Background music, started after release
    Music,
}

impl SoundEffect {
    /// File name of the user override for this cue in the asset folder
    pub fn override_file_name(&self) -> &'static str {
        match self {
            SoundEffect::Countdown => "Countdown.mp3",
            SoundEffect::Bounce => "Bounce.mp3",
            SoundEffect::Kiss => "Kiss.mp3",
            SoundEffect::Winner => "Winner.mp3",
            SoundEffect::Music => "Music.mp3",
        }
    }
}

/// Which clip should be played for a cue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clip {
    /// Built-in clip for the cue
    Default,
    /// User-supplied file
    Override(PathBuf),
}

impl Clip {
    pub fn from_override(path: Option<PathBuf>) -> Self {
        path.map_or(Clip::Default, Clip::Override)
    }
}

/// A single playback channel with a known clip length.
///
/// Playback is tracked in simulated seconds so it stays consistent with
/// the time scale.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Voice {
    busy_until: f32,
}

impl Voice {
    pub fn is_playing(&self, now: f32) -> bool {
        now < self.busy_until
    }

    /// Start a clip of `duration` seconds. Returns false if the voice was busy.
    pub fn try_play(&mut self, now: f32, duration: f32) -> bool {
        if self.is_playing(now) {
            return false;
        }
        self.busy_until = now + duration.max(0.0);
        true
    }

    pub fn stop(&mut self) {
        self.busy_until = 0.0;
    }
}
