//! Race state and core simulation types

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Shape;
use super::drag::Draggable;
use crate::audio::{Clip, SoundEffect, Voice};
use crate::consts::RACER_RADIUS;

/// Stable racer identity (roster order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RacerId(pub u32);

/// Which way the racer sprite faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    pub fn from_velocity(vel: Vec2) -> Self {
        if vel.x > 0.0 { Facing::Right } else { Facing::Left }
    }
}

/// Everything needed to put a racer on the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RacerProfile {
    pub name: String,
    pub bounce_clip: Clip,
    /// Per-racer victory sound; falls back to the arena default
    pub winner_clip: Option<Clip>,
}

impl RacerProfile {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounce_clip: Clip::Default,
            winner_clip: None,
        }
    }
}

/// A racer entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Racer {
    pub id: RacerId,
    pub name: String,
    pub pos: Vec2,
    /// Zero means idle
    pub vel: Vec2,
    pub radius: f32,
    /// Simulated time of the last accepted bounce (or release)
    pub last_bounce: f32,
    pub facing: Facing,
    /// Bounce sound channel
    #[serde(skip)]
    pub voice: Voice,
    pub bounce_clip: Clip,
    pub winner_clip: Option<Clip>,
    /// Optional drag capability (racers can be nudged by hand before the start)
    #[serde(skip)]
    pub drag: Option<Draggable>,
}

impl Racer {
    pub fn new(id: RacerId, profile: RacerProfile, pos: Vec2) -> Self {
        let drag = Some(Draggable::new(profile.name.clone()));
        Self {
            id,
            name: profile.name,
            pos,
            vel: Vec2::ZERO,
            radius: RACER_RADIUS,
            last_bounce: 0.0,
            facing: Facing::Right,
            voice: Voice::default(),
            bounce_clip: profile.bounce_clip,
            winner_clip: profile.winner_clip,
            drag,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.vel == Vec2::ZERO
    }

    /// Give the racer its starting velocity
    pub fn release(&mut self, vel: Vec2, now: f32) {
        self.vel = vel;
        self.facing = Facing::from_velocity(vel);
        self.last_bounce = now;
    }

    /// Stop dead (finish, abort, restart)
    pub fn halt(&mut self) {
        self.vel = Vec2::ZERO;
    }

    /// Body collider shape at the current position
    pub fn body(&self) -> Shape {
        Shape::Circle {
            center: self.pos,
            radius: self.radius,
        }
    }
}

/// Semantic kind of a zone in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    /// First racer to touch it wins
    Goal,
    /// Racers bumping each other in here trigger a kiss
    KissZone,
    /// Plain obstacle
    SolidWall,
}

impl ZoneKind {
    pub fn is_blocking(&self) -> bool {
        matches!(self, ZoneKind::SolidWall)
    }
}

/// Zone geometry plus its kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerZone {
    pub kind: ZoneKind,
    pub shape: Shape,
}

impl TriggerZone {
    pub fn new(kind: ZoneKind, shape: Shape) -> Self {
        Self { kind, shape }
    }
}

/// Race lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RacePhase {
    #[default]
    Idle,
    Countdown,
    Racing,
    Finished,
    Aborted,
}

impl RacePhase {
    /// Forward-only transitions; `Idle` is reachable from anywhere via restart
    pub fn can_transition_to(self, next: RacePhase) -> bool {
        use RacePhase::*;
        matches!(
            (self, next),
            (Idle, Countdown)
                | (Countdown, Racing)
                | (Countdown, Aborted)
                | (Racing, Finished)
                | (Racing, Aborted)
                | (_, Idle)
        )
    }

    /// Phases with live racers or pending release
    pub fn is_running(self) -> bool {
        matches!(self, RacePhase::Countdown | RacePhase::Racing)
    }
}

/// Global race state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceState {
    pub phase: RacePhase,
    /// Simulated seconds since release
    pub elapsed: f32,
    /// Multiplier on simulated time, never below 1
    pub time_scale: f32,
}

impl Default for RaceState {
    fn default() -> Self {
        Self {
            phase: RacePhase::Idle,
            elapsed: 0.0,
            time_scale: 1.0,
        }
    }
}

impl RaceState {
    /// Clock value shown to viewers
    pub fn display_seconds(&self) -> u32 {
        self.elapsed as u32
    }
}

/// Cross-racer cooldown for the kiss effect
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct KissGate {
    available_at: f32,
}

impl KissGate {
    /// Claim the gate if its cooldown has elapsed
    pub fn try_claim(&mut self, now: f32, cooldown: f32) -> bool {
        if now > self.available_at {
            self.available_at = now + cooldown;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.available_at = 0.0;
    }
}

/// Canned UI animations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiCue {
    GameStart,
    GameOver,
    Abort,
    Restart,
}

/// Everything the host needs to present the race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    Sound {
        effect: SoundEffect,
        clip: Clip,
        pitch: f32,
        source: Option<RacerId>,
    },
    StopMusic,
    Ui(UiCue),
    PhaseChanged {
        from: RacePhase,
        to: RacePhase,
    },
    /// Racers got their starting velocity
    Released,
    /// Displayed race clock changed
    Clock {
        seconds: u32,
    },
    TimeScaleChanged(f32),
    Bounce {
        racer: RacerId,
        normal: Vec2,
    },
    Kiss {
        racer: RacerId,
        at: Vec2,
        particles: u32,
    },
    Win {
        racer: RacerId,
    },
    /// Swap the victory banner to the winner's sprite
    VictorySprite {
        racer: RacerId,
    },
    /// Victory sequence is over
    ResultsReady {
        racer: RacerId,
    },
}
