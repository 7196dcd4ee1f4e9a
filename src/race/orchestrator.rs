//! Race orchestrator
//!
//! Drives the race lifecycle: Idle -> Countdown -> Racing -> Finished or
//! Aborted, with restart back to Idle from anywhere. Timed steps (release,
//! music, results) are continuations in the session scheduler, so a phase
//! change that renews the session also cancels them.

use std::collections::HashMap;
use std::path::PathBuf;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::scheduler::{Scheduler, SessionToken};
use crate::audio::{Clip, SoundEffect};
use crate::persistence::PositionStore;
use crate::prediction::{PredictionBridge, PredictionService};
use crate::settings::RaceSettings;
use crate::sim::arena::Arena;
use crate::sim::drag::Dragging;
use crate::sim::motion::{MotionContext, MotionOutcome, advance_racer};
use crate::sim::state::{
    KissGate, RaceEvent, RacePhase, RaceState, Racer, RacerId, RacerProfile, UiCue,
};
use crate::{random_in_unit_circle, random_unit_vector};

/// Discrete operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceCommand {
    StartRace,
    StopRace,
    Restart,
    IncreaseTimeScale,
    DecreaseTimeScale,
}

/// Pointer interaction with draggable objects
#[derive(Debug, Clone, PartialEq)]
pub enum DragCommand {
    Begin { target: String },
    End { target: String },
    PointerMoved(Vec2),
}

/// Timed steps of a race session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    Release,
    StartMusic,
    ResultsReady { winner: RacerId },
}

pub struct RaceOrchestrator<S> {
    settings: RaceSettings,
    arena: Arena,
    racers: Vec<Racer>,
    state: RaceState,
    kiss_gate: KissGate,
    scheduler: Scheduler<Continuation>,
    rng: Pcg32,
    /// Simulated seconds (scaled by the time scale)
    now: f32,
    events: Vec<RaceEvent>,
    winner: Option<RacerId>,
    bridge: PredictionBridge<S>,
    sound_overrides: HashMap<SoundEffect, PathBuf>,
    pointer: Vec2,
}

impl<S: PredictionService> RaceOrchestrator<S> {
    pub fn new(settings: RaceSettings, arena: Arena, service: S, seed: u64) -> Self {
        let bridge = PredictionBridge::new(service, settings.prediction.clone());
        Self {
            settings,
            arena,
            racers: Vec::new(),
            state: RaceState::default(),
            kiss_gate: KissGate::default(),
            scheduler: Scheduler::new(),
            rng: Pcg32::seed_from_u64(seed),
            now: 0.0,
            events: Vec::new(),
            winner: None,
            bridge,
            sound_overrides: HashMap::new(),
            pointer: Vec2::ZERO,
        }
    }

    /// Replace the roster; racers appear scattered around the spawn point
    pub fn load_roster(&mut self, profiles: Vec<RacerProfile>) {
        if self.state.phase.is_running() {
            log::debug!("Roster change ignored while {:?}", self.state.phase);
            return;
        }
        let mut racers = Vec::with_capacity(profiles.len());
        for (i, profile) in profiles.into_iter().enumerate() {
            let pos = self.spawn_position();
            let mut racer = Racer::new(RacerId(i as u32), profile, pos);
            racer.radius = self.settings.motion.racer_radius;
            racers.push(racer);
        }
        log::info!("Loaded {} racers", racers.len());
        self.racers = racers;
    }

    pub fn set_sound_override(&mut self, effect: SoundEffect, path: PathBuf) {
        self.sound_overrides.insert(effect, path);
    }

    pub fn handle(&mut self, command: RaceCommand) {
        match command {
            RaceCommand::StartRace => self.start_race(),
            RaceCommand::StopRace => self.stop_race(),
            RaceCommand::Restart => self.restart(),
            RaceCommand::IncreaseTimeScale => self.increase_time_scale(),
            RaceCommand::DecreaseTimeScale => self.decrease_time_scale(),
        }
    }

    pub fn start_race(&mut self) {
        let phase = self.state.phase;
        if !matches!(phase, RacePhase::Idle | RacePhase::Finished | RacePhase::Aborted) {
            log::debug!("StartRace ignored in {:?}", phase);
            return;
        }
        if self.racers.is_empty() {
            log::debug!("StartRace ignored, no racers");
            return;
        }
        self.set_phase(RacePhase::Idle);

        self.scheduler.renew();
        self.winner = None;
        self.kiss_gate.reset();
        self.state.elapsed = 0.0;
        for racer in &mut self.racers {
            if let Some(drag) = racer.drag.as_mut() {
                drag.end_drag();
            }
        }

        if self.bridge.is_enabled() {
            let names: Vec<String> = self.racers.iter().map(|r| r.name.clone()).collect();
            if let Err(e) = self.bridge.create_prediction(&names) {
                log::info!("Racing without a prediction: {}", e);
            }
        }

        self.play(SoundEffect::Countdown, None);
        self.events.push(RaceEvent::Ui(UiCue::GameStart));
        self.set_phase(RacePhase::Countdown);
        self.scheduler.schedule(
            self.now + self.settings.timing.countdown_delay,
            Continuation::Release,
        );
    }

    pub fn stop_race(&mut self) {
        if !self.state.phase.is_running() {
            log::debug!("StopRace ignored in {:?}", self.state.phase);
            return;
        }
        self.scheduler.renew();
        self.halt_all();
        self.set_time_scale(1.0);
        self.events.push(RaceEvent::StopMusic);
        self.events.push(RaceEvent::Ui(UiCue::Abort));
        self.bridge.cancel_prediction();
        self.set_phase(RacePhase::Aborted);
        log::info!("Race aborted at {:.1}s", self.state.elapsed);
    }

    /// Back to Idle with racers scattered around the spawn point
    pub fn restart(&mut self) {
        self.scheduler.renew();
        let positions: Vec<Vec2> = (0..self.racers.len())
            .map(|_| self.spawn_position())
            .collect();
        for (racer, pos) in self.racers.iter_mut().zip(positions) {
            racer.pos = pos;
            racer.halt();
            racer.voice.stop();
        }
        if self.state.phase != RacePhase::Idle {
            self.events.push(RaceEvent::StopMusic);
        }
        self.bridge.cancel_prediction();
        self.set_time_scale(1.0);
        self.kiss_gate.reset();
        self.winner = None;
        self.state.elapsed = 0.0;
        self.events.push(RaceEvent::Ui(UiCue::Restart));
        self.set_phase(RacePhase::Idle);
    }

    pub fn increase_time_scale(&mut self) {
        if self.state.phase == RacePhase::Racing {
            self.set_time_scale(self.state.time_scale + 1.0);
        }
    }

    pub fn decrease_time_scale(&mut self) {
        if self.state.phase == RacePhase::Racing {
            self.set_time_scale((self.state.time_scale - 1.0).max(1.0));
        }
    }

    /// Advance by one frame of `frame_dt` real seconds
    pub fn update(&mut self, frame_dt: f32) {
        self.bridge.update(frame_dt);
        self.follow_pointer(frame_dt);

        let dt = frame_dt * self.state.time_scale;
        self.now += dt;

        while let Some(continuation) = self.scheduler.pop_due(self.now) {
            self.run_continuation(continuation);
        }

        if self.state.phase == RacePhase::Racing {
            self.tick_racers(dt);
        }
    }

    pub fn apply_drag(&mut self, command: DragCommand) {
        match command {
            DragCommand::Begin { target } => match self.draggable_mut(&target) {
                Some(item) => {
                    if let Some(parts) = item.drag_parts() {
                        parts.handle.begin_drag();
                    }
                }
                None => log::debug!("Nothing draggable named {}", target),
            },
            DragCommand::End { target } => {
                if let Some(parts) = self.draggable_mut(&target).and_then(|d| d.drag_parts()) {
                    parts.handle.end_drag();
                }
            }
            DragCommand::PointerMoved(pos) => self.pointer = pos,
        }
    }

    /// Restore racer and marker positions saved by a previous run
    pub fn restore_positions(&mut self, store: &dyn PositionStore) {
        for racer in &mut self.racers {
            if let Some(parts) = racer.drag_parts() {
                parts.handle.load_position(store, parts.pos);
            }
        }
        for marker in &mut self.arena.markers {
            marker.drag.load_position(store, &mut marker.pos);
        }
    }

    pub fn persist_positions(&self, store: &mut dyn PositionStore) {
        for racer in &self.racers {
            if let Some(drag) = &racer.drag {
                drag.save_position(store, racer.pos);
            }
        }
        for marker in &self.arena.markers {
            marker.drag.save_position(store, marker.pos);
        }
    }

    /// Cancel all timed work and any open prediction
    pub fn shutdown(&mut self) {
        self.scheduler.renew();
        self.halt_all();
        self.bridge.shutdown();
        log::info!("Race orchestrator shut down");
    }

    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn phase(&self) -> RacePhase {
        self.state.phase
    }

    pub fn time_scale(&self) -> f32 {
        self.state.time_scale
    }

    pub fn elapsed(&self) -> f32 {
        self.state.elapsed
    }

    pub fn now(&self) -> f32 {
        self.now
    }

    pub fn session(&self) -> SessionToken {
        self.scheduler.active()
    }

    pub fn racers(&self) -> &[Racer] {
        &self.racers
    }

    pub fn winner(&self) -> Option<&Racer> {
        let id = self.winner?;
        self.racers.iter().find(|r| r.id == id)
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    pub fn bridge(&self) -> &PredictionBridge<S> {
        &self.bridge
    }

    fn run_continuation(&mut self, continuation: Continuation) {
        match continuation {
            Continuation::Release => self.release(),
            Continuation::StartMusic => self.play(SoundEffect::Music, None),
            Continuation::ResultsReady { winner } => {
                self.events.push(RaceEvent::ResultsReady { racer: winner });
            }
        }
    }

    fn release(&mut self) {
        if self.state.phase != RacePhase::Countdown {
            return;
        }
        let speed = self.settings.motion.base_speed;
        for racer in &mut self.racers {
            let dir = random_unit_vector(&mut self.rng);
            racer.release(dir * speed, self.now);
        }
        self.state.elapsed = 0.0;
        self.set_phase(RacePhase::Racing);
        self.events.push(RaceEvent::Released);
        self.scheduler.schedule(
            self.now + self.settings.timing.music_delay,
            Continuation::StartMusic,
        );
        log::info!("Released {} racers", self.racers.len());
    }

    fn tick_racers(&mut self, dt: f32) {
        let shown = self.state.display_seconds();
        self.state.elapsed += dt;
        let seconds = self.state.display_seconds();
        if seconds != shown {
            self.events.push(RaceEvent::Clock { seconds });
        }

        let colliders = self.arena.frame_colliders(&self.racers);
        let mut ctx = MotionContext {
            now: self.now,
            dt,
            settings: &self.settings.motion,
            kiss_gate: &mut self.kiss_gate,
            rng: &mut self.rng,
            events: &mut self.events,
        };

        let mut winner = None;
        for racer in &mut self.racers {
            if let MotionOutcome::Won(id) = advance_racer(racer, &colliders, &mut ctx) {
                winner = Some(id);
                break;
            }
        }

        if let Some(id) = winner {
            self.declare_winner(id);
        }
    }

    /// First goal contact of the session ends the race
    fn declare_winner(&mut self, id: RacerId) {
        if self.state.phase != RacePhase::Racing {
            return;
        }
        let Some(racer) = self.racers.iter().find(|r| r.id == id) else {
            return;
        };
        let name = racer.name.clone();
        let winner_clip = racer.winner_clip.clone();

        self.scheduler.renew();
        self.halt_all();
        self.winner = Some(id);
        self.bridge.end_prediction(&name);
        self.set_time_scale(1.0);
        self.set_phase(RacePhase::Finished);

        self.events.push(RaceEvent::StopMusic);
        self.events.push(RaceEvent::Ui(UiCue::GameOver));
        self.events.push(RaceEvent::VictorySprite { racer: id });
        self.events.push(RaceEvent::Win { racer: id });
        let clip = winner_clip.unwrap_or_else(|| self.override_clip(SoundEffect::Winner));
        self.events.push(RaceEvent::Sound {
            effect: SoundEffect::Winner,
            clip,
            pitch: 1.0,
            source: Some(id),
        });

        self.scheduler.schedule(
            self.now + self.settings.timing.victory_hold,
            Continuation::ResultsReady { winner: id },
        );
        log::info!("{} wins after {:.1}s", name, self.state.elapsed);
    }

    fn halt_all(&mut self) {
        for racer in &mut self.racers {
            racer.halt();
        }
    }

    fn set_phase(&mut self, next: RacePhase) {
        let from = self.state.phase;
        if from == next {
            return;
        }
        if !from.can_transition_to(next) {
            log::warn!("Refusing phase change {:?} -> {:?}", from, next);
            return;
        }
        self.state.phase = next;
        self.events.push(RaceEvent::PhaseChanged { from, to: next });
        log::debug!("Phase {:?} -> {:?}", from, next);
    }

    fn set_time_scale(&mut self, scale: f32) {
        if scale != self.state.time_scale {
            self.state.time_scale = scale;
            self.events.push(RaceEvent::TimeScaleChanged(scale));
        }
    }

    fn spawn_position(&mut self) -> Vec2 {
        self.arena.spawn_point + random_in_unit_circle(&mut self.rng) * self.settings.spawn_radius
    }

    fn override_clip(&self, effect: SoundEffect) -> Clip {
        Clip::from_override(self.sound_overrides.get(&effect).cloned())
    }

    fn play(&mut self, effect: SoundEffect, source: Option<RacerId>) {
        let clip = self.override_clip(effect);
        self.events.push(RaceEvent::Sound {
            effect,
            clip,
            pitch: 1.0,
            source,
        });
    }

    /// Racers are only draggable while the race is not running
    fn draggable_mut(&mut self, name: &str) -> Option<&mut dyn Dragging> {
        if !self.state.phase.is_running() {
            if let Some(racer) = self.racers.iter_mut().find(|r| r.drag_name() == name) {
                return Some(racer as &mut dyn Dragging);
            }
        }
        self.arena
            .markers
            .iter_mut()
            .find(|m| m.drag_name() == name)
            .map(|m| m as &mut dyn Dragging)
    }

    fn follow_pointer(&mut self, dt: f32) {
        let pointer = self.pointer;
        if !self.state.phase.is_running() {
            for racer in &mut self.racers {
                if let Some(parts) = racer.drag_parts() {
                    parts.handle.follow(parts.pos, pointer, dt);
                }
            }
        }
        for marker in &mut self.arena.markers {
            marker.drag.follow(&mut marker.pos, pointer, dt);
        }
    }
}
