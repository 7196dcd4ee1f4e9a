//! Per-racer motion: sweep, bounce, drift, kiss, goal
//!
//! Each tick a moving racer sweeps its body along its velocity against the
//! colliders sampled at tick start, reacts to every contact in distance order
//! and then moves. Racers never see each other's same-tick moves.

use rand::Rng;

use super::collision::{ColliderOwner, ColliderSet, reflect_velocity};
use super::state::{Facing, KissGate, RaceEvent, Racer, RacerId, ZoneKind};
use crate::audio::{Clip, SoundEffect};
use crate::consts::{BOUNCE_PITCH_MAX, BOUNCE_PITCH_MIN};
use crate::random_unit_vector;
use crate::settings::MotionSettings;

/// Shared per-race state handed to every racer update
pub struct MotionContext<'a, R: Rng> {
    /// Simulated seconds since the arena was loaded
    pub now: f32,
    /// Scaled tick length
    pub dt: f32,
    pub settings: &'a MotionSettings,
    pub kiss_gate: &'a mut KissGate,
    pub rng: &'a mut R,
    pub events: &'a mut Vec<RaceEvent>,
}

/// What happened to one racer this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Not moving
    Idle,
    Moved,
    /// Touched the goal; the racer did not move
    Won(RacerId),
}

/// Advance one racer by one tick
pub fn advance_racer<R: Rng>(
    racer: &mut Racer,
    colliders: &ColliderSet,
    ctx: &mut MotionContext<'_, R>,
) -> MotionOutcome {
    if racer.is_idle() {
        return MotionOutcome::Idle;
    }

    let settings = ctx.settings;
    let now = ctx.now;
    let mut speed_multiplier = settings.speed_recovery.multiplier(now - racer.last_bounce);

    if now - racer.last_bounce >= settings.bounce_debounce {
        let mut in_kissing_zone = false;
        let distance = racer.vel.length() * speed_multiplier * ctx.dt;
        let hits = colliders.sweep(
            racer.id,
            racer.pos,
            racer.radius,
            racer.vel,
            distance,
            settings.max_hits,
        );

        for contact in hits {
            match contact.owner {
                ColliderOwner::Zone(ZoneKind::Goal) => {
                    log::debug!("{} reached the goal at t={:.2}", racer.name, now);
                    return MotionOutcome::Won(racer.id);
                }
                ColliderOwner::Zone(ZoneKind::KissZone) => {
                    in_kissing_zone = true;
                }
                owner @ (ColliderOwner::Zone(ZoneKind::SolidWall) | ColliderOwner::Racer(_)) => {
                    racer.last_bounce = now;
                    speed_multiplier = 1.0;
                    bounce(racer, contact.hit.normal, ctx);

                    if in_kissing_zone && matches!(owner, ColliderOwner::Racer(_)) {
                        try_kiss(racer, ctx);
                    }
                }
            }
        }
    }

    racer.pos += racer.vel * speed_multiplier * ctx.dt;
    MotionOutcome::Moved
}

/// Reflect, play the bounce sound, maybe drift
fn bounce<R: Rng>(racer: &mut Racer, normal: glam::Vec2, ctx: &mut MotionContext<'_, R>) {
    let settings = ctx.settings;
    racer.vel = reflect_velocity(racer.vel, normal);
    racer.facing = Facing::from_velocity(racer.vel);
    ctx.events.push(RaceEvent::Bounce {
        racer: racer.id,
        normal,
    });

    if racer.voice.try_play(ctx.now, settings.bounce_clip_secs) {
        ctx.events.push(RaceEvent::Sound {
            effect: SoundEffect::Bounce,
            clip: racer.bounce_clip.clone(),
            pitch: ctx.rng.random_range(BOUNCE_PITCH_MIN..BOUNCE_PITCH_MAX),
            source: Some(racer.id),
        });
    }

    if ctx.rng.random::<f32>() < settings.perturb_chance {
        racer.vel = perturb(racer.vel, random_unit_vector(ctx.rng));
    }
}

/// Nudge direction by `kick` without changing speed
pub fn perturb(vel: glam::Vec2, kick: glam::Vec2) -> glam::Vec2 {
    let speed = vel.length();
    (vel + kick).try_normalize().map_or(vel, |dir| dir * speed)
}

fn try_kiss<R: Rng>(racer: &Racer, ctx: &mut MotionContext<'_, R>) {
    let settings = ctx.settings;
    if !ctx.kiss_gate.try_claim(ctx.now, settings.kiss_cooldown) {
        return;
    }

    ctx.events.push(RaceEvent::Kiss {
        racer: racer.id,
        at: racer.pos,
        particles: settings.kiss_particles,
    });

    let with_sound =
        settings.kiss_sound_chance >= 1.0 || ctx.rng.random::<f32>() < settings.kiss_sound_chance;
    if with_sound {
        ctx.events.push(RaceEvent::Sound {
            effect: SoundEffect::Kiss,
            clip: Clip::Default,
            pitch: 1.0,
            source: Some(racer.id),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::{Collider, Shape};
    use crate::sim::curve::{Easing, SpeedRecovery};
    use crate::sim::state::RacerProfile;
    use glam::Vec2;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DT: f32 = 1.0 / 60.0;

    fn racer_at(id: u32, pos: Vec2, vel: Vec2) -> Racer {
        let mut racer = Racer::new(RacerId(id), RacerProfile::named(format!("R{id}")), pos);
        racer.release(vel, 0.0);
        racer
    }

    fn wall_at_x(x: f32) -> Collider {
        Collider::new(
            ColliderOwner::Zone(ZoneKind::SolidWall),
            Shape::Segment {
                a: Vec2::new(x, -10.0),
                b: Vec2::new(x, 10.0),
            },
        )
    }

    fn no_drift() -> MotionSettings {
        MotionSettings {
            perturb_chance: 0.0,
            ..Default::default()
        }
    }

    struct Harness {
        settings: MotionSettings,
        gate: KissGate,
        rng: Pcg32,
        events: Vec<RaceEvent>,
    }

    impl Harness {
        fn new(settings: MotionSettings) -> Self {
            Self {
                settings,
                gate: KissGate::default(),
                rng: Pcg32::seed_from_u64(42),
                events: Vec::new(),
            }
        }

        fn step(&mut self, racer: &mut Racer, colliders: &ColliderSet, now: f32, dt: f32) -> MotionOutcome {
            let mut ctx = MotionContext {
                now,
                dt,
                settings: &self.settings,
                kiss_gate: &mut self.gate,
                rng: &mut self.rng,
                events: &mut self.events,
            };
            advance_racer(racer, colliders, &mut ctx)
        }

        fn count(&self, pred: impl Fn(&RaceEvent) -> bool) -> usize {
            self.events.iter().filter(|e| pred(e)).count()
        }
    }

    #[test]
    fn test_idle_racer_is_noop() {
        let mut h = Harness::new(no_drift());
        let mut racer = Racer::new(RacerId(0), RacerProfile::named("Idle"), Vec2::ZERO);
        let mut set = ColliderSet::new();
        set.push(wall_at_x(0.1));
        assert_eq!(h.step(&mut racer, &set, 5.0, DT), MotionOutcome::Idle);
        assert_eq!(racer.pos, Vec2::ZERO);
        assert!(h.events.is_empty());
    }

    #[test]
    fn test_free_movement() {
        let mut h = Harness::new(no_drift());
        let mut racer = racer_at(0, Vec2::ZERO, Vec2::new(2.0, 0.0));
        let set = ColliderSet::new();
        assert_eq!(h.step(&mut racer, &set, 1.0, 0.5), MotionOutcome::Moved);
        assert!((racer.pos - Vec2::new(1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_wall_bounce_reflects_and_keeps_speed() {
        let mut h = Harness::new(no_drift());
        let mut racer = racer_at(0, Vec2::new(0.6, 0.0), Vec2::new(2.0, 1.0));
        let before = racer.vel.length();
        let mut set = ColliderSet::new();
        set.push(wall_at_x(1.0));

        h.step(&mut racer, &set, 1.0, 0.1);

        assert!(racer.vel.x < 0.0, "should head back left");
        assert!((racer.vel.y - 1.0).abs() < 1e-5);
        assert!((racer.vel.length() - before).abs() < 1e-5);
        assert_eq!(racer.facing, Facing::Left);
        assert_eq!(racer.last_bounce, 1.0);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Bounce { .. })), 1);
        assert_eq!(
            h.count(|e| matches!(e, RaceEvent::Sound { effect: SoundEffect::Bounce, .. })),
            1
        );
    }

    #[test]
    fn test_bounce_sound_pitch_in_range() {
        let mut h = Harness::new(no_drift());
        let mut racer = racer_at(0, Vec2::new(0.6, 0.0), Vec2::new(2.0, 0.0));
        let mut set = ColliderSet::new();
        set.push(wall_at_x(1.0));
        h.step(&mut racer, &set, 1.0, 0.1);

        let pitch = h
            .events
            .iter()
            .find_map(|e| match e {
                RaceEvent::Sound { pitch, .. } => Some(*pitch),
                _ => None,
            })
            .expect("bounce sound");
        assert!((BOUNCE_PITCH_MIN..BOUNCE_PITCH_MAX).contains(&pitch));
    }

    #[test]
    fn test_bounce_sound_skipped_while_playing() {
        let mut h = Harness::new(MotionSettings {
            bounce_clip_secs: 5.0,
            ..no_drift()
        });
        let mut set = ColliderSet::new();
        set.push(wall_at_x(1.0));
        set.push(wall_at_x(-1.0));

        let mut racer = racer_at(0, Vec2::new(0.6, 0.0), Vec2::new(2.0, 0.0));
        h.step(&mut racer, &set, 1.0, 0.1);
        racer.pos = Vec2::new(-0.6, 0.0);
        h.step(&mut racer, &set, 2.0, 0.1);

        assert_eq!(h.count(|e| matches!(e, RaceEvent::Bounce { .. })), 2);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Sound { .. })), 1);
    }

    #[test]
    fn test_bounce_debounce() {
        // Racer jammed between two close walls, sampled every tick
        let mut h = Harness::new(no_drift());
        let mut set = ColliderSet::new();
        set.push(wall_at_x(0.5));
        set.push(wall_at_x(-0.5));
        let mut racer = racer_at(0, Vec2::ZERO, Vec2::new(3.0, 0.0));

        let mut accepted = Vec::new();
        let mut now = 0.0;
        for _ in 0..240 {
            now += DT;
            let before = racer.last_bounce;
            h.step(&mut racer, &set, now, DT);
            if racer.last_bounce != before {
                accepted.push(racer.last_bounce);
            }
        }

        assert!(accepted.len() >= 2);
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= 0.1 - 1e-4, "bounces too close: {:?}", pair);
        }
    }

    #[test]
    fn test_goal_short_circuits() {
        let mut h = Harness::new(no_drift());
        let mut set = ColliderSet::new();
        set.push(Collider::new(
            ColliderOwner::Zone(ZoneKind::Goal),
            Shape::rect(Vec2::new(0.5, -1.0), Vec2::new(2.0, 1.0)),
        ));
        set.push(wall_at_x(0.9));
        let start = Vec2::new(0.0, 0.0);
        let mut racer = racer_at(3, start, Vec2::new(2.0, 0.0));

        assert_eq!(h.step(&mut racer, &set, 1.0, 0.2), MotionOutcome::Won(RacerId(3)));
        assert_eq!(racer.pos, start);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Bounce { .. })), 0);
    }

    #[test]
    fn test_no_sweep_inside_debounce_window() {
        let mut h = Harness::new(no_drift());
        let mut set = ColliderSet::new();
        set.push(Collider::new(
            ColliderOwner::Zone(ZoneKind::Goal),
            Shape::rect(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0)),
        ));
        let mut racer = racer_at(0, Vec2::ZERO, Vec2::new(2.0, 0.0));
        // Released at t=0, so t=0.05 is still inside the debounce window
        assert_eq!(h.step(&mut racer, &set, 0.05, DT), MotionOutcome::Moved);
    }

    fn kiss_setup() -> (ColliderSet, Racer) {
        let mut set = ColliderSet::new();
        set.push(Collider::new(
            ColliderOwner::Zone(ZoneKind::KissZone),
            Shape::rect(Vec2::splat(-5.0), Vec2::splat(5.0)),
        ));
        set.push(Collider::new(
            ColliderOwner::Racer(RacerId(9)),
            Shape::Circle {
                center: Vec2::new(1.0, 0.0),
                radius: 0.35,
            },
        ));
        let racer = racer_at(0, Vec2::new(0.2, 0.0), Vec2::new(2.0, 0.0));
        (set, racer)
    }

    #[test]
    fn test_kiss_gate_rate_limits() {
        let mut h = Harness::new(no_drift());

        let (set, mut racer) = kiss_setup();
        h.step(&mut racer, &set, 1.0, 0.1);
        let (set, mut racer) = kiss_setup();
        h.step(&mut racer, &set, 1.1, 0.1);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Kiss { .. })), 1);

        let (set, mut racer) = kiss_setup();
        h.step(&mut racer, &set, 1.6, 0.1);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Kiss { .. })), 2);
    }

    #[test]
    fn test_same_tick_kiss_goes_to_first_in_roster() {
        let mut h = Harness::new(no_drift());
        let mut first = racer_at(0, Vec2::new(-0.5, 0.0), Vec2::new(2.0, 0.0));
        let mut second = racer_at(1, Vec2::new(0.5, 0.0), Vec2::new(-2.0, 0.0));
        let mut set = ColliderSet::new();
        set.push(Collider::new(
            ColliderOwner::Zone(ZoneKind::KissZone),
            Shape::rect(Vec2::splat(-5.0), Vec2::splat(5.0)),
        ));
        set.push(Collider::new(ColliderOwner::Racer(first.id), first.body()));
        set.push(Collider::new(ColliderOwner::Racer(second.id), second.body()));

        h.step(&mut first, &set, 1.0, 0.2);
        h.step(&mut second, &set, 1.0, 0.2);

        assert_eq!(h.count(|e| matches!(e, RaceEvent::Bounce { .. })), 2);
        let kissers: Vec<RacerId> = h
            .events
            .iter()
            .filter_map(|e| match e {
                RaceEvent::Kiss { racer, .. } => Some(*racer),
                _ => None,
            })
            .collect();
        assert_eq!(kissers, vec![RacerId(0)]);
    }

    #[test]
    fn test_kiss_needs_another_racer() {
        let mut h = Harness::new(no_drift());
        let mut set = ColliderSet::new();
        set.push(Collider::new(
            ColliderOwner::Zone(ZoneKind::KissZone),
            Shape::rect(Vec2::splat(-5.0), Vec2::splat(5.0)),
        ));
        set.push(wall_at_x(1.0));
        let mut racer = racer_at(0, Vec2::new(0.6, 0.0), Vec2::new(2.0, 0.0));
        h.step(&mut racer, &set, 1.0, 0.1);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Bounce { .. })), 1);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Kiss { .. })), 0);
    }

    #[test]
    fn test_kiss_sound_is_configurable() {
        let mut h = Harness::new(MotionSettings {
            kiss_sound_chance: 0.0,
            ..no_drift()
        });
        let (set, mut racer) = kiss_setup();
        h.step(&mut racer, &set, 1.0, 0.1);
        assert_eq!(h.count(|e| matches!(e, RaceEvent::Kiss { .. })), 1);
        assert_eq!(
            h.count(|e| matches!(e, RaceEvent::Sound { effect: SoundEffect::Kiss, .. })),
            0
        );
    }

    #[test]
    fn test_drift_keeps_speed() {
        let mut h = Harness::new(MotionSettings {
            perturb_chance: 1.0,
            ..Default::default()
        });
        let mut set = ColliderSet::new();
        set.push(wall_at_x(1.0));
        let mut racer = racer_at(0, Vec2::new(0.6, 0.0), Vec2::new(2.0, 0.0));
        h.step(&mut racer, &set, 1.0, 0.1);
        assert!((racer.vel.length() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_eased_recovery_slows_after_bounce() {
        let mut h = Harness::new(MotionSettings {
            speed_recovery: SpeedRecovery::Eased {
                floor: 0.5,
                duration: 1.0,
                easing: Easing::Linear,
            },
            ..no_drift()
        });
        let set = ColliderSet::new();
        let mut racer = racer_at(0, Vec2::ZERO, Vec2::new(2.0, 0.0));
        // Right after release the curve is at its floor
        h.step(&mut racer, &set, 0.0, 0.5);
        assert!((racer.pos.x - 0.5).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn perturb_preserves_speed(
            vx in -10.0f32..10.0,
            vy in -10.0f32..10.0,
            theta in 0.0f32..std::f32::consts::TAU,
        ) {
            let v = Vec2::new(vx, vy);
            prop_assume!(v.length() > 0.01);
            let out = perturb(v, Vec2::from_angle(theta));
            prop_assert!((out.length() - v.length()).abs() < 1e-3);
        }
    }
}
