use std::f64::consts::TAU;

use rand::{Rng, RngCore};

use super::{HitPolicy, TargetDirector, TickReport};
use crate::geometry::{Arena, Point, Velocity};
use crate::mode::{DrillSettings, MotionProfile, TestMode};
use crate::target::{IdGen, Target, TargetId, TargetKind};

const ERRATIC_IMPULSE_CHANCE: f64 = 0.02;
const CURVE_FREQUENCY: f64 = 2.0;

/// One continuously moving target bouncing off the arena edges
#[derive(Debug)]
pub struct TrackDirector {
    arena: Arena,
    target_size: f64,
    speed: f64,
    max_speed: f64,
    profile: MotionProfile,
    targets: Vec<Target>,
    ids: IdGen,
    started_ms: f64,
    last_tick_ms: f64,
}

impl TrackDirector {
    pub fn new(settings: &DrillSettings, arena: Arena) -> Self {
        Self {
            arena,
            target_size: settings.target_size,
            speed: settings.track_speed,
            max_speed: settings.max_speed.max(settings.track_speed),
            profile: settings.motion_profile,
            targets: Vec::new(),
            ids: IdGen::default(),
            started_ms: 0.0,
            last_tick_ms: 0.0,
        }
    }

    /// Apply the motion profile's perturbation for one tick
    fn perturb(&self, v: Velocity, elapsed_secs: f64, dt: f64, rng: &mut dyn RngCore) -> Velocity {
        let v = match self.profile {
            MotionProfile::Linear => v,
            MotionProfile::Curved => {
                let accel = self.speed * 1.5;
                let phase = elapsed_secs * CURVE_FREQUENCY;
                Velocity::new(
                    v.vx + accel * phase.cos() * dt,
                    v.vy + accel * phase.sin() * dt,
                )
            }
            MotionProfile::Erratic => {
                if rng.gen_bool(ERRATIC_IMPULSE_CHANCE) {
                    let heading = rng.gen_range(0.0..TAU);
                    let kick = self.speed * 0.5;
                    Velocity::new(v.vx + kick * heading.cos(), v.vy + kick * heading.sin())
                } else {
                    v
                }
            }
            MotionProfile::Chaotic => {
                let k = self.speed * 0.15;
                Velocity::new(v.vx + rng.gen_range(-k..k), v.vy + rng.gen_range(-k..k))
            }
        };
        v.clamped(self.max_speed)
    }

    /// Reflect off all four edges: flip the velocity sign and clamp the position
    fn bounce(&self, mut p: Point, mut v: Velocity, radius: f64) -> (Point, Velocity) {
        if p.x < radius {
            p.x = radius;
            v.vx = v.vx.abs();
        } else if p.x > self.arena.width - radius {
            p.x = self.arena.width - radius;
            v.vx = -v.vx.abs();
        }
        if p.y < radius {
            p.y = radius;
            v.vy = v.vy.abs();
        } else if p.y > self.arena.height - radius {
            p.y = self.arena.height - radius;
            v.vy = -v.vy.abs();
        }
        (self.arena.clamp(p, radius), v)
    }
}

impl TargetDirector for TrackDirector {
    fn mode(&self) -> TestMode {
        TestMode::Track
    }

    fn spawn_initial(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        let heading = rng.gen_range(0.0..TAU);
        let velocity = Velocity::new(self.speed * heading.cos(), self.speed * heading.sin());
        self.targets = vec![Target::new(
            self.ids.next_id(),
            self.arena.center(),
            self.target_size,
            now_ms,
            TargetKind::Moving {
                velocity,
                profile: self.profile,
            },
        )];
        self.started_ms = now_ms;
        self.last_tick_ms = now_ms;
    }

    fn on_tick(&mut self, now_ms: f64, rng: &mut dyn RngCore) -> TickReport {
        let dt = ((now_ms - self.last_tick_ms) / 1000.0).max(0.0);
        let elapsed_secs = (now_ms - self.started_ms) / 1000.0;
        self.last_tick_ms = now_ms;

        let Some(target) = self.targets.first() else {
            self.spawn_initial(now_ms, rng);
            return TickReport::default();
        };
        let TargetKind::Moving { velocity, profile } = target.kind else {
            return TickReport::default();
        };

        let velocity = self.perturb(velocity, elapsed_secs, dt, rng);
        let moved = Point::new(
            target.position.x + velocity.vx * dt,
            target.position.y + velocity.vy * dt,
        );
        let (position, velocity) = self.bounce(moved, velocity, target.radius());

        if let Some(target) = self.targets.first_mut() {
            target.position = position;
            target.kind = TargetKind::Moving { velocity, profile };
        }
        TickReport::default()
    }

    fn on_hit(&mut self, _target_id: TargetId, _now_ms: f64, _rng: &mut dyn RngCore) {}

    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn hit_policy(&self) -> HitPolicy {
        HitPolicy::AlwaysMiss
    }

    fn clear(&mut self) {
        self.targets.clear();
    }
}
