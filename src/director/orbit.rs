use std::f64::consts::TAU;

use rand::{Rng, RngCore};

use super::{HitPolicy, TargetDirector, TickReport};
use crate::geometry::{Arena, Point};
use crate::mode::{DrillSettings, TestMode};
use crate::target::{IdGen, Target, TargetId, TargetKind};

/// Calibration "circle-tracking": one target travelling along a circle around
/// the arena centre. A hit relocates it to a new orbit and angle.
#[derive(Debug)]
pub struct OrbitDirector {
    arena: Arena,
    target_size: f64,
    angular_speed: f64,
    targets: Vec<Target>,
    ids: IdGen,
    last_tick_ms: f64,
}

impl OrbitDirector {
    pub fn new(settings: &DrillSettings, arena: Arena) -> Self {
        Self {
            arena,
            target_size: settings.target_size,
            angular_speed: settings.orbit_angular_speed,
            targets: Vec::new(),
            ids: IdGen::default(),
            last_tick_ms: 0.0,
        }
    }

    fn position_on(center: Point, orbit_radius: f64, angle: f64) -> Point {
        Point::new(
            center.x + orbit_radius * angle.cos(),
            center.y + orbit_radius * angle.sin(),
        )
    }

    fn spawn(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        let center = self.arena.center();
        let max_radius = (self.arena.shorter_side() / 2.0 - self.target_size / 2.0).max(0.0);
        let orbit_radius = max_radius * rng.gen_range(0.45..0.9);
        let angle = rng.gen_range(0.0..TAU);
        let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.targets = vec![Target::new(
            self.ids.next_id(),
            Self::position_on(center, orbit_radius, angle),
            self.target_size,
            now_ms,
            TargetKind::Orbit {
                center,
                orbit_radius,
                angle,
                angular_speed: self.angular_speed * direction,
            },
        )];
    }
}

impl TargetDirector for OrbitDirector {
    fn mode(&self) -> TestMode {
        TestMode::Calibration
    }

    fn spawn_initial(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        self.spawn(now_ms, rng);
        self.last_tick_ms = now_ms;
    }

    fn on_tick(&mut self, now_ms: f64, rng: &mut dyn RngCore) -> TickReport {
        let dt = ((now_ms - self.last_tick_ms) / 1000.0).max(0.0);
        self.last_tick_ms = now_ms;

        match self.targets.first_mut() {
            Some(target) => {
                if let TargetKind::Orbit {
                    center,
                    orbit_radius,
                    angle,
                    angular_speed,
                } = &mut target.kind
                {
                    *angle = (*angle + *angular_speed * dt).rem_euclid(TAU);
                    target.position = Self::position_on(*center, *orbit_radius, *angle);
                }
            }
            None => self.spawn(now_ms, rng),
        }
        TickReport::default()
    }

    fn on_hit(&mut self, target_id: TargetId, now_ms: f64, rng: &mut dyn RngCore) {
        if self.targets.iter().any(|t| t.id == target_id) {
            self.spawn(now_ms, rng);
        }
    }

    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn hit_policy(&self) -> HitPolicy {
        HitPolicy::AnyLive
    }

    fn clear(&mut self) {
        self.targets.clear();
    }
}
