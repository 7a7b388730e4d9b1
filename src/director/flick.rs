use rand::RngCore;
use tracing::{debug, warn};

use super::{HitPolicy, TargetDirector, TickReport};
use crate::geometry::{distance, Arena, Point};
use crate::mode::{DrillSettings, TestMode};
use crate::target::{IdGen, Target, TargetId, TargetKind};

const PLACEMENT_ATTEMPTS: usize = 10;

/// Exactly one live target, placed far from the previous one
#[derive(Debug)]
pub struct FlickDirector {
    arena: Arena,
    target_size: f64,
    min_distance: f64,
    lifetime_ms: Option<f64>,
    targets: Vec<Target>,
    ids: IdGen,
    previous: Point,
}

impl FlickDirector {
    pub fn new(settings: &DrillSettings, arena: Arena) -> Self {
        Self {
            arena,
            target_size: settings.target_size,
            min_distance: settings.min_distance,
            lifetime_ms: settings.target_lifetime_ms,
            targets: Vec::new(),
            ids: IdGen::default(),
            previous: arena.center(),
        }
    }

    /// Rejection-sample a position at least `min_distance` from the previous
    /// target, falling back to an unconstrained position.
    fn place(&self, rng: &mut dyn RngCore) -> Point {
        let margin = self.target_size / 2.0;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let candidate = self.arena.random_point(margin, rng);
            if distance(candidate, self.previous) >= self.min_distance {
                return candidate;
            }
        }
        warn!(
            min_distance = self.min_distance,
            "flick placement exhausted attempts, using unconstrained position"
        );
        self.arena.random_point(margin, rng)
    }

    fn replace(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        let position = self.place(rng);
        let travel = distance(position, self.previous);
        let target = Target::new(
            self.ids.next_id(),
            position,
            self.target_size,
            now_ms,
            TargetKind::Flick { travel },
        )
        .with_lifetime(self.lifetime_ms);
        debug!(id = target.id, travel, "flick target spawned");
        self.previous = position;
        self.targets.clear();
        self.targets.push(target);
    }
}

impl TargetDirector for FlickDirector {
    fn mode(&self) -> TestMode {
        TestMode::Flick
    }

    fn spawn_initial(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        self.previous = self.arena.center();
        self.replace(now_ms, rng);
    }

    fn on_tick(&mut self, now_ms: f64, rng: &mut dyn RngCore) -> TickReport {
        let mut report = TickReport::default();
        if let Some(current) = self.targets.first() {
            if current.is_expired(now_ms) {
                report.expired.push(current.clone());
                self.replace(now_ms, rng);
            }
        } else {
            self.replace(now_ms, rng);
        }
        report
    }

    fn on_hit(&mut self, target_id: TargetId, now_ms: f64, rng: &mut dyn RngCore) {
        if self.targets.iter().any(|t| t.id == target_id) {
            self.replace(now_ms, rng);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Difficulty;
    use rand::{rngs::StdRng, SeedableRng};

    fn director() -> (FlickDirector, StdRng) {
        let settings = DrillSettings::new(TestMode::Flick, Difficulty::Easy, 30.0);
        (
            FlickDirector::new(&settings, Arena::default()),
            StdRng::seed_from_u64(9),
        )
    }

    #[test]
    fn test_always_exactly_one_target() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        for step in 0..100 {
            let now = step as f64 * 500.0;
            if step % 3 == 0 {
                let id = d.targets()[0].id;
                d.on_hit(id, now, &mut rng);
            } else {
                d.on_tick(now, &mut rng);
            }
            assert_eq!(d.targets().len(), 1);
        }
    }

    #[test]
    fn test_replacement_respects_min_distance_when_possible() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        let mut satisfied = 0;
        for step in 1..50 {
            let before = d.targets()[0].position;
            let id = d.targets()[0].id;
            d.on_hit(id, step as f64 * 100.0, &mut rng);
            let after = &d.targets()[0];
            if let TargetKind::Flick { travel } = after.kind {
                assert!((travel - distance(before, after.position)).abs() < 1e-9);
                if travel >= 200.0 {
                    satisfied += 1;
                }
            } else {
                panic!("flick director spawned a non-flick target");
            }
        }
        // rejection sampling almost always finds a far position on an 800x600 arena
        assert!(satisfied >= 45);
    }

    #[test]
    fn test_impossible_min_distance_still_spawns() {
        let mut settings = DrillSettings::new(TestMode::Flick, Difficulty::Easy, 30.0);
        settings.min_distance = 10_000.0;
        let mut d = FlickDirector::new(&settings, Arena::default());
        let mut rng = StdRng::seed_from_u64(1);
        d.spawn_initial(0.0, &mut rng);
        assert_eq!(d.targets().len(), 1);
    }

    #[test]
    fn test_expiry_replaces_target() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        let id = d.targets()[0].id;
        let report = d.on_tick(3000.0, &mut rng);
        assert_eq!(report.expired.len(), 1);
        assert_ne!(d.targets()[0].id, id);
    }

    #[test]
    fn test_hit_on_stale_id_is_ignored() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        let id = d.targets()[0].id;
        d.on_hit(id + 100, 10.0, &mut rng);
        assert_eq!(d.targets()[0].id, id);
    }
}
