use rand::RngCore;
use tracing::debug;

use super::{HitPolicy, TargetDirector, TickReport};
use crate::geometry::Arena;
use crate::mode::{DrillSettings, TestMode};
use crate::target::{IdGen, Target, TargetId, TargetKind};

/// Static targets appearing on a timer, up to a concurrency cap
#[derive(Debug)]
pub struct GridshotDirector {
    arena: Arena,
    target_size: f64,
    max_targets: usize,
    spawn_rate_ms: f64,
    lifetime_ms: Option<f64>,
    targets: Vec<Target>,
    ids: IdGen,
    last_spawn_ms: f64,
}

impl GridshotDirector {
    pub fn new(settings: &DrillSettings, arena: Arena) -> Self {
        Self {
            arena,
            target_size: settings.target_size,
            max_targets: settings.max_targets.max(1),
            spawn_rate_ms: settings.spawn_rate_ms,
            lifetime_ms: settings.target_lifetime_ms,
            targets: Vec::new(),
            ids: IdGen::default(),
            last_spawn_ms: 0.0,
        }
    }

    fn spawn(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        let position = self.arena.random_point(self.target_size / 2.0, rng);
        let target = Target::new(
            self.ids.next_id(),
            position,
            self.target_size,
            now_ms,
            TargetKind::Static,
        )
        .with_lifetime(self.lifetime_ms);
        debug!(id = target.id, x = position.x, y = position.y, "gridshot target spawned");
        self.targets.push(target);
        self.last_spawn_ms = now_ms;
    }
}

impl TargetDirector for GridshotDirector {
    fn mode(&self) -> TestMode {
        TestMode::Gridshot
    }

    fn spawn_initial(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        self.targets.clear();
        self.spawn(now_ms, rng);
    }

    fn on_tick(&mut self, now_ms: f64, rng: &mut dyn RngCore) -> TickReport {
        let (expired, live): (Vec<Target>, Vec<Target>) = self
            .targets
            .drain(..)
            .partition(|t| t.is_expired(now_ms));
        self.targets = live;

        if self.targets.is_empty()
            || (self.targets.len() < self.max_targets
                && now_ms - self.last_spawn_ms >= self.spawn_rate_ms)
        {
            self.spawn(now_ms, rng);
        }

        TickReport {
            expired,
            idle_switches: 0,
        }
    }

    fn on_hit(&mut self, target_id: TargetId, now_ms: f64, rng: &mut dyn RngCore) {
        self.targets.retain(|t| t.id != target_id);
        if self.targets.is_empty() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Difficulty;
    use rand::{rngs::StdRng, SeedableRng};

    fn director() -> (GridshotDirector, StdRng) {
        let settings = DrillSettings::new(TestMode::Gridshot, Difficulty::Easy, 30.0);
        (
            GridshotDirector::new(&settings, Arena::default()),
            StdRng::seed_from_u64(42),
        )
    }

    #[test]
    fn test_spawns_on_timer_up_to_cap() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        assert_eq!(d.targets().len(), 1);

        d.on_tick(799.0, &mut rng);
        assert_eq!(d.targets().len(), 1);
        d.on_tick(800.0, &mut rng);
        assert_eq!(d.targets().len(), 2);
        d.on_tick(1600.0, &mut rng);
        assert_eq!(d.targets().len(), 3);
        // cap reached (easy = 3)
        d.on_tick(2400.0, &mut rng);
        assert_eq!(d.targets().len(), 3);
    }

    #[test]
    fn test_targets_expire_and_are_reported() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        let first = d.targets()[0].id;
        let report = d.on_tick(3000.0, &mut rng);
        assert_eq!(report.expired.len(), 1);
        assert_eq!(report.expired[0].id, first);
        // never left empty
        assert!(!d.targets().is_empty());
        assert!(d.targets().iter().all(|t| t.id != first));
    }

    #[test]
    fn test_hit_removes_target_and_refills_when_empty() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        let id = d.targets()[0].id;
        d.on_hit(id, 100.0, &mut rng);
        assert_eq!(d.targets().len(), 1);
        assert_ne!(d.targets()[0].id, id);
    }

    #[test]
    fn test_targets_stay_inside_arena() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        for step in 1..200 {
            d.on_tick(step as f64 * 400.0, &mut rng);
            for t in d.targets() {
                assert!(t.position.x >= t.radius() && t.position.x <= 800.0 - t.radius());
                assert!(t.position.y >= t.radius() && t.position.y <= 600.0 - t.radius());
            }
        }
    }
}
