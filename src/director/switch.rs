use rand::RngCore;
use tracing::{debug, warn};

use super::{HitPolicy, TargetDirector, TickReport};
use crate::geometry::{distance, Arena, Point};
use crate::mode::{DrillSettings, TestMode};
use crate::target::{IdGen, Target, TargetId, TargetKind};

const PLACEMENT_ATTEMPTS: usize = 20;

/// Several visible targets, only one of which is active at a time
#[derive(Debug)]
pub struct SwitchDirector {
    arena: Arena,
    target_size: f64,
    total_targets: usize,
    switch_rate_ms: f64,
    targets: Vec<Target>,
    ids: IdGen,
    active_index: usize,
    active_since_ms: f64,
}

impl SwitchDirector {
    pub fn new(settings: &DrillSettings, arena: Arena) -> Self {
        Self {
            arena,
            target_size: settings.target_size,
            total_targets: settings.total_targets.max(1),
            switch_rate_ms: settings.switch_rate_ms,
            targets: Vec::new(),
            ids: IdGen::default(),
            active_index: 0,
            active_since_ms: 0.0,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_target(&self) -> Option<&Target> {
        self.targets.get(self.active_index)
    }

    /// Best-effort placement keeping `min_separation` from every placed target.
    /// Keeps the candidate with the largest clearance when no attempt satisfies it.
    fn place(&self, placed: &[Point], min_separation: f64, rng: &mut dyn RngCore) -> Point {
        let margin = self.target_size / 2.0;
        let clearance = |p: Point| {
            placed
                .iter()
                .map(|q| distance(p, *q))
                .fold(f64::INFINITY, f64::min)
        };

        let mut best = self.arena.random_point(margin, rng);
        let mut best_clearance = clearance(best);
        for _ in 1..PLACEMENT_ATTEMPTS {
            if best_clearance >= min_separation {
                break;
            }
            let candidate = self.arena.random_point(margin, rng);
            let c = clearance(candidate);
            if c > best_clearance {
                best = candidate;
                best_clearance = c;
            }
        }
        if best_clearance < min_separation {
            warn!(
                clearance = best_clearance,
                min_separation, "switch target placed closer than the minimum separation"
            );
        }
        best
    }

    /// Deactivate the current target and activate the next one circularly.
    /// The newly active target is re-armed so reaction time counts from activation.
    pub fn switch_to_next(&mut self, now_ms: f64) {
        if self.targets.is_empty() {
            return;
        }
        self.set_active(self.active_index, false, now_ms);
        self.active_index = (self.active_index + 1) % self.targets.len();
        self.set_active(self.active_index, true, now_ms);
        self.active_since_ms = now_ms;
        debug!(active_index = self.active_index, "switched active target");
    }

    fn set_active(&mut self, index: usize, value: bool, now_ms: f64) {
        if let Some(target) = self.targets.get_mut(index) {
            if let TargetKind::Switch { active, .. } = &mut target.kind {
                *active = value;
            }
            if value {
                target.spawned_at = now_ms;
            }
        }
    }
}

impl TargetDirector for SwitchDirector {
    fn mode(&self) -> TestMode {
        TestMode::Switch
    }

    fn spawn_initial(&mut self, now_ms: f64, rng: &mut dyn RngCore) {
        let max_distance = self.arena.shorter_side();
        let min_separation = max_distance * 0.3;

        self.targets.clear();
        let mut placed: Vec<Point> = Vec::with_capacity(self.total_targets);
        for index in 0..self.total_targets {
            let position = self.place(&placed, min_separation, rng);
            placed.push(position);
            self.targets.push(Target::new(
                self.ids.next_id(),
                position,
                self.target_size,
                now_ms,
                TargetKind::Switch {
                    active: index == 0,
                    index,
                },
            ));
        }
        self.active_index = 0;
        self.active_since_ms = now_ms;
    }

    fn on_tick(&mut self, now_ms: f64, _rng: &mut dyn RngCore) -> TickReport {
        let mut report = TickReport::default();
        if now_ms - self.active_since_ms >= self.switch_rate_ms {
            self.switch_to_next(now_ms);
            report.idle_switches += 1;
        }
        report
    }

    fn on_hit(&mut self, target_id: TargetId, now_ms: f64, _rng: &mut dyn RngCore) {
        if self.active_target().is_some_and(|t| t.id == target_id) {
            self.switch_to_next(now_ms);
        }
    }

    fn targets(&self) -> &[Target] {
        &self.targets
    }

    fn hit_policy(&self) -> HitPolicy {
        HitPolicy::ActiveOnly
    }

    fn clear(&mut self) {
        self.targets.clear();
        self.active_index = 0;
    }

    fn focus(&self, _cursor: Point) -> Option<&Target> {
        self.active_target()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Difficulty;
    use rand::{rngs::StdRng, SeedableRng};

    fn director() -> (SwitchDirector, StdRng) {
        let settings = DrillSettings::new(TestMode::Switch, Difficulty::Medium, 30.0);
        (
            SwitchDirector::new(&settings, Arena::default()),
            StdRng::seed_from_u64(21),
        )
    }

    fn active_count(d: &SwitchDirector) -> usize {
        d.targets().iter().filter(|t| t.is_active()).count()
    }

    #[test]
    fn test_spawns_all_targets_with_one_active() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        assert_eq!(d.targets().len(), 4);
        assert_eq!(active_count(&d), 1);
        assert!(d.targets()[0].is_active());
    }

    #[test]
    fn test_switch_to_next_wraps_and_keeps_one_active() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        for i in 1..=9 {
            d.switch_to_next(i as f64 * 10.0);
            assert_eq!(active_count(&d), 1);
            assert_eq!(d.active_index(), i % 4);
        }
    }

    #[test]
    fn test_idle_timeout_switches() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        assert_eq!(d.on_tick(1999.0, &mut rng).idle_switches, 0);
        assert_eq!(d.on_tick(2000.0, &mut rng).idle_switches, 1);
        assert_eq!(d.active_index(), 1);
        assert_eq!(d.active_target().map(|t| t.spawned_at), Some(2000.0));
    }

    #[test]
    fn test_hit_on_inactive_target_does_not_switch() {
        let (mut d, mut rng) = director();
        d.spawn_initial(0.0, &mut rng);
        let inactive = d.targets()[2].id;
        d.on_hit(inactive, 100.0, &mut rng);
        assert_eq!(d.active_index(), 0);

        let active = d.targets()[0].id;
        d.on_hit(active, 200.0, &mut rng);
        assert_eq!(d.active_index(), 1);
    }

    #[test]
    fn test_targets_are_spread_out() {
        let settings = DrillSettings::new(TestMode::Switch, Difficulty::Easy, 30.0);
        let mut d = SwitchDirector::new(&settings, Arena::default());
        let mut rng = StdRng::seed_from_u64(21);
        d.spawn_initial(0.0, &mut rng);
        let min_sep = 600.0 * 0.3;
        let ts = d.targets();
        let mut close_pairs = 0;
        for i in 0..ts.len() {
            for j in (i + 1)..ts.len() {
                if distance(ts[i].position, ts[j].position) < min_sep {
                    close_pairs += 1;
                }
            }
        }
        assert_eq!(close_pairs, 0);
    }
}
