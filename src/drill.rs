use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info};

use crate::director::{director_for, TargetDirector};
use crate::geometry::{Arena, Point};
use crate::hit_policy::{apply_click, ClickOutcome};
use crate::metrics::{MetricsAggregator, SessionMetrics};
use crate::mode::{DrillSettings, TestMode};
use crate::motion::{MotionCollector, Sample};
use crate::session::{ClockTick, SessionClock, SessionState};
use crate::target::Target;

/// Result of advancing the drill by one frame
#[derive(Debug, Clone, PartialEq)]
pub enum DrillTick {
    /// The clock is not running (idle, paused or already ended)
    Inactive,
    Running { remaining_ms: f64 },
    /// The session ran out of time on this tick and was finalized
    Ended(SessionMetrics),
}

/// One timed drill: clock, target director, hit resolution, motion sampling
/// and metrics for a single session. Callers feed it wall-clock milliseconds.
#[derive(Debug)]
pub struct Drill {
    settings: DrillSettings,
    arena: Arena,
    clock: SessionClock,
    director: Box<dyn TargetDirector>,
    metrics: MetricsAggregator,
    motion: MotionCollector,
    cursor: Point,
    rng: StdRng,
    results: Option<SessionMetrics>,
    /// Session time of the last director step and motion sample
    last_step_ms: Option<f64>,
}

impl Drill {
    pub fn new(settings: DrillSettings, arena: Arena) -> Self {
        Self::with_rng(settings, arena, StdRng::from_entropy())
    }

    /// Deterministic target placement, for replays and tests
    pub fn with_seed(settings: DrillSettings, arena: Arena, seed: u64) -> Self {
        Self::with_rng(settings, arena, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: DrillSettings, arena: Arena, rng: StdRng) -> Self {
        Self {
            clock: SessionClock::new(settings.duration_ms()),
            director: director_for(&settings, arena),
            settings,
            arena,
            metrics: MetricsAggregator::new(),
            motion: MotionCollector::new(),
            cursor: arena.center(),
            rng,
            results: None,
            last_step_ms: None,
        }
    }

    pub fn settings(&self) -> &DrillSettings {
        &self.settings
    }

    pub fn mode(&self) -> TestMode {
        self.settings.mode
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    pub fn state(&self) -> SessionState {
        self.clock.state()
    }

    pub fn has_finished(&self) -> bool {
        self.clock.state() == SessionState::Ended
    }

    pub fn targets(&self) -> &[Target] {
        self.director.targets()
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn remaining_ms(&self) -> f64 {
        self.clock.remaining_ms()
    }

    /// Live totals while the session runs
    pub fn running_metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn samples(&self) -> &[Sample] {
        self.motion.samples()
    }

    /// Finalized metrics of the last session that ran to completion
    pub fn results(&self) -> Option<&SessionMetrics> {
        self.results.as_ref()
    }

    /// Requires idle; anything else is a no-op returning false
    pub fn start(&mut self, now_ms: f64) -> bool {
        if !self.clock.start(now_ms) {
            return false;
        }
        self.metrics = MetricsAggregator::new();
        self.motion.clear();
        self.results = None;
        self.last_step_ms = None;
        self.director.spawn_initial(0.0, &mut self.rng);
        info!(mode = %self.settings.mode, difficulty = %self.settings.difficulty, "drill started");
        true
    }

    pub fn pause(&mut self, now_ms: f64) -> bool {
        self.clock.pause(now_ms)
    }

    pub fn resume(&mut self, now_ms: f64) -> bool {
        self.clock.resume(now_ms)
    }

    /// Abandon the session from any state. In-flight targets, samples and
    /// totals are dropped without being finalized.
    pub fn exit(&mut self) {
        if self.clock.state() != SessionState::Idle {
            info!(state = %self.clock.state(), "drill exited");
        }
        self.clock.reset();
        self.director.clear();
        self.metrics = MetricsAggregator::new();
        self.motion.clear();
        self.last_step_ms = None;
    }

    /// Only an idle drill can change canvas size; returns whether it did
    pub fn resize(&mut self, arena: Arena) -> bool {
        if self.clock.state() != SessionState::Idle {
            return false;
        }
        if arena != self.arena {
            debug!(width = arena.width, height = arena.height, "drill arena resized");
            self.arena = arena;
            self.director = director_for(&self.settings, arena);
            self.cursor = arena.center();
        }
        true
    }

    pub fn on_cursor_move(&mut self, x: f64, y: f64) {
        self.cursor = Point::new(x, y);
    }

    /// Clicking while not running is a no-op
    pub fn on_click(&mut self, x: f64, y: f64, now_ms: f64) -> Option<ClickOutcome> {
        if !self.clock.is_running() {
            return None;
        }
        let click = Point::new(x, y);
        self.cursor = click;
        let t = self.clock.session_time(now_ms);
        Some(apply_click(
            self.director.as_mut(),
            &mut self.metrics,
            click,
            t,
            &mut self.rng,
        ))
    }

    pub fn tick(&mut self, now_ms: f64) -> DrillTick {
        match self.clock.tick(now_ms) {
            ClockTick::Inactive => DrillTick::Inactive,
            ClockTick::Running {
                elapsed_ms,
                remaining_ms,
            } => {
                self.step(elapsed_ms);
                DrillTick::Running { remaining_ms }
            }
            ClockTick::Ended { elapsed_ms } => {
                self.step(elapsed_ms);
                let results = self.finalize(elapsed_ms);
                self.results = Some(results.clone());
                DrillTick::Ended(results)
            }
        }
    }

    /// At most one step per distinct session time; a repeated tick is ignored
    fn step(&mut self, t: f64) {
        if self.last_step_ms.is_some_and(|last| t <= last) {
            return;
        }
        self.last_step_ms = Some(t);
        let report = self.director.on_tick(t, &mut self.rng);
        if !report.expired.is_empty() {
            debug!(count = report.expired.len(), "targets expired");
            self.metrics.record_expired(report.expired.len());
        }
        self.metrics.record_idle_switches(report.idle_switches);

        if let Some(focus) = self.director.focus(self.cursor) {
            let sample = self.motion.record(t, self.cursor, focus);
            if self.settings.mode == TestMode::Track {
                self.metrics.record_tracking_tick(sample.on_target);
            }
        }
    }

    fn finalize(&self, elapsed_ms: f64) -> SessionMetrics {
        let motion = (self.settings.mode == TestMode::Calibration).then(|| self.motion.analyze());
        let results = self.metrics.finalize(self.settings.mode, elapsed_ms, motion);
        info!(
            score = results.score,
            accuracy = results.accuracy_pct,
            hits = results.total_hits,
            shots = results.total_shots,
            "drill finished"
        );
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Difficulty;

    fn drill(mode: TestMode) -> Drill {
        Drill::with_seed(
            DrillSettings::new(mode, Difficulty::Easy, 1.0),
            Arena::default(),
            17,
        )
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut d = drill(TestMode::Gridshot);
        assert!(d.start(0.0));
        assert!(!d.start(10.0));
    }

    #[test]
    fn test_click_before_start_is_noop() {
        let mut d = drill(TestMode::Gridshot);
        assert_eq!(d.on_click(10.0, 10.0, 0.0), None);
        assert_eq!(d.running_metrics().total_shots, 0);
    }

    #[test]
    fn test_click_while_paused_is_noop() {
        let mut d = drill(TestMode::Flick);
        d.start(0.0);
        d.pause(100.0);
        assert_eq!(d.on_click(10.0, 10.0, 150.0), None);
        assert_eq!(d.running_metrics().total_shots, 0);
    }

    #[test]
    fn test_runs_to_completion_and_finalizes() {
        let mut d = drill(TestMode::Gridshot);
        d.start(0.0);
        let mut ended = None;
        for i in 1..=70 {
            if let DrillTick::Ended(m) = d.tick(i as f64 * 16.0) {
                ended = Some(m);
                break;
            }
        }
        let m = ended.expect("drill should end after its duration");
        assert_eq!(m.elapsed_ms, 1000.0);
        assert!(d.has_finished());
        assert_eq!(d.results(), Some(&m));
        assert_eq!(d.tick(2000.0), DrillTick::Inactive);
    }

    #[test]
    fn test_repeated_tick_is_one_step() {
        let mut d = drill(TestMode::Track);
        d.start(0.0);
        for i in 1..=10 {
            let now = i as f64 * 16.0;
            let p = d.targets()[0].position;
            d.on_cursor_move(p.x, p.y);
            d.tick(now);
            d.tick(now);
        }
        assert_eq!(d.samples().len(), 10);
        assert!(d
            .samples()
            .windows(2)
            .all(|w| w[1].t_offset_ms > w[0].t_offset_ms));
        assert!((d.running_metrics().tracking_accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exit_discards_in_flight_state() {
        let mut d = drill(TestMode::Gridshot);
        d.start(0.0);
        d.tick(16.0);
        d.on_click(-100.0, -100.0, 20.0);
        d.exit();
        assert_eq!(d.state(), SessionState::Idle);
        assert!(d.targets().is_empty());
        assert!(d.samples().is_empty());
        assert_eq!(d.running_metrics().total_shots, 0);
        assert!(d.results().is_none());
        assert!(d.start(100.0));
    }

    #[test]
    fn test_resize_only_when_idle() {
        let mut d = drill(TestMode::Flick);
        assert!(d.resize(Arena::new(400.0, 320.0)));
        assert_eq!(d.cursor(), Point::new(200.0, 160.0));
        d.start(0.0);
        assert!(!d.resize(Arena::default()));
        assert_eq!(d.arena(), Arena::new(400.0, 320.0));
    }

    #[test]
    fn test_pause_does_not_age_targets() {
        let mut d = drill(TestMode::Gridshot);
        d.start(0.0);
        let first = d.targets()[0].id;
        d.pause(100.0);
        d.resume(10_000.0);
        d.tick(10_050.0);
        // only 150ms of session time has passed; the first target is still live
        assert!(d.targets().iter().any(|t| t.id == first));
    }

    #[test]
    fn test_calibration_results_include_motion() {
        let mut d = drill(TestMode::Calibration);
        d.start(0.0);
        let mut i = 1;
        let m = loop {
            d.on_cursor_move(i as f64 * 3.0, 300.0);
            if let DrillTick::Ended(m) = d.tick(i as f64 * 16.0) {
                break m;
            }
            i += 1;
        };
        assert!(m.motion.is_some());
        assert!(!d.samples().is_empty());
    }
}
