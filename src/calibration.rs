//! Sensitivity calibration: a series of circle-tracking sub-tests, one per
//! (dpi, sensitivity) configuration, each producing an immutable
//! [`CalibrationRun`].

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::drill::{Drill, DrillTick};
use crate::error::{ReticleError, Result};
use crate::geometry::Arena;
use crate::hit_policy::ClickOutcome;
use crate::metrics::SessionMetrics;
use crate::mode::{Difficulty, DrillSettings, TestMode};

pub const DEFAULT_MULTIPLIERS: [f64; 5] = [0.6, 0.8, 1.0, 1.2, 1.4];
pub const CM_PER_INCH: f64 = 2.54;

/// Physical mouse travel for a full 360° turn, assuming one degree per count
pub fn cm_per_360(dpi: u32, sensitivity: f64) -> f64 {
    let counts_per_inch = dpi as f64 * sensitivity;
    if counts_per_inch > 0.0 {
        360.0 / counts_per_inch * CM_PER_INCH
    } else {
        0.0
    }
}

/// In-game sensitivity that yields `cm360` at the given DPI
pub fn sensitivity_for(dpi: u32, cm360: f64) -> f64 {
    let inches = cm360 / CM_PER_INCH;
    if dpi > 0 && inches > 0.0 {
        360.0 / (dpi as f64 * inches)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPlan {
    pub dpi: u32,
    pub base_sensitivity: f64,
    pub multipliers: Vec<f64>,
}

impl CalibrationPlan {
    pub fn new(dpi: u32, base_sensitivity: f64) -> Self {
        Self {
            dpi,
            base_sensitivity,
            multipliers: DEFAULT_MULTIPLIERS.to_vec(),
        }
    }

    /// Calibration cannot run without the user's current DPI and sensitivity
    pub fn from_config(config: &Config) -> Result<Self> {
        let dpi = config
            .dpi
            .filter(|d| *d > 0)
            .ok_or_else(|| ReticleError::ConfigurationMissing("dpi".to_string()))?;
        let sensitivity = config
            .sensitivity
            .filter(|s| *s > 0.0)
            .ok_or_else(|| ReticleError::ConfigurationMissing("sensitivity".to_string()))?;
        Ok(Self::new(dpi, sensitivity))
    }

    pub fn settings(&self) -> Vec<(u32, f64)> {
        self.multipliers
            .iter()
            .map(|m| (self.dpi, self.base_sensitivity * m))
            .collect()
    }
}

/// Outcome of one calibration sub-test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRun {
    pub dpi: u32,
    pub sensitivity: f64,
    pub cm_per_360: f64,
    pub accuracy_pct: f64,
    pub consistency_pct: f64,
    pub reaction_time_ms: f64,
    pub path_efficiency_pct: f64,
    pub movement_smoothness_pct: f64,
    pub overshoot_rate: f64,
    pub undershoot_rate: f64,
    pub correction_rate: f64,
    pub prediction_accuracy_pct: f64,
}

impl CalibrationRun {
    /// Rates are events per second of active drill time
    pub fn from_metrics(dpi: u32, sensitivity: f64, metrics: &SessionMetrics) -> Self {
        let motion = metrics.motion.unwrap_or_default();
        let secs = metrics.elapsed_ms / 1000.0;
        let rate = |count: u32| {
            if secs > 0.0 {
                count as f64 / secs
            } else {
                0.0
            }
        };
        Self {
            dpi,
            sensitivity,
            cm_per_360: cm_per_360(dpi, sensitivity),
            accuracy_pct: metrics.accuracy_pct,
            consistency_pct: metrics.consistency_pct,
            reaction_time_ms: metrics.avg_reaction_ms,
            path_efficiency_pct: motion.path_efficiency_pct,
            movement_smoothness_pct: motion.movement_smoothness_pct,
            overshoot_rate: rate(motion.overshoots),
            undershoot_rate: rate(motion.undershoots),
            correction_rate: rate(motion.corrections),
            prediction_accuracy_pct: motion.prediction_accuracy_pct,
        }
    }

    pub fn inches_per_360(&self) -> f64 {
        self.cm_per_360 / CM_PER_INCH
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationTick {
    Inactive,
    Running { remaining_ms: f64 },
    /// A sub-test ended; the next one is waiting to be started
    SubtestFinished(CalibrationRun),
    /// The last sub-test ended
    Complete(CalibrationRun),
}

/// Owns every piece of state for one calibration run; nothing outlives it
#[derive(Debug)]
pub struct CalibrationSession {
    plan: CalibrationPlan,
    settings: Vec<(u32, f64)>,
    difficulty: Difficulty,
    subtest_secs: f64,
    arena: Arena,
    step: usize,
    drill: Drill,
    runs: Vec<CalibrationRun>,
}

impl CalibrationSession {
    pub fn new(plan: CalibrationPlan, difficulty: Difficulty, subtest_secs: f64, arena: Arena) -> Self {
        let settings = plan.settings();
        let drill = Drill::new(Self::drill_settings(difficulty, subtest_secs), arena);
        Self {
            plan,
            settings,
            difficulty,
            subtest_secs,
            arena,
            step: 0,
            drill,
            runs: Vec::new(),
        }
    }

    fn drill_settings(difficulty: Difficulty, subtest_secs: f64) -> DrillSettings {
        DrillSettings::new(TestMode::Calibration, difficulty, subtest_secs)
    }

    pub fn plan(&self) -> &CalibrationPlan {
        &self.plan
    }

    pub fn drill(&self) -> &Drill {
        &self.drill
    }

    pub fn runs(&self) -> &[CalibrationRun] {
        &self.runs
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn total_steps(&self) -> usize {
        self.settings.len()
    }

    pub fn is_complete(&self) -> bool {
        self.step >= self.settings.len()
    }

    /// The (dpi, sensitivity) the user should have set for the current sub-test
    pub fn current_setting(&self) -> Option<(u32, f64)> {
        self.settings.get(self.step).copied()
    }

    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.is_complete() {
            return false;
        }
        self.drill.start(now_ms)
    }

    pub fn pause(&mut self, now_ms: f64) -> bool {
        self.drill.pause(now_ms)
    }

    pub fn resume(&mut self, now_ms: f64) -> bool {
        self.drill.resume(now_ms)
    }

    /// Abandon the current sub-test; finished runs are kept
    pub fn exit(&mut self) {
        self.drill.exit();
    }

    /// Applies to the current sub-test if it has not started, and to every later one
    pub fn resize(&mut self, arena: Arena) {
        self.arena = arena;
        self.drill.resize(arena);
    }

    pub fn on_cursor_move(&mut self, x: f64, y: f64) {
        self.drill.on_cursor_move(x, y);
    }

    pub fn on_click(&mut self, x: f64, y: f64, now_ms: f64) -> Option<ClickOutcome> {
        self.drill.on_click(x, y, now_ms)
    }

    pub fn tick(&mut self, now_ms: f64) -> CalibrationTick {
        match self.drill.tick(now_ms) {
            DrillTick::Inactive => CalibrationTick::Inactive,
            DrillTick::Running { remaining_ms } => CalibrationTick::Running { remaining_ms },
            DrillTick::Ended(metrics) => {
                let Some((dpi, sensitivity)) = self.current_setting() else {
                    return CalibrationTick::Inactive;
                };
                let run = CalibrationRun::from_metrics(dpi, sensitivity, &metrics);
                info!(
                    step = self.step,
                    dpi,
                    sensitivity,
                    cm_per_360 = run.cm_per_360,
                    "calibration sub-test finished"
                );
                self.runs.push(run.clone());
                self.step += 1;
                if self.is_complete() {
                    CalibrationTick::Complete(run)
                } else {
                    self.drill = Drill::new(
                        Self::drill_settings(self.difficulty, self.subtest_secs),
                        self.arena,
                    );
                    CalibrationTick::SubtestFinished(run)
                }
            }
        }
    }
}
