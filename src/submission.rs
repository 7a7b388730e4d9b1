//! Records handed to the persistence collaborator once a session or a
//! calibration sub-test is over. Field names follow the camelCase contract
//! of the results endpoint; arrays stay typed until the storage edge.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calibration::{CalibrationRun, CM_PER_INCH};
use crate::error::{ReticleError, Result};
use crate::geometry::Point;
use crate::metrics::SessionMetrics;
use crate::mode::{Difficulty, DrillSettings, TestMode};

pub const CALIBRATION_TEST_TYPE: &str = "circle-tracking";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSubmission {
    pub test_mode: TestMode,
    pub difficulty: Difficulty,
    /// Seconds
    pub duration: f64,
    pub target_size: f64,
    pub score: u64,
    pub accuracy: f64,
    pub total_shots: u32,
    pub total_hits: u32,
    pub total_misses: u32,
    pub average_reaction_time: f64,
    pub kills_per_second: f64,
    pub consistency: f64,
    pub streak_best: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flick_distance: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_speed: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_positions: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miss_positions: Option<Vec<Point>>,
}

fn non_empty<T: Clone>(v: &[T]) -> Option<Vec<T>> {
    (!v.is_empty()).then(|| v.to_vec())
}

impl ResultSubmission {
    pub fn from_metrics(settings: &DrillSettings, metrics: &SessionMetrics) -> Self {
        Self {
            test_mode: metrics.mode,
            difficulty: settings.difficulty,
            duration: settings.duration_secs,
            target_size: settings.target_size,
            score: metrics.score,
            accuracy: metrics.accuracy_pct,
            total_shots: metrics.total_shots,
            total_hits: metrics.total_hits,
            total_misses: metrics.total_misses,
            average_reaction_time: metrics.avg_reaction_ms,
            kills_per_second: metrics.kills_per_second,
            consistency: metrics.consistency_pct,
            streak_best: metrics.streak_best,
            flick_distance: non_empty(&metrics.flick_distances),
            tracking_accuracy: metrics.tracking_accuracy_pct,
            switch_speed: non_empty(&metrics.switch_speeds_ms),
            hit_positions: non_empty(&metrics.hit_positions),
            miss_positions: non_empty(&metrics.miss_positions),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_shots != self.total_hits + self.total_misses {
            return Err(ReticleError::Validation(format!(
                "totalShots ({}) must equal totalHits ({}) + totalMisses ({})",
                self.total_shots, self.total_hits, self.total_misses
            )));
        }
        if !(0.0..=100.0).contains(&self.accuracy) {
            return Err(ReticleError::Validation(format!(
                "accuracy {} is outside 0..=100",
                self.accuracy
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSubmission {
    pub user_id: String,
    pub test_type: String,
    pub dpi: u32,
    pub in_game_sensitivity: f64,
    pub inches_per_360: f64,
    pub accuracy_percentage: f64,
    pub reaction_time_ms: f64,
    pub consistency_score: f64,
    pub path_efficiency: f64,
    pub movement_smoothness: f64,
    pub overshoot_rate: f64,
    pub undershoot_rate: f64,
    pub correction_rate: f64,
    pub prediction_accuracy: f64,
}

impl CalibrationSubmission {
    pub fn new(user_id: &str, run: &CalibrationRun) -> Self {
        Self {
            user_id: user_id.to_string(),
            test_type: CALIBRATION_TEST_TYPE.to_string(),
            dpi: run.dpi,
            in_game_sensitivity: run.sensitivity,
            inches_per_360: run.inches_per_360(),
            accuracy_percentage: run.accuracy_pct,
            reaction_time_ms: run.reaction_time_ms,
            consistency_score: run.consistency_pct,
            path_efficiency: run.path_efficiency_pct,
            movement_smoothness: run.movement_smoothness_pct,
            overshoot_rate: run.overshoot_rate,
            undershoot_rate: run.undershoot_rate,
            correction_rate: run.correction_rate,
            prediction_accuracy: run.prediction_accuracy_pct,
        }
    }

    pub fn to_run(&self) -> CalibrationRun {
        CalibrationRun {
            dpi: self.dpi,
            sensitivity: self.in_game_sensitivity,
            cm_per_360: self.inches_per_360 * CM_PER_INCH,
            accuracy_pct: self.accuracy_percentage,
            consistency_pct: self.consistency_score,
            reaction_time_ms: self.reaction_time_ms,
            path_efficiency_pct: self.path_efficiency,
            movement_smoothness_pct: self.movement_smoothness,
            overshoot_rate: self.overshoot_rate,
            undershoot_rate: self.undershoot_rate,
            correction_rate: self.correction_rate,
            prediction_accuracy_pct: self.prediction_accuracy,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(ReticleError::Validation("userId is empty".to_string()));
        }
        if self.dpi == 0 || self.in_game_sensitivity <= 0.0 {
            return Err(ReticleError::Validation(format!(
                "dpi ({}) and sensitivity ({}) must be positive",
                self.dpi, self.in_game_sensitivity
            )));
        }
        Ok(())
    }
}

/// Whatever stores finished sessions. Returns the stored record id.
pub trait ResultSink {
    fn submit_result(&mut self, result: &ResultSubmission) -> Result<i64>;
    fn submit_calibration(&mut self, run: &CalibrationSubmission) -> Result<i64>;
}

/// Fire-and-forget: failures are logged and swallowed so the caller's
/// in-memory results are never affected.
pub fn submit_or_log(sink: &mut dyn ResultSink, result: &ResultSubmission) -> Option<i64> {
    match result.validate().and_then(|_| sink.submit_result(result)) {
        Ok(id) => {
            debug!(id, mode = %result.test_mode, "result stored");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, mode = %result.test_mode, "failed to submit result");
            None
        }
    }
}

pub fn submit_calibration_or_log(
    sink: &mut dyn ResultSink,
    run: &CalibrationSubmission,
) -> Option<i64> {
    match run.validate().and_then(|_| sink.submit_calibration(run)) {
        Ok(id) => {
            debug!(id, dpi = run.dpi, sensitivity = run.in_game_sensitivity, "calibration run stored");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, dpi = run.dpi, "failed to submit calibration run");
            None
        }
    }
}
