use serde::Serialize;

use crate::geometry::Point;
use crate::mode::TestMode;
use crate::motion::MotionAnalysis;
use crate::util::{consistency_pct, mean, percentage};

const TRACKING_STEP: f64 = 0.1;
const TRACKING_CAP: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HitEvent {
    pub reaction_ms: f64,
    /// Click position relative to the target centre
    pub offset: Point,
    pub flick_distance: Option<f64>,
    pub switch_interval_ms: Option<f64>,
    pub score_delta: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissEvent {
    pub position: Point,
    /// Distance to the nearest live target centre, if any target was live
    pub nearest_distance: Option<f64>,
}

/// Running totals for one session
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    pub total_shots: u32,
    pub total_hits: u32,
    pub total_misses: u32,
    pub streak: u32,
    pub streak_best: u32,
    pub score: u64,
    pub reaction_times_ms: Vec<f64>,
    pub flick_distances: Vec<f64>,
    pub switch_speeds_ms: Vec<f64>,
    pub hit_positions: Vec<Point>,
    pub miss_positions: Vec<Point>,
    pub miss_distances: Vec<f64>,
    pub expired_targets: u32,
    pub idle_switches: u32,
    pub tracking_accuracy: f64,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self, hit: HitEvent) {
        self.total_shots += 1;
        self.total_hits += 1;
        self.streak += 1;
        self.streak_best = self.streak_best.max(self.streak);
        self.score += hit.score_delta;
        self.reaction_times_ms.push(hit.reaction_ms);
        self.hit_positions.push(hit.offset);
        if let Some(d) = hit.flick_distance {
            self.flick_distances.push(d);
        }
        if let Some(interval) = hit.switch_interval_ms {
            self.switch_speeds_ms.push(interval);
        }
    }

    pub fn record_miss(&mut self, miss: MissEvent) {
        self.total_shots += 1;
        self.total_misses += 1;
        self.streak = 0;
        self.miss_positions.push(miss.position);
        if let Some(d) = miss.nearest_distance {
            self.miss_distances.push(d);
        }
    }

    /// Expired targets are tracked apart from misses: they are not shots
    pub fn record_expired(&mut self, count: usize) {
        self.expired_targets += count as u32;
    }

    pub fn record_idle_switches(&mut self, count: u32) {
        self.idle_switches += count;
    }

    pub fn record_tracking_tick(&mut self, on_target: bool) {
        if on_target {
            self.tracking_accuracy = (self.tracking_accuracy + TRACKING_STEP).min(TRACKING_CAP);
        }
    }

    pub fn accuracy_pct(&self) -> f64 {
        percentage(self.total_hits as f64, self.total_shots as f64)
    }

    pub fn finalize(
        &self,
        mode: TestMode,
        elapsed_ms: f64,
        motion: Option<MotionAnalysis>,
    ) -> SessionMetrics {
        let elapsed_secs = elapsed_ms / 1000.0;
        let tracking_accuracy_pct = (mode == TestMode::Track).then_some(self.tracking_accuracy);
        let tracking_bonus = tracking_accuracy_pct
            .map(|t| (t * 10.0).floor() as u64)
            .unwrap_or(0);

        SessionMetrics {
            mode,
            total_shots: self.total_shots,
            total_hits: self.total_hits,
            total_misses: self.total_misses,
            reaction_times_ms: self.reaction_times_ms.clone(),
            streak_best: self.streak_best,
            accuracy_pct: self.accuracy_pct(),
            avg_reaction_ms: mean(&self.reaction_times_ms).unwrap_or(0.0),
            kills_per_second: if elapsed_secs > 0.0 {
                self.total_hits as f64 / elapsed_secs
            } else {
                0.0
            },
            consistency_pct: consistency_pct(&self.reaction_times_ms),
            score: self.score + tracking_bonus,
            elapsed_ms,
            expired_targets: self.expired_targets,
            flick_distances: self.flick_distances.clone(),
            switch_speeds_ms: self.switch_speeds_ms.clone(),
            tracking_accuracy_pct,
            hit_positions: self.hit_positions.clone(),
            miss_positions: self.miss_positions.clone(),
            motion,
        }
    }
}

/// Derived once, when the session ends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub mode: TestMode,
    pub total_shots: u32,
    pub total_hits: u32,
    pub total_misses: u32,
    pub reaction_times_ms: Vec<f64>,
    pub streak_best: u32,
    pub accuracy_pct: f64,
    pub avg_reaction_ms: f64,
    pub kills_per_second: f64,
    pub consistency_pct: f64,
    pub score: u64,
    pub elapsed_ms: f64,
    pub expired_targets: u32,
    pub flick_distances: Vec<f64>,
    pub switch_speeds_ms: Vec<f64>,
    pub tracking_accuracy_pct: Option<f64>,
    pub hit_positions: Vec<Point>,
    pub miss_positions: Vec<Point>,
    /// Present for the calibration drill
    pub motion: Option<MotionAnalysis>,
}
