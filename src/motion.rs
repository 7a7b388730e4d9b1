//! Per-tick cursor/target sampling and the movement analysis built on it.
//!
//! Overshoot, undershoot and correction are inferred online from a short
//! trailing window as samples arrive. Path efficiency, smoothness and
//! prediction accuracy are computed over the whole sequence at session end.

use serde::Serialize;

use crate::geometry::{distance, Point};
use crate::target::Target;
use crate::util::{mean, percentage};

const UNDERSHOOT_SPEED: f64 = 50.0;
const UNDERSHOOT_RADIUS_FACTOR: f64 = 1.2;
const OVERSHOOT_FACTOR: f64 = 1.5;
const CORRECTION_MIN_SPEED: f64 = 100.0;
const CORRECTION_WINDOW: usize = 4;
const SMOOTHNESS_MIN_SPEED: f64 = 10.0;
const PREDICTION_LOOKAHEAD: usize = 5;
const PREDICTION_MIN_TRAVEL: f64 = 5.0;
const PREDICTION_DEFAULT: f64 = 50.0;

/// One immutable per-tick record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub t_offset_ms: f64,
    pub cursor: Point,
    pub target: Point,
    pub distance: f64,
    pub velocity_px_per_sec: f64,
    pub on_target: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionAnalysis {
    pub overshoots: u32,
    pub undershoots: u32,
    pub corrections: u32,
    pub path_efficiency_pct: f64,
    pub movement_smoothness_pct: f64,
    pub prediction_accuracy_pct: f64,
}

/// Append-only sample log for one session
#[derive(Debug, Clone, Default)]
pub struct MotionCollector {
    samples: Vec<Sample>,
    overshoots: u32,
    undershoots: u32,
    corrections: u32,
}

impl MotionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Record the cursor against the focused target and run the online detectors.
    pub fn record(&mut self, t_offset_ms: f64, cursor: Point, target: &Target) -> Sample {
        let velocity = match self.samples.last() {
            Some(prev) if t_offset_ms > prev.t_offset_ms => {
                distance(cursor, prev.cursor) / ((t_offset_ms - prev.t_offset_ms) / 1000.0)
            }
            Some(prev) => prev.velocity_px_per_sec,
            None => 0.0,
        };
        let d = distance(cursor, target.position);
        let sample = Sample {
            t_offset_ms,
            cursor,
            target: target.position,
            distance: d,
            velocity_px_per_sec: velocity,
            on_target: d <= target.radius(),
        };
        self.samples.push(sample);

        if self.detect_overshoot() {
            self.overshoots += 1;
        }
        if self.detect_undershoot(target.radius()) {
            self.undershoots += 1;
        }
        if self.detect_correction() {
            self.corrections += 1;
        }
        sample
    }

    /// Three-sample approach followed by recession that lands well past the closest point
    fn detect_overshoot(&self) -> bool {
        let n = self.samples.len();
        if n < 4 {
            return false;
        }
        let d: Vec<f64> = self.samples[n - 4..].iter().map(|s| s.distance).collect();
        let approached = d[0] > d[1] && d[1] > d[2];
        let receded = d[2] < d[3];
        let window_min = d.iter().copied().fold(f64::INFINITY, f64::min);
        approached && receded && d[3] > OVERSHOOT_FACTOR * window_min
    }

    /// Cursor just slowed to a near stop while still short of the target after approaching.
    /// Counted once per slowdown, on the tick the speed drops below the threshold.
    fn detect_undershoot(&self, radius: f64) -> bool {
        let n = self.samples.len();
        if n < 3 {
            return false;
        }
        let window = &self.samples[n - 3..];
        let (first, prev, last) = (window[0], window[1], window[2]);
        last.velocity_px_per_sec < UNDERSHOOT_SPEED
            && prev.velocity_px_per_sec >= UNDERSHOOT_SPEED
            && last.distance > UNDERSHOOT_RADIUS_FACTOR * radius
            && first.distance > last.distance
    }

    /// Sharp, fast re-acceleration relative to the recent average speed
    fn detect_correction(&self) -> bool {
        let n = self.samples.len();
        if n < CORRECTION_WINDOW + 1 {
            return false;
        }
        let v_now = self.samples[n - 1].velocity_px_per_sec;
        let v_prev = self.samples[n - 2].velocity_px_per_sec;
        let recent: Vec<f64> = self.samples[n - 1 - CORRECTION_WINDOW..n - 1]
            .iter()
            .map(|s| s.velocity_px_per_sec)
            .collect();
        let avg = mean(&recent).unwrap_or(0.0);
        (v_now - v_prev).abs() > 2.0 * avg && v_now > CORRECTION_MIN_SPEED
    }

    pub fn analyze(&self) -> MotionAnalysis {
        MotionAnalysis {
            overshoots: self.overshoots,
            undershoots: self.undershoots,
            corrections: self.corrections,
            path_efficiency_pct: path_efficiency(&self.samples),
            movement_smoothness_pct: movement_smoothness(&self.samples),
            prediction_accuracy_pct: prediction_accuracy(&self.samples),
        }
    }
}

/// Shortest path to the (possibly moving) target over the path actually taken, capped at 100
pub fn path_efficiency(samples: &[Sample]) -> f64 {
    let (optimal, actual) = samples
        .windows(2)
        .fold((0.0, 0.0), |(optimal, actual), w| {
            (
                optimal + distance(w[0].cursor, w[1].target),
                actual + distance(w[0].cursor, w[1].cursor),
            )
        });
    percentage(optimal, actual).min(100.0)
}

/// Mean of `1 - jerk / local mean speed` over three-sample windows, skipping near-stationary ones
pub fn movement_smoothness(samples: &[Sample]) -> f64 {
    let scores: Vec<f64> = samples
        .windows(3)
        .filter_map(|w| {
            let (v0, v1, v2) = (
                w[0].velocity_px_per_sec,
                w[1].velocity_px_per_sec,
                w[2].velocity_px_per_sec,
            );
            let local_mean = (v0 + v1 + v2) / 3.0;
            if local_mean <= SMOOTHNESS_MIN_SPEED {
                return None;
            }
            let jerk = ((v1 - v0).abs() + (v2 - v1).abs()) / local_mean;
            Some((1.0 - jerk).max(0.0))
        })
        .collect();
    mean(&scores).map(|m| m * 100.0).unwrap_or(0.0)
}

/// How well the player's movement heading matches where the target is heading.
/// Only windows where the target travels noticeably count; 50 when none do.
pub fn prediction_accuracy(samples: &[Sample]) -> f64 {
    if samples.len() <= PREDICTION_LOOKAHEAD {
        return PREDICTION_DEFAULT;
    }
    let scores: Vec<f64> = samples
        .windows(PREDICTION_LOOKAHEAD + 1)
        .filter_map(|w| {
            let (start, end) = (w[0], w[PREDICTION_LOOKAHEAD]);
            let target_move = end.target.offset_from(start.target);
            if target_move.x.abs() <= PREDICTION_MIN_TRAVEL
                && target_move.y.abs() <= PREDICTION_MIN_TRAVEL
            {
                return None;
            }
            let player_move = end.cursor.offset_from(start.cursor);
            if player_move.x == 0.0 && player_move.y == 0.0 {
                return Some(0.0);
            }
            let delta = player_move.y.atan2(player_move.x) - target_move.y.atan2(target_move.x);
            Some(delta.cos().max(0.0))
        })
        .collect();
    mean(&scores)
        .map(|m| m * 100.0)
        .unwrap_or(PREDICTION_DEFAULT)
}
