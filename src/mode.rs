use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Drill type; selects the target director once per session
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestMode {
    Gridshot,
    Flick,
    Track,
    Switch,
    Calibration,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

/// Velocity perturbation applied to a moving target every tick
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MotionProfile {
    Linear,
    Curved,
    Erratic,
    Chaotic,
}

/// Tunables for one drill. Built from mode + difficulty, then optionally
/// adjusted (target size override, motion profile) before the session starts.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillSettings {
    pub mode: TestMode,
    pub difficulty: Difficulty,
    pub duration_secs: f64,
    /// Target diameter in canvas pixels
    pub target_size: f64,
    // gridshot
    pub max_targets: usize,
    pub spawn_rate_ms: f64,
    /// Expiry for gridshot/flick targets; None means targets never expire
    pub target_lifetime_ms: Option<f64>,
    // flick
    pub min_distance: f64,
    // track
    pub track_speed: f64,
    pub max_speed: f64,
    pub motion_profile: MotionProfile,
    // switch
    pub total_targets: usize,
    pub switch_rate_ms: f64,
    // calibration orbit
    pub orbit_angular_speed: f64,
}

impl DrillSettings {
    pub fn new(mode: TestMode, difficulty: Difficulty, duration_secs: f64) -> Self {
        let level = match difficulty {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
            Difficulty::Expert => 3,
        };
        let pick = |table: [f64; 4]| table[level];

        let target_lifetime_ms = match mode {
            TestMode::Gridshot => Some(pick([3000.0, 2000.0, 1500.0, 1100.0])),
            TestMode::Flick => Some(pick([3000.0, 2200.0, 1600.0, 1200.0])),
            _ => None,
        };
        let track_speed = pick([120.0, 180.0, 260.0, 340.0]);

        Self {
            mode,
            difficulty,
            duration_secs,
            target_size: pick([80.0, 60.0, 45.0, 35.0]),
            max_targets: [3, 3, 4, 5][level],
            spawn_rate_ms: pick([800.0, 600.0, 450.0, 350.0]),
            target_lifetime_ms,
            min_distance: pick([200.0, 250.0, 300.0, 350.0]),
            track_speed,
            max_speed: track_speed * 2.0,
            motion_profile: [
                MotionProfile::Linear,
                MotionProfile::Curved,
                MotionProfile::Erratic,
                MotionProfile::Chaotic,
            ][level],
            total_targets: [3, 4, 5, 6][level],
            switch_rate_ms: pick([2500.0, 2000.0, 1500.0, 1100.0]),
            orbit_angular_speed: pick([0.8, 1.1, 1.4, 1.8]),
        }
    }

    pub fn with_target_size(mut self, size: Option<f64>) -> Self {
        if let Some(size) = size.filter(|s| *s > 0.0) {
            self.target_size = size;
        }
        self
    }

    pub fn with_motion_profile(mut self, profile: Option<MotionProfile>) -> Self {
        if let Some(profile) = profile {
            self.motion_profile = profile;
        }
        self
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_secs * 1000.0
    }
}
