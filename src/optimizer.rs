//! Cross-session sensitivity recommendation.
//!
//! Pure and synchronous: given the persisted calibration runs, the DPI the
//! user plays at and a game profile, it ranks the runs by a weighted score and
//! derives the in-game sensitivity that reproduces the best runs' cm/360.
//! The DPI is never changed.

use itertools::Itertools;
use serde::Serialize;
use tracing::info;

use crate::calibration::{sensitivity_for, CalibrationRun};
use crate::profiles::GameProfile;

const TOP_RUNS: usize = 5;
const MIN_RUNS: usize = 2;
const REACTION_CEILING_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "kebab-case")]
pub enum MousepadSize {
    #[strum(serialize = "small (around 25x21 cm)")]
    Small,
    #[strum(serialize = "medium (around 45x40 cm)")]
    Medium,
    #[strum(serialize = "large (around 49x42 cm)")]
    Large,
    #[strum(serialize = "extended (90x40 cm or bigger)")]
    Extended,
}

impl MousepadSize {
    /// Low cm/360 needs little space; every band up asks for a bigger pad
    pub fn for_cm_per_360(cm360: f64) -> Self {
        if cm360 < 20.0 {
            MousepadSize::Small
        } else if cm360 < 35.0 {
            MousepadSize::Medium
        } else if cm360 < 50.0 {
            MousepadSize::Large
        } else {
            MousepadSize::Extended
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub dpi: u32,
    pub sensitivity: f64,
    pub cm_per_360: f64,
    pub confidence_pct: f64,
    pub mousepad_recommendation: MousepadSize,
    pub reasoning: String,
}

/// Weighted performance of one run under a profile.
/// A run without hits reports 0 ms and scores as the slowest reaction.
pub fn combined_score(run: &CalibrationRun, profile: &GameProfile) -> f64 {
    let w = profile.test_weights;
    let reaction_ms = if run.reaction_time_ms > 0.0 {
        run.reaction_time_ms.min(REACTION_CEILING_MS)
    } else {
        REACTION_CEILING_MS
    };
    let reaction_score = (REACTION_CEILING_MS - reaction_ms) / REACTION_CEILING_MS * 100.0;
    run.accuracy_pct * w.accuracy + reaction_score * w.reaction + run.consistency_pct * w.consistency
}

pub fn optimize(runs: &[CalibrationRun], dpi: u32, profile: &GameProfile) -> OptimizationResult {
    if runs.len() < MIN_RUNS {
        return neutral(runs.len(), dpi, profile);
    }

    let top: Vec<&CalibrationRun> = runs
        .iter()
        .map(|run| (run, combined_score(run, profile)))
        .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
        .take(TOP_RUNS.min(runs.len()))
        .map(|(run, _)| run)
        .collect();

    let top_count = top.len() as f64;
    let total_count = runs.len() as f64;
    let avg_cm360 = top.iter().map(|r| r.cm_per_360).sum::<f64>() / top_count;
    let sensitivity = sensitivity_for(dpi, avg_cm360);

    let consistency_factor = (top_count / 3.0).min(1.0);
    let confidence_pct = ((top_count / total_count) * consistency_factor * 100.0).min(100.0);

    let result = OptimizationResult {
        dpi,
        sensitivity,
        cm_per_360: avg_cm360,
        confidence_pct,
        mousepad_recommendation: MousepadSize::for_cm_per_360(avg_cm360),
        reasoning: reasoning(profile, dpi, avg_cm360, top.len(), runs.len()),
    };
    info!(
        game = %profile.id,
        dpi,
        sensitivity = result.sensitivity,
        cm_per_360 = result.cm_per_360,
        confidence = result.confidence_pct,
        "sensitivity recommendation computed"
    );
    result
}

/// Not enough data: aim for the middle of the game's preferred range
fn neutral(run_count: usize, dpi: u32, profile: &GameProfile) -> OptimizationResult {
    let cm360 = profile.optimal_range.midpoint();
    OptimizationResult {
        dpi,
        sensitivity: sensitivity_for(dpi, cm360),
        cm_per_360: cm360,
        confidence_pct: 0.0,
        mousepad_recommendation: MousepadSize::for_cm_per_360(cm360),
        reasoning: format!(
            "Only {run_count} calibration run(s) recorded; at least {MIN_RUNS} are needed. \
             Showing the middle of the {} range ({:.0}-{:.0} cm/360) as a starting point.",
            profile.name, profile.optimal_range.min, profile.optimal_range.max
        ),
    }
}

fn reasoning(profile: &GameProfile, dpi: u32, cm360: f64, top: usize, total: usize) -> String {
    let mut parts = vec![format!(
        "Your best {top} of {total} calibration runs averaged {cm360:.1} cm/360."
    )];
    let range = profile.optimal_range;
    if range.contains(cm360) {
        parts.push(format!(
            "That sits inside the typical {} range of {:.0}-{:.0} cm/360.",
            profile.name, range.min, range.max
        ));
    } else if cm360 < range.min {
        parts.push(format!(
            "That is faster than the typical {} range ({:.0}-{:.0} cm/360); consider testing lower sensitivities.",
            profile.name, range.min, range.max
        ));
    } else {
        parts.push(format!(
            "That is slower than the typical {} range ({:.0}-{:.0} cm/360); consider testing higher sensitivities.",
            profile.name, range.min, range.max
        ));
    }
    let dpi_range = profile.dpi_recommendation;
    if dpi < dpi_range.min || dpi > dpi_range.max {
        parts.push(format!(
            "Your DPI was kept at {dpi}, though {}-{} DPI is common for {}.",
            dpi_range.min, dpi_range.max, profile.name
        ));
    } else {
        parts.push(format!("Your DPI was kept at {dpi}."));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::lookup;

    fn run(cm_per_360: f64, accuracy_pct: f64, reaction_time_ms: f64) -> CalibrationRun {
        CalibrationRun {
            dpi: 800,
            sensitivity: 360.0 / (800.0 * cm_per_360 / 2.54),
            cm_per_360,
            accuracy_pct,
            consistency_pct: 80.0,
            reaction_time_ms,
            path_efficiency_pct: 70.0,
            movement_smoothness_pct: 60.0,
            overshoot_rate: 0.1,
            undershoot_rate: 0.1,
            correction_rate: 0.2,
            prediction_accuracy_pct: 50.0,
        }
    }

    #[test]
    fn test_run_without_hits_gets_no_reaction_credit() {
        let valorant = lookup("valorant").unwrap();
        let mut no_hits = run(30.0, 0.0, 0.0);
        no_hits.consistency_pct = 0.0;
        assert_eq!(combined_score(&no_hits, &valorant), 0.0);

        // a real but mediocre run outranks a run where nothing was hit
        let mut idle = run(55.0, 0.0, 0.0);
        idle.consistency_pct = 0.0;
        let played = run(30.0, 40.0, 600.0);
        assert!(combined_score(&played, &valorant) > combined_score(&idle, &valorant));
    }

    #[test]
    fn test_mousepad_bands() {
        assert_eq!(MousepadSize::for_cm_per_360(15.0), MousepadSize::Small);
        assert_eq!(MousepadSize::for_cm_per_360(20.0), MousepadSize::Medium);
        assert_eq!(MousepadSize::for_cm_per_360(40.0), MousepadSize::Large);
        assert_eq!(MousepadSize::for_cm_per_360(50.0), MousepadSize::Extended);
    }

    #[test]
    fn test_combined_score_caps_slow_reactions() {
        let profile = lookup("valorant").unwrap();
        let slow = combined_score(&run(30.0, 80.0, 5000.0), &profile);
        let slower = combined_score(&run(30.0, 80.0, 9000.0), &profile);
        assert_eq!(slow, slower);
    }

    #[test]
    fn test_sensitivity_from_average_cm360() {
        let profile = lookup("valorant").unwrap();
        let runs = vec![run(30.0, 90.0, 200.0), run(30.0, 85.0, 220.0)];
        let result = optimize(&runs, 800, &profile);
        assert_eq!(result.dpi, 800);
        assert!((result.sensitivity - 0.0381).abs() < 1e-4);
        assert_eq!(result.mousepad_recommendation, MousepadSize::Medium);
    }

    #[test]
    fn test_only_top_five_runs_count() {
        let profile = lookup("valorant").unwrap();
        let mut runs: Vec<CalibrationRun> = (0..5).map(|_| run(40.0, 95.0, 150.0)).collect();
        runs.extend((0..3).map(|_| run(10.0, 20.0, 900.0)));
        let result = optimize(&runs, 800, &profile);
        assert!((result.cm_per_360 - 40.0).abs() < 1e-9);
        assert!((result.confidence_pct - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_grows_with_run_count() {
        let profile = lookup("apex").unwrap();
        let two = optimize(&[run(25.0, 80.0, 250.0), run(27.0, 70.0, 260.0)], 1600, &profile);
        let three = optimize(
            &[run(25.0, 80.0, 250.0), run(27.0, 70.0, 260.0), run(26.0, 75.0, 240.0)],
            1600,
            &profile,
        );
        assert!((two.confidence_pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(three.confidence_pct, 100.0);
    }

    #[test]
    fn test_too_few_runs_is_neutral() {
        let profile = lookup("csgo").unwrap();
        for runs in [vec![], vec![run(30.0, 90.0, 200.0)]] {
            let result = optimize(&runs, 400, &profile);
            assert_eq!(result.dpi, 400);
            assert_eq!(result.confidence_pct, 0.0);
            assert_eq!(result.cm_per_360, 40.0);
            assert!(result.sensitivity > 0.0);
        }
    }

    #[test]
    fn test_idempotent() {
        let profile = lookup("valorant").unwrap();
        let runs = vec![run(30.0, 90.0, 200.0), run(45.0, 70.0, 300.0), run(35.0, 80.0, 250.0)];
        assert_eq!(optimize(&runs, 800, &profile), optimize(&runs, 800, &profile));
    }
}
