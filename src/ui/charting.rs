/// Reaction time per hit, as (hit number, ms) chart points
pub fn reaction_series(reaction_times_ms: &[f64]) -> Vec<(f64, f64)> {
    reaction_times_ms
        .iter()
        .enumerate()
        .map(|(i, &ms)| ((i + 1) as f64, ms))
        .collect()
}

/// Compute X (hit number) and Y (reaction ms) bounds for the results chart
pub fn compute_chart_params(coords: &[(f64, f64)]) -> (f64, f64) {
    let highest = coords.iter().map(|&(_, y)| y).fold(0.0, f64::max);
    let last = coords.last().map(|&(x, _)| x).unwrap_or(1.0);
    (last.max(2.0), highest.ceil().max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
