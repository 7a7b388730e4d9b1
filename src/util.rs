pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / count as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 && numerator.is_finite() {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

/// Coefficient-of-variation consistency: 100 minus the relative spread, floored at 0.
/// Fewer than two samples carry no spread information and yield 0.
pub fn consistency_pct(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    match (mean(data), std_dev(data)) {
        (Some(m), Some(sd)) if m > 0.0 => (100.0 - sd / m * 100.0).clamp(0.0, 100.0),
        _ => 0.0,
    }
}
