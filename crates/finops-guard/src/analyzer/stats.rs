//! Statistical helpers for baseline computation

/// True when every value equals the first one exactly
pub fn is_flat(values: &[f64]) -> bool {
    values
        .split_first()
        .map_or(true, |(first, rest)| rest.iter().all(|v| v == first))
}

/// Arithmetic mean. Returns 0.0 for an empty slice.
///
/// A flat slice returns its value unchanged; summing repeated values like
/// `0.1` would otherwise drift by a few ulps.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if is_flat(values) {
        return values[0];
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (n divisor).
///
/// Exactly 0.0 for an empty or flat slice, so callers can test for zero
/// variance with `==`.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if is_flat(values) {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Round to `decimals` places, half away from zero
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Round to cents
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}
