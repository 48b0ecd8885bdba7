//! Adaptive energy thresholds
//!
//! Absolute chroma energy varies per recording (microphone gain, mix level),
//! so every voiced/silent decision is made against a threshold derived from
//! the recording's own energy distribution.

/// Energy at or below this is treated as exact silence by the voiced test
pub const SILENCE_EPSILON: f32 = 1e-6;

/// Median of a set of values (`None` when empty)
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let median = if sorted.len() % 2 == 0 {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) * 0.5
    } else {
        sorted[sorted.len() / 2]
    };
    Some(median)
}

/// Percentile of a set of values with linear interpolation between order statistics
///
/// # Arguments
///
/// * `values` - Energies to threshold
/// * `percentile` - Percentile in [0, 100], e.g. 25.0
///
/// # Returns
///
/// `None` when `values` is empty; the percentile is clamped into [0, 100].
pub fn percentile(values: &[f32], percentile: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (percentile.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median-scaled threshold: `median(values) × scale`, or `fallback` when empty
pub fn median_scaled_threshold(values: &[f32], scale: f32, fallback: f32) -> f32 {
    median(values).map(|m| m * scale).unwrap_or(fallback)
}

/// Voiced test against a percentile threshold
///
/// A frame is voiced when its energy reaches the threshold and is not exact
/// silence. Using `>=` keeps recordings with perfectly flat energy voiced.
pub fn is_voiced(energy: f32, threshold: f32) -> bool {
    energy >= threshold && energy > SILENCE_EPSILON
}

/// Population standard deviation (0 for fewer than 2 values)
pub fn std_dev(values: &[f32]) -> f32 {
    variance(values).sqrt()
}

/// Population variance (0 for fewer than 2 values)
pub fn variance(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var as f32
}

/// Arithmetic mean (0 for an empty slice)
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32
}
