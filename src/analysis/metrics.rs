//! Performance metrics along the alignment path
//!
//! - Note agreement: share of the user's peak energy on the expected pitch class
//! - Timing penalty: jitter (standard deviation) of the alignment delay
//! - Energy correlation: Pearson correlation of per-frame energies along the path
//! - Voiced frames and singing coverage against percentile thresholds

use crate::features::alignment::AlignmentPath;
use crate::features::chroma::{argmax, PitchClassMatrix};
use crate::features::recording::RecordingFeatures;
use crate::features::threshold::{is_voiced, percentile, std_dev};
use serde::{Deserialize, Serialize};

/// Metric extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Percentile of reference energy below which frames are unvoiced (default: 25.0)
    pub reference_voiced_percentile: f32,

    /// Percentile of user energy below which frames are unvoiced (default: 25.0)
    pub user_voiced_percentile: f32,

    /// Threshold used when a recording has no frames (default: 0.01)
    pub empty_threshold: f32,

    /// Expected-class energy ratio above which a frame counts as correct (default: 0.6)
    pub correct_energy_ratio: f32,

    /// Timing penalty per second of delay standard deviation (default: 8.0)
    pub timing_penalty_factor: f32,

    /// Maximum timing penalty (default: 10.0)
    pub timing_max_penalty: f32,

    /// Energy-correlation penalty weight (default: 3.5)
    pub energy_correlation_weight: f32,

    /// Fewer path samples than this give a correlation of 0 (default: 3)
    pub min_correlation_samples: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            reference_voiced_percentile: 25.0,
            user_voiced_percentile: 25.0,
            empty_threshold: 0.01,
            correct_energy_ratio: 0.6,
            timing_penalty_factor: 8.0,
            timing_max_penalty: 10.0,
            energy_correlation_weight: 3.5,
            min_correlation_samples: 3,
        }
    }
}

/// Adaptive voiced thresholds for both recordings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoicingThresholds {
    /// Reference energy threshold
    pub reference: f32,
    /// User energy threshold
    pub user: f32,
}

impl VoicingThresholds {
    /// Percentile thresholds over each recording's energy vector
    pub fn from_energies(reference: &[f32], user: &[f32], config: &MetricsConfig) -> Self {
        Self {
            reference: percentile(reference, config.reference_voiced_percentile)
                .unwrap_or(config.empty_threshold),
            user: percentile(user, config.user_voiced_percentile).unwrap_or(config.empty_threshold),
        }
    }

    /// `true` when both sides of a path pair are voiced
    pub fn both_voiced(&self, reference_energy: f32, user_energy: f32) -> bool {
        is_voiced(reference_energy, self.reference) && is_voiced(user_energy, self.user)
    }
}

/// Note-agreement statistics over voiced path frames
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoteAgreement {
    /// Mean expected-class energy ratio (0-1)
    pub score: f32,

    /// Number of qualifying frames
    pub frames: usize,

    /// Mean absolute pitch-class error in semitone-equivalents
    pub avg_pitch_error: f32,

    /// Fraction of qualifying frames counted correct
    pub correct_fraction: f32,
}

/// Note agreement between raw reference and (key-aligned) raw user frames
///
/// Only path frames where both sides are voiced qualify. For each, the ratio
/// `user[expected] / peak(user)` is taken; a frame is correct if the dominant
/// classes match or the ratio exceeds `correct_energy_ratio`.
///
/// # Returns
///
/// All-zero statistics when no frame qualifies.
pub fn note_agreement(
    reference_raw: &PitchClassMatrix,
    user_raw: &PitchClassMatrix,
    reference_energy: &[f32],
    user_energy: &[f32],
    path: &AlignmentPath,
    thresholds: &VoicingThresholds,
    config: &MetricsConfig,
) -> NoteAgreement {
    let mut ratio_sum = 0.0f64;
    let mut error_sum = 0.0f64;
    let mut correct = 0usize;
    let mut frames = 0usize;

    for (ri, ui) in path.iter() {
        let (Some(r), Some(u)) = (reference_raw.frame(ri), user_raw.frame(ui)) else {
            continue;
        };
        let (Some(&er), Some(&eu)) = (reference_energy.get(ri), user_energy.get(ui)) else {
            continue;
        };
        if !thresholds.both_voiced(er, eu) {
            continue;
        }

        let expected = argmax(r);
        let actual = argmax(u);
        let peak = u[actual] + 1e-8;
        let ratio = u[expected] / peak;

        ratio_sum += ratio as f64;
        error_sum += (expected as i32 - actual as i32).unsigned_abs() as f64;
        if expected == actual || ratio > config.correct_energy_ratio {
            correct += 1;
        }
        frames += 1;
    }

    if frames == 0 {
        return NoteAgreement::default();
    }

    let n = frames as f64;
    NoteAgreement {
        score: (ratio_sum / n) as f32,
        frames,
        avg_pitch_error: (error_sum / n) as f32,
        correct_fraction: correct as f32 / frames as f32,
    }
}

/// Timing penalty from alignment jitter
///
/// `min(std((userFrame − refFrame) · hop) · factor, cap)`; 0 for paths shorter than 2.
/// A constant offset has zero standard deviation and costs nothing.
pub fn timing_penalty(path: &AlignmentPath, hop_duration: f32, config: &MetricsConfig) -> f32 {
    if path.len() < 2 {
        return 0.0;
    }
    let delays: Vec<f32> = path
        .iter()
        .map(|(ri, ui)| (ui as f32 - ri as f32) * hop_duration)
        .collect();
    (std_dev(&delays) * config.timing_penalty_factor).min(config.timing_max_penalty)
}

/// Pearson correlation of reference and user energies along the path
///
/// Returns 0 with fewer than `min_samples` in-range pairs; clamped to [-1, 1].
pub fn energy_correlation(
    reference_energy: &[f32],
    user_energy: &[f32],
    path: &AlignmentPath,
    min_samples: usize,
) -> f32 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = path
        .iter()
        .filter_map(|(ri, ui)| {
            let x = *reference_energy.get(ri)?;
            let y = *user_energy.get(ui)?;
            Some((x as f64, y as f64))
        })
        .unzip();

    if xs.len() < min_samples.max(1) {
        return 0.0;
    }

    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;

    let mut dot = 0.0;
    let mut nx = 0.0;
    let mut ny = 0.0;
    for (x, y) in xs.iter().zip(ys.iter()) {
        let (dx, dy) = (x - mx, y - my);
        dot += dx * dy;
        nx += dx * dx;
        ny += dy * dy;
    }

    let denom = nx.sqrt() * ny.sqrt() + 1e-8;
    ((dot / denom) as f32).clamp(-1.0, 1.0)
}

/// Penalty for loudness that does not track the reference: `(1 − max(0, r)) · weight`
pub fn energy_correlation_penalty(correlation: f32, weight: f32) -> f32 {
    (1.0 - correlation.max(0.0)) * weight
}

/// Path frames where both sides are voiced
pub fn voiced_frame_count(
    reference_energy: &[f32],
    user_energy: &[f32],
    path: &AlignmentPath,
    thresholds: &VoicingThresholds,
) -> usize {
    path.iter()
        .filter(|&(ri, ui)| match (reference_energy.get(ri), user_energy.get(ui)) {
            (Some(&er), Some(&eu)) => thresholds.both_voiced(er, eu),
            _ => false,
        })
        .count()
}

/// Fraction of user frames with singing
pub fn singing_coverage(user_energy: &[f32], threshold: f32) -> f32 {
    let sung = user_energy.iter().filter(|&&e| is_voiced(e, threshold)).count();
    sung as f32 / user_energy.len().max(1) as f32
}

/// All path metrics for one comparison
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    /// Thresholds used for the voiced tests
    pub thresholds: VoicingThresholds,

    /// Path frames where both sides are voiced
    pub voiced_frames: usize,

    /// `voiced_frames / max(1, path length)`
    pub voiced_ratio: f32,

    /// Note agreement statistics
    pub note_agreement: NoteAgreement,

    /// Timing-jitter penalty
    pub timing_penalty: f32,

    /// Energy correlation along the path
    pub energy_correlation: f32,

    /// Energy-correlation penalty
    pub energy_correlation_penalty: f32,

    /// Fraction of user frames with singing
    pub singing_coverage: f32,
}

/// Extract every path metric
///
/// # Arguments
///
/// * `reference` - Reference features
/// * `user` - User features, already rotated into the reference key
/// * `path` - Alignment path
/// * `config` - Metric configuration
pub fn extract_metrics(
    reference: &RecordingFeatures,
    user: &RecordingFeatures,
    path: &AlignmentPath,
    config: &MetricsConfig,
) -> PerformanceMetrics {
    let thresholds = VoicingThresholds::from_energies(&reference.energy, &user.energy, config);
    let voiced_frames = voiced_frame_count(&reference.energy, &user.energy, path, &thresholds);
    let agreement = note_agreement(
        &reference.raw,
        &user.raw,
        &reference.energy,
        &user.energy,
        path,
        &thresholds,
        config,
    );
    let timing = timing_penalty(path, user.hop_duration(), config);
    let correlation = energy_correlation(
        &reference.energy,
        &user.energy,
        path,
        config.min_correlation_samples,
    );

    let metrics = PerformanceMetrics {
        thresholds,
        voiced_frames,
        voiced_ratio: voiced_frames as f32 / path.len().max(1) as f32,
        note_agreement: agreement,
        timing_penalty: timing,
        energy_correlation: correlation,
        energy_correlation_penalty: energy_correlation_penalty(
            correlation,
            config.energy_correlation_weight,
        ),
        singing_coverage: singing_coverage(&user.energy, thresholds.user),
    };

    log::debug!(
        "Metrics: voiced={}/{}, nas={:.3}, correct={:.3}, timing={:.2}, r={:.3}, coverage={:.3}",
        metrics.voiced_frames,
        path.len(),
        metrics.note_agreement.score,
        metrics.note_agreement.correct_fraction,
        metrics.timing_penalty,
        metrics.energy_correlation,
        metrics.singing_coverage
    );

    metrics
}
