//! Vocal quality gate
//!
//! Runs on the user recording before any scoring. Checks run in a fixed
//! order and the first failure is surfaced as a zero-score result:
//!
//! 1. Silence → `No Singing Detected`
//! 2. Pitch track (when present): voiced fraction / median f0 / hum → `No Singing Detected`
//! 3. Mean spectral flatness too high (mostly noise) → `Invalid Recording`
//! 4. Chroma concentration too low (no clear pitch) → `Invalid Recording`
//! 5. Too few frames with a dominant pitch → `Invalid Recording`
//! 6. Vocal quality score too low → `Invalid Recording`
//! 7. Duration too short → `Recording Too Short`
//! 8. Boosted quality or singing coverage too low → `No Singing Detected`
//!
//! An accepted recording carries a vocal-quality confidence in [0, 1] that
//! scales the aggregator's overall quality.

use super::silence::{detect_silence, SilenceDetector};
use super::voicing::{has_sung_pitch, summarize_pitch_track, PitchTrackConfig};
use crate::analysis::metrics::singing_coverage;
use crate::analysis::result::QualityTier;
use crate::features::recording::RecordingFeatures;
use crate::features::threshold::{mean, percentile};
use serde::{Deserialize, Serialize};

/// Vocal gate configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocalGateConfig {
    /// Silence floors
    pub silence: SilenceDetector,

    /// Pitch-track checks
    pub pitch_track: PitchTrackConfig,

    /// Maximum mean spectral flatness (default: 0.9)
    pub max_mean_flatness: f32,

    /// Minimum mean chroma concentration on the dominant class (default: 0.10)
    pub min_concentration: f32,

    /// A frame has a dominant pitch when its peak exceeds this fraction of
    /// the global peak (default: 0.2)
    pub dominant_peak_fraction: f32,

    /// Minimum fraction of frames with a dominant pitch (default: 0.15)
    pub min_voicing_ratio: f32,

    /// RMS at which the loudness term saturates (default: 0.1)
    pub rms_reference: f32,

    /// Voicing ratio at which the voicing term saturates (default: 0.5)
    pub voicing_reference: f32,

    /// Minimum quality score (default: 0.25)
    pub min_quality: f32,

    /// Boost applied to an accepted quality score, capped at 1 (default: 1.25)
    pub quality_boost: f32,

    /// Minimum recording duration in seconds (default: 30.0)
    pub min_duration_secs: f32,

    /// Minimum boosted confidence (default: 0.3)
    pub min_confidence: f32,

    /// Minimum singing coverage (default: 0.2)
    pub min_singing_coverage: f32,

    /// Energy percentile used for singing coverage (default: 25.0)
    pub coverage_percentile: f32,
}

impl Default for VocalGateConfig {
    fn default() -> Self {
        Self {
            silence: SilenceDetector::default(),
            pitch_track: PitchTrackConfig::default(),
            max_mean_flatness: 0.9,
            min_concentration: 0.10,
            dominant_peak_fraction: 0.2,
            min_voicing_ratio: 0.15,
            rms_reference: 0.1,
            voicing_reference: 0.5,
            min_quality: 0.25,
            quality_boost: 1.25,
            min_duration_secs: 30.0,
            min_confidence: 0.3,
            min_singing_coverage: 0.2,
            coverage_percentile: 25.0,
        }
    }
}

/// Gate check that rejected a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateCheck {
    /// Silence floors
    Silence,
    /// Pitch-track voicing or hum
    PitchTrack,
    /// Spectral flatness ceiling
    Flatness,
    /// Chroma concentration floor
    Concentration,
    /// Dominant-pitch frame fraction floor
    Voicing,
    /// Quality score floor
    Quality,
    /// Minimum duration
    Duration,
    /// Boosted confidence or singing coverage floor
    Confidence,
}

/// Measurements behind a gate decision
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GateDiagnostics {
    /// Unboosted quality score (0-1)
    pub quality_score: f32,
    /// Mean frame RMS
    pub mean_rms: f32,
    /// Mean spectral flatness
    pub mean_flatness: f32,
    /// Mean share of frame energy on the dominant class
    pub chroma_concentration: f32,
    /// Fraction of frames with a dominant pitch
    pub voicing_ratio: f32,
    /// Voiced fraction of the pitch track
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voiced_pitch_fraction: Option<f32>,
    /// Median voiced f0 in Hz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_f0_hz: Option<f32>,
    /// Recording duration in seconds
    pub duration_secs: f32,
    /// Fraction of frames with singing
    pub singing_coverage: f32,
    /// Check that failed, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_check: Option<GateCheck>,
}

/// Gate decision
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    /// Recording passed every check
    Accepted {
        /// Vocal-quality confidence (0-1)
        vocal_quality: f32,
        /// Measurements
        diagnostics: GateDiagnostics,
    },
    /// Recording rejected by the first failing check
    Rejected {
        /// Rejection tier
        tier: QualityTier,
        /// Message for the singer
        message: String,
        /// Measurements, with `failed_check` set
        diagnostics: GateDiagnostics,
    },
}

impl GateOutcome {
    /// Measurements behind the decision
    pub fn diagnostics(&self) -> &GateDiagnostics {
        match self {
            GateOutcome::Accepted { diagnostics, .. } | GateOutcome::Rejected { diagnostics, .. } => diagnostics,
        }
    }
}

fn chroma_concentration(user: &RecordingFeatures) -> f32 {
    let frames = user.raw.frames();
    if frames.is_empty() {
        return 0.0;
    }
    let sum: f32 = frames
        .iter()
        .map(|f| {
            let peak = f.iter().copied().fold(0.0f32, f32::max);
            let total: f32 = f.iter().sum();
            peak / (total + 1e-8)
        })
        .sum();
    sum / frames.len() as f32
}

fn dominant_pitch_ratio(user: &RecordingFeatures, fraction: f32) -> f32 {
    let n = user.raw.n_frames();
    if n == 0 {
        return 0.0;
    }
    let floor = user.raw.global_peak() * fraction;
    let active = (0..n).filter(|&t| user.raw.frame_peak(t) > floor).count();
    active as f32 / n as f32
}

/// Quality score from loudness, tonality, concentration and voicing
pub fn quality_score(
    mean_rms: f32,
    mean_flatness: f32,
    concentration: f32,
    voicing_ratio: f32,
    config: &VocalGateConfig,
) -> f32 {
    0.3 * (mean_rms / config.rms_reference).min(1.0)
        + 0.3 * (1.0 - mean_flatness)
        + 0.2 * concentration
        + 0.2 * (voicing_ratio / config.voicing_reference).min(1.0)
}

/// Run the vocal quality gate on a user recording
///
/// # Arguments
///
/// * `user` - User recording features
/// * `config` - Gate configuration
///
/// # Returns
///
/// `GateOutcome::Accepted` with a vocal-quality confidence, or
/// `GateOutcome::Rejected` with the first failing check. Rejection is a
/// value, never an error.
pub fn evaluate_vocal_quality(user: &RecordingFeatures, config: &VocalGateConfig) -> GateOutcome {
    let mean_rms = mean(&user.rms);
    let mean_flatness = mean(&user.spectral_flatness);
    let concentration = chroma_concentration(user);
    let voicing_ratio = dominant_pitch_ratio(user, config.dominant_peak_fraction);
    let quality = quality_score(mean_rms, mean_flatness, concentration, voicing_ratio, config);
    let coverage_threshold = percentile(&user.energy, config.coverage_percentile).unwrap_or(0.0);
    let pitch = user
        .pitch_track_hz
        .as_deref()
        .map(|track| summarize_pitch_track(track, &config.pitch_track));

    let mut diagnostics = GateDiagnostics {
        quality_score: quality,
        mean_rms,
        mean_flatness,
        chroma_concentration: concentration,
        voicing_ratio,
        voiced_pitch_fraction: pitch.map(|p| p.voiced_fraction),
        median_f0_hz: pitch.map(|p| p.median_f0_hz),
        duration_secs: user.duration_secs(),
        singing_coverage: singing_coverage(&user.energy, coverage_threshold),
        failed_check: None,
    };

    log::debug!(
        "Vocal gate: rms={:.4}, flatness={:.3}, concentration={:.3}, voicing={:.3}, quality={:.3}, duration={:.1}s",
        mean_rms,
        mean_flatness,
        concentration,
        voicing_ratio,
        quality,
        diagnostics.duration_secs
    );

    let confidence = (quality * config.quality_boost).min(1.0);

    let failure: Option<(GateCheck, QualityTier, String)> =
        if let Some(reason) = detect_silence(&user.raw, &user.rms, &config.silence) {
            Some((GateCheck::Silence, QualityTier::NoSingingDetected, reason.message().to_string()))
        } else if pitch.is_some_and(|p| !has_sung_pitch(&p, &config.pitch_track)) {
            Some((
                GateCheck::PitchTrack,
                QualityTier::NoSingingDetected,
                "No valid singing detected (likely background hum or silence).".to_string(),
            ))
        } else if mean_flatness > config.max_mean_flatness {
            Some((
                GateCheck::Flatness,
                QualityTier::InvalidRecording,
                "Audio is mostly noise, no clear vocals detected.".to_string(),
            ))
        } else if concentration < config.min_concentration {
            Some((
                GateCheck::Concentration,
                QualityTier::InvalidRecording,
                "No clear pitch detected, possibly just noise.".to_string(),
            ))
        } else if voicing_ratio < config.min_voicing_ratio {
            Some((
                GateCheck::Voicing,
                QualityTier::InvalidRecording,
                "Too little vocal activity detected.".to_string(),
            ))
        } else if quality < config.min_quality {
            Some((
                GateCheck::Quality,
                QualityTier::InvalidRecording,
                "Low vocal presence detected.".to_string(),
            ))
        } else if diagnostics.duration_secs < config.min_duration_secs {
            Some((
                GateCheck::Duration,
                QualityTier::RecordingTooShort,
                format!(
                    "Recording too short, need at least {:.0} seconds.",
                    config.min_duration_secs
                ),
            ))
        } else if confidence < config.min_confidence || diagnostics.singing_coverage < config.min_singing_coverage {
            Some((
                GateCheck::Confidence,
                QualityTier::NoSingingDetected,
                "No clear singing detected in your recording.".to_string(),
            ))
        } else {
            None
        };

    match failure {
        Some((check, tier, message)) => {
            log::warn!("Vocal gate rejected recording at {:?}: {}", check, message);
            diagnostics.failed_check = Some(check);
            GateOutcome::Rejected {
                tier,
                message,
                diagnostics,
            }
        }
        None => GateOutcome::Accepted {
            vocal_quality: confidence,
            diagnostics,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chroma::PitchClassMatrix;

    const SR: u32 = 22050;
    const HOP: usize = 512;

    /// Frames for the given duration in seconds
    fn frames_for(secs: f32) -> usize {
        (secs * SR as f32 / HOP as f32).ceil() as usize
    }

    fn singing(secs: f32) -> RecordingFeatures {
        let n = frames_for(secs);
        let frames = (0..n)
            .map(|t| {
                let mut f = [0.02f32; 12];
                f[[0, 4, 7, 5][(t / 40) % 4]] = 1.0;
                f
            })
            .collect();
        RecordingFeatures::from_raw(PitchClassMatrix::new(frames), vec![0.05; n], vec![0.2; n], SR, HOP)
    }

    fn rejected_check(outcome: &GateOutcome) -> Option<GateCheck> {
        match outcome {
            GateOutcome::Rejected { diagnostics, .. } => diagnostics.failed_check,
            GateOutcome::Accepted { .. } => None,
        }
    }

    #[test]
    fn test_accepts_clear_singing() {
        let outcome = evaluate_vocal_quality(&singing(45.0), &VocalGateConfig::default());
        match outcome {
            GateOutcome::Accepted { vocal_quality, diagnostics } => {
                assert!(vocal_quality > 0.5 && vocal_quality <= 1.0);
                assert!(diagnostics.failed_check.is_none());
                assert!(diagnostics.duration_secs >= 45.0);
            }
            other => panic!("expected acceptance, got {:?}", other),
        }
    }

    #[test]
    fn test_silence_rejected_first() {
        let n = frames_for(45.0);
        let user = RecordingFeatures::from_raw(
            PitchClassMatrix::new(vec![[0.0; 12]; n]),
            vec![0.0; n],
            vec![1.0; n],
            SR,
            HOP,
        );
        let outcome = evaluate_vocal_quality(&user, &VocalGateConfig::default());
        assert_eq!(rejected_check(&outcome), Some(GateCheck::Silence));
        match outcome {
            GateOutcome::Rejected { tier, .. } => assert_eq!(tier, QualityTier::NoSingingDetected),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_noise_rejected() {
        let mut user = singing(45.0);
        user.spectral_flatness = vec![0.95; user.spectral_flatness.len()];
        let outcome = evaluate_vocal_quality(&user, &VocalGateConfig::default());
        assert_eq!(rejected_check(&outcome), Some(GateCheck::Flatness));
    }

    #[test]
    fn test_flat_chroma_rejected() {
        let n = frames_for(45.0);
        let user = RecordingFeatures::from_raw(
            PitchClassMatrix::new(vec![[0.5; 12]; n]),
            vec![0.05; n],
            vec![0.2; n],
            SR,
            HOP,
        );
        // Uniform chroma has concentration exactly 1/12, below the 0.10 floor
        let outcome = evaluate_vocal_quality(&user, &VocalGateConfig::default());
        assert_eq!(rejected_check(&outcome), Some(GateCheck::Concentration));
    }

    #[test]
    fn test_hum_rejected() {
        let user = singing(45.0);
        let n = user.n_frames();
        let user = user.with_pitch_track(vec![150.0; n]);
        let outcome = evaluate_vocal_quality(&user, &VocalGateConfig::default());
        assert_eq!(rejected_check(&outcome), Some(GateCheck::PitchTrack));
        assert_eq!(outcome.diagnostics().voiced_pitch_fraction, Some(0.0));
    }

    #[test]
    fn test_short_recording_rejected() {
        let outcome = evaluate_vocal_quality(&singing(20.0), &VocalGateConfig::default());
        assert_eq!(rejected_check(&outcome), Some(GateCheck::Duration));
        match outcome {
            GateOutcome::Rejected { tier, .. } => assert_eq!(tier, QualityTier::RecordingTooShort),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_quality_score_formula() {
        let c = VocalGateConfig::default();
        let q = quality_score(0.2, 0.0, 1.0, 1.0, &c);
        assert!((q - 1.0).abs() < 1e-6);
        let q = quality_score(0.05, 0.5, 0.5, 0.25, &c);
        assert!((q - (0.15 + 0.15 + 0.1 + 0.1)).abs() < 1e-6);
    }
}
