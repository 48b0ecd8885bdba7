//! Pitch-track voicing checks
//!
//! Summarizes a fundamental-frequency track (from the extraction
//! collaborator's pitch tracker) into a voiced fraction and median f0, and
//! flags a held constant tone ("hum"): voiced pitch varying by less than a
//! few Hz is not a sung melody.

use crate::features::threshold::{median, std_dev};
use serde::{Deserialize, Serialize};

/// Pitch-track check configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchTrackConfig {
    /// Minimum fraction of voiced frames (default: 0.10)
    pub min_voiced_fraction: f32,

    /// Minimum median f0 in Hz (default: 80.0)
    pub min_median_f0_hz: f32,

    /// Voiced f0 standard deviation below this (Hz) is a hum (default: 3.0)
    pub hum_max_std_hz: f32,
}

impl Default for PitchTrackConfig {
    fn default() -> Self {
        Self {
            min_voiced_fraction: 0.10,
            min_median_f0_hz: 80.0,
            hum_max_std_hz: 3.0,
        }
    }
}

/// Summary of a pitch track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PitchTrackSummary {
    /// Fraction of frames with a voiced (finite, positive) f0
    pub voiced_fraction: f32,

    /// Median voiced f0 in Hz (0 when nothing is voiced)
    pub median_f0_hz: f32,

    /// Standard deviation of voiced f0 in Hz
    pub f0_std_hz: f32,

    /// `true` when the voiced pitch barely moves
    pub is_hum: bool,
}

/// Summarize a pitch track
///
/// A hum zeroes both the voiced fraction and the median f0, so it fails the
/// voicing check the same way silence does.
pub fn summarize_pitch_track(track_hz: &[f32], config: &PitchTrackConfig) -> PitchTrackSummary {
    let voiced: Vec<f32> = track_hz
        .iter()
        .copied()
        .filter(|f| f.is_finite() && *f > 0.0)
        .collect();

    if voiced.is_empty() {
        return PitchTrackSummary::default();
    }

    let f0_std_hz = std_dev(&voiced);
    if f0_std_hz < config.hum_max_std_hz {
        log::debug!("Pitch track is a constant tone (std={:.2} Hz)", f0_std_hz);
        return PitchTrackSummary {
            voiced_fraction: 0.0,
            median_f0_hz: 0.0,
            f0_std_hz,
            is_hum: true,
        };
    }

    PitchTrackSummary {
        voiced_fraction: voiced.len() as f32 / track_hz.len() as f32,
        median_f0_hz: median(&voiced).unwrap_or(0.0),
        f0_std_hz,
        is_hum: false,
    }
}

/// `true` when the summary shows enough voiced, non-hum pitch
pub fn has_sung_pitch(summary: &PitchTrackSummary, config: &PitchTrackConfig) -> bool {
    summary.voiced_fraction >= config.min_voiced_fraction && summary.median_f0_hz >= config.min_median_f0_hz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sung_melody() {
        let track: Vec<f32> = (0..200)
            .map(|i| if i % 4 == 0 { f32::NAN } else { 220.0 + (i % 20) as f32 * 10.0 })
            .collect();
        let s = summarize_pitch_track(&track, &PitchTrackConfig::default());
        assert!(!s.is_hum);
        assert!((s.voiced_fraction - 0.75).abs() < 1e-6);
        assert!(s.median_f0_hz > 200.0);
        assert!(has_sung_pitch(&s, &PitchTrackConfig::default()));
    }

    #[test]
    fn test_hum_is_rejected() {
        let track: Vec<f32> = (0..200).map(|i| 150.0 + (i % 2) as f32).collect();
        let s = summarize_pitch_track(&track, &PitchTrackConfig::default());
        assert!(s.is_hum);
        assert_eq!(s.voiced_fraction, 0.0);
        assert!(!has_sung_pitch(&s, &PitchTrackConfig::default()));
    }

    #[test]
    fn test_low_rumble_is_rejected() {
        let track: Vec<f32> = (0..200).map(|i| 50.0 + (i % 10) as f32 * 2.0).collect();
        let s = summarize_pitch_track(&track, &PitchTrackConfig::default());
        assert!(!s.is_hum);
        assert!(!has_sung_pitch(&s, &PitchTrackConfig::default()));
    }

    #[test]
    fn test_unvoiced_track() {
        let s = summarize_pitch_track(&[0.0, -1.0, f32::NAN], &PitchTrackConfig::default());
        assert_eq!(s, PitchTrackSummary::default());
        assert!(!has_sung_pitch(&s, &PitchTrackConfig::default()));
    }
}
