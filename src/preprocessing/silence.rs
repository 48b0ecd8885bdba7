//! Silence detection on recording features
//!
//! A recording is silent when any of the following holds:
//! - mean |chroma| below a floor (no pitch-class content at all)
//! - mean frame RMS or peak frame RMS below a floor (too quiet)
//! - summed frame RMS or peak chroma below a floor (no voice energy)

use crate::features::chroma::PitchClassMatrix;
use crate::features::threshold::mean;
use serde::{Deserialize, Serialize};

/// Silence detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceDetector {
    /// Minimum mean |chroma| (default: 1e-5)
    pub min_mean_chroma: f32,

    /// Minimum mean frame RMS (default: 0.002)
    pub min_mean_rms: f32,

    /// Minimum peak frame RMS (default: 0.004)
    pub min_peak_rms: f32,

    /// Minimum summed frame RMS (default: 0.5)
    pub min_total_rms: f32,

    /// Minimum peak chroma value (default: 1e-6)
    pub min_peak_chroma: f32,
}

impl Default for SilenceDetector {
    fn default() -> Self {
        Self {
            min_mean_chroma: 1e-5,
            min_mean_rms: 0.002,
            min_peak_rms: 0.004,
            min_total_rms: 0.5,
            min_peak_chroma: 1e-6,
        }
    }
}

/// Why a recording counts as silent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceReason {
    /// No pitch-class content
    NoChromaContent,
    /// Frame RMS below the loudness floors
    TooQuiet,
    /// Summed RMS or peak chroma below the energy floors
    NoVoiceEnergy,
}

impl SilenceReason {
    /// Message for the singer
    pub fn message(&self) -> &'static str {
        match self {
            SilenceReason::NoChromaContent => "No chroma content detected (silence).",
            SilenceReason::TooQuiet => "Audio is too quiet or silent.",
            SilenceReason::NoVoiceEnergy => "Your recording contains no audible singing or voice energy.",
        }
    }
}

/// Detect silence from raw chroma and frame RMS
///
/// # Arguments
///
/// * `raw` - Raw pitch-class matrix
/// * `rms` - Frame RMS values
/// * `detector` - Silence floors
///
/// # Returns
///
/// The first failing check, or `None` when the recording is audible.
pub fn detect_silence(raw: &PitchClassMatrix, rms: &[f32], detector: &SilenceDetector) -> Option<SilenceReason> {
    let mean_rms = mean(rms);
    let peak_rms = rms.iter().copied().fold(0.0f32, f32::max);
    let total_rms: f32 = rms.iter().sum();

    log::debug!(
        "Silence check: frames={}, mean_rms={:.6}, peak_rms={:.6}, total_rms={:.4}",
        raw.n_frames(),
        mean_rms,
        peak_rms,
        total_rms
    );

    if raw.mean_abs() < detector.min_mean_chroma {
        return Some(SilenceReason::NoChromaContent);
    }
    if mean_rms < detector.min_mean_rms || peak_rms < detector.min_peak_rms {
        return Some(SilenceReason::TooQuiet);
    }
    if total_rms < detector.min_total_rms || raw.global_peak() < detector.min_peak_chroma {
        return Some(SilenceReason::NoVoiceEnergy);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(n: usize, level: f32) -> PitchClassMatrix {
        let mut f = [0.0f32; 12];
        f[0] = level;
        PitchClassMatrix::new(vec![f; n])
    }

    #[test]
    fn test_silent_chroma() {
        let raw = PitchClassMatrix::new(vec![[0.0; 12]; 100]);
        assert_eq!(
            detect_silence(&raw, &[0.05; 100], &SilenceDetector::default()),
            Some(SilenceReason::NoChromaContent)
        );
    }

    #[test]
    fn test_quiet_rms() {
        assert_eq!(
            detect_silence(&tone(100, 1.0), &[0.001; 100], &SilenceDetector::default()),
            Some(SilenceReason::TooQuiet)
        );
    }

    #[test]
    fn test_low_total_energy() {
        // Loud enough per frame but far too short in total
        assert_eq!(
            detect_silence(&tone(10, 1.0), &[0.01; 10], &SilenceDetector::default()),
            Some(SilenceReason::NoVoiceEnergy)
        );
    }

    #[test]
    fn test_audible() {
        assert_eq!(detect_silence(&tone(100, 1.0), &[0.05; 100], &SilenceDetector::default()), None);
    }

    #[test]
    fn test_empty_is_silent() {
        assert!(detect_silence(&PitchClassMatrix::default(), &[], &SilenceDetector::default()).is_some());
    }
}
