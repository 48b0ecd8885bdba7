//! Configuration parameters for performance scoring
//!
//! One immutable [`ScoringConfig`] is built per process (or per request) and
//! passed explicitly into every stage. Each stage owns a sub-config whose
//! `Default` carries the reference constants; tuning variants are config
//! diffs, e.g. [`ScoringConfig::alignment_weighted`].

use crate::analysis::mistakes::MistakeDetectorConfig;
use crate::analysis::metrics::MetricsConfig;
use crate::analysis::scoring::{AggregationConfig, MistakePenaltyCurve};
use crate::error::AnalysisError;
use crate::features::alignment::AlignmentConfig;
use crate::features::chroma::PITCH_CLASSES;
use crate::preprocessing::vocal_gate::VocalGateConfig;
use serde::{Deserialize, Serialize};

/// Scoring configuration parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Sequence alignment (hybrid distance, FastDTW radius, accuracy decay)
    pub alignment: AlignmentConfig,

    /// Mistake detection and debouncing
    pub mistakes: MistakeDetectorConfig,

    /// Path metrics
    pub metrics: MetricsConfig,

    /// Score aggregation and quality tiers
    pub aggregation: AggregationConfig,

    /// Vocal quality gate
    pub vocal_gate: VocalGateConfig,
}

impl ScoringConfig {
    /// Alignment-weighted tuning
    ///
    /// Favors DTW accuracy over note agreement (0.50 / 0.30 / 0.20), uses a
    /// gentler mistake slope (0.65), a lower mistake energy threshold (0.06),
    /// a softer `Needs Practice` multiplier (2.0), the stepped mistake curve,
    /// and also accepts the fifth as a harmonic interval.
    pub fn alignment_weighted() -> Self {
        let mut config = Self::default();
        config.aggregation.accuracy_weight = 0.50;
        config.aggregation.note_agreement_weight = 0.30;
        config.aggregation.base_accuracy_weight = 0.20;
        config.aggregation.mistake_slope = 0.65;
        config.aggregation.poor_multiplier = 2.0;
        config.aggregation.mistake_curve = MistakePenaltyCurve::stepped();
        config.mistakes.energy_threshold = 0.06;
        config.mistakes.harmonic_intervals = vec![0, 3, 4, 5, 7];
        config
    }

    /// Check the configuration for inconsistent values
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the base-score weights do not
    /// sum to 1 (±1e-3), `alpha` is outside [0, 1], the decay constant, spread
    /// factor or debounce gap is not positive, the FastDTW radius is 0, or a
    /// harmonic interval is not a pitch-class offset (≥ 12).
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let weights = self.aggregation.weight_sum();
        if (weights - 1.0).abs() > 1e-3 {
            return Err(AnalysisError::InvalidInput(format!(
                "Score weights must sum to 1, got {:.4}",
                weights
            )));
        }
        if !(0.0..=1.0).contains(&self.alignment.alpha) {
            return Err(AnalysisError::InvalidInput(format!(
                "alpha must be in [0, 1], got {}",
                self.alignment.alpha
            )));
        }
        if self.alignment.decay_k <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Accuracy decay constant must be positive, got {}",
                self.alignment.decay_k
            )));
        }
        if self.alignment.radius == 0 {
            return Err(AnalysisError::InvalidInput(
                "FastDTW radius must be at least 1".to_string(),
            ));
        }
        if self.aggregation.spread_factor <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Spread factor must be positive, got {}",
                self.aggregation.spread_factor
            )));
        }
        if self.mistakes.debounce_gap_secs <= 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Debounce gap must be positive, got {}",
                self.mistakes.debounce_gap_secs
            )));
        }
        if let Some(&bad) = self
            .mistakes
            .harmonic_intervals
            .iter()
            .find(|&&i| i as usize >= PITCH_CLASSES)
        {
            return Err(AnalysisError::InvalidInput(format!(
                "Harmonic interval {} is not a pitch-class offset",
                bad
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
        assert!(ScoringConfig::alignment_weighted().validate().is_ok());
    }

    #[test]
    fn test_reference_constants() {
        let c = ScoringConfig::default();
        assert_eq!(c.alignment.alpha, 0.40);
        assert_eq!(c.alignment.decay_k, 0.20);
        assert_eq!(c.mistakes.harmonic_intervals, vec![0, 3, 4, 5]);
        assert_eq!(c.mistakes.debounce_gap_secs, 0.2);
        assert_eq!(c.aggregation.spread_factor, 1.3);
        assert_eq!(c.aggregation.mistake_penalty_cap, 35.0);
        assert_eq!(c.vocal_gate.min_duration_secs, 30.0);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut c = ScoringConfig::default();
        c.aggregation.accuracy_weight = 0.5;
        assert!(matches!(c.validate(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut c = ScoringConfig::default();
        c.alignment.alpha = 1.5;
        assert!(c.validate().is_err());

        let mut c = ScoringConfig::default();
        c.alignment.radius = 0;
        assert!(c.validate().is_err());

        let mut c = ScoringConfig::default();
        c.mistakes.harmonic_intervals.push(12);
        assert!(c.validate().is_err());

        let mut c = ScoringConfig::default();
        c.mistakes.debounce_gap_secs = 0.0;
        assert!(c.validate().is_err());
    }
}
