//! Score aggregation
//!
//! Two stages, evaluated once per request:
//!
//! 1. **Performance score** (additive): weighted blend of DTW accuracy, note
//!    agreement and mistake-density accuracy, minus timing, key-shift,
//!    energy-correlation and mistake-count penalties. A literal self-match
//!    short-circuits to `Perfect Match`; everything else is spread around the
//!    midpoint and bucketed into `Good` / `Average` / `Needs Practice`.
//! 2. **Integrity discounts** (multiplicative): singing coverage, recording
//!    duration and energy instability scale the score down and override the
//!    tier label. Integrity problems never share the additive penalty budget.
//!
//! The final score is always clamped to [0, 100].

use super::metrics::PerformanceMetrics;
use super::result::{MistakeEvent, QualityTier, ScoreBreakdown};
use crate::features::alignment::AlignmentOutcome;
use serde::{Deserialize, Serialize};

/// Bounded penalty as a function of mistake counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MistakePenaltyCurve {
    /// `(major·majorWeight + other·otherWeight)^exponent · scale + missing · missingWeight`
    PowerLaw {
        /// Weight of a `too-*-major` event (default: 1.3)
        major_weight: f32,
        /// Weight of any other event (default: 0.8)
        other_weight: f32,
        /// Exponent on the weighted count (default: 1.05)
        exponent: f32,
        /// Scale on the powered count (default: 1.04)
        scale: f32,
        /// Extra penalty per `missing` event (default: 2.0)
        missing_weight: f32,
    },
    /// `count · perMistake`, multiplied by each step whose count is exceeded
    Stepped {
        /// Penalty per event
        per_mistake: f32,
        /// `(count above which, multiplier)` pairs, applied cumulatively
        steps: Vec<(usize, f32)>,
    },
}

impl Default for MistakePenaltyCurve {
    fn default() -> Self {
        MistakePenaltyCurve::PowerLaw {
            major_weight: 1.3,
            other_weight: 0.8,
            exponent: 1.05,
            scale: 1.04,
            missing_weight: 2.0,
        }
    }
}

impl MistakePenaltyCurve {
    /// Stepped curve: 0.5 per mistake, ×1.1 above 15, ×1.2 above 24, ×1.5 above 30
    pub fn stepped() -> Self {
        MistakePenaltyCurve::Stepped {
            per_mistake: 0.5,
            steps: vec![(15, 1.1), (24, 1.2), (30, 1.5)],
        }
    }

    /// Unclamped penalty for the given counts
    pub fn penalty(&self, counts: &MistakeCounts) -> f32 {
        match self {
            MistakePenaltyCurve::PowerLaw {
                major_weight,
                other_weight,
                exponent,
                scale,
                missing_weight,
            } => {
                let other = counts.total - counts.major;
                let weighted = counts.major as f32 * major_weight + other as f32 * other_weight;
                weighted.powf(*exponent) * scale + counts.missing as f32 * missing_weight
            }
            MistakePenaltyCurve::Stepped { per_mistake, steps } => {
                let mut penalty = counts.total as f32 * per_mistake;
                for &(above, multiplier) in steps {
                    if counts.total > above {
                        penalty *= multiplier;
                    }
                }
                penalty
            }
        }
    }
}

/// Event counts that drive the mistake penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MistakeCounts {
    /// All events
    pub total: usize,
    /// `too-*-major` events
    pub major: usize,
    /// `missing` events
    pub missing: usize,
    /// Path frames covered by events
    pub frames: usize,
}

impl MistakeCounts {
    /// Count events by class
    pub fn from_events(events: &[MistakeEvent]) -> Self {
        events.iter().fold(Self::default(), |mut c, e| {
            c.total += 1;
            c.frames += e.frame_count;
            if e.reason.is_major() {
                c.major += 1;
            }
            if e.reason == super::result::MistakeReason::Missing {
                c.missing += 1;
            }
            c
        })
    }
}

/// Threshold rule for a performance tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    /// `overallQuality` must exceed this
    pub min_quality: f32,
    /// Mistake ratio must be below this
    pub max_mistake_ratio: f32,
    /// Mistake count must be below this
    pub max_mistakes: usize,
    /// Offset added to the spread score
    pub offset: f32,
}

/// Self-match shortcut thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfMatchRule {
    /// Effective distance must be below this (default: 0.08)
    pub max_effective_distance: f32,
    /// Mistake ratio must be below this (default: 0.02)
    pub max_mistake_ratio: f32,
    /// DTW accuracy must exceed this (default: 98.0)
    pub min_accuracy: f32,
}

/// Multiplicative discount for values below a bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityBand {
    /// Applies when the measured value is below this
    pub below: f32,
    /// Score multiplier
    pub factor: f32,
    /// Tier label override (`None` keeps the current label)
    pub tier: Option<QualityTier>,
}

/// Score aggregation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Weight of DTW accuracy (default: 0.35)
    pub accuracy_weight: f32,
    /// Weight of the note-agreement score (default: 0.45)
    pub note_agreement_weight: f32,
    /// Weight of the mistake-density accuracy (default: 0.20)
    pub base_accuracy_weight: f32,

    /// Base accuracy loss per unit mistake ratio (default: 1.0)
    pub mistake_slope: f32,

    /// Penalty per semitone of key shift (default: 0.04)
    pub key_shift_penalty_per_step: f32,

    /// Mistake-count penalty curve (default: power law)
    pub mistake_curve: MistakePenaltyCurve,
    /// Maximum mistake penalty (default: 35.0)
    pub mistake_penalty_cap: f32,
    /// Singing coverage above which the mistake penalty is forgiven (default: 0.6)
    pub forgiving_coverage: f32,
    /// Mistake penalty multiplier when forgiven (default: 0.75)
    pub forgiveness_factor: f32,

    /// Self-match shortcut thresholds
    pub self_match: SelfMatchRule,

    /// Spread around the midpoint (default: 1.3)
    pub spread_factor: f32,
    /// Average pitch error (semitones) at which pitch quality reaches 0 (default: 5.0)
    pub pitch_error_scale: f32,
    /// `Good` tier rule (default: quality > 0.75, ratio < 0.20, count < 15, +10)
    pub good: TierRule,
    /// `Average` tier rule (default: quality > 0.55, ratio < 0.35, count < 26, +5)
    pub average: TierRule,
    /// Offset subtracted in `Needs Practice` (default: 5.0)
    pub needs_practice_offset: f32,
    /// Mistake ratio scale in `Needs Practice` (default: 15.0)
    pub poor_ratio_scale: f32,
    /// Multiplier on the `Needs Practice` ratio penalty (default: 3.0)
    pub poor_multiplier: f32,

    /// Singing-coverage discounts, first match wins
    pub coverage_bands: Vec<IntegrityBand>,
    /// Absolute user-duration discounts (seconds), first match wins
    pub duration_bands: Vec<IntegrityBand>,
    /// User duration below this fraction of the reference is partial (default: 0.4)
    pub partial_fraction: f32,
    /// Partial recording multiplier (default: 0.7)
    pub partial_factor: f32,

    /// RMS standard deviation above which energy is unstable (default: 0.1)
    pub unstable_rms_std: f32,
    /// Energy variance above which energy is unstable (default: 0.02)
    pub unstable_energy_variance: f32,
    /// Unstable recording multiplier (default: 0.8)
    pub unstable_factor: f32,

    /// Duration coverage ratio above which a full recording is rewarded (default: 0.9)
    pub full_coverage_ratio: f32,
    /// Minimum user duration (seconds) for the reward (default: 60.0)
    pub full_min_duration_secs: f32,
    /// Reward multiplier (default: 1.05)
    pub full_bonus: f32,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            accuracy_weight: 0.35,
            note_agreement_weight: 0.45,
            base_accuracy_weight: 0.20,
            mistake_slope: 1.0,
            key_shift_penalty_per_step: 0.04,
            mistake_curve: MistakePenaltyCurve::default(),
            mistake_penalty_cap: 35.0,
            forgiving_coverage: 0.6,
            forgiveness_factor: 0.75,
            self_match: SelfMatchRule {
                max_effective_distance: 0.08,
                max_mistake_ratio: 0.02,
                min_accuracy: 98.0,
            },
            spread_factor: 1.3,
            pitch_error_scale: 5.0,
            good: TierRule {
                min_quality: 0.75,
                max_mistake_ratio: 0.20,
                max_mistakes: 15,
                offset: 10.0,
            },
            average: TierRule {
                min_quality: 0.55,
                max_mistake_ratio: 0.35,
                max_mistakes: 26,
                offset: 5.0,
            },
            needs_practice_offset: 5.0,
            poor_ratio_scale: 15.0,
            poor_multiplier: 3.0,
            coverage_bands: vec![
                IntegrityBand {
                    below: 0.3,
                    factor: 0.4,
                    tier: Some(QualityTier::TooLittleSinging),
                },
                IntegrityBand {
                    below: 0.5,
                    factor: 0.7,
                    tier: Some(QualityTier::LowSingingActivity),
                },
                IntegrityBand {
                    below: 0.7,
                    factor: 0.9,
                    tier: None,
                },
            ],
            duration_bands: vec![
                IntegrityBand {
                    below: 20.0,
                    factor: 0.1,
                    tier: Some(QualityTier::RecordingTooShort),
                },
                IntegrityBand {
                    below: 35.0,
                    factor: 0.4,
                    tier: Some(QualityTier::TooShortToEvaluate),
                },
            ],
            partial_fraction: 0.4,
            partial_factor: 0.7,
            unstable_rms_std: 0.1,
            unstable_energy_variance: 0.02,
            unstable_factor: 0.8,
            full_coverage_ratio: 0.9,
            full_min_duration_secs: 60.0,
            full_bonus: 1.05,
        }
    }
}

impl AggregationConfig {
    /// Sum of the three base-score weights
    pub fn weight_sum(&self) -> f32 {
        self.accuracy_weight + self.note_agreement_weight + self.base_accuracy_weight
    }
}

/// Recording-level statistics used by the integrity discounts
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordingStats {
    /// User duration in seconds
    pub user_duration_secs: f32,
    /// Reference duration in seconds
    pub reference_duration_secs: f32,
    /// Standard deviation of the user's frame RMS
    pub user_rms_std: f32,
    /// Variance of the user's per-frame energy
    pub user_energy_variance: f32,
}

/// Everything the aggregator consumes
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    /// Sequence alignment outcome
    pub alignment: &'a AlignmentOutcome,
    /// Path metrics
    pub metrics: &'a PerformanceMetrics,
    /// Debounced mistake events
    pub mistakes: &'a [MistakeEvent],
    /// Key shift applied to the user (unreduced)
    pub key_shift: i32,
    /// Vocal-quality confidence from the gate (0-1)
    pub vocal_quality: f32,
    /// Recording statistics
    pub recording: RecordingStats,
}

/// Aggregated score with its message and integrity warnings
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Full breakdown
    pub breakdown: ScoreBreakdown,
    /// Message for the singer
    pub message: String,
    /// Integrity discounts that fired
    pub warnings: Vec<String>,
}

/// Message shown for a final tier
pub fn tier_message(tier: QualityTier) -> &'static str {
    match tier {
        QualityTier::PerfectMatch => "Perfect match with the reference.",
        QualityTier::Good => "Great job! Your singing closely follows the reference.",
        QualityTier::Average => "Good effort. A few passages need attention.",
        QualityTier::NeedsPractice => "Keep practicing. Several passages differ from the reference.",
        QualityTier::TooLittleSinging => "Too little singing in your recording to score it fully.",
        QualityTier::LowSingingActivity => "Your recording has long stretches without singing.",
        QualityTier::RecordingTooShort => "Recording too short, need at least 30 seconds.",
        QualityTier::TooShortToEvaluate => "Recording too short to evaluate reliably.",
        QualityTier::PartialRecording => "Only part of the song was recorded.",
        QualityTier::UnstableRecording => "Inconsistent energy pattern, possibly speech or noise.",
        QualityTier::InvalidRecording => "The recording does not contain clear vocals.",
        QualityTier::NoSingingDetected => "No clear singing detected in your recording.",
    }
}

fn apply_band(
    bands: &[IntegrityBand],
    value: f32,
    score: &mut f32,
    tier: &mut QualityTier,
    warnings: &mut Vec<String>,
    what: &str,
) {
    if let Some(band) = bands.iter().find(|b| value < b.below) {
        *score *= band.factor;
        if let Some(t) = band.tier {
            *tier = t;
        }
        log::warn!(
            "{} {:.3} below {:.3}: score ×{:.2}",
            what,
            value,
            band.below,
            band.factor
        );
        warnings.push(format!("{} {:.2} below {:.2}", what, value, band.below));
    }
}

/// Combine alignment, metrics and mistakes into a final score and tier
///
/// # Arguments
///
/// * `inputs` - Alignment outcome, metrics, mistakes, key shift, vocal quality
///   and recording statistics
/// * `config` - Aggregation configuration
///
/// # Returns
///
/// Breakdown with a final score in [0, 100], the tier message and the list
/// of integrity discounts that fired.
pub fn aggregate(inputs: &ScoreInputs<'_>, config: &AggregationConfig) -> Aggregate {
    let alignment = inputs.alignment;
    let metrics = inputs.metrics;
    let counts = MistakeCounts::from_events(inputs.mistakes);
    let voiced = metrics.voiced_frames;

    let mistake_ratio = if voiced > 0 {
        counts.frames as f32 / voiced as f32
    } else {
        0.0
    };
    let base_accuracy = if voiced > 0 {
        (100.0 * (1.0 - config.mistake_slope * mistake_ratio.min(1.0))).max(0.0)
    } else {
        0.0
    };
    let note_agreement_score = 100.0 * metrics.note_agreement.score;
    let key_shift_penalty = inputs.key_shift.unsigned_abs() as f32 * config.key_shift_penalty_per_step;

    let mut mistake_penalty = config
        .mistake_curve
        .penalty(&counts)
        .clamp(0.0, config.mistake_penalty_cap);
    if metrics.singing_coverage > config.forgiving_coverage {
        mistake_penalty *= config.forgiveness_factor;
    }

    let base_score = config.accuracy_weight * alignment.accuracy
        + config.note_agreement_weight * note_agreement_score
        + config.base_accuracy_weight * base_accuracy;
    let penalized_score = base_score
        - metrics.timing_penalty
        - key_shift_penalty
        - metrics.energy_correlation_penalty
        - mistake_penalty;

    let pitch_quality = (1.0 - metrics.note_agreement.avg_pitch_error / config.pitch_error_scale).max(0.0);
    let overall_quality =
        (0.5 * pitch_quality + 0.5 * metrics.note_agreement.correct_fraction) * inputs.vocal_quality;

    let rule = &config.self_match;
    let is_self_match = alignment.path.len() >= 2
        && voiced > 0
        && alignment.effective_distance < rule.max_effective_distance
        && mistake_ratio < rule.max_mistake_ratio
        && alignment.accuracy > rule.min_accuracy
        && counts.total == 0;

    let mut warnings = Vec::new();
    let (mut score, mut tier) = if is_self_match {
        (
            99.0 + (penalized_score / 100.0).clamp(0.0, 1.0),
            QualityTier::PerfectMatch,
        )
    } else {
        let spread = 50.0 + (penalized_score - 50.0) * config.spread_factor;
        let passes = |r: &TierRule| {
            overall_quality > r.min_quality
                && mistake_ratio < r.max_mistake_ratio
                && counts.total < r.max_mistakes
        };
        if passes(&config.good) {
            (spread + config.good.offset, QualityTier::Good)
        } else if passes(&config.average) {
            (spread + config.average.offset, QualityTier::Average)
        } else {
            let extra = mistake_ratio * config.poor_ratio_scale * config.poor_multiplier;
            (
                spread - extra - config.needs_practice_offset,
                QualityTier::NeedsPractice,
            )
        }
    };

    if !is_self_match {
        let stats = &inputs.recording;
        apply_band(
            &config.coverage_bands,
            metrics.singing_coverage,
            &mut score,
            &mut tier,
            &mut warnings,
            "Singing coverage",
        );

        let duration_before = warnings.len();
        apply_band(
            &config.duration_bands,
            stats.user_duration_secs,
            &mut score,
            &mut tier,
            &mut warnings,
            "Recording duration",
        );
        if warnings.len() == duration_before
            && stats.user_duration_secs < stats.reference_duration_secs * config.partial_fraction
        {
            score *= config.partial_factor;
            tier = QualityTier::PartialRecording;
            log::warn!(
                "Partial recording: {:.1}s of {:.1}s",
                stats.user_duration_secs,
                stats.reference_duration_secs
            );
            warnings.push(format!(
                "Partial recording: {:.1}s of {:.1}s",
                stats.user_duration_secs, stats.reference_duration_secs
            ));
        }

        if stats.user_rms_std > config.unstable_rms_std
            && stats.user_energy_variance > config.unstable_energy_variance
        {
            score *= config.unstable_factor;
            tier = QualityTier::UnstableRecording;
            log::warn!("Detected inconsistent energy pattern (possible speech or noise)");
            warnings.push("Inconsistent energy pattern".to_string());
        }

        let coverage_ratio = if stats.reference_duration_secs > 0.0 {
            (stats.user_duration_secs / stats.reference_duration_secs).min(1.0)
        } else {
            0.0
        };
        if coverage_ratio > config.full_coverage_ratio
            && stats.user_duration_secs > config.full_min_duration_secs
        {
            score *= config.full_bonus;
        }
    }

    let final_score = if score.is_finite() { score.clamp(0.0, 100.0) } else { 0.0 };

    log::debug!(
        "Score: base={:.2}, penalized={:.2}, final={:.2}, tier={}",
        base_score,
        penalized_score,
        final_score,
        tier
    );

    Aggregate {
        breakdown: ScoreBreakdown {
            dtw_accuracy: alignment.accuracy,
            note_agreement_score,
            base_accuracy,
            timing_penalty: metrics.timing_penalty,
            key_shift_penalty,
            energy_correlation_penalty: metrics.energy_correlation_penalty,
            mistake_penalty,
            base_score,
            penalized_score,
            final_score,
            quality_tier: tier,
            effective_distance: alignment.effective_distance,
            self_distance: alignment.self_distance,
            pair_distance: alignment.pair_distance,
            mistake_ratio,
            voiced_frames: voiced,
            singing_coverage: metrics.singing_coverage,
            overall_quality,
            vocal_quality: inputs.vocal_quality,
        },
        message: tier_message(tier).to_string(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metrics::{NoteAgreement, VoicingThresholds};
    use crate::analysis::result::MistakeReason;
    use crate::features::alignment::AlignmentPath;

    fn alignment(accuracy: f32, effective: f32, len: usize) -> AlignmentOutcome {
        AlignmentOutcome {
            path: AlignmentPath::new((0..len).map(|i| (i, i)).collect()),
            pair_distance: effective,
            self_distance: 0.0,
            effective_distance: effective,
            accuracy,
        }
    }

    fn metrics(nas: f32, correct: f32, coverage: f32) -> PerformanceMetrics {
        PerformanceMetrics {
            thresholds: VoicingThresholds {
                reference: 0.1,
                user: 0.1,
            },
            voiced_frames: 1000,
            voiced_ratio: 1.0,
            note_agreement: NoteAgreement {
                score: nas,
                frames: 1000,
                avg_pitch_error: 0.0,
                correct_fraction: correct,
            },
            timing_penalty: 0.0,
            energy_correlation: 1.0,
            energy_correlation_penalty: 0.0,
            singing_coverage: coverage,
        }
    }

    fn event(reason: MistakeReason, frames: usize) -> MistakeEvent {
        MistakeEvent {
            reason,
            severity: 1,
            start_time: 0.0,
            end_time: 1.0,
            duration: 1.0,
            expected_pitch_class: 0,
            actual_pitch_class: 0,
            semitone_delta: 0,
            frame_count: frames,
            description: String::new(),
            expected_note: "C4".to_string(),
            actual_note: "C4".to_string(),
            pitch_diff_hz: 0.0,
        }
    }

    fn stats(duration: f32) -> RecordingStats {
        RecordingStats {
            user_duration_secs: duration,
            reference_duration_secs: duration,
            user_rms_std: 0.01,
            user_energy_variance: 0.001,
        }
    }

    #[test]
    fn test_power_law_curve() {
        let curve = MistakePenaltyCurve::default();
        assert_eq!(curve.penalty(&MistakeCounts::default()), 0.0);
        let counts = MistakeCounts {
            total: 3,
            major: 1,
            missing: 1,
            frames: 0,
        };
        let expected = (1.3f32 + 1.6).powf(1.05) * 1.04 + 2.0;
        assert!((curve.penalty(&counts) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_stepped_curve() {
        let curve = MistakePenaltyCurve::stepped();
        let c = |n| MistakeCounts {
            total: n,
            ..Default::default()
        };
        assert!((curve.penalty(&c(10)) - 5.0).abs() < 1e-5);
        assert!((curve.penalty(&c(16)) - 8.0 * 1.1).abs() < 1e-4);
        assert!((curve.penalty(&c(31)) - 15.5 * 1.1 * 1.2 * 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_self_match_is_perfect() {
        let a = alignment(100.0, 0.0, 2000);
        let m = metrics(1.0, 1.0, 1.0);
        let inputs = ScoreInputs {
            alignment: &a,
            metrics: &m,
            mistakes: &[],
            key_shift: 0,
            vocal_quality: 1.0,
            recording: stats(10.0),
        };
        let agg = aggregate(&inputs, &AggregationConfig::default());
        assert_eq!(agg.breakdown.quality_tier, QualityTier::PerfectMatch);
        assert!(agg.breakdown.final_score >= 99.0);
        assert!(agg.warnings.is_empty());
    }

    #[test]
    fn test_single_frame_path_never_self_matches() {
        let a = alignment(100.0, 0.0, 1);
        let m = metrics(1.0, 1.0, 1.0);
        let inputs = ScoreInputs {
            alignment: &a,
            metrics: &m,
            mistakes: &[],
            key_shift: 0,
            vocal_quality: 1.0,
            recording: stats(90.0),
        };
        let agg = aggregate(&inputs, &AggregationConfig::default());
        assert_ne!(agg.breakdown.quality_tier, QualityTier::PerfectMatch);
    }

    #[test]
    fn test_nothing_voiced_never_self_matches() {
        let a = alignment(100.0, 0.0, 2000);
        let mut m = metrics(0.0, 0.0, 1.0);
        m.voiced_frames = 0;
        m.note_agreement.frames = 0;
        let inputs = ScoreInputs {
            alignment: &a,
            metrics: &m,
            mistakes: &[],
            key_shift: 0,
            vocal_quality: 1.0,
            recording: stats(46.0),
        };
        let agg = aggregate(&inputs, &AggregationConfig::default());
        assert_ne!(agg.breakdown.quality_tier, QualityTier::PerfectMatch);
        assert_eq!(agg.breakdown.base_accuracy, 0.0);
        assert!(agg.breakdown.final_score < 99.0);
    }

    #[test]
    fn test_good_average_needs_practice() {
        let config = AggregationConfig::default();
        let a = alignment(90.0, 0.5, 2000);

        let good = metrics(0.9, 0.9, 0.9);
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &good,
                mistakes: &[event(MistakeReason::SlightlyHigh, 20)],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: stats(50.0),
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::Good);

        let average = metrics(0.7, 0.3, 0.9);
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &average,
                mistakes: &[],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: stats(50.0),
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::Average);

        let poor = metrics(0.2, 0.1, 0.9);
        let mistakes: Vec<MistakeEvent> = (0..30).map(|_| event(MistakeReason::TooLowMajor, 20)).collect();
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &poor,
                mistakes: &mistakes,
                key_shift: 3,
                vocal_quality: 1.0,
                recording: stats(50.0),
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::NeedsPractice);
        assert_eq!(agg.breakdown.mistake_penalty, 35.0 * 0.75);
        assert!((agg.breakdown.key_shift_penalty - 0.12).abs() < 1e-6);
        assert!((0.0..=100.0).contains(&agg.breakdown.final_score));
    }

    #[test]
    fn test_integrity_discounts_override_tier() {
        let config = AggregationConfig::default();
        let a = alignment(90.0, 0.5, 2000);
        let m = metrics(0.9, 0.9, 0.4);
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &m,
                mistakes: &[],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: stats(50.0),
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::LowSingingActivity);
        assert_eq!(agg.warnings.len(), 1);

        let m = metrics(0.9, 0.9, 0.9);
        let mut short = stats(25.0);
        short.reference_duration_secs = 200.0;
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &m,
                mistakes: &[],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: short,
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::TooShortToEvaluate);

        let mut partial = stats(50.0);
        partial.reference_duration_secs = 200.0;
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &m,
                mistakes: &[],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: partial,
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::PartialRecording);

        let mut unstable = stats(50.0);
        unstable.user_rms_std = 0.2;
        unstable.user_energy_variance = 0.5;
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &m,
                mistakes: &[],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: unstable,
            },
            &config,
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::UnstableRecording);
    }

    #[test]
    fn test_full_recording_bonus_stays_clamped() {
        let a = alignment(100.0, 0.2, 5000);
        let m = metrics(1.0, 1.0, 1.0);
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &m,
                mistakes: &[event(MistakeReason::Extra, 1)],
                key_shift: 0,
                vocal_quality: 1.0,
                recording: stats(120.0),
            },
            &AggregationConfig::default(),
        );
        assert_eq!(agg.breakdown.quality_tier, QualityTier::Good);
        assert_eq!(agg.breakdown.final_score, 100.0);
    }

    #[test]
    fn test_score_clamped_under_huge_penalties() {
        let a = alignment(0.0, 50.0, 100);
        let mut m = metrics(0.0, 0.0, 0.1);
        m.timing_penalty = 1e6;
        m.energy_correlation_penalty = 1e6;
        let agg = aggregate(
            &ScoreInputs {
                alignment: &a,
                metrics: &m,
                mistakes: &[],
                key_shift: 11,
                vocal_quality: 0.0,
                recording: stats(5.0),
            },
            &AggregationConfig::default(),
        );
        assert_eq!(agg.breakdown.final_score, 0.0);
    }
}
