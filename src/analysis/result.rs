//! Comparison result types

use super::metadata::ComparisonMetadata;
use crate::features::chroma::NOTE_NAMES;
use crate::preprocessing::vocal_gate::GateDiagnostics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Musical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

impl Key {
    /// Get key name in musical notation (e.g., "C", "Am", "F#", "D#m")
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_vocal::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).name(), "C");
    /// assert_eq!(Key::Major(6).name(), "F#");
    /// assert_eq!(Key::Minor(9).name(), "Am");
    /// ```
    pub fn name(&self) -> String {
        match self {
            Key::Major(i) => NOTE_NAMES[*i as usize % 12].to_string(),
            Key::Minor(i) => format!("{}m", NOTE_NAMES[*i as usize % 12]),
        }
    }

    /// Tonic pitch class (0-11)
    pub fn tonic(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }
}

/// Why a stretch of the performance was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MistakeReason {
    /// Reference has a note, user is silent
    Missing,
    /// User sings where the reference is silent
    Extra,
    /// Sharp by fewer than 4 semitones
    SlightlyHigh,
    /// Flat by fewer than 4 semitones
    SlightlyLow,
    /// Sharp by 4-6 semitones
    TooHigh,
    /// Flat by 4-6 semitones
    TooLow,
    /// Sharp by 7 or more semitones
    TooHighMajor,
    /// Flat by 7 or more semitones
    TooLowMajor,
}

impl MistakeReason {
    /// Wire label (e.g. "too-high-major")
    pub fn as_str(&self) -> &'static str {
        match self {
            MistakeReason::Missing => "missing",
            MistakeReason::Extra => "extra",
            MistakeReason::SlightlyHigh => "slightly-high",
            MistakeReason::SlightlyLow => "slightly-low",
            MistakeReason::TooHigh => "too-high",
            MistakeReason::TooLow => "too-low",
            MistakeReason::TooHighMajor => "too-high-major",
            MistakeReason::TooLowMajor => "too-low-major",
        }
    }

    /// Large pitch error (7+ semitones)
    pub fn is_major(&self) -> bool {
        matches!(self, MistakeReason::TooHighMajor | MistakeReason::TooLowMajor)
    }

    /// Any wrong-pitch reason (as opposed to missing/extra)
    pub fn is_pitch_error(&self) -> bool {
        !matches!(self, MistakeReason::Missing | MistakeReason::Extra)
    }
}

impl fmt::Display for MistakeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One debounced mistake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeEvent {
    /// Mistake class
    pub reason: MistakeReason,

    /// Severity 1-3 (maximum seen across merged frames)
    pub severity: u8,

    /// Start time in seconds (user timeline)
    pub start_time: f32,

    /// End time in seconds (user timeline)
    pub end_time: f32,

    /// `end_time − start_time`
    pub duration: f32,

    /// Pitch class the reference expected (first merged frame)
    pub expected_pitch_class: usize,

    /// Pitch class the user produced (first merged frame)
    pub actual_pitch_class: usize,

    /// `actual − expected` pitch class index (first merged frame)
    pub semitone_delta: i32,

    /// Number of merged path frames
    pub frame_count: usize,

    /// Human-readable description
    pub description: String,

    /// Expected note name (octave 4 mapping)
    pub expected_note: String,

    /// Actual note name (octave 4 mapping)
    pub actual_note: String,

    /// Frequency gap between expected and actual notes in Hz (0 for missing)
    pub pitch_diff_hz: f32,
}

/// Per-reason aggregate of mistake events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeSummary {
    /// Number of events
    pub count: usize,

    /// Sum of event durations in seconds
    pub total_duration: f32,

    /// Description of the first event of this reason
    pub description: String,
}

/// Discrete, human-readable outcome bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    /// Literal or near-literal self-match
    #[serde(rename = "Perfect Match")]
    PerfectMatch,
    /// Good performance
    #[serde(rename = "Good")]
    Good,
    /// Average performance
    #[serde(rename = "Average")]
    Average,
    /// Poor performance
    #[serde(rename = "Needs Practice")]
    NeedsPractice,
    /// Singing covers under 30% of the recording
    #[serde(rename = "Too Little Singing")]
    TooLittleSinging,
    /// Singing covers under 50% of the recording
    #[serde(rename = "Low Singing Activity")]
    LowSingingActivity,
    /// Recording shorter than the minimum duration
    #[serde(rename = "Recording Too Short")]
    RecordingTooShort,
    /// Recording too short to score credibly
    #[serde(rename = "Too Short to Evaluate")]
    TooShortToEvaluate,
    /// Recording covers well under half of the reference
    #[serde(rename = "Partial Recording")]
    PartialRecording,
    /// Energy pattern looks like speech or noise bursts
    #[serde(rename = "Unstable Recording")]
    UnstableRecording,
    /// Rejected by the vocal gate (noise, no clear pitch, ...)
    #[serde(rename = "Invalid Recording")]
    InvalidRecording,
    /// Rejected by the vocal gate (silence, hum, ...)
    #[serde(rename = "No Singing Detected")]
    NoSingingDetected,
}

impl QualityTier {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::PerfectMatch => "Perfect Match",
            QualityTier::Good => "Good",
            QualityTier::Average => "Average",
            QualityTier::NeedsPractice => "Needs Practice",
            QualityTier::TooLittleSinging => "Too Little Singing",
            QualityTier::LowSingingActivity => "Low Singing Activity",
            QualityTier::RecordingTooShort => "Recording Too Short",
            QualityTier::TooShortToEvaluate => "Too Short to Evaluate",
            QualityTier::PartialRecording => "Partial Recording",
            QualityTier::UnstableRecording => "Unstable Recording",
            QualityTier::InvalidRecording => "Invalid Recording",
            QualityTier::NoSingingDetected => "No Singing Detected",
        }
    }

    /// One of the four performance tiers (not an integrity or rejection tier)
    pub fn is_performance_tier(&self) -> bool {
        matches!(
            self,
            QualityTier::PerfectMatch | QualityTier::Good | QualityTier::Average | QualityTier::NeedsPractice
        )
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every intermediate signal behind a final score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Self-calibrated DTW accuracy (0-100)
    pub dtw_accuracy: f32,
    /// Note-agreement score (0-100)
    pub note_agreement_score: f32,
    /// `100 · (1 − slope · mistakeRatio)` (0-100)
    pub base_accuracy: f32,
    /// Timing-jitter penalty
    pub timing_penalty: f32,
    /// `|shift| · perStepWeight`
    pub key_shift_penalty: f32,
    /// Energy-correlation penalty
    pub energy_correlation_penalty: f32,
    /// Bounded mistake-count penalty
    pub mistake_penalty: f32,
    /// Weighted base score before penalties
    pub base_score: f32,
    /// Base score minus all penalties
    pub penalized_score: f32,
    /// Final clamped score (0-100)
    pub final_score: f32,
    /// Final tier
    pub quality_tier: QualityTier,
    /// Alignment effective distance
    pub effective_distance: f32,
    /// Alignment self distance
    pub self_distance: f32,
    /// Alignment pair distance
    pub pair_distance: f32,
    /// Mistake frames over voiced frames
    pub mistake_ratio: f32,
    /// Path frames where both sides are voiced
    pub voiced_frames: usize,
    /// Fraction of user frames with singing
    pub singing_coverage: f32,
    /// Pitch/note quality blend scaled by vocal quality (0-1)
    pub overall_quality: f32,
    /// Vocal-quality confidence from the gate (0-1)
    pub vocal_quality: f32,
}

/// Result of one comparison request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Debounced mistake events in time order
    pub mistakes: Vec<MistakeEvent>,

    /// Count and total duration per reason
    pub mistake_summary: BTreeMap<MistakeReason, MistakeSummary>,

    /// Final score (0-100)
    pub final_score: f32,

    /// Quality tier
    pub quality_tier: QualityTier,

    /// Message for the singer
    pub message: String,

    /// Score breakdown (absent when the gate rejected the recording)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreBreakdown>,

    /// Gate diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<GateDiagnostics>,

    /// Estimated reference key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_key: Option<Key>,

    /// Estimated user key (before alignment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_key: Option<Key>,

    /// Key shift applied to the user (unreduced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_shift: Option<i32>,

    /// Request metadata
    pub metadata: ComparisonMetadata,
}

impl ComparisonResult {
    /// Early-exit result for a recording the vocal gate rejected
    pub fn rejected(
        tier: QualityTier,
        message: impl Into<String>,
        diagnostics: GateDiagnostics,
        metadata: ComparisonMetadata,
    ) -> Self {
        Self {
            mistakes: Vec::new(),
            mistake_summary: BTreeMap::new(),
            final_score: 0.0,
            quality_tier: tier,
            message: message.into(),
            breakdown: None,
            diagnostics: Some(diagnostics),
            reference_key: None,
            user_key: None,
            key_shift: None,
            metadata,
        }
    }

    /// `true` when the vocal gate rejected the recording
    pub fn is_rejected(&self) -> bool {
        self.breakdown.is_none()
    }
}

/// Output of the ungated scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Debounced mistake events in time order
    pub mistakes: Vec<MistakeEvent>,

    /// Count and total duration per reason
    pub mistake_summary: BTreeMap<MistakeReason, MistakeSummary>,

    /// Score breakdown
    pub breakdown: ScoreBreakdown,

    /// Message for the singer
    pub message: String,

    /// Estimated reference key
    pub reference_key: Key,

    /// Estimated user key (before alignment)
    pub user_key: Key,

    /// Key shift applied to the user (unreduced)
    pub key_shift: i32,

    /// Alignment path length
    pub path_length: usize,

    /// Integrity discounts that fired
    pub warnings: Vec<String>,
}

impl ScoreReport {
    /// Final score (0-100)
    pub fn final_score(&self) -> f32 {
        self.breakdown.final_score
    }

    /// Final tier
    pub fn quality_tier(&self) -> QualityTier {
        self.breakdown.quality_tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_name() {
        assert_eq!(Key::Major(1).name(), "C#");
        assert_eq!(Key::Minor(11).name(), "Bm");
        assert_eq!(Key::Minor(14).tonic(), 2);
    }

    #[test]
    fn test_reason_labels() {
        assert_eq!(MistakeReason::TooHighMajor.as_str(), "too-high-major");
        assert!(MistakeReason::TooLowMajor.is_major());
        assert!(!MistakeReason::TooLow.is_major());
        assert!(!MistakeReason::Missing.is_pitch_error());
        assert!(MistakeReason::SlightlyHigh.is_pitch_error());
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(QualityTier::PerfectMatch.to_string(), "Perfect Match");
        assert_eq!(QualityTier::NoSingingDetected.label(), "No Singing Detected");
        assert!(QualityTier::Average.is_performance_tier());
        assert!(!QualityTier::PartialRecording.is_performance_tier());
    }
}
