//! # Stratum Vocal
//!
//! A deterministic scoring engine for sung performances: compares a user's
//! pitch-class energy trajectory against a reference and produces a
//! calibrated 0-100 score, a quality tier and a list of musically meaningful
//! mistakes.
//!
//! ## Features
//!
//! - **Key Alignment**: Rotates the user's pitch classes into the reference key
//! - **Sequence Alignment**: FastDTW under a hybrid cosine/Euclidean distance,
//!   self-calibrated so a literal self-match scores 100
//! - **Mistake Detection**: Missing notes, extra notes and graded pitch errors,
//!   debounced into discrete events
//! - **Scoring**: Weighted accuracy with bounded penalties, quality tiers and
//!   multiplicative integrity discounts
//! - **Vocal Quality Gate**: Rejects silence, noise, hums and short recordings
//!   with a single actionable reason
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_vocal::{compare_features, RecordingFeatures, ScoringConfig};
//!
//! // Features from your chroma extractor (12 × T raw energies, RMS, flatness)
//! # fn load(_: &str) -> RecordingFeatures { unimplemented!() }
//! let reference: RecordingFeatures = load("reference");
//! let user: RecordingFeatures = load("user");
//!
//! let result = compare_features(&reference, &user, &ScoringConfig::default())?;
//! println!("Score: {:.1} ({})", result.final_score, result.quality_tier);
//! for m in &result.mistakes {
//!     println!("{:.2}s-{:.2}s {}", m.start_time, m.end_time, m.description);
//! }
//! # Ok::<(), stratum_vocal::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The comparison pipeline follows this flow:
//!
//! ```text
//! Features → Vocal Gate → Key Alignment → Sequence Alignment → Mistakes + Metrics → Aggregation → Result
//! ```
//!
//! Feature extraction for the two recordings runs concurrently
//! ([`compare_recordings`]); everything after the join is single-threaded.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod preprocessing;

// Re-export main types
pub use analysis::metadata::ComparisonMetadata;
pub use analysis::result::{
    ComparisonResult, Key, MistakeEvent, MistakeReason, MistakeSummary, QualityTier, ScoreBreakdown, ScoreReport,
};
pub use config::ScoringConfig;
pub use error::AnalysisError;
pub use features::chroma::PitchClassMatrix;
pub use features::recording::{FeatureExtractor, RecordingFeatures};
pub use preprocessing::vocal_gate::{GateDiagnostics, GateOutcome};

use analysis::mistakes::{detect_mistakes, summarize_mistakes};
use analysis::metrics::extract_metrics;
use analysis::scoring::{aggregate, RecordingStats, ScoreInputs};
use features::alignment::align_sequences;
use features::key::{align_user_key, estimate_key};
use features::threshold::{std_dev, variance};
use preprocessing::vocal_gate::evaluate_vocal_quality;
use std::time::Instant;

/// Main comparison function
///
/// Runs the full pipeline on already-extracted features: validation, vocal
/// gate, key alignment, sequence alignment, mistake detection, metrics and
/// score aggregation.
///
/// # Arguments
///
/// * `reference` - Reference recording features
/// * `user` - User recording features
/// * `config` - Scoring configuration
///
/// # Returns
///
/// `ComparisonResult` with mistakes, per-reason summary, final score and
/// tier. A recording rejected by the vocal gate yields a zero-score result
/// with diagnostics, not an error.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an inconsistent configuration or
/// malformed features, and `AnalysisError::NumericalError` if alignment
/// produces non-finite values.
pub fn compare_features(
    reference: &RecordingFeatures,
    user: &RecordingFeatures,
    config: &ScoringConfig,
) -> Result<ComparisonResult, AnalysisError> {
    let start_time = Instant::now();

    config.validate()?;
    reference.validate("reference")?;
    user.validate("user")?;

    log::debug!(
        "Comparing {} reference frames against {} user frames",
        reference.n_frames(),
        user.n_frames()
    );

    let mut metadata = ComparisonMetadata {
        reference_duration_secs: reference.duration_secs(),
        user_duration_secs: user.duration_secs(),
        reference_frames: reference.n_frames(),
        user_frames: user.n_frames(),
        ..Default::default()
    };

    let outcome = evaluate_vocal_quality(user, &config.vocal_gate);
    log::debug!("Vocal gate diagnostics: {:?}", outcome.diagnostics());

    let (vocal_quality, diagnostics) = match outcome {
        GateOutcome::Rejected {
            tier,
            message,
            diagnostics,
        } => {
            metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;
            log::info!("Recording rejected: {} ({})", tier, message);
            return Ok(ComparisonResult::rejected(tier, message, diagnostics, metadata));
        }
        GateOutcome::Accepted {
            vocal_quality,
            diagnostics,
        } => (vocal_quality, diagnostics),
    };

    let report = run_engine(reference, user, vocal_quality, config)?;

    metadata.path_length = report.path_length;
    metadata.warnings = report.warnings;
    metadata.processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;

    log::info!(
        "Final score: {:.2} | tier: {} | mistakes: {} | {:.1} ms",
        report.breakdown.final_score,
        report.breakdown.quality_tier,
        report.mistakes.len(),
        metadata.processing_time_ms
    );

    Ok(ComparisonResult {
        final_score: report.breakdown.final_score,
        quality_tier: report.breakdown.quality_tier,
        message: report.message,
        mistakes: report.mistakes,
        mistake_summary: report.mistake_summary,
        breakdown: Some(report.breakdown),
        diagnostics: Some(diagnostics),
        reference_key: Some(report.reference_key),
        user_key: Some(report.user_key),
        key_shift: Some(report.key_shift),
        metadata,
    })
}

/// Extract both recordings concurrently, then compare them
///
/// # Arguments
///
/// * `extractor` - Feature-extraction collaborator
/// * `reference` - Reference recording source
/// * `user` - User recording source
/// * `config` - Scoring configuration
///
/// # Errors
///
/// Propagates extraction errors, then any error from [`compare_features`].
pub fn compare_recordings<E: FeatureExtractor>(
    extractor: &E,
    reference: &E::Source,
    user: &E::Source,
    config: &ScoringConfig,
) -> Result<ComparisonResult, AnalysisError> {
    let (reference, user) = features::recording::extract_pair(extractor, reference, user)?;
    compare_features(&reference, &user, config)
}

/// Score a performance without the vocal gate
///
/// For callers that gate separately (or not at all): key alignment, sequence
/// alignment, mistake detection, metrics and aggregation.
///
/// # Arguments
///
/// * `reference` - Reference recording features
/// * `user` - User recording features
/// * `vocal_quality` - Vocal-quality confidence in [0, 1] (1.0 when ungated)
/// * `config` - Scoring configuration
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an inconsistent configuration,
/// malformed features or a vocal quality outside [0, 1].
///
/// # Example
///
/// ```
/// use stratum_vocal::{score_performance, PitchClassMatrix, QualityTier, RecordingFeatures, ScoringConfig};
///
/// let mut frame = [0.0f32; 12];
/// frame[9] = 1.0;
/// let features = RecordingFeatures::from_raw(
///     PitchClassMatrix::new(vec![frame; 100]),
///     vec![0.05; 100],
///     vec![0.2; 100],
///     22050,
///     512,
/// );
/// let report = score_performance(&features, &features, 1.0, &ScoringConfig::default())?;
/// assert_eq!(report.quality_tier(), QualityTier::PerfectMatch);
/// assert!(report.final_score() >= 99.0);
/// # Ok::<(), stratum_vocal::AnalysisError>(())
/// ```
pub fn score_performance(
    reference: &RecordingFeatures,
    user: &RecordingFeatures,
    vocal_quality: f32,
    config: &ScoringConfig,
) -> Result<ScoreReport, AnalysisError> {
    config.validate()?;
    reference.validate("reference")?;
    user.validate("user")?;
    if !(0.0..=1.0).contains(&vocal_quality) {
        return Err(AnalysisError::InvalidInput(format!(
            "Vocal quality must be in [0, 1], got {}",
            vocal_quality
        )));
    }
    run_engine(reference, user, vocal_quality, config)
}

/// Key-align, align, detect, measure and aggregate (inputs already validated)
fn run_engine(
    reference: &RecordingFeatures,
    user: &RecordingFeatures,
    vocal_quality: f32,
    config: &ScoringConfig,
) -> Result<ScoreReport, AnalysisError> {
    let reference_key = estimate_key(&reference.unit);
    let user_key = estimate_key(&user.unit);

    let mut aligned_user = user.clone();
    let key = align_user_key(&reference.unit, &mut aligned_user.unit, &mut aligned_user.raw);

    let alignment = align_sequences(&reference.unit, &aligned_user.unit, &config.alignment)?;
    let mistakes = detect_mistakes(reference, &aligned_user, &alignment.path, &config.mistakes);
    let metrics = extract_metrics(reference, &aligned_user, &alignment.path, &config.metrics);

    let recording = RecordingStats {
        user_duration_secs: user.duration_secs(),
        reference_duration_secs: reference.duration_secs(),
        user_rms_std: std_dev(&user.rms),
        user_energy_variance: variance(&user.energy),
    };

    let aggregated = aggregate(
        &ScoreInputs {
            alignment: &alignment,
            metrics: &metrics,
            mistakes: &mistakes,
            key_shift: key.shift,
            vocal_quality,
            recording,
        },
        &config.aggregation,
    );

    Ok(ScoreReport {
        mistake_summary: summarize_mistakes(&mistakes),
        mistakes,
        breakdown: aggregated.breakdown,
        message: aggregated.message,
        reference_key,
        user_key,
        key_shift: key.shift,
        path_length: alignment.path.len(),
        warnings: aggregated.warnings,
    })
}
