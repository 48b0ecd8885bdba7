//! Sequence alignment
//!
//! Aligns the reference and (key-aligned) user unit chroma sequences with
//! approximate DTW under the hybrid distance, then converts the alignment
//! cost into a self-calibrated 0-100 accuracy:
//!
//! ```text
//! effective = max(0, pairDistance − selfDistance)
//! accuracy  = 100 · exp(−k · effective)
//! ```
//!
//! `selfDistance` is the reference aligned against itself; it is close to but
//! not exactly zero, and subtracting it makes a literal self-match score 100.

pub mod distance;
pub mod fastdtw;

pub use distance::hybrid_distance;
pub use fastdtw::{fast_dtw, full_dtw, Warping};

use crate::error::AnalysisError;
use crate::features::chroma::PitchClassMatrix;
use serde::{Deserialize, Serialize};

/// Sequence alignment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Cosine weight of the hybrid distance (default: 0.40)
    pub alpha: f32,

    /// Exponential decay constant for accuracy (default: 0.20)
    pub decay_k: f32,

    /// FastDTW window radius in coarse cells (default: 1)
    /// Wider windows trade compute for alignment quality on strongly warped performances
    pub radius: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.40,
            decay_k: 0.20,
            radius: 1,
        }
    }
}

/// Monotone `(referenceFrame, userFrame)` alignment path
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AlignmentPath {
    pairs: Vec<(usize, usize)>,
}

impl AlignmentPath {
    /// Wrap a list of pairs (assumed monotone non-decreasing in both components)
    pub fn new(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    /// Number of pairs
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// `true` when the path has no pairs
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All pairs in order
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    /// Iterate over `(referenceFrame, userFrame)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs.iter().copied()
    }
}

/// Output of the sequence aligner
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutcome {
    /// Reference/user alignment path
    pub path: AlignmentPath,

    /// Pair cost normalized by path length
    pub pair_distance: f32,

    /// Reference-vs-reference cost normalized by path length
    pub self_distance: f32,

    /// `max(0, pair_distance − self_distance)`
    pub effective_distance: f32,

    /// `100 · exp(−k · effective_distance)`, clamped to [0, 100]
    pub accuracy: f32,
}

/// Align two unit sequences and return the path with its normalized distance
///
/// # Returns
///
/// `(normalizedDistance, path)` where the distance is the total path cost
/// divided by `max(1, path length)`.
pub fn normalized_dtw_distance(
    reference: &PitchClassMatrix,
    user: &PitchClassMatrix,
    config: &AlignmentConfig,
) -> Result<(f32, AlignmentPath), AnalysisError> {
    let alpha = config.alpha;
    let dist = move |x: &[f32; 12], y: &[f32; 12]| hybrid_distance(x, y, alpha);
    let warping = fast_dtw(reference.frames(), user.frames(), config.radius, &dist)?;
    let normalized = warping.cost / warping.path.len().max(1) as f64;
    Ok((normalized as f32, AlignmentPath::new(warping.path)))
}

/// Convert an effective distance into a 0-100 accuracy
pub fn calibrated_accuracy(effective_distance: f32, decay_k: f32) -> f32 {
    (100.0 * (-decay_k * effective_distance).exp()).clamp(0.0, 100.0)
}

/// Align reference and user sequences with self-calibrated accuracy
///
/// # Arguments
///
/// * `reference` - Reference unit matrix
/// * `user` - Key-aligned user unit matrix
/// * `config` - Alignment configuration
///
/// # Errors
///
/// Returns `AnalysisError::NumericalError` if the alignment cost is not finite
/// (non-finite input values).
///
/// # Example
///
/// ```
/// use stratum_vocal::features::chroma::PitchClassMatrix;
/// use stratum_vocal::features::alignment::{align_sequences, AlignmentConfig};
///
/// let mut frame = [0.0f32; 12];
/// frame[0] = 1.0;
/// let m = PitchClassMatrix::new(vec![frame; 50]);
/// let outcome = align_sequences(&m, &m, &AlignmentConfig::default())?;
/// assert!(outcome.accuracy > 99.9);
/// # Ok::<(), stratum_vocal::AnalysisError>(())
/// ```
pub fn align_sequences(
    reference: &PitchClassMatrix,
    user: &PitchClassMatrix,
    config: &AlignmentConfig,
) -> Result<AlignmentOutcome, AnalysisError> {
    log::debug!(
        "Aligning {} reference frames against {} user frames (alpha={:.2}, radius={})",
        reference.n_frames(),
        user.n_frames(),
        config.alpha,
        config.radius
    );

    let (self_distance, _) = normalized_dtw_distance(reference, reference, config)?;
    let (pair_distance, path) = normalized_dtw_distance(reference, user, config)?;

    if !self_distance.is_finite() || !pair_distance.is_finite() {
        return Err(AnalysisError::NumericalError(format!(
            "Non-finite alignment distance (self={}, pair={})",
            self_distance, pair_distance
        )));
    }

    let effective_distance = (pair_distance - self_distance).max(0.0);
    let accuracy = calibrated_accuracy(effective_distance, config.decay_k);

    log::debug!(
        "Alignment: path={} pairs, self={:.4}, pair={:.4}, effective={:.4}, accuracy={:.2}",
        path.len(),
        self_distance,
        pair_distance,
        effective_distance,
        accuracy
    );

    Ok(AlignmentOutcome {
        path,
        pair_distance,
        self_distance,
        effective_distance,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chroma::unit_normalize_columns;

    fn melody(n: usize, notes: &[usize], frames_per_note: usize) -> PitchClassMatrix {
        let raw = PitchClassMatrix::new(
            (0..n)
                .map(|t| {
                    let mut f = [0.05f32; 12];
                    f[notes[(t / frames_per_note) % notes.len()]] = 1.0;
                    f
                })
                .collect(),
        );
        unit_normalize_columns(&raw)
    }

    #[test]
    fn test_self_alignment_scores_100() {
        let m = melody(300, &[0, 4, 7, 5, 2], 12);
        let outcome = align_sequences(&m, &m, &AlignmentConfig::default()).unwrap();
        assert_eq!(outcome.effective_distance, 0.0);
        assert!((outcome.accuracy - 100.0).abs() < 1e-4);
        assert_eq!(outcome.path.len(), 300);
        assert!(outcome.path.pairs().iter().all(|&(i, j)| i == j));
    }

    #[test]
    fn test_repeated_dense_frames_align_on_diagonal() {
        // Every column is the same non-one-hot unit vector
        let m = melody(100, &[9], 100);
        let outcome = align_sequences(&m, &m, &AlignmentConfig::default()).unwrap();
        assert_eq!(outcome.path.len(), 100);
        assert_eq!(outcome.path.pairs()[..3], [(0, 0), (1, 1), (2, 2)]);
        assert!(outcome.self_distance >= 0.0);
    }

    #[test]
    fn test_different_melody_scores_lower() {
        let a = melody(200, &[0, 4, 7, 5], 10);
        let b = melody(200, &[1, 9, 3, 11], 10);
        let outcome = align_sequences(&a, &b, &AlignmentConfig::default()).unwrap();
        assert!(outcome.effective_distance > 0.1);
        assert!(outcome.accuracy < 100.0);
        assert!(outcome.accuracy > 0.0);
    }

    #[test]
    fn test_accuracy_monotone_in_distance() {
        let k = 0.2;
        assert_eq!(calibrated_accuracy(0.0, k), 100.0);
        assert!(calibrated_accuracy(0.5, k) > calibrated_accuracy(1.0, k));
        assert!(calibrated_accuracy(1e6, k) >= 0.0);
    }

    #[test]
    fn test_tempo_drift_still_aligns() {
        let a = melody(200, &[0, 4, 7, 5], 10);
        let b = melody(260, &[0, 4, 7, 5], 13);
        let outcome = align_sequences(&a, &b, &AlignmentConfig::default()).unwrap();
        assert!(outcome.accuracy > 95.0, "accuracy={}", outcome.accuracy);
        assert_eq!(outcome.path.pairs().first(), Some(&(0, 0)));
        assert_eq!(outcome.path.pairs().last(), Some(&(199, 259)));
    }

    #[test]
    fn test_empty_user() {
        let a = melody(20, &[0], 5);
        let outcome = align_sequences(&a, &PitchClassMatrix::default(), &AlignmentConfig::default()).unwrap();
        assert!(outcome.path.is_empty());
        assert_eq!(outcome.pair_distance, 0.0);
    }
}
