//! Chroma normalization strategies

use super::matrix::{PitchClassMatrix, PITCH_CLASSES};

/// Added to every column norm so all-silent columns stay near zero instead of
/// dividing by zero
pub const NORM_EPSILON: f32 = 1e-8;

/// L2-normalize one 12-element chroma vector
///
/// # Arguments
///
/// * `chroma` - 12-element chroma vector
///
/// # Returns
///
/// Unit-length vector, or a near-zero vector when the input is silent
pub fn unit_normalize(chroma: &[f32; PITCH_CLASSES]) -> [f32; PITCH_CLASSES] {
    let norm = chroma.iter().map(|v| v * v).sum::<f32>().sqrt() + NORM_EPSILON;
    let mut out = [0.0f32; PITCH_CLASSES];
    for (o, &v) in out.iter_mut().zip(chroma.iter()) {
        *o = v / norm;
    }
    out
}

/// L2-normalize every column of a pitch-class matrix
///
/// This produces the `unit` variant used for alignment distances.
pub fn unit_normalize_columns(raw: &PitchClassMatrix) -> PitchClassMatrix {
    log::debug!("Unit-normalizing {} chroma columns", raw.n_frames());
    PitchClassMatrix::new(raw.frames().iter().map(unit_normalize).collect())
}

/// Allowed deviation of a unit column's norm from 1
pub const UNIT_NORM_TOLERANCE: f32 = 1e-5;

fn l2_norm(column: &[f32; PITCH_CLASSES]) -> f32 {
    column.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// First column of `unit` that is not a unit-normalized view of `raw`
///
/// No column may be longer than 1 (±`tolerance`) or hold a negative or
/// non-finite value. Where the raw column is loud enough that the norm
/// epsilon is negligible (`‖raw‖·tolerance ≥ NORM_EPSILON`), the unit column
/// must have norm 1 (±`tolerance`); quieter columns are treated as silent.
///
/// # Returns
///
/// Index of the first offending column, or `None` when all columns pass
pub fn find_non_unit_column(raw: &PitchClassMatrix, unit: &PitchClassMatrix, tolerance: f32) -> Option<usize> {
    raw.frames()
        .iter()
        .zip(unit.frames().iter())
        .position(|(r, u)| {
            if u.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return true;
            }
            let norm = l2_norm(u);
            if norm > 1.0 + tolerance {
                return true;
            }
            l2_norm(r) * tolerance >= NORM_EPSILON && (norm - 1.0).abs() > tolerance
        })
}
