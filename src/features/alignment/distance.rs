//! Hybrid frame distance
//!
//! For unit vectors `x`, `y` with dot product `d`:
//! - cosine distance is `1 − d`
//! - Euclidean distance is `sqrt(2 − 2d)`
//!
//! The hybrid distance is the convex blend `α·(1 − d) + (1 − α)·sqrt(max(0, 2 − 2d))`.
//!
//! `d` is clamped to [-1, 1] first. Rounding can push the self dot product of
//! a unit column just above 1, and a negative cell cost would make DTW favor
//! the longest path.

use crate::features::chroma::PITCH_CLASSES;

/// Dot product of two 12-element vectors
#[inline]
pub fn dot(x: &[f32; PITCH_CLASSES], y: &[f32; PITCH_CLASSES]) -> f32 {
    x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
}

/// Hybrid cosine/Euclidean distance between two unit vectors
///
/// # Arguments
///
/// * `x`, `y` - Unit-normalized chroma columns
/// * `alpha` - Cosine weight in [0, 1] (reference 0.40)
#[inline]
pub fn hybrid_distance(x: &[f32; PITCH_CLASSES], y: &[f32; PITCH_CLASSES], alpha: f32) -> f32 {
    let d = dot(x, y).clamp(-1.0, 1.0);
    let cosine = 1.0 - d;
    let euclidean = (2.0 - 2.0 * d).max(0.0).sqrt();
    alpha * cosine + (1.0 - alpha) * euclidean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chroma::unit_normalize;

    fn basis(pc: usize) -> [f32; PITCH_CLASSES] {
        let mut v = [0.0f32; PITCH_CLASSES];
        v[pc] = 1.0;
        v
    }

    #[test]
    fn test_identical_vectors_have_zero_distance() {
        let v = basis(3);
        assert_eq!(hybrid_distance(&v, &v, 0.4), 0.0);
    }

    #[test]
    fn test_orthogonal_vectors() {
        let d = hybrid_distance(&basis(0), &basis(7), 0.4);
        // 0.4 * 1 + 0.6 * sqrt(2)
        assert!((d - (0.4 + 0.6 * 2.0f32.sqrt())).abs() < 1e-6);
    }

    #[test]
    fn test_alpha_extremes() {
        let x = basis(0);
        let mut y = [0.0f32; PITCH_CLASSES];
        y[0] = 0.6;
        y[1] = 0.8;
        // d = 0.6
        assert!((hybrid_distance(&x, &y, 1.0) - 0.4).abs() < 1e-6);
        assert!((hybrid_distance(&x, &y, 0.0) - 0.8f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_dense_unit_column_is_never_negative() {
        let mut raw = [0.02f32; PITCH_CLASSES];
        raw[9] = 1.0;
        let u = unit_normalize(&raw);
        let d = hybrid_distance(&u, &u, 0.4);
        assert!((0.0..1e-3).contains(&d), "self distance {}", d);

        let mut other = raw;
        other[2] = 0.3;
        let v = unit_normalize(&other);
        assert!(hybrid_distance(&u, &v, 0.4) > 0.0);
        assert!(hybrid_distance(&v, &v, 0.0) >= 0.0);
    }

    #[test]
    fn test_near_zero_vectors_do_not_produce_nan() {
        let z = [0.0f32; PITCH_CLASSES];
        let d = hybrid_distance(&z, &basis(2), 0.4);
        assert!(d.is_finite());
    }
}
