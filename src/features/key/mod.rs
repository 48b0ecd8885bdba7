//! Key alignment
//!
//! Singers often perform a song in a different key than the reference. Before
//! any alignment or scoring, the user's pitch-class axis is rotated so that
//! both recordings share the same tonic:
//! - Tonic estimation (argmax of time-summed energy)
//! - Key shift `tonicUser − tonicReference`
//! - In-place circular rotation of the user's `unit` and `raw` matrices

pub mod detector;
pub mod templates;

pub use detector::{estimate_key, estimate_tonic};

use crate::features::chroma::{PitchClassMatrix, PITCH_CLASSES};

/// Key alignment result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAlignment {
    /// Tonic pitch class of the reference
    pub reference_tonic: usize,

    /// Tonic pitch class of the user (before rotation)
    pub user_tonic: usize,

    /// `user_tonic − reference_tonic`, unreduced (−11..=11)
    pub shift: i32,
}

impl KeyAlignment {
    /// Shift folded into the signed range −6..=5 (musical transposition distance)
    pub fn reduced_shift(&self) -> i32 {
        let r = self.shift.rem_euclid(PITCH_CLASSES as i32);
        if r > 6 {
            r - PITCH_CLASSES as i32
        } else {
            r
        }
    }
}

/// Rotate every frame of a matrix by `-steps` pitch classes, in place
///
/// After the call, bin `i` holds what bin `i + steps` (mod 12) held before, so
/// a user who sang `steps` semitones above the reference is brought down into
/// the reference key. Rotating by `s` then by `-s` restores the matrix exactly.
pub fn rotate_pitch_classes(matrix: &mut PitchClassMatrix, steps: i32) {
    let k = steps.rem_euclid(PITCH_CLASSES as i32) as usize;
    if k == 0 {
        return;
    }
    for frame in matrix.frames_mut() {
        frame.rotate_left(k);
    }
}

/// Estimate the key shift and rotate the user matrices into the reference key
///
/// Both the user's `unit` and `raw` matrices are rotated in place; everything
/// downstream consumes the rotated matrices. Never fails: silent input yields
/// tonic 0 and therefore a defined shift.
///
/// # Arguments
///
/// * `reference_unit` - Reference unit-normalized matrix
/// * `user_unit` - User unit-normalized matrix (rotated in place)
/// * `user_raw` - User raw matrix (rotated in place)
pub fn align_user_key(
    reference_unit: &PitchClassMatrix,
    user_unit: &mut PitchClassMatrix,
    user_raw: &mut PitchClassMatrix,
) -> KeyAlignment {
    let reference_tonic = estimate_tonic(reference_unit);
    let user_tonic = estimate_tonic(user_unit);
    let alignment = KeyAlignment {
        reference_tonic,
        user_tonic,
        shift: user_tonic as i32 - reference_tonic as i32,
    };

    log::debug!(
        "Key alignment: reference tonic={}, user tonic={}, shift={} ({:+} semitones)",
        reference_tonic,
        user_tonic,
        alignment.shift,
        alignment.reduced_shift()
    );

    rotate_pitch_classes(user_unit, alignment.shift);
    rotate_pitch_classes(user_raw, alignment.shift);

    alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn melody(n: usize, base: usize) -> PitchClassMatrix {
        let frames = (0..n)
            .map(|t| {
                let mut f = [0.01f32; 12];
                let pc = (base + [0, 0, 4, 7, 0][t % 5]) % 12;
                f[pc] = 1.0;
                f
            })
            .collect();
        PitchClassMatrix::new(frames)
    }

    #[test]
    fn test_rotation_roundtrip() {
        let original = melody(20, 2);
        for s in -6..=6 {
            let mut m = original.clone();
            rotate_pitch_classes(&mut m, s);
            rotate_pitch_classes(&mut m, -s);
            assert_eq!(m, original, "rotation by {} did not round-trip", s);
        }
    }

    #[test]
    fn test_rotation_direction() {
        let mut f = [0.0f32; 12];
        f[5] = 1.0;
        let mut m = PitchClassMatrix::new(vec![f]);
        rotate_pitch_classes(&mut m, 2);
        assert_eq!(m.dominant_class(0), 3);
        rotate_pitch_classes(&mut m, -5);
        assert_eq!(m.dominant_class(0), 8);
    }

    #[test]
    fn test_align_user_key_detects_shift() {
        let reference = melody(30, 0);
        let mut user_unit = melody(30, 2);
        let mut user_raw = melody(30, 2);

        let alignment = align_user_key(&reference, &mut user_unit, &mut user_raw);
        assert_eq!(alignment.shift, 2);
        assert_eq!(alignment.reduced_shift(), 2);
        assert_eq!(user_unit, reference);
        assert_eq!(user_raw, reference);
    }

    #[test]
    fn test_align_user_key_unreduced_shift() {
        let reference = melody(10, 11);
        let mut user_unit = melody(10, 1);
        let mut user_raw = melody(10, 1);

        let alignment = align_user_key(&reference, &mut user_unit, &mut user_raw);
        assert_eq!(alignment.shift, -10);
        assert_eq!(alignment.reduced_shift(), 2);
        assert_eq!(user_unit, reference);
    }

    #[test]
    fn test_align_user_key_silent_input() {
        let reference = PitchClassMatrix::new(vec![[0.0; 12]; 4]);
        let mut user_unit = reference.clone();
        let mut user_raw = reference.clone();
        let alignment = align_user_key(&reference, &mut user_unit, &mut user_raw);
        assert_eq!(alignment.shift, 0);
    }
}
