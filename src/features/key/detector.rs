//! Tonic and key estimation
//!
//! The tonic of a recording is taken as the pitch class with the largest
//! energy summed over time. That is deliberately simple: it is only used to
//! estimate the transposition between two performances of the same song, not
//! to classify keys musicologically.

use super::templates::{triad_energy, MAJOR_TRIAD, MINOR_TRIAD};
use crate::analysis::result::Key;
use crate::features::chroma::{argmax, PitchClassMatrix};

/// Estimate the tonic pitch class of a recording
///
/// # Arguments
///
/// * `unit` - Unit-normalized pitch-class matrix
///
/// # Returns
///
/// Pitch class (0 = C, ..., 11 = B) with the largest summed energy. A
/// silent or empty matrix yields 0: argmax of an all-zero vector is index 0.
pub fn estimate_tonic(unit: &PitchClassMatrix) -> usize {
    argmax(&unit.pitch_class_totals())
}

/// Estimate the key (tonic plus mode) of a recording
///
/// The mode is major when the major triad on the tonic carries at least as
/// much energy as the minor triad.
///
/// # Example
///
/// ```
/// use stratum_vocal::features::chroma::PitchClassMatrix;
/// use stratum_vocal::features::key::estimate_key;
/// use stratum_vocal::analysis::result::Key;
///
/// let mut frame = [0.0f32; 12];
/// frame[7] = 1.0; // G
/// frame[11] = 0.6; // B
/// frame[2] = 0.5; // D
/// let matrix = PitchClassMatrix::new(vec![frame; 8]);
/// assert_eq!(estimate_key(&matrix), Key::Major(7));
/// ```
pub fn estimate_key(unit: &PitchClassMatrix) -> Key {
    let totals = unit.pitch_class_totals();
    let tonic = argmax(&totals);
    let major = triad_energy(&totals, tonic, &MAJOR_TRIAD);
    let minor = triad_energy(&totals, tonic, &MINOR_TRIAD);

    log::debug!(
        "Key estimate: tonic={}, major triad={:.3}, minor triad={:.3}",
        tonic,
        major,
        minor
    );

    if major >= minor {
        Key::Major(tonic as u32)
    } else {
        Key::Minor(tonic as u32)
    }
}
