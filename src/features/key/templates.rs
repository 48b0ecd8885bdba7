//! Triad templates for mode estimation
//!
//! A tonic is reported as major or minor by comparing the energy on its major
//! triad (root, major third, fifth) with the energy on its minor triad (root,
//! minor third, fifth).

use crate::features::chroma::PITCH_CLASSES;

/// Intervals above the tonic forming the major triad
pub const MAJOR_TRIAD: [usize; 3] = [0, 4, 7];

/// Intervals above the tonic forming the minor triad
pub const MINOR_TRIAD: [usize; 3] = [0, 3, 7];

/// Summed energy of the triad built on `tonic`
///
/// # Arguments
///
/// * `totals` - Energy per pitch class, summed over time
/// * `tonic` - Tonic pitch class (0-11)
/// * `intervals` - Triad intervals above the tonic
pub fn triad_energy(totals: &[f32; PITCH_CLASSES], tonic: usize, intervals: &[usize; 3]) -> f32 {
    intervals
        .iter()
        .map(|&i| totals[(tonic + i) % PITCH_CLASSES])
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triad_energy_wraps_around() {
        let mut totals = [0.0f32; PITCH_CLASSES];
        // A minor: A(9), C(0), E(4)
        totals[9] = 1.0;
        totals[0] = 1.0;
        totals[4] = 1.0;
        assert_eq!(triad_energy(&totals, 9, &MINOR_TRIAD), 3.0);
        // A major would need C#(1)
        assert_eq!(triad_energy(&totals, 9, &MAJOR_TRIAD), 2.0);
    }
}
