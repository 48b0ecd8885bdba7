//! Pitch-class energy matrix
//!
//! A 12 × T matrix of non-negative energies, stored column-major as one
//! `[f32; 12]` per time frame. Row 0 is C, row 11 is B.

use crate::error::AnalysisError;

/// Number of pitch classes (chroma bins)
pub const PITCH_CLASSES: usize = 12;

/// Pitch-class names, indexed by pitch class
pub const NOTE_NAMES: [&str; PITCH_CLASSES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Per-frame pitch-class energies for one recording
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PitchClassMatrix {
    frames: Vec<[f32; PITCH_CLASSES]>,
}

impl PitchClassMatrix {
    /// Wrap already-shaped frames
    pub fn new(frames: Vec<[f32; PITCH_CLASSES]>) -> Self {
        Self { frames }
    }

    /// Build a matrix from 12-element chroma vectors (one per frame)
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if a vector does not have exactly
    /// 12 elements or contains a negative or non-finite value.
    pub fn from_chroma_vectors(chroma_vectors: &[Vec<f32>]) -> Result<Self, AnalysisError> {
        let mut frames = Vec::with_capacity(chroma_vectors.len());

        for (i, chroma) in chroma_vectors.iter().enumerate() {
            if chroma.len() != PITCH_CLASSES {
                return Err(AnalysisError::InvalidInput(format!(
                    "Chroma vector at index {} has {} elements, expected {}",
                    i,
                    chroma.len(),
                    PITCH_CLASSES
                )));
            }

            let mut frame = [0.0f32; PITCH_CLASSES];
            for (pc, &v) in chroma.iter().enumerate() {
                if !v.is_finite() || v < 0.0 {
                    return Err(AnalysisError::InvalidInput(format!(
                        "Chroma vector at index {} has invalid energy {} in bin {}",
                        i, v, pc
                    )));
                }
                frame[pc] = v;
            }
            frames.push(frame);
        }

        Ok(Self { frames })
    }

    /// Number of time frames (T)
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// `true` when the matrix has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// All frames, in time order
    pub fn frames(&self) -> &[[f32; PITCH_CLASSES]] {
        &self.frames
    }

    /// One frame (column); `None` past the end
    pub fn frame(&self, t: usize) -> Option<&[f32; PITCH_CLASSES]> {
        self.frames.get(t)
    }

    /// Mutable access to the frames (used by the in-place key rotation)
    pub(crate) fn frames_mut(&mut self) -> &mut [[f32; PITCH_CLASSES]] {
        &mut self.frames
    }

    /// First cell holding a negative or non-finite energy, as `(frame, bin, value)`
    pub fn find_invalid_energy(&self) -> Option<(usize, usize, f32)> {
        self.frames.iter().enumerate().find_map(|(t, f)| {
            f.iter()
                .position(|v| !v.is_finite() || *v < 0.0)
                .map(|pc| (t, pc, f[pc]))
        })
    }

    /// Summed energy of every frame
    pub fn energy_vector(&self) -> Vec<f32> {
        self.frames.iter().map(|f| f.iter().sum()).collect()
    }

    /// Largest single bin value in one frame
    pub fn frame_peak(&self, t: usize) -> f32 {
        self.frames
            .get(t)
            .map(|f| f.iter().copied().fold(0.0f32, f32::max))
            .unwrap_or(0.0)
    }

    /// Dominant pitch class of one frame
    ///
    /// Ties (including all-zero frames) resolve to the lowest index, so a
    /// silent frame reports pitch class 0.
    pub fn dominant_class(&self, t: usize) -> usize {
        self.frames.get(t).map(|f| argmax(f)).unwrap_or(0)
    }

    /// Energy summed over time for each pitch class
    pub fn pitch_class_totals(&self) -> [f32; PITCH_CLASSES] {
        let mut totals = [0.0f32; PITCH_CLASSES];
        for frame in &self.frames {
            for (total, &v) in totals.iter_mut().zip(frame.iter()) {
                *total += v;
            }
        }
        totals
    }

    /// Largest value anywhere in the matrix
    pub fn global_peak(&self) -> f32 {
        self.frames
            .iter()
            .flat_map(|f| f.iter().copied())
            .fold(0.0f32, f32::max)
    }

    /// Mean absolute value over all cells (0 for an empty matrix)
    pub fn mean_abs(&self) -> f32 {
        let cells = self.frames.len() * PITCH_CLASSES;
        if cells == 0 {
            return 0.0;
        }
        let sum: f32 = self.frames.iter().flat_map(|f| f.iter()).map(|v| v.abs()).sum();
        sum / cells as f32
    }
}

/// Index of the largest element, lowest index on ties
pub fn argmax(values: &[f32; PITCH_CLASSES]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Note name for a MIDI note number (e.g. 60 → "C4")
pub fn note_name_from_midi(midi: i32) -> String {
    let pc = midi.rem_euclid(PITCH_CLASSES as i32) as usize;
    let octave = midi.div_euclid(PITCH_CLASSES as i32) - 1;
    format!("{}{}", NOTE_NAMES[pc], octave)
}

/// Frequency in Hz of a MIDI note number (A4 = 69 = 440 Hz)
pub fn freq_from_midi(midi: i32) -> f32 {
    440.0 * 2.0f32.powf((midi as f32 - 69.0) / 12.0)
}
