//! Pitch-class (chroma) data
//!
//! The 12 × T pitch-class energy matrix that everything downstream consumes:
//! - `raw` energies, used for note agreement and energy metrics
//! - `unit` columns (L2-normalized), used for alignment distances

pub mod matrix;
pub mod normalization;

pub use matrix::{argmax, freq_from_midi, note_name_from_midi, PitchClassMatrix, NOTE_NAMES, PITCH_CLASSES};
pub use normalization::{unit_normalize, unit_normalize_columns};
