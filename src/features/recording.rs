//! Per-recording features supplied by the extraction collaborator
//!
//! Decoding audio and computing chroma/RMS/flatness from waveforms happen
//! outside this crate. The collaborator hands over a [`RecordingFeatures`] per
//! recording; [`extract_pair`] runs it on the reference and the user recording
//! concurrently and joins both before anything else happens.

use super::chroma::normalization::{find_non_unit_column, UNIT_NORM_TOLERANCE};
use super::chroma::{unit_normalize_columns, PitchClassMatrix};
use crate::error::AnalysisError;

/// Everything the engine consumes about one recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingFeatures {
    /// Unnormalized pitch-class energies (12 × T)
    pub raw: PitchClassMatrix,

    /// Column-unit-normalized pitch-class energies (12 × T)
    pub unit: PitchClassMatrix,

    /// Summed raw energy per frame (length T)
    pub energy: Vec<f32>,

    /// Frame RMS of the waveform (length T', may differ from T)
    pub rms: Vec<f32>,

    /// Frame spectral flatness of the waveform (length T')
    pub spectral_flatness: Vec<f32>,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Hop length in samples between frames
    pub hop_length: usize,

    /// Optional fundamental-frequency track in Hz (non-finite or ≤ 0 = unvoiced)
    pub pitch_track_hz: Option<Vec<f32>>,
}

impl RecordingFeatures {
    /// Assemble features from a raw matrix, deriving `unit` and `energy`
    pub fn from_raw(
        raw: PitchClassMatrix,
        rms: Vec<f32>,
        spectral_flatness: Vec<f32>,
        sample_rate: u32,
        hop_length: usize,
    ) -> Self {
        let unit = unit_normalize_columns(&raw);
        let energy = raw.energy_vector();
        Self {
            raw,
            unit,
            energy,
            rms,
            spectral_flatness,
            sample_rate,
            hop_length,
            pitch_track_hz: None,
        }
    }

    /// Attach a pitch track from the collaborator's pitch tracker
    pub fn with_pitch_track(mut self, pitch_track_hz: Vec<f32>) -> Self {
        self.pitch_track_hz = Some(pitch_track_hz);
        self
    }

    /// Number of chroma frames (T)
    pub fn n_frames(&self) -> usize {
        self.raw.n_frames()
    }

    /// Seconds between consecutive frames
    pub fn hop_duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.hop_length as f32 / self.sample_rate as f32
    }

    /// Recording duration in seconds, as covered by the chroma frames
    pub fn duration_secs(&self) -> f32 {
        self.n_frames() as f32 * self.hop_duration()
    }

    /// Check the shape contract with the collaborator
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop,
    /// `raw`/`unit`/`energy` length mismatches, a negative or non-finite raw
    /// energy, a `unit` column that is not unit-normalized (silent columns
    /// excepted), or non-finite RMS, flatness or energy values.
    pub fn validate(&self, label: &str) -> Result<(), AnalysisError> {
        if self.sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: sample rate must be positive",
                label
            )));
        }
        if self.hop_length == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: hop length must be positive",
                label
            )));
        }
        if self.raw.n_frames() != self.unit.n_frames() {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: raw matrix has {} frames but unit matrix has {}",
                label,
                self.raw.n_frames(),
                self.unit.n_frames()
            )));
        }
        if self.energy.len() != self.raw.n_frames() {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: energy vector has {} entries, expected {}",
                label,
                self.energy.len(),
                self.raw.n_frames()
            )));
        }
        if let Some((t, pc, v)) = self.raw.find_invalid_energy() {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: invalid raw energy {} at frame {}, bin {}",
                label, v, t, pc
            )));
        }
        if let Some(t) = find_non_unit_column(&self.raw, &self.unit, UNIT_NORM_TOLERANCE) {
            return Err(AnalysisError::InvalidInput(format!(
                "{}: unit matrix column {} is not unit-normalized",
                label, t
            )));
        }
        for (name, values) in [
            ("energy", &self.energy),
            ("rms", &self.rms),
            ("spectral flatness", &self.spectral_flatness),
        ] {
            if let Some(i) = values.iter().position(|v| !v.is_finite()) {
                return Err(AnalysisError::InvalidInput(format!(
                    "{}: non-finite {} value at frame {}",
                    label, name, i
                )));
            }
        }
        Ok(())
    }
}

/// External collaborator that turns a recording into [`RecordingFeatures`]
///
/// Implementations own decoding, noise reduction, source separation and the
/// chroma/RMS/flatness computation.
pub trait FeatureExtractor: Sync {
    /// Whatever identifies a recording for this extractor (path, buffer, ...)
    type Source: Sync + ?Sized;

    /// Extract the features of one recording
    fn extract(&self, source: &Self::Source) -> Result<RecordingFeatures, AnalysisError>;
}

/// Extract reference and user features concurrently
///
/// The two extractions share nothing, so they run on the rayon pool and are
/// joined before key alignment.
///
/// # Errors
///
/// Propagates the reference extraction error first, then the user one.
pub fn extract_pair<E: FeatureExtractor>(
    extractor: &E,
    reference: &E::Source,
    user: &E::Source,
) -> Result<(RecordingFeatures, RecordingFeatures), AnalysisError> {
    log::debug!("Extracting reference and user features in parallel");
    let (reference, user) = rayon::join(|| extractor.extract(reference), || extractor.extract(user));
    Ok((reference?, user?))
}
