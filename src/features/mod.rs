//! Feature modules
//!
//! This module contains the data objects and the numeric front half of the
//! engine:
//! - Pitch-class matrices and column normalization
//! - Per-recording features and the extraction collaborator
//! - Adaptive energy thresholds
//! - Key alignment
//! - Sequence alignment (FastDTW with self-calibrated accuracy)

pub mod alignment;
pub mod chroma;
pub mod key;
pub mod recording;
pub mod threshold;
