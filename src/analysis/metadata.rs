//! Comparison metadata

use serde::{Deserialize, Serialize};

/// Request-level facts about one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonMetadata {
    /// Reference duration in seconds (chroma frames × hop)
    pub reference_duration_secs: f32,

    /// User duration in seconds (chroma frames × hop)
    pub user_duration_secs: f32,

    /// Reference chroma frames
    pub reference_frames: usize,

    /// User chroma frames
    pub user_frames: usize,

    /// Alignment path length (0 when the gate rejected the recording)
    pub path_length: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Integrity warnings raised while scoring
    pub warnings: Vec<String>,
}

impl Default for ComparisonMetadata {
    fn default() -> Self {
        Self {
            reference_duration_secs: 0.0,
            user_duration_secs: 0.0,
            reference_frames: 0,
            user_frames: 0,
            path_length: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            warnings: vec![],
        }
    }
}
