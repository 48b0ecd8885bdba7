//! Error types for the scoring engine
//!
//! Only structural problems surface as errors. A recording that simply contains
//! no usable singing is not an error: the vocal gate turns it into a zero-score
//! result with a reason.

use std::fmt;

/// Errors that can occur while scoring a performance
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (malformed matrix shapes, bad configuration, ...)
    InvalidInput(String),

    /// The feature-extraction collaborator failed for one of the recordings
    ExtractionError(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (non-finite intermediate values)
    NumericalError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ExtractionError(msg) => write!(f, "Feature extraction error: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        assert_eq!(
            AnalysisError::InvalidInput("bad shape".to_string()).to_string(),
            "Invalid input: bad shape"
        );
        assert_eq!(
            AnalysisError::ExtractionError("decoder failed".to_string()).to_string(),
            "Feature extraction error: decoder failed"
        );
    }
}
