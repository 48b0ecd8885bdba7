//! Recording preprocessing modules
//!
//! This module contains the checks a user recording must pass before it is
//! scored:
//! - Silence detection (chroma and RMS floors)
//! - Pitch-track voicing and hum detection
//! - The vocal quality gate that runs all checks in order

pub mod silence;
pub mod vocal_gate;
pub mod voicing;

pub use vocal_gate::{evaluate_vocal_quality, GateCheck, GateDiagnostics, GateOutcome, VocalGateConfig};
