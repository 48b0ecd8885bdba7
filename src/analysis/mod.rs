//! Analysis and result aggregation modules
//!
//! Turns an alignment into a scored result:
//! - Mistake detection and debouncing
//! - Path metrics (note agreement, timing, energy correlation, voicing)
//! - Score aggregation and quality tiers
//! - Result types
//! - Metadata

pub mod metadata;
pub mod metrics;
pub mod mistakes;
pub mod result;
pub mod scoring;
