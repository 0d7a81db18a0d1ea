//! Rendered output analysis.
//!
//! Level, DC and low-frequency bias summaries of rendered noise, plus
//! thresholds that flag clipping, offset or silence. These are sanity
//! checks, not a spectral measurement.

mod statistics;
mod threshold;

pub use statistics::{OutputStatistics, StatsAccumulator};
pub use threshold::{OutputThresholds, OutputViolation};
