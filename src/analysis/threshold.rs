//! Output quality thresholds.

use super::statistics::OutputStatistics;
use serde::{Deserialize, Serialize};

/// Acceptable ranges for rendered output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputThresholds {
    /// Largest allowed absolute sample.
    pub max_peak: f64,
    /// Largest allowed absolute DC offset.
    pub max_dc_offset: f64,
    /// Smallest RMS that still counts as sound.
    pub min_rms: f64,
}

impl Default for OutputThresholds {
    fn default() -> Self {
        Self {
            max_peak: 1.0,
            max_dc_offset: 0.1,
            min_rms: 0.01,
        }
    }
}

impl OutputThresholds {
    /// Checks statistics against thresholds.
    pub fn check(&self, stats: &OutputStatistics) -> Result<(), OutputViolation> {
        if stats.peak > self.max_peak {
            return Err(OutputViolation::Clipping {
                observed: stats.peak,
                threshold: self.max_peak,
            });
        }

        if stats.mean.abs() > self.max_dc_offset {
            return Err(OutputViolation::DcOffset {
                observed: stats.mean,
                threshold: self.max_dc_offset,
            });
        }

        if stats.rms < self.min_rms {
            return Err(OutputViolation::Silence {
                observed: stats.rms,
                threshold: self.min_rms,
            });
        }

        Ok(())
    }
}

/// Threshold violation types.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutputViolation {
    /// Peak above `max_peak`.
    #[error("peak {observed:.4} exceeds {threshold:.4}")]
    Clipping {
        /// Measured peak.
        observed: f64,
        /// Configured limit.
        threshold: f64,
    },

    /// Mean further from zero than `max_dc_offset`.
    #[error("DC offset {observed:.4} exceeds {threshold:.4}")]
    DcOffset {
        /// Measured mean.
        observed: f64,
        /// Configured limit.
        threshold: f64,
    },

    /// RMS below `min_rms`.
    #[error("RMS {observed:.5} below {threshold:.5}")]
    Silence {
        /// Measured RMS.
        observed: f64,
        /// Configured floor.
        threshold: f64,
    },
}
