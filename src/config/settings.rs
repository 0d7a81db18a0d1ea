//! Configuration sections and TOML loading.

use crate::analysis::OutputThresholds;
use crate::protocol::NoiseMode;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Noise engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz. Fixed for the engine's lifetime.
    pub sample_rate: u32,
    /// Brown integrator time constant in seconds.
    pub brown_time_constant_s: f64,
    /// Mode crossfade length in milliseconds.
    pub crossfade_ms: f64,
    /// Audio time between seed requests, in seconds.
    pub seed_request_interval_s: f64,
    /// Hard cap on queued entropy batches.
    pub pending_capacity: usize,
    /// Mode sounding at construction.
    pub initial_mode: NoiseMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            brown_time_constant_s: 0.02,
            crossfade_ms: 50.0,
            seed_request_interval_s: 0.5,
            pending_capacity: 16,
            initial_mode: NoiseMode::Pink,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration for the given sample rate.
    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..Default::default()
        }
    }

    /// Seed request threshold in samples (at least one).
    pub fn seed_request_threshold(&self) -> u64 {
        let samples = (self.sample_rate as f64 * self.seed_request_interval_s).round();
        if samples.is_finite() && samples >= 1.0 {
            samples as u64
        } else {
            1
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if !(self.brown_time_constant_s.is_finite() && self.brown_time_constant_s > 0.0) {
            return Err(ConfigError::InvalidTimeConstant);
        }
        if !(self.crossfade_ms.is_finite() && self.crossfade_ms >= 0.0) {
            return Err(ConfigError::InvalidCrossfade);
        }
        if !(self.seed_request_interval_s.is_finite() && self.seed_request_interval_s > 0.0) {
            return Err(ConfigError::InvalidRequestInterval);
        }
        if self.pending_capacity < 2 {
            return Err(ConfigError::InvalidPendingCapacity);
        }
        Ok(())
    }
}

/// Entropy feeder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    /// Periodic send interval in milliseconds.
    pub period_ms: u64,
    /// Words per entropy batch.
    pub batch_words: usize,
    /// Ambient word queue capacity.
    pub ambient_capacity: usize,
    /// Host to render queue capacity (messages).
    pub channel_capacity: usize,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            period_ms: 150,
            batch_words: 8,
            ambient_capacity: 256,
            channel_capacity: 64,
        }
    }
}

impl FeederConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        if self.batch_words == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        Ok(())
    }
}

/// Offline / paced render configuration used by the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Frames per render call.
    pub block_size: usize,
    /// Total audio to render, in seconds.
    pub seconds: f64,
    /// Pace rendering at the audio rate instead of running flat out.
    pub realtime: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_size: 128,
            seconds: 10.0,
            realtime: false,
        }
    }
}

impl RenderConfig {
    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if !(self.seconds.is_finite() && self.seconds > 0.0) {
            return Err(ConfigError::InvalidDuration);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be non-zero")]
    InvalidSampleRate,
    #[error("brown time constant must be a positive number of seconds")]
    InvalidTimeConstant,
    #[error("crossfade length must be a non-negative number of milliseconds")]
    InvalidCrossfade,
    #[error("seed request interval must be a positive number of seconds")]
    InvalidRequestInterval,
    #[error("pending capacity must hold at least two batches")]
    InvalidPendingCapacity,
    #[error("feeder period must be non-zero")]
    InvalidPeriod,
    #[error("batch size must be at least one word")]
    InvalidBatchSize,
    #[error("block size must be non-zero")]
    InvalidBlockSize,
    #[error("render duration must be a positive number of seconds")]
    InvalidDuration,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// `[engine]` section.
    #[serde(default)]
    pub engine: EngineConfig,
    /// `[feeder]` section.
    #[serde(default)]
    pub feeder: FeederConfig,
    /// `[render]` section (CLI only).
    #[serde(default)]
    pub render: RenderConfig,
    /// `[thresholds]` section for the output report.
    #[serde(default)]
    pub thresholds: OutputThresholds,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.feeder.validate()?;
        self.render.validate()
    }
}
