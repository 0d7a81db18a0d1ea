//! Message payloads exchanged between host and render contexts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Noise colouring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseMode {
    /// Kellet 3-tap pink noise.
    #[default]
    Pink,
    /// Leaky-integrator brown noise.
    Brown,
}

impl NoiseMode {
    /// Returns the other mode.
    pub fn toggled(self) -> Self {
        match self {
            NoiseMode::Pink => NoiseMode::Brown,
            NoiseMode::Brown => NoiseMode::Pink,
        }
    }

    /// Wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            NoiseMode::Pink => "pink",
            NoiseMode::Brown => "brown",
        }
    }
}

impl fmt::Display for NoiseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown noise mode name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown noise mode {0:?} (expected \"pink\" or \"brown\")")]
pub struct ParseModeError(String);

impl FromStr for NoiseMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pink" => Ok(NoiseMode::Pink),
            "brown" => Ok(NoiseMode::Brown),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

/// An immutable batch of entropy words.
///
/// Produced by the entropy pool and moved by value into the render
/// context; the producer keeps no reference.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedBatch {
    words: Vec<u32>,
}

impl SeedBatch {
    /// Wraps a word sequence.
    pub fn new(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Returns the words in order.
    #[inline]
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Number of words.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if the batch carries no words.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Splits the batch for the two channels.
    ///
    /// The left channel gets the first `len / 2` words, the right channel
    /// gets the remainder (so an odd word goes right).
    pub fn halves(&self) -> (&[u32], &[u32]) {
        self.words.split_at(self.words.len() / 2)
    }
}

impl From<Vec<u32>> for SeedBatch {
    fn from(words: Vec<u32>) -> Self {
        Self::new(words)
    }
}

impl fmt::Debug for SeedBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print seed material.
        f.debug_struct("SeedBatch")
            .field("words", &self.words.len())
            .finish_non_exhaustive()
    }
}

/// Host to render messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMessage {
    /// One-time high-quality reseed (8 words: 4 left, 4 right).
    InitialSeeds(SeedBatch),
    /// Entropy queued for opportunistic mixing.
    EntropySeeds(SeedBatch),
    /// Requested target colouring mode.
    SetMode(NoiseMode),
}

/// Render to host messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMessage {
    /// The engine would like a fresh batch out of band.
    NeedSeed,
}
