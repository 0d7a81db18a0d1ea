//! Real-time noise synthesis.
//!
//! This module holds everything that runs in the render context: the
//! per-channel xoshiro128++ generators, the pink and brown colouring
//! filters, the equal-power mode crossfade and the [`NoiseEngine`] that
//! ties them to the host message link.
//!
//! Nothing here blocks, and nothing on the render path returns an error:
//! bad input degrades to a no-op and missing entropy degrades to running
//! on the state already held.

mod color;
mod crossfade;
mod prng;
mod renderer;

pub use color::{BrownFilter, PinkFilter, BROWN_TIME_CONSTANT_S};
pub use crossfade::{Crossfade, CROSSFADE_MS};
pub use prng::{word_to_sample, GeneratorState, DIFFUSION_STEPS};
pub use renderer::{EngineStats, KeyState, NoiseEngine, INITIAL_SEED_WORDS};
