//! Entropy feeding from the host context to the render context.
//!
//! The feeder owns the entropy pool and the host end of the message link.
//! It sends a batch on a repeating timer and another whenever the engine
//! asks, and it drains ambient events into the pool on every tick.

mod supply;

pub use supply::{EntropyFeeder, FeederState, FeederStats, Trigger};
