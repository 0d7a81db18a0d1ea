//! Host-side entropy collection.
//!
//! A small pool keyed from a cryptographically strong source and stirred
//! with low-grade ambient signals (pointer motion, keys, frame timing).
//! Ambient input contributes but is never required: the pool is valid
//! from the moment it is keyed.

mod ambient;
mod pool;
mod source;

pub use ambient::{ambient_channel, AmbientEvent, AmbientQueue, AmbientStirrer};
pub use pool::{EntropyPool, POOL_WORDS};
pub use source::{os_source, passphrase_source, EntropyError};
