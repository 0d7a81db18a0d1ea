//! Focus Noise Library
//!
//! A real-time stereo pink/brown noise engine whose per-channel
//! generators are continuously re-keyed from a host-side entropy pool.
//!
//! # Architecture
//!
//! Two contexts share no memory and talk over a pair of bounded queues:
//!
//! ```text
//! host:   entropy pool ← ambient events
//!              ↓
//!         entropy feeder ── InitialSeeds / EntropySeeds / SetMode ──→ render
//!              ↑                                                       │
//!              └───────────────────── NeedSeed ←───────────────────────┘
//! render: noise engine (xoshiro128++ → pink / brown → crossfade)
//! ```
//!
//! # Design Principles
//!
//! - **Never block the render path**: all messages are try-send / try-recv
//! - **Degrade, don't fail**: without a host the engine keeps rendering on
//!   the state it holds
//! - **Uses standard primitives**: OS randomness or ChaCha20 keyed through
//!   BLAKE3 for the pool, xoshiro128++ for synthesis
//! - **No cryptographic claims**: the output is noise, not key material
//!
//! # Example
//!
//! ```no_run
//! use focus_noise::{
//!     config::{EngineConfig, FeederConfig},
//!     engine::NoiseEngine,
//!     entropy::EntropyPool,
//!     feeder::EntropyFeeder,
//!     protocol::{link, NoiseMode},
//! };
//! use std::time::Instant;
//!
//! let (host, render) = link(64, 4);
//! let mut engine = NoiseEngine::new(&EngineConfig::default(), 0).with_port(render);
//!
//! let pool = EntropyPool::from_os().unwrap();
//! let mut feeder = EntropyFeeder::new(pool, host, &FeederConfig::default());
//! feeder.send_initial_seeds();
//! feeder.start(Instant::now());
//! feeder.post_mode(NoiseMode::Brown);
//!
//! let mut left = vec![0.0f32; 128];
//! let mut right = vec![0.0f32; 128];
//! for _ in 0..100 {
//!     engine.render(&mut left, &mut right);
//!     feeder.poll(Instant::now());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod config;
pub mod engine;
pub mod entropy;
pub mod feeder;
pub mod metrics;
pub mod protocol;

// Re-export commonly used types at crate root
pub use analysis::{OutputStatistics, OutputThresholds, StatsAccumulator};
pub use config::{EngineConfig, FeederConfig, FileConfig, RenderConfig};
pub use engine::{KeyState, NoiseEngine};
pub use entropy::{AmbientEvent, AmbientStirrer, EntropyPool};
pub use feeder::EntropyFeeder;
pub use protocol::{link, HostMessage, NoiseMode, RenderMessage, SeedBatch};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
