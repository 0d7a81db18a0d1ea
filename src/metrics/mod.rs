//! Prometheus metrics for the noise pipeline.
//!
//! Metrics are gathered in-process and rendered in the text exposition
//! format on demand; nothing is served over the network.
//!
//! # Metrics Exposed
//!
//! ## Engine
//! - `focus_noise_frames_rendered_total` - Stereo frames rendered
//! - `focus_noise_blocks_rendered_total` - Render calls served
//! - `focus_noise_batches_mixed_total` - Entropy batches mixed
//! - `focus_noise_batches_dropped_total` - Batches dropped on a full queue
//! - `focus_noise_pending_batches` - Batches waiting to be mixed
//! - `focus_noise_seed_requests_total` - `NeedSeed` requests emitted
//! - `focus_noise_crossfades_total` - Completed crossfades
//! - `focus_noise_engine_keyed` - Keying status (1=keyed)
//! - `focus_noise_brown_mode` - Sounding mode (1=brown)
//!
//! ## Feeder
//! - `focus_noise_feeder_batches_total` - Batches delivered
//! - `focus_noise_feeder_send_failures_total` - Messages refused by the link
//! - `focus_noise_pool_words_total` - Words produced by the pool
//! - `focus_noise_ambient_words_total` - Ambient words stirred
//! - `focus_noise_ambient_dropped_total` - Ambient words dropped
//!
//! # Example
//!
//! ```no_run
//! use focus_noise::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot {
//!     frames_rendered: 48_000,
//!     engine_keyed: true,
//!     ..Default::default()
//! });
//! println!("{}", registry.encode().expect("Failed to encode"));
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
