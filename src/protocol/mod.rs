//! Host/render message protocol.
//!
//! The host context (entropy pool, feeder, UI) and the render context
//! (noise engine) share no memory. Everything crosses a pair of bounded
//! queues as owned messages, and neither side ever blocks on the other.

mod link;
mod message;

pub use link::{link, HostPort, PostError, RenderPort};
pub use message::{HostMessage, NoiseMode, ParseModeError, RenderMessage, SeedBatch};
