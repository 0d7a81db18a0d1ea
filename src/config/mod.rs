//! Runtime configuration.
//!
//! Every knob has a working default, so an empty
//! or missing file yields a working setup. Values are validated once at
//! load time; nothing on the render path re-checks them.

mod settings;

pub use settings::{ConfigError, EngineConfig, FeederConfig, FileConfig, RenderConfig};
