//! Registries of the pluggable parts of the pipeline.
//!
//! Both registries are built mutably during start-up and shared behind an [`std::sync::Arc`]
//! afterwards, so nothing can be registered once processing starts.

mod config_type;
mod streamer;

pub use config_type::{ConfigManager, ConfigTypeRegistry};
pub use streamer::{Streamer, StreamerRegistry};
