//! Computation units shipped with the pipeline.

mod lifecycle;

pub use lifecycle::{LIFECYCLE_CONFIG_TYPE, LifecycleConfigManager, LifecycleStreamer};
