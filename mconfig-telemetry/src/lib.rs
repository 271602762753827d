//! Tracing and metrics initialization shared by mconfig binaries and tests.

pub mod metrics;
pub mod tracing;
