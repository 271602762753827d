//! Sources of CDC messages.

mod base;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;

pub use base::{ChangeStream, StreamMessage};
