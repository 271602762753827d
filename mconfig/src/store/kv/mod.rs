//! Generational key/value engines.

mod base;
pub mod memory;
pub mod postgres;

pub use base::{KvEngine, KvValue, KvWrite, Precondition};
