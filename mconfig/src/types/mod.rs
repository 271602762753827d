//! Common types used throughout the mconfig pipeline.
//!
//! Includes the typed updates produced by the decoder, the per-gateway bundle model and the
//! fragments the pipeline itself reads and writes.

mod bundle;
mod lifecycle;
mod operation;
mod tier;
mod update;

pub use bundle::*;
pub use lifecycle::*;
pub use operation::*;
pub use tier::*;
pub use update::*;
