//! Persistence of materialized bundles.

pub mod bundle;
pub mod kv;
