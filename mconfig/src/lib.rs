pub mod apply;
pub mod decoder;
pub mod directory;
pub mod error;
mod macros;
pub mod metrics;
pub mod processor;
pub mod provider;
pub mod registry;
pub mod store;
pub mod stream;
pub mod streamers;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
