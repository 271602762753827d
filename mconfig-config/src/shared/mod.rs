//! Shared configuration types for the mconfig streamer.

mod base;
mod connection;
mod processor;
mod storage;
mod stream;
mod streamer;

pub use base::ValidationError;
pub use connection::{
    IntoConnectOptions, MCONFIG_STORAGE_OPTIONS, PgConnectionConfig,
    PgConnectionConfigWithoutSecrets, PgConnectionOptions, TlsConfig,
};
pub use processor::ProcessorConfig;
pub use storage::{StorageConfig, StorageConfigWithoutSecrets};
pub use stream::StreamConfig;
pub use streamer::{StreamerConfig, StreamerConfigWithoutSecrets};
