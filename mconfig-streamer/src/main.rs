//! mconfig streamer service binary.
//!
//! Consumes CDC messages of the configuration tables and keeps the per-gateway mconfig
//! bundles up to date until it receives a shutdown signal.

use mconfig_config::Environment;
use mconfig_config::shared::StreamerConfig;
use mconfig_telemetry::metrics::init_metrics;
use mconfig_telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::load_streamer_config;
use crate::core::start_streamer_with_config;
use crate::error::{StreamerError, StreamerResult};

mod config;
mod core;
mod error;

fn main() -> StreamerResult<()> {
    let streamer_config = load_streamer_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(StreamerError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(streamer_config))?;

    Ok(())
}

async fn async_main(streamer_config: StreamerConfig) -> StreamerResult<()> {
    // The exporter spawns its listener on the current runtime.
    let environment = Environment::load()?;
    init_metrics(Some(environment.as_str())).map_err(StreamerError::config)?;

    if let Err(err) = start_streamer_with_config(streamer_config).await {
        error!("{err}");

        return Err(err);
    }

    Ok(())
}
