use mconfig_config::load_config;
use mconfig_config::shared::StreamerConfig;

use crate::error::{StreamerError, StreamerResult};

/// Loads and validates the streamer configuration.
pub fn load_streamer_config() -> StreamerResult<StreamerConfig> {
    let config = load_config::<StreamerConfig>().map_err(StreamerError::config)?;
    config.validate().map_err(StreamerError::config)?;

    Ok(config)
}
