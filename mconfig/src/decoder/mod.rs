//! Decoding of CDC messages into typed updates.
//!
//! Decoding is pure: it looks at the topic name and the envelope of a message and consults the
//! config type registry to unmarshal config values, without touching storage.

mod envelope;
mod topic;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

pub use topic::{SourceTable, TopicName, subscription_pattern};

use crate::bail;
use crate::decoder::envelope::{ConfigRow, GatewayRow, RowChange, TierRow};
use crate::error::{ErrorKind, MconfigResult};
use crate::registry::ConfigTypeRegistry;
use crate::stream::StreamMessage;
use crate::types::{ConfigUpdate, GatewayUpdate, TierInfo, TierUpdate, Update};

/// Maps CDC messages to [`Update`]s.
#[derive(Debug, Clone)]
pub struct Decoder {
    config_types: Arc<ConfigTypeRegistry>,
}

impl Decoder {
    pub fn new(config_types: Arc<ConfigTypeRegistry>) -> Self {
        Self { config_types }
    }

    /// Decodes one message.
    ///
    /// Tombstones, envelopes without payload and blacklisted config types decode to
    /// [`Update::NoOp`].
    pub fn decode(&self, message: &StreamMessage) -> MconfigResult<Update> {
        let topic = TopicName::parse(&message.topic)?;

        let raw = match message.payload.as_deref() {
            Some(raw) if !raw.is_empty() => raw,
            _ => {
                debug!(topic = %message.topic, offset = message.offset, "skipping tombstone");
                return Ok(Update::NoOp);
            }
        };

        let Some(change) = RowChange::parse(raw)? else {
            return Ok(Update::NoOp);
        };

        match topic.table {
            SourceTable::Configurations => self.decode_config(topic.network_id, change),
            SourceTable::GatewayRecords => decode_gateway(topic.network_id, change),
            SourceTable::TierVersions => decode_tier(topic.network_id, change),
        }
    }

    fn decode_config(&self, network_id: String, change: RowChange) -> MconfigResult<Update> {
        let row: ConfigRow = change.row()?;

        if self.config_types.is_blacklisted(&row.config_type) {
            debug!(config_type = %row.config_type, "skipping blacklisted config type");
            return Ok(Update::NoOp);
        }

        let new_value = if change.operation.is_delete() {
            None
        } else {
            let Some(encoded) = row.value.as_deref() else {
                bail!(
                    ErrorKind::InvalidEnvelope,
                    "Config row has no value",
                    format!(
                        "Config '{}' key '{}' has a null value on {}",
                        row.config_type, row.key, change.operation
                    )
                );
            };
            let raw = decode_base64(encoded)?;

            Some(self.config_types.unmarshal(&row.config_type, &raw)?)
        };

        Ok(Update::Config(ConfigUpdate {
            network_id,
            config_type: row.config_type,
            config_key: row.key,
            operation: change.operation,
            new_value,
        }))
    }
}

fn decode_gateway(network_id: String, change: RowChange) -> MconfigResult<Update> {
    let row: GatewayRow = change.row()?;

    Ok(Update::Gateway(GatewayUpdate {
        network_id,
        gateway_id: row.key,
        operation: change.operation,
    }))
}

fn decode_tier(network_id: String, change: RowChange) -> MconfigResult<Update> {
    let row: TierRow = change.row()?;

    if change.operation.is_delete() {
        return Ok(Update::Tier(TierUpdate {
            network_id,
            tier_id: row.key,
            operation: change.operation,
            tier_version: String::new(),
            tier_images: vec![],
        }));
    }

    let Some(encoded) = row.value.as_deref() else {
        bail!(
            ErrorKind::InvalidEnvelope,
            "Tier row has no value",
            format!("Tier '{}' has a null value on {}", row.key, change.operation)
        );
    };
    let info: TierInfo = match serde_json::from_slice(&decode_base64(encoded)?) {
        Ok(info) => info,
        Err(err) => bail!(
            ErrorKind::UnmarshalError,
            "Failed to unmarshal tier info",
            format!("Tier '{}': {err}", row.key),
            source: err
        ),
    };

    Ok(Update::Tier(TierUpdate {
        network_id,
        tier_id: row.key,
        operation: change.operation,
        tier_version: info.version,
        tier_images: info.images,
    }))
}

fn decode_base64(encoded: &str) -> MconfigResult<Vec<u8>> {
    match STANDARD.decode(encoded) {
        Ok(raw) => Ok(raw),
        Err(err) => bail!(
            ErrorKind::InvalidEnvelope,
            "Row value is not valid base64",
            source: err
        ),
    }
}
