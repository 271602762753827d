use crate::types::{ImageSpec, Operation};

/// Decoded value of a config row, as produced by the config type's unmarshaler.
pub type ConfigValue = serde_json::Value;

/// Change to a network or entity config.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub network_id: String,
    pub config_type: String,
    pub config_key: String,
    pub operation: Operation,
    /// Unmarshaled value after the change, `None` for deletes.
    pub new_value: Option<ConfigValue>,
}

/// Change to a gateway record.
///
/// Only creates and deletes affect bundles.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayUpdate {
    pub network_id: String,
    pub gateway_id: String,
    pub operation: Operation,
}

/// Change to a tier version.
#[derive(Debug, Clone, PartialEq)]
pub struct TierUpdate {
    pub network_id: String,
    pub tier_id: String,
    pub operation: Operation,
    /// Package version of the tier, empty for deletes.
    pub tier_version: String,
    pub tier_images: Vec<ImageSpec>,
}

/// Typed result of decoding one CDC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Config(ConfigUpdate),
    Gateway(GatewayUpdate),
    Tier(TierUpdate),
    /// Tombstones and blacklisted config types.
    NoOp,
}

impl Update {
    /// Short label of the variant, used in logs and metrics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Update::Config(_) => "config",
            Update::Gateway(_) => "gateway",
            Update::Tier(_) => "tier",
            Update::NoOp => "noop",
        }
    }

    /// Network the update belongs to, if any.
    pub fn network_id(&self) -> Option<&str> {
        match self {
            Update::Config(update) => Some(&update.network_id),
            Update::Gateway(update) => Some(&update.network_id),
            Update::Tier(update) => Some(&update.network_id),
            Update::NoOp => None,
        }
    }
}
