use serde::Deserialize;

use crate::error::MconfigResult;
use crate::registry::{ConfigManager, Streamer};
use crate::types::{
    Bundle, BundlesByGateway, ConfigUpdate, ConfigValue, DEFAULT_TIER_ID, LifecycleConfig,
    UNVERSIONED_PACKAGE_VERSION,
};

/// Config type assigning a gateway to a tier, keyed by gateway id.
pub const LIFECYCLE_CONFIG_TYPE: &str = "gateway_lifecycle";

#[derive(Debug, Deserialize)]
struct TierAssignment {
    tier: String,
}

/// Maintains the lifecycle fragment of every gateway bundle.
///
/// New gateways start unversioned on the default tier. Tier versions are applied to the
/// fragment by tier updates, this unit only tracks which tier a gateway is on. A gateway
/// moved to another tier drops its pinned version until that tier is next updated.
#[derive(Debug, Default)]
pub struct LifecycleStreamer;

impl LifecycleStreamer {
    pub fn new() -> Self {
        Self
    }
}

impl Streamer for LifecycleStreamer {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn subscribed_config_types(&self) -> Vec<String> {
        vec![LIFECYCLE_CONFIG_TYPE.to_string()]
    }

    fn seed_new_gateway(
        &self,
        _network_id: &str,
        _gateway_id: &str,
        bundle: &mut Bundle,
    ) -> MconfigResult<()> {
        LifecycleConfig::unversioned(DEFAULT_TIER_ID).write_to(bundle)
    }

    fn apply_update(
        &self,
        update: &ConfigUpdate,
        mut bundles: BundlesByGateway,
    ) -> MconfigResult<BundlesByGateway> {
        let tier_id = match &update.new_value {
            Some(value) => TierAssignment::deserialize(value)?.tier,
            None => DEFAULT_TIER_ID.to_string(),
        };

        for bundle in bundles.values_mut() {
            let mut lifecycle = LifecycleConfig::read_from(bundle)?
                .unwrap_or_else(|| LifecycleConfig::unversioned(DEFAULT_TIER_ID));
            if lifecycle.tier_id == tier_id {
                continue;
            }

            lifecycle.tier_id = tier_id.clone();
            lifecycle.apply_tier_version(UNVERSIONED_PACKAGE_VERSION, &[]);
            lifecycle.write_to(bundle)?;
        }

        Ok(bundles)
    }
}

/// Config manager of [`LIFECYCLE_CONFIG_TYPE`]: JSON values, one gateway per key.
#[derive(Debug, Default)]
pub struct LifecycleConfigManager;

impl LifecycleConfigManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ConfigManager for LifecycleConfigManager {
    fn config_type(&self) -> &str {
        LIFECYCLE_CONFIG_TYPE
    }

    async fn gateway_ids_for_config(
        &self,
        _network_id: &str,
        config_key: &str,
    ) -> MconfigResult<Vec<String>> {
        Ok(vec![config_key.to_string()])
    }

    fn unmarshal_config(&self, raw: &[u8]) -> MconfigResult<ConfigValue> {
        Ok(serde_json::from_slice(raw)?)
    }
}
