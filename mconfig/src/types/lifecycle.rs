use serde::{Deserialize, Serialize};

use crate::error::MconfigResult;
use crate::types::{Bundle, ImageSpec};

/// Bundle key of the gateway lifecycle fragment.
pub const LIFECYCLE_CONFIG_KEY: &str = "lifecycle";

/// Package version given to gateways whose tier has no version.
pub const UNVERSIONED_PACKAGE_VERSION: &str = "0.0.0-0";

/// Tier every new gateway starts on.
pub const DEFAULT_TIER_ID: &str = "default";

/// Lifecycle fragment of a gateway bundle.
///
/// Fields the pipeline does not know about are kept as-is when the fragment is rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default)]
    pub tier_id: String,
    #[serde(default)]
    pub package_version: String,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LifecycleConfig {
    /// Lifecycle of a freshly registered gateway.
    pub fn unversioned(tier_id: impl Into<String>) -> Self {
        LifecycleConfig {
            tier_id: tier_id.into(),
            package_version: UNVERSIONED_PACKAGE_VERSION.to_string(),
            images: vec![],
            extra: serde_json::Map::new(),
        }
    }

    pub fn read_from(bundle: &Bundle) -> MconfigResult<Option<LifecycleConfig>> {
        bundle.get_typed(LIFECYCLE_CONFIG_KEY)
    }

    pub fn write_to(&self, bundle: &mut Bundle) -> MconfigResult<()> {
        bundle.set_typed(LIFECYCLE_CONFIG_KEY, self)
    }

    /// Points the fragment at a tier version, returning whether anything changed.
    pub fn apply_tier_version(&mut self, version: &str, images: &[ImageSpec]) -> bool {
        if self.package_version == version && self.images == images {
            return false;
        }

        self.package_version = version.to_string();
        self.images = images.to_vec();

        true
    }
}
