use crate::bail;
use crate::error::{ErrorKind, MconfigResult};
use crate::registry::Streamer;
use crate::types::{Bundle, BundlesByGateway, ConfigUpdate};

/// Unit writing the new config value under its own name in every bundle it receives.
///
/// Seeding writes `"seed:<gateway id>"` under the unit's name, deletes remove the fragment.
#[derive(Debug, Clone)]
pub struct TestStreamer {
    name: String,
    config_types: Vec<String>,
}

impl TestStreamer {
    pub fn new(name: &str, config_type: &str) -> Self {
        Self::with_types(name, &[config_type])
    }

    pub fn with_types(name: &str, config_types: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            config_types: config_types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Streamer for TestStreamer {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribed_config_types(&self) -> Vec<String> {
        self.config_types.clone()
    }

    fn seed_new_gateway(
        &self,
        _network_id: &str,
        gateway_id: &str,
        bundle: &mut Bundle,
    ) -> MconfigResult<()> {
        bundle.set_typed(self.name.clone(), &format!("seed:{gateway_id}"))
    }

    fn apply_update(
        &self,
        update: &ConfigUpdate,
        mut bundles: BundlesByGateway,
    ) -> MconfigResult<BundlesByGateway> {
        for bundle in bundles.values_mut() {
            match &update.new_value {
                Some(value) => bundle.set_typed(self.name.clone(), value)?,
                None => {
                    bundle.remove(&self.name);
                }
            }
        }

        Ok(bundles)
    }
}

/// Unit failing every call.
#[derive(Debug, Clone)]
pub struct FailingStreamer {
    name: String,
    config_type: String,
}

impl FailingStreamer {
    pub fn new(name: &str, config_type: &str) -> Self {
        Self {
            name: name.to_string(),
            config_type: config_type.to_string(),
        }
    }
}

impl Streamer for FailingStreamer {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribed_config_types(&self) -> Vec<String> {
        vec![self.config_type.clone()]
    }

    fn seed_new_gateway(
        &self,
        _network_id: &str,
        _gateway_id: &str,
        _bundle: &mut Bundle,
    ) -> MconfigResult<()> {
        bail!(ErrorKind::InvalidState, "Test unit refuses to seed")
    }

    fn apply_update(
        &self,
        _update: &ConfigUpdate,
        _bundles: BundlesByGateway,
    ) -> MconfigResult<BundlesByGateway> {
        bail!(ErrorKind::InvalidState, "Test unit refuses to apply")
    }
}
