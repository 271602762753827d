use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ErrorKind, MconfigResult};
use crate::mconfig_error;
use crate::types::{Bundle, BundlesByGateway, ConfigUpdate};

/// Independent computation unit contributing fragments to gateway bundles.
///
/// A unit declares the config types it reacts to, seeds the bundle of every new gateway and
/// rewrites the bundles affected by an update to one of its config types. Units take and
/// return owned maps and must not retain them past a call.
pub trait Streamer: Send + Sync + fmt::Debug {
    /// Name used in logs and error details.
    fn name(&self) -> &str;

    /// Config types this unit reacts to. Duplicates are ignored.
    fn subscribed_config_types(&self) -> Vec<String>;

    /// Writes this unit's initial fragments into the bundle of a new gateway.
    fn seed_new_gateway(
        &self,
        network_id: &str,
        gateway_id: &str,
        bundle: &mut Bundle,
    ) -> MconfigResult<()>;

    /// Returns the bundles after applying `update`.
    fn apply_update(
        &self,
        update: &ConfigUpdate,
        bundles: BundlesByGateway,
    ) -> MconfigResult<BundlesByGateway>;
}

/// Ordered set of computation units indexed by subscribed config type.
#[derive(Debug, Default)]
pub struct StreamerRegistry {
    all: Vec<Arc<dyn Streamer>>,
    by_config_type: HashMap<String, Vec<Arc<dyn Streamer>>>,
}

impl StreamerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit after all previously registered ones.
    pub fn register(&mut self, streamer: Arc<dyn Streamer>) {
        let mut config_types = streamer.subscribed_config_types();
        config_types.sort();
        config_types.dedup();

        debug!(
            streamer = streamer.name(),
            ?config_types,
            "registering computation unit"
        );

        for config_type in config_types {
            self.by_config_type
                .entry(config_type)
                .or_default()
                .push(streamer.clone());
        }
        self.all.push(streamer);
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Units subscribed to `config_type`, in registration order.
    pub fn subscribers(&self, config_type: &str) -> &[Arc<dyn Streamer>] {
        self.by_config_type
            .get(config_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Builds the initial bundle of a new gateway from every registered unit.
    ///
    /// Fails as soon as one unit fails, so a gateway is never seeded partially.
    pub fn seed_bundle(&self, network_id: &str, gateway_id: &str) -> MconfigResult<Bundle> {
        let mut bundle = Bundle::new();

        for streamer in &self.all {
            streamer
                .seed_new_gateway(network_id, gateway_id, &mut bundle)
                .map_err(|err| {
                    mconfig_error!(
                        ErrorKind::ComputationUnitFailed,
                        "Seeding a new gateway failed",
                        format!(
                            "Unit '{}' failed to seed gateway '{gateway_id}' in network '{network_id}'",
                            streamer.name()
                        ),
                        source: err
                    )
                })?;
        }

        Ok(bundle)
    }

    /// Threads `bundles` through the units subscribed to the update's config type.
    ///
    /// Without subscribers the input is returned unchanged.
    pub fn apply_config_update(
        &self,
        update: &ConfigUpdate,
        mut bundles: BundlesByGateway,
    ) -> MconfigResult<BundlesByGateway> {
        for streamer in self.subscribers(&update.config_type) {
            bundles = streamer.apply_update(update, bundles).map_err(|err| {
                mconfig_error!(
                    ErrorKind::ComputationUnitFailed,
                    "Computation unit failed to apply update",
                    format!(
                        "Unit '{}' failed on {} of '{}' key '{}'",
                        streamer.name(),
                        update.operation,
                        update.config_type,
                        update.config_key
                    ),
                    source: err
                )
            })?;
        }

        Ok(bundles)
    }
}
