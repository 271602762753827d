//! Lookups of gateways by network and by hardware id.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::MconfigResult;

/// Network and gateway a hardware id is registered as.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GatewayIdentity {
    pub network_id: String,
    pub gateway_id: String,
}

/// Lists the gateways of a network.
pub trait GatewayLister {
    fn list_gateways(
        &self,
        network_id: &str,
    ) -> impl Future<Output = MconfigResult<Vec<String>>> + Send;
}

/// Resolves the hardware id a gateway polls with to its identity.
pub trait HardwareIdResolver {
    /// Returns `None` for unregistered hardware ids.
    fn resolve_hardware_id(
        &self,
        hardware_id: &str,
    ) -> impl Future<Output = MconfigResult<Option<GatewayIdentity>>> + Send;
}

#[derive(Debug, Default)]
struct Inner {
    gateways: BTreeMap<String, BTreeSet<String>>,
    hardware_ids: HashMap<String, GatewayIdentity>,
}

/// In-memory gateway directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGatewayDirectory {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryGatewayDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway under `network_id` with the given hardware id.
    pub async fn add_gateway(&self, network_id: &str, gateway_id: &str, hardware_id: &str) {
        let mut inner = self.inner.lock().await;

        inner
            .gateways
            .entry(network_id.to_string())
            .or_default()
            .insert(gateway_id.to_string());
        inner.hardware_ids.insert(
            hardware_id.to_string(),
            GatewayIdentity {
                network_id: network_id.to_string(),
                gateway_id: gateway_id.to_string(),
            },
        );
    }

    pub async fn remove_gateway(&self, network_id: &str, gateway_id: &str) {
        let mut inner = self.inner.lock().await;

        if let Some(gateways) = inner.gateways.get_mut(network_id) {
            gateways.remove(gateway_id);
        }
        inner.hardware_ids.retain(|_, identity| {
            identity.network_id != network_id || identity.gateway_id != gateway_id
        });
    }
}

impl GatewayLister for MemoryGatewayDirectory {
    async fn list_gateways(&self, network_id: &str) -> MconfigResult<Vec<String>> {
        let inner = self.inner.lock().await;

        Ok(inner
            .gateways
            .get(network_id)
            .map(|gateways| gateways.iter().cloned().collect())
            .unwrap_or_default())
    }
}

impl HardwareIdResolver for MemoryGatewayDirectory {
    async fn resolve_hardware_id(&self, hardware_id: &str) -> MconfigResult<Option<GatewayIdentity>> {
        let inner = self.inner.lock().await;

        Ok(inner.hardware_ids.get(hardware_id).cloned())
    }
}
