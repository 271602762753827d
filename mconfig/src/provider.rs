//! Read path answering gateway polls.

use tracing::debug;

use crate::directory::HardwareIdResolver;
use crate::error::MconfigResult;
use crate::store::bundle::BundleStorage;
use crate::store::kv::KvEngine;
use crate::types::Bundle;

/// Bundle sent to a gateway together with the offset it reflects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayBundleUpdate {
    pub gateway_id: String,
    pub bundle: Bundle,
    pub offset: i64,
}

/// Serves stored bundles to gateways that are behind.
#[derive(Debug, Clone)]
pub struct MconfigProvider<K, R> {
    storage: BundleStorage<K>,
    resolver: R,
}

impl<K, R> MconfigProvider<K, R>
where
    K: KvEngine + Sync,
    R: HardwareIdResolver + Sync,
{
    pub fn new(storage: BundleStorage<K>, resolver: R) -> Self {
        Self { storage, resolver }
    }

    /// Returns the bundle of the gateway polling with `hardware_id` if it is newer than
    /// `client_offset`.
    ///
    /// A gateway that has never received a bundle passes `None` and gets any stored bundle,
    /// including one seeded at [`crate::types::SEEDED_BUNDLE_OFFSET`]. Unknown hardware ids
    /// and gateways that are up to date get an empty response.
    pub async fn get_updates(
        &self,
        hardware_id: &str,
        client_offset: Option<i64>,
    ) -> MconfigResult<Vec<GatewayBundleUpdate>> {
        let Some(identity) = self.resolver.resolve_hardware_id(hardware_id).await? else {
            debug!(hardware_id, "unknown hardware id");
            return Ok(vec![]);
        };

        let Some(stored) = self
            .storage
            .get(&identity.network_id, &identity.gateway_id)
            .await?
        else {
            return Ok(vec![]);
        };

        if stored.offset <= client_offset.unwrap_or(i64::MIN) {
            return Ok(vec![]);
        }

        Ok(vec![GatewayBundleUpdate {
            gateway_id: stored.gateway_id,
            bundle: stored.bundle,
            offset: stored.offset,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryGatewayDirectory;
    use crate::store::bundle::BundleWrite;
    use crate::store::kv::Precondition;
    use crate::store::kv::memory::MemoryKvEngine;
    use crate::types::SEEDED_BUNDLE_OFFSET;

    async fn provider(offset: i64) -> MconfigProvider<MemoryKvEngine, MemoryGatewayDirectory> {
        let directory = MemoryGatewayDirectory::new();
        directory.add_gateway("n1", "gw1", "hw1").await;
        directory.add_gateway("n1", "gw2", "hw2").await;

        let storage = BundleStorage::new(MemoryKvEngine::new());
        let mut bundle = Bundle::new();
        bundle.insert("s1", b"\"v\"".to_vec());
        storage
            .create_or_update(
                "n1",
                vec![BundleWrite {
                    gateway_id: "gw1".to_string(),
                    bundle,
                    offset,
                    precondition: Precondition::None,
                }],
            )
            .await
            .unwrap();

        MconfigProvider::new(storage, directory)
    }

    #[tokio::test]
    async fn newer_bundle_is_returned() {
        let provider = provider(10).await;

        let updates = provider.get_updates("hw1", Some(9)).await.unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].gateway_id, "gw1");
        assert_eq!(updates[0].offset, 10);
    }

    #[tokio::test]
    async fn up_to_date_gateways_get_nothing() {
        let provider = provider(10).await;

        assert!(provider.get_updates("hw1", Some(10)).await.unwrap().is_empty());
        assert!(provider.get_updates("hw1", Some(11)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_bundle_reaches_fresh_gateways_only() {
        let provider = provider(SEEDED_BUNDLE_OFFSET).await;

        assert_eq!(provider.get_updates("hw1", None).await.unwrap().len(), 1);
        assert!(provider.get_updates("hw1", Some(0)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_or_unstored_gateways_get_nothing() {
        let provider = provider(10).await;

        assert!(provider.get_updates("hw9", None).await.unwrap().is_empty());
        assert!(provider.get_updates("hw2", None).await.unwrap().is_empty());
    }
}
