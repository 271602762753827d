//! Application of decoded updates to the stored bundles.
//!
//! Every apply re-derives its output from the bundles currently stored, the update and the
//! stream offset, so replaying a message after a crash converges to the same state. Writes are
//! guarded by the generation each bundle was read at, so a concurrent writer makes the apply
//! fail with [`crate::error::ErrorKind::StorageConflict`] instead of losing its update.

mod config;
mod gateway;
mod tier;

use std::sync::Arc;

use crate::directory::GatewayLister;
use crate::error::MconfigResult;
use crate::registry::{ConfigTypeRegistry, StreamerRegistry};
use crate::store::bundle::BundleStorage;
use crate::store::kv::KvEngine;
use crate::types::Update;

/// Everything an [`Update`] needs to be applied.
#[derive(Debug, Clone)]
pub struct ApplyContext<K, L> {
    pub storage: BundleStorage<K>,
    pub streamers: Arc<StreamerRegistry>,
    pub config_types: Arc<ConfigTypeRegistry>,
    pub directory: L,
}

impl<K, L> ApplyContext<K, L> {
    pub fn new(
        storage: BundleStorage<K>,
        streamers: Arc<StreamerRegistry>,
        config_types: Arc<ConfigTypeRegistry>,
        directory: L,
    ) -> Self {
        Self {
            storage,
            streamers,
            config_types,
            directory,
        }
    }
}

impl Update {
    /// Applies the update as produced by the message at `offset`.
    ///
    /// Returns the number of bundles written or deleted.
    pub async fn apply<K, L>(&self, ctx: &ApplyContext<K, L>, offset: i64) -> MconfigResult<usize>
    where
        K: KvEngine + Sync,
        L: GatewayLister + Sync,
    {
        match self {
            Update::Config(update) => config::apply_config_update(ctx, update, offset).await,
            Update::Gateway(update) => gateway::apply_gateway_update(ctx, update).await,
            Update::Tier(update) => tier::apply_tier_update(ctx, update).await,
            Update::NoOp => Ok(0),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::directory::MemoryGatewayDirectory;
    use crate::store::kv::memory::MemoryKvEngine;
    use crate::test_utils::config_manager::TestConfigManager;
    use crate::test_utils::streamers::TestStreamer;

    pub(crate) type TestContext = ApplyContext<MemoryKvEngine, MemoryGatewayDirectory>;

    /// Context with units `s1` on `type1` and `s2` on `type2`, where `type1` fans out to
    /// `gw1` and `gw2` and `blocked` is blacklisted.
    pub(crate) fn context() -> TestContext {
        let mut streamers = StreamerRegistry::new();
        streamers.register(Arc::new(TestStreamer::new("s1", "type1")));
        streamers.register(Arc::new(TestStreamer::new("s2", "type2")));

        let mut config_types = ConfigTypeRegistry::new().with_blacklist(["blocked"]);
        config_types.register(Arc::new(
            TestConfigManager::new("type1").with_gateways("k1", &["gw1", "gw2"]),
        ));
        config_types.register(Arc::new(TestConfigManager::new("type2")));
        config_types.register(Arc::new(TestConfigManager::new("blocked")));

        ApplyContext::new(
            BundleStorage::new(MemoryKvEngine::new()),
            Arc::new(streamers),
            Arc::new(config_types),
            MemoryGatewayDirectory::new(),
        )
    }

    #[tokio::test]
    async fn noop_writes_nothing() {
        let ctx = context();

        assert_eq!(Update::NoOp.apply(&ctx, 3).await.unwrap(), 0);
        assert!(ctx.storage.list_gateway_ids("n1").await.unwrap().is_empty());
    }
}
