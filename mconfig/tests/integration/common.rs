use std::sync::Arc;

use mconfig::apply::ApplyContext;
use mconfig::decoder::{Decoder, SourceTable};
use mconfig::directory::GatewayLister;
use mconfig::processor::Processor;
use mconfig::registry::{ConfigTypeRegistry, StreamerRegistry};
use mconfig::store::bundle::BundleStorage;
use mconfig::store::kv::memory::MemoryKvEngine;
use mconfig::stream::memory::{CommitLog, MemoryChangeStream, MemoryStreamProducer};
use mconfig::test_utils::config_manager::TestConfigManager;
use mconfig::test_utils::notify::TimedNotify;
use mconfig::test_utils::streamers::TestStreamer;
use rand::random;

pub const TOPIC_PREFIX: &str = "magma.public";

/// Network id unique to one test.
pub fn test_network_id() -> String {
    format!("network_{}", random::<u32>())
}

pub fn topic(network_id: &str, table: SourceTable) -> String {
    format!("{TOPIC_PREFIX}.{network_id}_{}", table.as_str())
}

/// Units `s1` on `type1` and `s2` on `type2`. `type1` key `k1` fans out to `gw1` and `gw2`,
/// `type2` keys map to the gateway of the same id and `blocked` is blacklisted.
pub fn test_registries() -> (Arc<StreamerRegistry>, Arc<ConfigTypeRegistry>) {
    let mut streamers = StreamerRegistry::new();
    streamers.register(Arc::new(TestStreamer::new("s1", "type1")));
    streamers.register(Arc::new(TestStreamer::new("s2", "type2")));

    let mut config_types = ConfigTypeRegistry::new().with_blacklist(["blocked"]);
    config_types.register(Arc::new(
        TestConfigManager::new("type1").with_gateways("k1", &["gw1", "gw2"]),
    ));
    config_types.register(Arc::new(TestConfigManager::new("type2")));
    config_types.register(Arc::new(TestConfigManager::new("blocked")));

    (Arc::new(streamers), Arc::new(config_types))
}

/// Processor over a memory stream and a memory engine, with the handles tests observe it by.
pub struct TestPipeline<L> {
    pub processor: Processor<MemoryChangeStream, MemoryKvEngine, L>,
    pub producer: MemoryStreamProducer,
    pub commits: CommitLog,
    pub storage: BundleStorage<MemoryKvEngine>,
}

impl<L> TestPipeline<L>
where
    L: GatewayLister + Send + Sync,
{
    pub fn new(
        streamers: Arc<StreamerRegistry>,
        config_types: Arc<ConfigTypeRegistry>,
        storage: BundleStorage<MemoryKvEngine>,
        directory: L,
    ) -> Self {
        let (stream, producer) = MemoryChangeStream::new();
        let commits = stream.commit_log();

        let decoder = Decoder::new(config_types.clone());
        let context = ApplyContext::new(storage.clone(), streamers, config_types, directory);

        Self {
            processor: Processor::new(stream, decoder, context),
            producer,
            commits,
            storage,
        }
    }

    /// Publishes a message and processes it.
    pub async fn process(&mut self, topic: &str, payload: Vec<u8>) -> i64 {
        let offset = self.producer.publish(topic, Some(payload)).unwrap();
        self.processor.run_once().await.unwrap();

        offset
    }
}

pub async fn wait_for_commit(commits: &CommitLog, offset: i64) {
    TimedNotify::new(commits.notify_on_commit(offset).await)
        .notified()
        .await;
}
