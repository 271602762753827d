use mconfig::decoder::SourceTable;
use mconfig::directory::MemoryGatewayDirectory;
use mconfig::provider::MconfigProvider;
use mconfig::store::bundle::BundleStorage;
use mconfig::store::kv::memory::MemoryKvEngine;
use mconfig::test_utils::fixtures::{config_change, gateway_change};
use mconfig::types::SEEDED_BUNDLE_OFFSET;
use mconfig_telemetry::tracing::init_test_tracing;

use crate::common::{TestPipeline, test_network_id, test_registries, topic};

#[tokio::test(flavor = "multi_thread")]
async fn gateways_receive_bundles_newer_than_their_offset() {
    init_test_tracing();

    let network_id = test_network_id();
    let directory = MemoryGatewayDirectory::new();
    directory.add_gateway(&network_id, "gw3", "hw3").await;
    directory.add_gateway(&network_id, "gw4", "hw4").await;

    let (streamers, config_types) = test_registries();
    let mut pipeline = TestPipeline::new(
        streamers,
        config_types,
        BundleStorage::new(MemoryKvEngine::new()),
        directory.clone(),
    );
    let provider = MconfigProvider::new(pipeline.storage.clone(), directory);

    pipeline
        .process(
            &topic(&network_id, SourceTable::GatewayRecords),
            gateway_change("c", "gw4"),
        )
        .await;

    let fresh = provider.get_updates("hw4", None).await.unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].gateway_id, "gw4");
    assert_eq!(fresh[0].offset, SEEDED_BUNDLE_OFFSET);
    assert!(
        provider
            .get_updates("hw4", Some(SEEDED_BUNDLE_OFFSET))
            .await
            .unwrap()
            .is_empty()
    );

    assert!(provider.get_updates("hw3", None).await.unwrap().is_empty());

    let offset = pipeline
        .process(
            &topic(&network_id, SourceTable::Configurations),
            config_change("type2", "gw3", Some("v2")),
        )
        .await;

    let updates = provider.get_updates("hw3", Some(offset - 1)).await.unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].offset, offset);
    assert_eq!(
        updates[0].bundle.get_typed::<String>("s2").unwrap().as_deref(),
        Some("v2")
    );
    assert!(provider.get_updates("hw3", Some(offset)).await.unwrap().is_empty());
    assert!(provider.get_updates("unknown", None).await.unwrap().is_empty());
}
