use mconfig::decoder::SourceTable;
use mconfig::directory::MemoryGatewayDirectory;
use mconfig::store::bundle::BundleStorage;
use mconfig::store::kv::memory::MemoryKvEngine;
use mconfig::test_utils::fixtures::{config_change, gateway_change};
use mconfig::types::{Bundle, SEEDED_BUNDLE_OFFSET};
use mconfig_telemetry::tracing::init_test_tracing;

use crate::common::{TestPipeline, test_network_id, test_registries, topic};

fn pipeline() -> TestPipeline<MemoryGatewayDirectory> {
    let (streamers, config_types) = test_registries();

    TestPipeline::new(
        streamers,
        config_types,
        BundleStorage::new(MemoryKvEngine::new()),
        MemoryGatewayDirectory::new(),
    )
}

fn fragment(bundle: &Bundle, key: &str) -> Option<String> {
    bundle.get_typed::<String>(key).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn config_and_gateway_changes_materialize_bundles() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let gateway_records = topic(&network_id, SourceTable::GatewayRecords);
    let mut pipeline = pipeline();

    let type1_offset = pipeline
        .process(&configurations, config_change("type1", "k1", Some("v1")))
        .await;
    let type2_offset = pipeline
        .process(&configurations, config_change("type2", "gw3", Some("v2")))
        .await;
    pipeline
        .process(&gateway_records, gateway_change("c", "gw4"))
        .await;

    for gateway_id in ["gw1", "gw2"] {
        let stored = pipeline
            .storage
            .get(&network_id, gateway_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.offset, type1_offset);
        assert_eq!(fragment(&stored.bundle, "s1").as_deref(), Some("v1"));
        assert!(!stored.bundle.contains_key("s2"));
    }

    let gw3 = pipeline
        .storage
        .get(&network_id, "gw3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(gw3.offset, type2_offset);
    assert_eq!(fragment(&gw3.bundle, "s2").as_deref(), Some("v2"));
    assert!(!gw3.bundle.contains_key("s1"));

    let gw4 = pipeline
        .storage
        .get(&network_id, "gw4")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(gw4.offset, SEEDED_BUNDLE_OFFSET);
    assert_eq!(fragment(&gw4.bundle, "s1").as_deref(), Some("seed:gw4"));
    assert_eq!(fragment(&gw4.bundle, "s2").as_deref(), Some("seed:gw4"));

    assert_eq!(pipeline.commits.committed_offsets().await, vec![0, 1, 2]);
}

#[tokio::test(flavor = "multi_thread")]
async fn blacklisted_types_and_tombstones_are_committed_without_writes() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let mut pipeline = pipeline();

    pipeline
        .process(&configurations, config_change("blocked", "gw1", Some("v")))
        .await;
    pipeline.producer.publish(&configurations, None).unwrap();
    pipeline.processor.run_once().await.unwrap();

    assert!(
        pipeline
            .storage
            .list_gateway_ids(&network_id)
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(pipeline.commits.committed_offsets().await, vec![0, 1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_gateway_loses_its_bundle() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let gateway_records = topic(&network_id, SourceTable::GatewayRecords);
    let mut pipeline = pipeline();

    pipeline
        .process(&gateway_records, gateway_change("c", "gw3"))
        .await;
    pipeline
        .process(&configurations, config_change("type2", "gw3", Some("v2")))
        .await;
    pipeline
        .process(&gateway_records, gateway_change("u", "gw3"))
        .await;

    let gw3 = pipeline
        .storage
        .get(&network_id, "gw3")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fragment(&gw3.bundle, "s1").as_deref(), Some("seed:gw3"));
    assert_eq!(fragment(&gw3.bundle, "s2").as_deref(), Some("v2"));
    assert_eq!(gw3.offset, 1);

    pipeline
        .process(&gateway_records, gateway_change("d", "gw3"))
        .await;

    assert_eq!(pipeline.storage.get(&network_id, "gw3").await.unwrap(), None);
}
