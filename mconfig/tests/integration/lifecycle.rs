use std::sync::Arc;

use mconfig::decoder::SourceTable;
use mconfig::registry::{ConfigTypeRegistry, StreamerRegistry};
use mconfig::store::bundle::BundleStorage;
use mconfig::store::kv::memory::MemoryKvEngine;
use mconfig::streamers::{LIFECYCLE_CONFIG_TYPE, LifecycleConfigManager, LifecycleStreamer};
use mconfig::test_utils::fixtures::{config_change, gateway_change, tier_change};
use mconfig::types::{
    DEFAULT_TIER_ID, LifecycleConfig, SEEDED_BUNDLE_OFFSET, UNVERSIONED_PACKAGE_VERSION,
};
use mconfig_telemetry::tracing::init_test_tracing;

use crate::common::{TestPipeline, test_network_id, topic};

/// Pipeline running the lifecycle unit, listing gateways from the stored bundles.
fn pipeline() -> TestPipeline<BundleStorage<MemoryKvEngine>> {
    let mut streamers = StreamerRegistry::new();
    streamers.register(Arc::new(LifecycleStreamer::new()));

    let mut config_types = ConfigTypeRegistry::new();
    config_types.register(Arc::new(LifecycleConfigManager::new()));

    let storage = BundleStorage::new(MemoryKvEngine::new());

    TestPipeline::new(
        Arc::new(streamers),
        Arc::new(config_types),
        storage.clone(),
        storage,
    )
}

async fn lifecycle(
    pipeline: &TestPipeline<BundleStorage<MemoryKvEngine>>,
    network_id: &str,
    gateway_id: &str,
) -> (LifecycleConfig, i64) {
    let stored = pipeline
        .storage
        .get(network_id, gateway_id)
        .await
        .unwrap()
        .unwrap();

    (
        LifecycleConfig::read_from(&stored.bundle).unwrap().unwrap(),
        stored.offset,
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn tier_versions_follow_gateway_tier_assignments() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let gateway_records = topic(&network_id, SourceTable::GatewayRecords);
    let tier_versions = topic(&network_id, SourceTable::TierVersions);
    let mut pipeline = pipeline();

    pipeline
        .process(&gateway_records, gateway_change("c", "gw1"))
        .await;
    pipeline
        .process(&gateway_records, gateway_change("c", "gw2"))
        .await;

    let (gw1, gw1_offset) = lifecycle(&pipeline, &network_id, "gw1").await;
    assert_eq!(gw1.tier_id, DEFAULT_TIER_ID);
    assert_eq!(gw1.package_version, UNVERSIONED_PACKAGE_VERSION);
    assert_eq!(gw1_offset, SEEDED_BUNDLE_OFFSET);

    let assignment_offset = pipeline
        .process(
            &configurations,
            config_change(LIFECYCLE_CONFIG_TYPE, "gw2", Some(r#"{"tier":"t1"}"#)),
        )
        .await;
    pipeline
        .process(
            &tier_versions,
            tier_change("t1", Some("1.2.0-7"), &[("agw", 1), ("sidecar", 2)]),
        )
        .await;

    let (gw2, gw2_offset) = lifecycle(&pipeline, &network_id, "gw2").await;
    assert_eq!(gw2.tier_id, "t1");
    assert_eq!(gw2.package_version, "1.2.0-7");
    assert_eq!(gw2.images.len(), 2);
    assert_eq!(gw2.images[1].order, 2);
    // Tier changes keep the offset of the change that last produced the bundle.
    assert_eq!(gw2_offset, assignment_offset);

    let (gw1, _) = lifecycle(&pipeline, &network_id, "gw1").await;
    assert_eq!(gw1.package_version, UNVERSIONED_PACKAGE_VERSION);

    pipeline
        .process(&tier_versions, tier_change("t1", None, &[]))
        .await;

    let (gw2, _) = lifecycle(&pipeline, &network_id, "gw2").await;
    assert_eq!(gw2.tier_id, "t1");
    assert_eq!(gw2.package_version, UNVERSIONED_PACKAGE_VERSION);
    assert!(gw2.images.is_empty());
}
