use mconfig::decoder::SourceTable;
use mconfig::directory::MemoryGatewayDirectory;
use mconfig::error::ErrorKind;
use mconfig::store::bundle::BundleStorage;
use mconfig::store::kv::memory::MemoryKvEngine;
use mconfig::stream::StreamMessage;
use mconfig::test_utils::fixtures::{config_change, gateway_change};
use mconfig_telemetry::tracing::init_test_tracing;

use crate::common::{TestPipeline, test_network_id, test_registries, topic, wait_for_commit};

fn pipeline() -> TestPipeline<MemoryGatewayDirectory> {
    let (streamers, config_types) = test_registries();

    TestPipeline::new(
        streamers,
        config_types,
        BundleStorage::new(MemoryKvEngine::new()),
        MemoryGatewayDirectory::new(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_processor_finishes_its_current_cycle() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let pipeline = pipeline();
    let producer = pipeline.producer.clone();
    let commits = pipeline.commits.clone();
    let storage = pipeline.storage.clone();

    let handle = pipeline.processor.spawn("magma.public");

    let first = producer
        .publish(&configurations, Some(config_change("type2", "gw3", Some("v1"))))
        .unwrap();
    wait_for_commit(&commits, first).await;

    handle.stop();
    producer
        .publish(&configurations, Some(config_change("type2", "gw3", Some("v2"))))
        .unwrap();

    handle.wait().await.unwrap();

    // Depending on where the stop landed the second message is either fully processed or
    // left uncommitted, never applied without its commit.
    let committed = commits.committed_offsets().await;
    assert_eq!(committed[0], first);
    let gw3 = storage.get(&network_id, "gw3").await.unwrap().unwrap();
    assert_eq!(Some(&gw3.offset), committed.last());
}

#[tokio::test(flavor = "multi_thread")]
async fn stopped_processor_reads_nothing() {
    init_test_tracing();

    let network_id = test_network_id();
    let mut pipeline = pipeline();
    pipeline
        .producer
        .publish(
            &topic(&network_id, SourceTable::Configurations),
            Some(config_change("type2", "gw3", Some("v1"))),
        )
        .unwrap();

    pipeline.processor.stop();
    pipeline.processor.run().await.unwrap();

    assert!(!pipeline.processor.is_running());
    assert!(pipeline.commits.committed_offsets().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_message_stops_the_processor_without_commit() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let pipeline = pipeline();
    let producer = pipeline.producer.clone();
    let commits = pipeline.commits.clone();

    let handle = pipeline.processor.spawn("magma.public");

    let ok = producer
        .publish(&configurations, Some(config_change("type2", "gw3", Some("v1"))))
        .unwrap();
    producer
        .publish("not-a-cdc-topic", Some(gateway_change("c", "gw1")))
        .unwrap();
    producer
        .publish(&configurations, Some(config_change("type2", "gw3", Some("v2"))))
        .unwrap();

    let err = handle.wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedTopic);
    assert_eq!(commits.committed_offsets().await, vec![ok]);
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_config_type_is_fatal() {
    init_test_tracing();

    let network_id = test_network_id();
    let mut pipeline = pipeline();

    pipeline
        .producer
        .publish(
            &topic(&network_id, SourceTable::Configurations),
            Some(config_change("type9", "gw1", Some("v"))),
        )
        .unwrap();

    let err = pipeline.processor.run_once().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnknownConfigType);
    assert!(pipeline.commits.committed_offsets().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn redelivered_message_converges() {
    init_test_tracing();

    let network_id = test_network_id();
    let configurations = topic(&network_id, SourceTable::Configurations);
    let mut pipeline = pipeline();

    let message = StreamMessage {
        topic: configurations.clone(),
        partition: 0,
        offset: 42,
        payload: Some(config_change("type1", "k1", Some("v1"))),
    };

    pipeline.producer.send(message.clone()).unwrap();
    pipeline.processor.run_once().await.unwrap();
    let first = pipeline
        .storage
        .get_many(&network_id, &["gw1".to_string(), "gw2".to_string()])
        .await
        .unwrap();

    pipeline.producer.send(message).unwrap();
    pipeline.processor.run_once().await.unwrap();
    let second = pipeline
        .storage
        .get_many(&network_id, &["gw1".to_string(), "gw2".to_string()])
        .await
        .unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(pipeline.commits.committed_offsets().await, vec![42, 42]);
}

#[tokio::test(flavor = "multi_thread")]
async fn closed_stream_ends_the_processor() {
    init_test_tracing();

    let pipeline = pipeline();
    let TestPipeline {
        processor,
        producer,
        ..
    } = pipeline;

    let handle = processor.spawn("magma.public");
    drop(producer);

    let err = handle.wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StreamEnded);
}

#[tokio::test(flavor = "multi_thread")]
async fn aborted_processor_reports_cancellation() {
    init_test_tracing();

    let pipeline = pipeline();
    let handle = pipeline.processor.spawn("magma.public");

    handle.abort_handle().unwrap().abort();
    let err = handle.wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProcessorCancelled);
}
