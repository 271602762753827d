use std::sync::Arc;
use std::time::Duration;

use mconfig::apply::ApplyContext;
use mconfig::decoder::Decoder;
use mconfig::directory::GatewayLister;
use mconfig::error::ErrorKind;
use mconfig::processor::{Processor, ProcessorHandle};
use mconfig::registry::{ConfigTypeRegistry, StreamerRegistry};
use mconfig::store::bundle::BundleStorage;
use mconfig::store::kv::KvEngine;
use mconfig::store::kv::memory::MemoryKvEngine;
use mconfig::store::kv::postgres::PostgresKvEngine;
use mconfig::stream::ChangeStream;
use mconfig::stream::memory::MemoryChangeStream;
use mconfig::streamers::{LifecycleConfigManager, LifecycleStreamer};
use mconfig_config::shared::{
    ProcessorConfig, StorageConfig, StreamConfig, StreamerConfig, StreamerConfigWithoutSecrets,
};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info, warn};

use crate::error::StreamerResult;

/// Time the processor gets to finish its current cycle after a shutdown signal.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Starts the streamer with the provided configuration and runs it until shutdown.
///
/// The storage engine and change stream are selected from the configuration. Both are
/// statically dispatched, hence one processor instantiation per combination.
pub async fn start_streamer_with_config(config: StreamerConfig) -> StreamerResult<()> {
    info!("starting mconfig streamer");

    log_config(&config);

    let (streamers, config_types) = build_registries(&config.processor);

    match &config.storage {
        StorageConfig::Memory => {
            warn!("using memory storage, bundles are lost on restart");
            let storage = BundleStorage::new(MemoryKvEngine::new());

            start_with_storage(&config, storage, streamers, config_types).await?;
        }
        StorageConfig::Postgres { connection } => {
            let engine = PostgresKvEngine::connect(connection).await?;
            let storage = BundleStorage::new(engine);

            start_with_storage(&config, storage, streamers, config_types).await?;
        }
    }

    info!("mconfig streamer completed");

    Ok(())
}

fn log_config(config: &StreamerConfig) {
    let config = StreamerConfigWithoutSecrets::from(config.clone());

    debug!(
        topic_prefix = config.processor.topic_prefix,
        blacklisted_config_types = ?config.processor.blacklisted_config_types,
        "processor config"
    );
    debug!(stream = ?config.stream, "stream config");
    debug!(storage = ?config.storage, "storage config");
}

/// Registers the built-in computation units and config types.
fn build_registries(
    config: &ProcessorConfig,
) -> (Arc<StreamerRegistry>, Arc<ConfigTypeRegistry>) {
    let mut streamers = StreamerRegistry::new();
    streamers.register(Arc::new(LifecycleStreamer::new()));

    let mut config_types =
        ConfigTypeRegistry::new().with_blacklist(config.blacklisted_config_types.iter().cloned());
    config_types.register(Arc::new(LifecycleConfigManager::new()));

    info!(
        units = streamers.len(),
        blacklisted = config.blacklisted_config_types.len(),
        "registries initialized"
    );

    (Arc::new(streamers), Arc::new(config_types))
}

async fn start_with_storage<K>(
    config: &StreamerConfig,
    storage: BundleStorage<K>,
    streamers: Arc<StreamerRegistry>,
    config_types: Arc<ConfigTypeRegistry>,
) -> StreamerResult<()>
where
    K: KvEngine + Clone + Send + Sync + 'static,
{
    let decoder = Decoder::new(config_types.clone());
    // Tier updates fan out to every gateway that has a stored bundle.
    let context = ApplyContext::new(storage.clone(), streamers, config_types, storage);
    let topic_prefix = &config.processor.topic_prefix;

    match &config.stream {
        StreamConfig::Memory => {
            warn!("using memory stream, no changes will be received");
            // The producer must outlive the processor, otherwise the stream ends immediately.
            let (stream, _producer) = MemoryChangeStream::new();

            start_processor(Processor::new(stream, decoder, context), topic_prefix).await
        }
        #[cfg(feature = "kafka")]
        StreamConfig::Kafka {
            brokers,
            group_id,
            session_timeout_ms,
        } => {
            use mconfig::stream::kafka::{KafkaChangeStream, KafkaStreamConfig};

            let stream = KafkaChangeStream::new(&KafkaStreamConfig {
                brokers: brokers.clone(),
                group_id: group_id.clone(),
                session_timeout_ms: *session_timeout_ms,
                topic_prefix: topic_prefix.clone(),
            })?;

            start_processor(Processor::new(stream, decoder, context), topic_prefix).await
        }
        #[cfg(not(feature = "kafka"))]
        StreamConfig::Kafka { .. } => Err(crate::error::StreamerError::config(std::io::Error::other(
            "kafka stream configured but the streamer was built without the `kafka` feature",
        ))),
    }
}

/// Runs the processor until it fails or a shutdown signal stops it.
///
/// On SIGTERM or SIGINT the processor is asked to stop after its current cycle. A processor
/// still blocked after [`SHUTDOWN_GRACE_PERIOD`] is aborted, which is safe because uncommitted
/// messages are replayed on the next start.
async fn start_processor<S, K, L>(
    processor: Processor<S, K, L>,
    topic_prefix: &str,
) -> StreamerResult<()>
where
    S: ChangeStream + Send + 'static,
    K: KvEngine + Send + Sync + 'static,
    L: GatewayLister + Send + Sync + 'static,
{
    let mut sigterm = signal(SignalKind::terminate())?;

    let handle = processor.spawn(topic_prefix);
    let stop = handle.stop_handle();
    let abort = handle.abort_handle();

    let shutdown_handle = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("sigint (ctrl+c) received, stopping processor");
            }
            _ = sigterm.recv() => {
                info!("sigterm received, stopping processor");
            }
        }

        stop.stop();
        tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;

        warn!(
            grace_period_secs = SHUTDOWN_GRACE_PERIOD.as_secs(),
            "processor did not stop in time, aborting"
        );
        if let Some(abort) = abort {
            abort.abort();
        }
    });

    let result = wait_for_processor(handle).await;

    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    result
}

async fn wait_for_processor(handle: ProcessorHandle) -> StreamerResult<()> {
    let stop = handle.stop_handle();

    match handle.wait().await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::ProcessorCancelled && stop.is_stopped() => {
            info!("processor aborted during shutdown");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
