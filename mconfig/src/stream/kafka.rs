use std::fmt;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, info};

use crate::decoder::subscription_pattern;
use crate::error::MconfigResult;
use crate::stream::{ChangeStream, StreamMessage};

/// Settings of the Kafka consumer reading the CDC topics.
#[derive(Debug, Clone)]
pub struct KafkaStreamConfig {
    pub brokers: String,
    pub group_id: String,
    pub session_timeout_ms: u64,
    pub topic_prefix: String,
}

/// Change stream reading every table topic under a prefix from Kafka.
///
/// Auto-commit is disabled, progress only advances through [`ChangeStream::commit`].
pub struct KafkaChangeStream {
    consumer: StreamConsumer,
}

impl KafkaChangeStream {
    pub fn new(config: &KafkaStreamConfig) -> MconfigResult<Self> {
        let consumer: StreamConsumer = consumer_config(config).create()?;

        let pattern = subscription_pattern(&config.topic_prefix);
        consumer.subscribe(&[pattern.as_str()])?;

        info!(
            brokers = %config.brokers,
            group_id = %config.group_id,
            %pattern,
            "subscribed to cdc topics"
        );

        Ok(KafkaChangeStream { consumer })
    }
}

fn consumer_config(config: &KafkaStreamConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.group_id)
        .set("session.timeout.ms", config.session_timeout_ms.to_string())
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest");

    client_config
}

/// Offsets to commit once `message` is processed: Kafka expects the next offset to read.
fn commit_offsets(message: &StreamMessage) -> MconfigResult<TopicPartitionList> {
    let mut partitions = TopicPartitionList::new();
    partitions.add_partition_offset(
        &message.topic,
        message.partition,
        Offset::Offset(message.offset + 1),
    )?;

    Ok(partitions)
}

impl fmt::Debug for KafkaChangeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaChangeStream").finish_non_exhaustive()
    }
}

impl ChangeStream for KafkaChangeStream {
    async fn next_message(&mut self) -> MconfigResult<StreamMessage> {
        let message = self.consumer.recv().await?;

        Ok(StreamMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec),
        })
    }

    async fn commit(&mut self, message: &StreamMessage) -> MconfigResult<()> {
        let partitions = commit_offsets(message)?;
        self.consumer.commit(&partitions, CommitMode::Sync)?;

        debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            "committed kafka offset"
        );

        Ok(())
    }
}
