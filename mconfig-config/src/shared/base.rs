use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The topic prefix used to build the stream subscription is empty.
    #[error("`topic_prefix` cannot be empty")]
    EmptyTopicPrefix,
    /// No Kafka brokers were configured.
    #[error("`brokers` cannot be empty")]
    EmptyBrokers,
    /// The Kafka consumer group id is empty.
    #[error("`group_id` cannot be empty")]
    EmptyGroupId,
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}
