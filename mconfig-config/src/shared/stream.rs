use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

const fn default_session_timeout_ms() -> u64 {
    StreamConfig::DEFAULT_SESSION_TIMEOUT_MS
}

/// Source of CDC messages consumed by the processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamConfig {
    /// In-process channel, used in development and tests.
    Memory,
    /// Kafka topics written by the CDC connector.
    Kafka {
        /// Comma separated list of bootstrap brokers.
        brokers: String,
        /// Consumer group whose committed offsets track processing progress.
        group_id: String,
        #[serde(default = "default_session_timeout_ms")]
        session_timeout_ms: u64,
    },
}

impl StreamConfig {
    /// Default Kafka consumer session timeout.
    pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 6_000;

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StreamConfig::Memory => Ok(()),
            StreamConfig::Kafka {
                brokers, group_id, ..
            } => {
                if brokers.trim().is_empty() {
                    return Err(ValidationError::EmptyBrokers);
                }
                if group_id.trim().is_empty() {
                    return Err(ValidationError::EmptyGroupId);
                }

                Ok(())
            }
        }
    }
}
