use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Settings for the stream processor loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Prefix of the CDC topics, e.g. `magma.public`.
    pub topic_prefix: String,
    /// Config types whose changes are ignored by the processor.
    #[serde(default)]
    pub blacklisted_config_types: Vec<String>,
}

impl ProcessorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.topic_prefix.is_empty() {
            return Err(ValidationError::EmptyTopicPrefix);
        }

        Ok(())
    }
}
