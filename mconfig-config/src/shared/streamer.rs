use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{
    ProcessorConfig, StorageConfig, StorageConfigWithoutSecrets, StreamConfig, ValidationError,
};

/// Complete configuration for the mconfig streamer service.
///
/// This intentionally does not implement [`Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamerConfig {
    pub processor: ProcessorConfig,
    pub stream: StreamConfig,
    pub storage: StorageConfig,
}

impl StreamerConfig {
    /// Validates every configuration section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.processor.validate()?;
        self.stream.validate()?;
        self.storage.validate()
    }
}

impl Config for StreamerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["processor.blacklisted_config_types"];
}

/// Same as [`StreamerConfig`] but without secrets, safe to log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamerConfigWithoutSecrets {
    pub processor: ProcessorConfig,
    pub stream: StreamConfig,
    pub storage: StorageConfigWithoutSecrets,
}

impl From<StreamerConfig> for StreamerConfigWithoutSecrets {
    fn from(value: StreamerConfig) -> Self {
        StreamerConfigWithoutSecrets {
            processor: value.processor,
            stream: value.stream,
            storage: value.storage.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{PgConnectionConfig, TlsConfig};
    use secrecy::SecretString;

    fn postgres_config(password: &str) -> StreamerConfig {
        StreamerConfig {
            processor: ProcessorConfig {
                topic_prefix: "magma.public".to_string(),
                blacklisted_config_types: vec![],
            },
            stream: StreamConfig::Kafka {
                brokers: "localhost:9092".to_string(),
                group_id: "mconfig".to_string(),
                session_timeout_ms: StreamConfig::DEFAULT_SESSION_TIMEOUT_MS,
            },
            storage: StorageConfig::Postgres {
                connection: PgConnectionConfig {
                    host: "localhost".to_string(),
                    port: 5432,
                    name: "magma".to_string(),
                    username: "postgres".to_string(),
                    password: Some(SecretString::new(password.to_string())),
                    tls: TlsConfig::disabled(),
                },
            },
        }
    }

    #[test]
    fn serialized_config_without_secrets_omits_password() {
        let config = postgres_config("hunter2");
        let without_secrets: StreamerConfigWithoutSecrets = config.into();

        let json = serde_json::to_string(&without_secrets).unwrap();

        assert!(!json.contains("hunter2"));
        assert!(json.contains("magma.public"));
    }

    #[test]
    fn validation_rejects_empty_sections() {
        let mut config = postgres_config("secret");
        assert!(config.validate().is_ok());

        config.processor.topic_prefix = String::new();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyTopicPrefix)
        ));

        let mut config = postgres_config("secret");
        config.stream = StreamConfig::Kafka {
            brokers: " ".to_string(),
            group_id: "mconfig".to_string(),
            session_timeout_ms: 1_000,
        };
        assert!(matches!(config.validate(), Err(ValidationError::EmptyBrokers)));
    }
}
