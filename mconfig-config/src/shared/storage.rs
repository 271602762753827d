use serde::{Deserialize, Serialize};

use crate::shared::{PgConnectionConfig, PgConnectionConfigWithoutSecrets, ValidationError};

/// Backend of the key/value engine holding materialized bundles.
///
/// This intentionally does not implement [`Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local storage, lost on restart.
    Memory,
    Postgres {
        connection: PgConnectionConfig,
    },
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StorageConfig::Memory => Ok(()),
            StorageConfig::Postgres { connection } => connection.validate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageConfigWithoutSecrets {
    Memory,
    Postgres {
        connection: PgConnectionConfigWithoutSecrets,
    },
}

impl From<StorageConfig> for StorageConfigWithoutSecrets {
    fn from(value: StorageConfig) -> Self {
        match value {
            StorageConfig::Memory => StorageConfigWithoutSecrets::Memory,
            StorageConfig::Postgres { connection } => StorageConfigWithoutSecrets::Postgres {
                connection: connection.into(),
            },
        }
    }
}
