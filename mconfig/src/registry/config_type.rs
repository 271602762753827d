use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::bail;
use crate::error::{ErrorKind, MconfigResult};
use crate::types::ConfigValue;

/// Knowledge about one config type held by the configuration service.
#[async_trait::async_trait]
pub trait ConfigManager: Send + Sync + fmt::Debug {
    /// Config type handled by this manager.
    fn config_type(&self) -> &str;

    /// Gateways whose bundles depend on the config stored under `config_key`.
    async fn gateway_ids_for_config(
        &self,
        network_id: &str,
        config_key: &str,
    ) -> MconfigResult<Vec<String>>;

    /// Decodes the raw value of a config row.
    fn unmarshal_config(&self, raw: &[u8]) -> MconfigResult<ConfigValue>;
}

/// Config managers keyed by config type, plus the set of ignored types.
#[derive(Debug, Default)]
pub struct ConfigTypeRegistry {
    managers: HashMap<String, Arc<dyn ConfigManager>>,
    blacklist: HashSet<String>,
}

impl ConfigTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a manager, replacing any previous one for the same type.
    pub fn register(&mut self, manager: Arc<dyn ConfigManager>) {
        self.managers.insert(manager.config_type().to_string(), manager);
    }

    /// Adds config types whose changes are ignored.
    pub fn with_blacklist<I, S>(mut self, config_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist.extend(config_types.into_iter().map(Into::into));
        self
    }

    pub fn is_blacklisted(&self, config_type: &str) -> bool {
        self.blacklist.contains(config_type)
    }

    pub fn manager(&self, config_type: &str) -> MconfigResult<&Arc<dyn ConfigManager>> {
        match self.managers.get(config_type) {
            Some(manager) => Ok(manager),
            None => bail!(
                ErrorKind::UnknownConfigType,
                "No manager registered for config type",
                format!("Unknown config type '{config_type}'")
            ),
        }
    }

    /// Decodes a raw config value with the manager of `config_type`.
    ///
    /// Failures of the manager are reported as [`ErrorKind::UnmarshalError`].
    pub fn unmarshal(&self, config_type: &str, raw: &[u8]) -> MconfigResult<ConfigValue> {
        let manager = self.manager(config_type)?;

        match manager.unmarshal_config(raw) {
            Ok(value) => Ok(value),
            Err(err) => bail!(
                ErrorKind::UnmarshalError,
                "Failed to unmarshal config value",
                format!("Config type '{config_type}' rejected its value"),
                source: err
            ),
        }
    }

    pub async fn gateway_ids_for_config(
        &self,
        config_type: &str,
        network_id: &str,
        config_key: &str,
    ) -> MconfigResult<Vec<String>> {
        self.manager(config_type)?
            .gateway_ids_for_config(network_id, config_key)
            .await
    }
}
