use std::collections::HashMap;

use crate::error::MconfigResult;
use crate::registry::ConfigManager;
use crate::types::ConfigValue;

/// Config manager whose values are UTF-8 strings.
///
/// Unless overridden with [`TestConfigManager::with_gateways`], a config key maps to the
/// gateway with the same id.
#[derive(Debug, Clone)]
pub struct TestConfigManager {
    config_type: String,
    gateways: HashMap<String, Vec<String>>,
}

impl TestConfigManager {
    pub fn new(config_type: &str) -> Self {
        Self {
            config_type: config_type.to_string(),
            gateways: HashMap::new(),
        }
    }

    pub fn with_gateways(mut self, config_key: &str, gateway_ids: &[&str]) -> Self {
        self.gateways.insert(
            config_key.to_string(),
            gateway_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }
}

#[async_trait::async_trait]
impl ConfigManager for TestConfigManager {
    fn config_type(&self) -> &str {
        &self.config_type
    }

    async fn gateway_ids_for_config(
        &self,
        _network_id: &str,
        config_key: &str,
    ) -> MconfigResult<Vec<String>> {
        Ok(self
            .gateways
            .get(config_key)
            .cloned()
            .unwrap_or_else(|| vec![config_key.to_string()]))
    }

    fn unmarshal_config(&self, raw: &[u8]) -> MconfigResult<ConfigValue> {
        let value = std::str::from_utf8(raw)?;

        Ok(ConfigValue::String(value.to_string()))
    }
}
