use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::GatewayLister;
use crate::error::{ErrorKind, MconfigResult};
use crate::mconfig_error;
use crate::store::kv::{KvEngine, KvValue, KvWrite, Precondition};
use crate::types::{Bundle, StoredBundle};

/// Suffix of the per-network table holding materialized bundles.
pub const BUNDLE_TABLE_SUFFIX: &str = "mconfig_views";

/// Name of the table holding the bundles of `network_id`.
pub fn bundle_table(network_id: &str) -> String {
    format!("{network_id}_{BUNDLE_TABLE_SUFFIX}")
}

/// Serialized form of a stored bundle: fragments as base64 strings plus the offset.
#[derive(Debug, Serialize, Deserialize)]
struct BundleRecord {
    bundle: BTreeMap<String, String>,
    offset: i64,
}

/// Stored bundle with the generation of the row it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBundle {
    pub bundle: StoredBundle,
    pub generation: u64,
}

/// Bundle write guarded by a precondition on the existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleWrite {
    pub gateway_id: String,
    pub bundle: Bundle,
    pub offset: i64,
    pub precondition: Precondition,
}

/// Typed access to the per-network bundle tables of a [`KvEngine`].
#[derive(Debug, Clone)]
pub struct BundleStorage<K> {
    engine: K,
}

impl<K> BundleStorage<K>
where
    K: KvEngine,
{
    pub fn new(engine: K) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &K {
        &self.engine
    }

    pub async fn get(
        &self,
        network_id: &str,
        gateway_id: &str,
    ) -> MconfigResult<Option<StoredBundle>> {
        let table = bundle_table(network_id);

        match self.engine.get(&table, gateway_id).await? {
            Some(value) => Ok(Some(decode_bundle(network_id, gateway_id, &value)?)),
            None => Ok(None),
        }
    }

    /// Returns the stored bundles among `gateway_ids`. Missing gateways are left out.
    pub async fn get_many(
        &self,
        network_id: &str,
        gateway_ids: &[String],
    ) -> MconfigResult<HashMap<String, StoredBundle>> {
        let versioned = self.get_many_versioned(network_id, gateway_ids).await?;

        Ok(versioned
            .into_iter()
            .map(|(gateway_id, versioned)| (gateway_id, versioned.bundle))
            .collect())
    }

    /// Like [`BundleStorage::get_many`], keeping the generation of every row for guarded writes.
    pub async fn get_many_versioned(
        &self,
        network_id: &str,
        gateway_ids: &[String],
    ) -> MconfigResult<HashMap<String, VersionedBundle>> {
        let table = bundle_table(network_id);
        let values = self.engine.get_many(&table, gateway_ids).await?;

        let mut bundles = HashMap::with_capacity(values.len());
        for (gateway_id, value) in values {
            let bundle = decode_bundle(network_id, &gateway_id, &value)?;
            bundles.insert(
                gateway_id,
                VersionedBundle {
                    bundle,
                    generation: value.generation,
                },
            );
        }

        Ok(bundles)
    }

    /// Writes the submitted bundles in one atomic batch.
    pub async fn create_or_update(
        &self,
        network_id: &str,
        writes: Vec<BundleWrite>,
    ) -> MconfigResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let count = writes.len();
        let writes = writes
            .into_iter()
            .map(|write| {
                Ok(KvWrite {
                    value: encode_bundle(&write.bundle, write.offset)?,
                    key: write.gateway_id,
                    precondition: write.precondition,
                })
            })
            .collect::<MconfigResult<Vec<_>>>()?;

        self.engine
            .put_many(&bundle_table(network_id), writes)
            .await?;

        debug!(network_id, count, "stored bundles");

        Ok(())
    }

    pub async fn delete(&self, network_id: &str, gateway_ids: Vec<String>) -> MconfigResult<()> {
        self.engine
            .delete_many(&bundle_table(network_id), gateway_ids)
            .await
    }

    /// Gateways of `network_id` that have a stored bundle.
    pub async fn list_gateway_ids(&self, network_id: &str) -> MconfigResult<Vec<String>> {
        self.engine.list_keys(&bundle_table(network_id)).await
    }

    /// Removes every stored bundle of `network_id`.
    pub async fn delete_all(&self, network_id: &str) -> MconfigResult<()> {
        let gateway_ids = self.list_gateway_ids(network_id).await?;

        self.delete(network_id, gateway_ids).await
    }
}

impl<K> GatewayLister for BundleStorage<K>
where
    K: KvEngine + Send + Sync,
{
    async fn list_gateways(&self, network_id: &str) -> MconfigResult<Vec<String>> {
        self.list_gateway_ids(network_id).await
    }
}

fn encode_bundle(bundle: &Bundle, offset: i64) -> MconfigResult<Vec<u8>> {
    let record = BundleRecord {
        bundle: bundle
            .iter()
            .map(|(key, value)| (key.to_string(), STANDARD.encode(value)))
            .collect(),
        offset,
    };

    Ok(serde_json::to_vec(&record)?)
}

fn decode_bundle(
    network_id: &str,
    gateway_id: &str,
    value: &KvValue,
) -> MconfigResult<StoredBundle> {
    let record: BundleRecord = serde_json::from_slice(&value.value)?;

    let mut bundle = Bundle::new();
    for (key, encoded) in record.bundle {
        let raw = STANDARD.decode(&encoded).map_err(|err| {
            mconfig_error!(
                ErrorKind::DeserializationError,
                "Stored bundle fragment is not valid base64",
                format!("Fragment '{key}' of gateway '{gateway_id}'"),
                source: err
            )
        })?;
        bundle.insert(key, raw);
    }

    Ok(StoredBundle {
        network_id: network_id.to_string(),
        gateway_id: gateway_id.to_string(),
        bundle,
        offset: record.offset,
    })
}
