use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::MconfigResult;

/// Offset recorded for bundles seeded outside the CDC stream.
///
/// Older than any offset derived from the stream, so the read path treats it as stale
/// relative to every stream-produced bundle.
pub const SEEDED_BUNDLE_OFFSET: i64 = -1;

/// Per-gateway configuration bundle.
///
/// Ordered map from fragment key to its serialized fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundle(BTreeMap<String, Vec<u8>>);

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Vec<u8>) -> Option<Vec<u8>> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decodes the JSON fragment stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn get_typed<T>(&self, key: &str) -> MconfigResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.0.get(key) {
            Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` as a JSON fragment under `key`.
    pub fn set_typed<T>(&mut self, key: impl Into<String>, value: &T) -> MconfigResult<()>
    where
        T: Serialize,
    {
        let raw = serde_json::to_vec(value)?;
        self.0.insert(key.into(), raw);

        Ok(())
    }
}

impl FromIterator<(String, Vec<u8>)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Bundle(iter.into_iter().collect())
    }
}

impl IntoIterator for Bundle {
    type Item = (String, Vec<u8>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Bundles keyed by gateway id, threaded through the computation units.
pub type BundlesByGateway = BTreeMap<String, Bundle>;

/// Bundle as persisted for one gateway, with the stream offset that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBundle {
    pub network_id: String,
    pub gateway_id: String,
    pub bundle: Bundle,
    pub offset: i64,
}
