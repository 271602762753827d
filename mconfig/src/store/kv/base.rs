use std::collections::HashMap;
use std::future::Future;

use crate::error::MconfigResult;

/// Stored value together with its generation.
///
/// A row starts at generation 0 and every overwrite increments it by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvValue {
    pub value: Vec<u8>,
    pub generation: u64,
}

/// Condition a write requires of the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Write unconditionally.
    None,
    /// The row must not exist.
    Absent,
    /// The row must exist at exactly this generation.
    Generation(u64),
}

/// Single write of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvWrite {
    pub key: String,
    pub value: Vec<u8>,
    pub precondition: Precondition,
}

impl KvWrite {
    pub fn unconditional(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
            precondition: Precondition::None,
        }
    }
}

/// Key/value storage partitioned into tables, with optimistic concurrency on writes.
///
/// Batches are atomic: if any write's [`Precondition`] does not hold, the whole batch fails with
/// [`crate::error::ErrorKind::StorageConflict`] and nothing is written.
pub trait KvEngine {
    fn get(
        &self,
        table: &str,
        key: &str,
    ) -> impl Future<Output = MconfigResult<Option<KvValue>>> + Send;

    /// Returns the rows that exist among `keys`.
    fn get_many(
        &self,
        table: &str,
        keys: &[String],
    ) -> impl Future<Output = MconfigResult<HashMap<String, KvValue>>> + Send;

    fn put(
        &self,
        table: &str,
        write: KvWrite,
    ) -> impl Future<Output = MconfigResult<()>> + Send {
        self.put_many(table, vec![write])
    }

    fn put_many(
        &self,
        table: &str,
        writes: Vec<KvWrite>,
    ) -> impl Future<Output = MconfigResult<()>> + Send;

    fn delete(&self, table: &str, key: &str) -> impl Future<Output = MconfigResult<()>> + Send {
        self.delete_many(table, vec![key.to_string()])
    }

    /// Deletes the given keys. Missing keys are ignored.
    fn delete_many(
        &self,
        table: &str,
        keys: Vec<String>,
    ) -> impl Future<Output = MconfigResult<()>> + Send;

    /// Returns every key of `table` in ascending order.
    fn list_keys(&self, table: &str) -> impl Future<Output = MconfigResult<Vec<String>>> + Send;
}
