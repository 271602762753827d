use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, MconfigResult};
use crate::store::kv::{KvEngine, KvValue, KvWrite, Precondition};

type Table = BTreeMap<String, KvValue>;

/// In-memory [`KvEngine`], lost on restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvEngine {
    tables: Arc<Mutex<HashMap<String, Table>>>,
}

impl MemoryKvEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Applies `writes` to a copy of `table`, failing on the first violated precondition.
fn stage_writes(table: &Table, writes: Vec<KvWrite>) -> MconfigResult<Table> {
    let mut staged = table.clone();

    for write in writes {
        let current = staged.get(&write.key).map(|value| value.generation);

        match (write.precondition, current) {
            (Precondition::None, _) | (Precondition::Absent, None) => {}
            (Precondition::Generation(expected), Some(actual)) if expected == actual => {}
            (precondition, current) => bail!(
                ErrorKind::StorageConflict,
                "Write precondition does not hold",
                format!(
                    "Key '{}' expected {precondition:?} but found generation {current:?}",
                    write.key
                )
            ),
        }

        let generation = current.map_or(0, |generation| generation + 1);
        staged.insert(
            write.key,
            KvValue {
                value: write.value,
                generation,
            },
        );
    }

    Ok(staged)
}

impl KvEngine for MemoryKvEngine {
    async fn get(&self, table: &str, key: &str) -> MconfigResult<Option<KvValue>> {
        let tables = self.tables.lock().await;

        Ok(tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn get_many(
        &self,
        table: &str,
        keys: &[String],
    ) -> MconfigResult<HashMap<String, KvValue>> {
        let tables = self.tables.lock().await;
        let Some(rows) = tables.get(table) else {
            return Ok(HashMap::new());
        };

        Ok(keys
            .iter()
            .filter_map(|key| rows.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    async fn put_many(&self, table: &str, writes: Vec<KvWrite>) -> MconfigResult<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();

        *rows = stage_writes(rows, writes)?;

        Ok(())
    }

    async fn delete_many(&self, table: &str, keys: Vec<String>) -> MconfigResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(rows) = tables.get_mut(table) {
            for key in keys {
                rows.remove(&key);
            }
        }

        Ok(())
    }

    async fn list_keys(&self, table: &str) -> MconfigResult<Vec<String>> {
        let tables = self.tables.lock().await;

        Ok(tables
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(key: &str, value: &[u8], precondition: Precondition) -> KvWrite {
        KvWrite {
            key: key.to_string(),
            value: value.to_vec(),
            precondition,
        }
    }

    #[tokio::test]
    async fn generation_starts_at_zero_and_increments() {
        let engine = MemoryKvEngine::new();

        engine
            .put("t", KvWrite::unconditional("k", b"a".to_vec()))
            .await
            .unwrap();
        assert_eq!(engine.get("t", "k").await.unwrap().unwrap().generation, 0);

        engine
            .put("t", write("k", b"b", Precondition::Generation(0)))
            .await
            .unwrap();
        let value = engine.get("t", "k").await.unwrap().unwrap();
        assert_eq!(value.generation, 1);
        assert_eq!(value.value, b"b");
    }

    #[tokio::test]
    async fn violated_precondition_fails_the_whole_batch() {
        let engine = MemoryKvEngine::new();
        engine
            .put("t", KvWrite::unconditional("existing", b"a".to_vec()))
            .await
            .unwrap();

        let err = engine
            .put_many(
                "t",
                vec![
                    write("fresh", b"x", Precondition::Absent),
                    write("existing", b"y", Precondition::Absent),
                ],
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageConflict);
        assert_eq!(engine.get("t", "fresh").await.unwrap(), None);
        assert_eq!(engine.get("t", "existing").await.unwrap().unwrap().value, b"a");
    }

    #[tokio::test]
    async fn stale_generation_is_rejected() {
        let engine = MemoryKvEngine::new();
        engine
            .put("t", KvWrite::unconditional("k", b"a".to_vec()))
            .await
            .unwrap();
        engine
            .put("t", KvWrite::unconditional("k", b"b".to_vec()))
            .await
            .unwrap();

        let err = engine
            .put("t", write("k", b"c", Precondition::Generation(0)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageConflict);
    }

    #[tokio::test]
    async fn tables_are_isolated() {
        let engine = MemoryKvEngine::new();
        engine
            .put("n1", KvWrite::unconditional("gw1", b"a".to_vec()))
            .await
            .unwrap();
        engine
            .put("n2", KvWrite::unconditional("gw2", b"b".to_vec()))
            .await
            .unwrap();

        assert_eq!(engine.list_keys("n1").await.unwrap(), vec!["gw1"]);
        let found = engine
            .get_many("n1", &["gw1".to_string(), "gw2".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        engine.delete("n1", "gw1").await.unwrap();
        assert!(engine.list_keys("n1").await.unwrap().is_empty());
        assert_eq!(engine.list_keys("n2").await.unwrap(), vec!["gw2"]);
    }
}
