use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use mconfig_config::shared::{IntoConnectOptions, MCONFIG_STORAGE_OPTIONS, PgConnectionConfig};
use pg_escape::quote_identifier;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bail;
use crate::error::{ErrorKind, MconfigError, MconfigResult};
use crate::mconfig_error;
use crate::store::kv::{KvEngine, KvValue, KvWrite, Precondition};

/// Maximum number of pooled connections to the storage database.
const NUM_POOL_CONNECTIONS: u32 = 4;

/// SQLSTATE raised when a statement references a missing table.
const UNDEFINED_TABLE: &str = "42P01";

/// [`KvEngine`] storing each table as a Postgres table `(key, value, generation)`.
///
/// Tables are created on first write. Reading or deleting from a table that does not
/// exist yet behaves as if it were empty.
#[derive(Debug, Clone)]
pub struct PostgresKvEngine {
    pool: PgPool,
    known_tables: Arc<Mutex<HashSet<String>>>,
}

impl PostgresKvEngine {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            known_tables: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Connects to the database described by `config`.
    pub async fn connect(config: &PgConnectionConfig) -> MconfigResult<Self> {
        let options = config.with_db(Some(&MCONFIG_STORAGE_OPTIONS));

        let pool = PgPoolOptions::new()
            .max_connections(NUM_POOL_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|err| {
                mconfig_error!(
                    ErrorKind::StorageConnectionFailed,
                    "Failed to connect to the storage database",
                    format!("{}:{}/{}", config.host, config.port, config.name),
                    source: err
                )
            })?;

        info!(host = %config.host, database = %config.name, "connected to storage database");

        Ok(Self::new(pool))
    }

    /// Creates `table` if this engine has not seen it yet and returns its quoted name.
    async fn ensure_table(&self, table: &str) -> MconfigResult<String> {
        let quoted = quote_identifier(table).into_owned();

        let mut known_tables = self.known_tables.lock().await;
        if known_tables.contains(table) {
            return Ok(quoted);
        }

        sqlx::query(&format!(
            r#"
            create table if not exists {quoted} (
                key text primary key,
                value bytea not null,
                generation bigint not null
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        debug!(table, "ensured key/value table exists");
        known_tables.insert(table.to_string());

        Ok(quoted)
    }
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNDEFINED_TABLE)
}

fn to_db_generation(generation: u64) -> MconfigResult<i64> {
    i64::try_from(generation).map_err(|_| {
        mconfig_error!(
            ErrorKind::ConversionError,
            "Generation does not fit a bigint",
            generation
        )
    })
}

fn from_db_generation(generation: i64) -> MconfigResult<u64> {
    u64::try_from(generation).map_err(|_| {
        mconfig_error!(
            ErrorKind::ConversionError,
            "Stored generation is negative",
            generation
        )
    })
}

fn conflict(table: &str, write: &KvWrite) -> MconfigError {
    mconfig_error!(
        ErrorKind::StorageConflict,
        "Write precondition does not hold",
        format!(
            "Key '{}' of table '{table}' expected {:?}",
            write.key, write.precondition
        )
    )
}

impl KvEngine for PostgresKvEngine {
    async fn get(&self, table: &str, key: &str) -> MconfigResult<Option<KvValue>> {
        let quoted = quote_identifier(table);

        let row = match sqlx::query(&format!(
            "select value, generation from {quoted} where key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        {
            Ok(row) => row,
            Err(err) if is_undefined_table(&err) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match row {
            Some(row) => Ok(Some(KvValue {
                value: row.try_get("value")?,
                generation: from_db_generation(row.try_get("generation")?)?,
            })),
            None => Ok(None),
        }
    }

    async fn get_many(
        &self,
        table: &str,
        keys: &[String],
    ) -> MconfigResult<HashMap<String, KvValue>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let quoted = quote_identifier(table);

        let rows = match sqlx::query(&format!(
            "select key, value, generation from {quoted} where key = any($1)"
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(err) if is_undefined_table(&err) => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };

        let mut values = HashMap::with_capacity(rows.len());
        for row in rows {
            values.insert(
                row.try_get("key")?,
                KvValue {
                    value: row.try_get("value")?,
                    generation: from_db_generation(row.try_get("generation")?)?,
                },
            );
        }

        Ok(values)
    }

    async fn put_many(&self, table: &str, writes: Vec<KvWrite>) -> MconfigResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let quoted = self.ensure_table(table).await?;

        let upsert = format!(
            r#"
            insert into {quoted} (key, value, generation)
            values ($1, $2, 0)
            on conflict (key)
            do update set value = excluded.value, generation = {quoted}.generation + 1
            "#
        );
        let insert = format!(
            "insert into {quoted} (key, value, generation) values ($1, $2, 0) on conflict (key) do nothing"
        );
        let update = format!(
            "update {quoted} set value = $2, generation = generation + 1 where key = $1 and generation = $3"
        );

        // Dropping the transaction without commit rolls back every write of the batch.
        let mut transaction = self.pool.begin().await?;
        for write in &writes {
            let result = match write.precondition {
                Precondition::None => {
                    sqlx::query(&upsert)
                        .bind(&write.key)
                        .bind(&write.value)
                        .execute(&mut *transaction)
                        .await?
                }
                Precondition::Absent => {
                    sqlx::query(&insert)
                        .bind(&write.key)
                        .bind(&write.value)
                        .execute(&mut *transaction)
                        .await?
                }
                Precondition::Generation(generation) => {
                    sqlx::query(&update)
                        .bind(&write.key)
                        .bind(&write.value)
                        .bind(to_db_generation(generation)?)
                        .execute(&mut *transaction)
                        .await?
                }
            };

            if result.rows_affected() == 0 {
                return Err(conflict(table, write));
            }
        }
        transaction.commit().await?;

        Ok(())
    }

    async fn delete_many(&self, table: &str, keys: Vec<String>) -> MconfigResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let quoted = quote_identifier(table);

        match sqlx::query(&format!("delete from {quoted} where key = any($1)"))
            .bind(&keys)
            .execute(&self.pool)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_undefined_table(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list_keys(&self, table: &str) -> MconfigResult<Vec<String>> {
        let quoted = quote_identifier(table);

        match sqlx::query_scalar::<_, String>(&format!("select key from {quoted} order by key"))
            .fetch_all(&self.pool)
            .await
        {
            Ok(keys) => Ok(keys),
            Err(err) if is_undefined_table(&err) => Ok(vec![]),
            Err(err) => Err(err.into()),
        }
    }
}
