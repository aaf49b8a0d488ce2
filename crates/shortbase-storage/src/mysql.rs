use async_trait::async_trait;
use jiff::Timestamp;
use shortbase_core::error::StorageError;
use shortbase_core::store::{
    CreateOutcome, ReadRecordStore, RecordStore, Result, ShardIndexEntry, ShortRecord,
};
use shortbase_core::{CompositeKey, ShardId};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

const SCHEMA: [(&str, &str); 2] = [
    (
        "short_records",
        include_str!("../ddl/mysql/short_records.sql"),
    ),
    ("shard_index", include_str!("../ddl/mysql/shard_index.sql")),
];

/// MySQL implementation of the record store contract.
///
/// Records are keyed by `(shard, sequence)`; the primary key is what makes
/// [`RecordStore::try_create`] conditional. Timestamps are stored as Unix
/// seconds.
#[derive(Debug, Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn parse_shard(shard: u8) -> Result<ShardId> {
    ShardId::new(shard).map_err(|e| StorageError::InvalidData(e.to_string()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn record_from_row(row: &MySqlRow) -> Result<ShortRecord> {
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ShortRecord {
        target: row.try_get("target").map_err(map_sqlx_error)?,
        permanent: row.try_get("permanent").map_err(map_sqlx_error)?,
        preserve_method: row.try_get("preserve_method").map_err(map_sqlx_error)?,
        hit_count: row.try_get("hit_count").map_err(map_sqlx_error)?,
        track_hits: row.try_get("track_hits").map_err(map_sqlx_error)?,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}

#[async_trait]
impl ReadRecordStore for MySqlRecordStore {
    async fn get(&self, key: &CompositeKey) -> Result<Option<ShortRecord>> {
        let row = sqlx::query(
            r#"
            SELECT target, permanent, preserve_method, hit_count, track_hits, created_at
            FROM short_records
            WHERE shard = ?
              AND sequence = ?
            LIMIT 1
            "#,
        )
        .bind(key.shard.get())
        .bind(key.sequence)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn bootstrap(&self) -> Result<()> {
        for (table, ddl) in SCHEMA {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            debug!(table, "ensured mysql table");
        }
        Ok(())
    }

    async fn try_create(&self, key: &CompositeKey, record: ShortRecord) -> Result<CreateOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_records
                (shard, sequence, target, permanent, preserve_method, hit_count, track_hits, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(key.shard.get())
        .bind(key.sequence)
        .bind(record.target)
        .bind(record.permanent)
        .bind(record.preserve_method)
        .bind(record.hit_count)
        .bind(record.track_hits)
        .bind(record.created_at.as_second())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn load_index(&self, shard: ShardId) -> Result<Option<ShardIndexEntry>> {
        let row = sqlx::query(
            r#"
            SELECT shard, counter, updated_at
            FROM shard_index
            WHERE shard = ?
            LIMIT 1
            "#,
        )
        .bind(shard.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_shard: u8 = row.try_get("shard").map_err(map_sqlx_error)?;
        let updated_at: i64 = row.try_get("updated_at").map_err(map_sqlx_error)?;

        Ok(Some(ShardIndexEntry {
            shard: parse_shard(stored_shard)?,
            counter: row.try_get("counter").map_err(map_sqlx_error)?,
            updated_at: parse_timestamp("updated_at", updated_at)?,
        }))
    }

    async fn save_index(&self, entry: ShardIndexEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shard_index (shard, counter, updated_at)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE
                counter = GREATEST(counter, VALUES(counter)),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(entry.shard.get())
        .bind(entry.counter)
        .bind(entry.updated_at.as_second())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
