use crate::error::StorageError;
use crate::key::{CompositeKey, ShardId};
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored short-code record.
///
/// Created exactly once per composite key and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortRecord {
    /// The target the short code redirects to.
    pub target: String,
    /// Redirect permanently (301/308) rather than temporarily (302/307).
    pub permanent: bool,
    /// Ask clients to keep the request method (307/308).
    pub preserve_method: bool,
    /// Stored for compatibility; nothing increments it yet.
    pub hit_count: u64,
    pub track_hits: bool,
    pub created_at: Timestamp,
}

/// The resolved view of a record, as returned to the transport layer and
/// held by resolution caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub target: String,
    pub permanent: bool,
    pub preserve_method: bool,
}

impl From<ShortRecord> for Redirect {
    fn from(record: ShortRecord) -> Self {
        Self {
            target: record.target,
            permanent: record.permanent,
            preserve_method: record.preserve_method,
        }
    }
}

/// Durable mirror of a shard's last-known counter.
///
/// Only used to reseed in-memory counters after a restart; it may lag the
/// true high-water mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardIndexEntry {
    pub shard: ShardId,
    pub counter: u64,
    pub updated_at: Timestamp,
}

impl ShardIndexEntry {
    pub fn new(shard: ShardId, counter: u64) -> Self {
        Self {
            shard,
            counter,
            updated_at: Timestamp::now(),
        }
    }
}

/// Outcome of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The record was written.
    Created,
    /// A record already exists under the key; nothing was written.
    Conflict,
}

/// A read-only view of a record store.
///
/// Resolvers only need this half of [`RecordStore`].
#[async_trait]
pub trait ReadRecordStore: Send + Sync + 'static {
    /// Retrieves the record stored under `key`.
    /// Returns `None` if there is none.
    async fn get(&self, key: &CompositeKey) -> Result<Option<ShortRecord>>;
}

#[async_trait]
pub trait RecordStore: ReadRecordStore {
    /// Creates tables or namespaces. Safe to call repeatedly.
    async fn bootstrap(&self) -> Result<()>;

    /// Writes `record` under `key` only if no record exists there.
    async fn try_create(&self, key: &CompositeKey, record: ShortRecord) -> Result<CreateOutcome>;

    /// Reads the persisted counter of `shard`, if any.
    async fn load_index(&self, shard: ShardId) -> Result<Option<ShardIndexEntry>>;

    /// Upserts a shard index entry.
    ///
    /// Implementations never lower a stored counter: a stale write racing a
    /// newer one leaves the larger value in place.
    async fn save_index(&self, entry: ShardIndexEntry) -> Result<()>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()>;
}
