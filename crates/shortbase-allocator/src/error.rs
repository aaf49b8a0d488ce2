use shortbase_core::{ShardId, StorageError};
use thiserror::Error;

/// Errors returned while building or seeding a [`ShardAllocator`](crate::ShardAllocator).
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid shard count {shard_count}; expected 1..={max_shard_count}")]
    InvalidShardCount { shard_count: usize, max_shard_count: u8 },
    #[error("failed to seed shard {shard}: {source}")]
    Seed {
        shard: ShardId,
        #[source]
        source: StorageError,
    },
}
