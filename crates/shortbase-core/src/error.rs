use thiserror::Error;

/// Errors related to the core functionality of the short-code engine.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid composite key: {0}")]
    InvalidKey(String),
    #[error("shard {shard} out of range; expected 0..{max}")]
    ShardOutOfRange { shard: u32, max: u8 },
}

/// Failures of a durable store call other than a duplicate-key conflict.
///
/// Conflicts are not errors: they are reported as
/// [`CreateOutcome::Conflict`](crate::store::CreateOutcome::Conflict).
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
    /// The read-through fetch behind the cache failed.
    #[error("cache source failed: {0}")]
    Source(#[from] StorageError),
}

/// Errors surfaced by the converter to its transport layer.
///
/// Not-found and exhausted allocation are not errors; they are reported as
/// `Ok(None)` by [`Converter`](crate::converter::Converter).
#[derive(Debug, Clone, Error)]
pub enum ConvertError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
