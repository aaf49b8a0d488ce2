//! Core types and traits for the Shortbase short-code engine.
//!
//! This crate holds the codec, the composite key model and the contracts
//! shared by the allocator, the storage backends, the resolution caches and
//! the converter service.

pub mod cache;
pub mod codec;
pub mod converter;
pub mod error;
pub mod key;
pub mod shortcode;
pub mod store;

pub use cache::ResolutionCache;
pub use converter::{Converter, EncodeParams};
pub use error::{CacheError, ConvertError, CoreError, StorageError};
pub use key::{CompositeKey, ShardId, MAX_SHARD_COUNT};
pub use shortcode::ShortCode;
pub use store::{
    CreateOutcome, ReadRecordStore, RecordStore, Redirect, ShardIndexEntry, ShortRecord,
};
