//! Sharded sequence allocation.
//!
//! A [`ShardAllocator`] owns one atomic counter per shard, seeded from the
//! persisted shard index. Allocation is lock-free; the matching
//! [`IndexReconciler`] writes counters back to the store in the background.

mod allocator;
pub mod error;
pub mod picker;
mod reconciler;

pub use allocator::{AllocatorSettings, ShardAllocator};
pub use error::Error;
pub use picker::{FixedPicker, RandomPicker, ShardPicker};
pub use reconciler::IndexReconciler;
