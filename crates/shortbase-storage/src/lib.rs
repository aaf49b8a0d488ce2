//! Record store backends.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRecordStore;
pub use mysql::MySqlRecordStore;
pub use shortbase_core::store::{
    CreateOutcome, ReadRecordStore, RecordStore, Result, ShardIndexEntry, ShortRecord,
};
pub use shortbase_core::StorageError;
