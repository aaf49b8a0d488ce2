use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shortbase_core::store::{
    CreateOutcome, ReadRecordStore, RecordStore, Result, ShardIndexEntry, ShortRecord,
};
use shortbase_core::{CompositeKey, ShardId};

/// In-memory record store backed by [`DashMap`].
///
/// Records and shard index entries live in separate maps. The conditional
/// create holds the map's bucket lock between the existence check and the
/// insert, so two concurrent creates on the same key never both succeed.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: DashMap<CompositeKey, ShortRecord>,
    index: DashMap<ShardId, ShardIndexEntry>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            index: DashMap::new(),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ReadRecordStore for InMemoryRecordStore {
    async fn get(&self, key: &CompositeKey) -> Result<Option<ShortRecord>> {
        Ok(self.records.get(key).map(|record| record.clone()))
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn bootstrap(&self) -> Result<()> {
        Ok(())
    }

    async fn try_create(&self, key: &CompositeKey, record: ShortRecord) -> Result<CreateOutcome> {
        match self.records.entry(*key) {
            Entry::Occupied(_) => Ok(CreateOutcome::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn load_index(&self, shard: ShardId) -> Result<Option<ShardIndexEntry>> {
        Ok(self.index.get(&shard).map(|entry| *entry))
    }

    async fn save_index(&self, entry: ShardIndexEntry) -> Result<()> {
        self.index
            .entry(entry.shard)
            .and_modify(|stored| {
                stored.counter = stored.counter.max(entry.counter);
                stored.updated_at = entry.updated_at;
            })
            .or_insert(entry);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
