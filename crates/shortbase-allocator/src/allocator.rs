use crate::error::Error;
use crate::picker::{RandomPicker, ShardPicker};
use shortbase_core::{CompositeKey, RecordStore, ShardId, ShardIndexEntry, MAX_SHARD_COUNT};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, trace};
use typed_builder::TypedBuilder;

/// Configures a [`ShardAllocator`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct AllocatorSettings {
    /// Number of shards in use, in `1..=99`.
    ///
    /// Shrinking this on a live deployment is safe; codes already issued on
    /// higher shards keep resolving.
    #[builder(default = MAX_SHARD_COUNT as usize)]
    pub shard_count: usize,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AllocatorSettings {
    fn validated_shard_count(&self) -> Result<u8, Error> {
        match u8::try_from(self.shard_count) {
            Ok(count) if (1..=MAX_SHARD_COUNT).contains(&count) => Ok(count),
            _ => Err(Error::InvalidShardCount {
                shard_count: self.shard_count,
                max_shard_count: MAX_SHARD_COUNT,
            }),
        }
    }
}

/// Lock-free allocator of `(shard, sequence)` keys.
///
/// Each shard owns one atomic counter. An allocation picks a shard, then
/// tries to bump its counter with a single compare-and-swap. When the swap
/// loses a race, the whole selection starts over on a freshly picked shard
/// instead of retrying the same one, so no caller ever spins on a hot shard.
///
/// Uniqueness is per process. Across processes the store's conditional
/// create is what detects reuse.
pub struct ShardAllocator<P: ShardPicker = RandomPicker> {
    counters: Box<[AtomicU64]>,
    picker: P,
}

impl ShardAllocator<RandomPicker> {
    /// Builds an allocator seeded from the persisted shard index.
    pub async fn seeded<S>(settings: AllocatorSettings, store: &S) -> Result<Self, Error>
    where
        S: RecordStore + ?Sized,
    {
        Self::seeded_with_picker(settings, store, RandomPicker).await
    }
}

impl<P: ShardPicker> ShardAllocator<P> {
    /// Builds an allocator seeded from the persisted shard index, using a
    /// custom shard picker.
    ///
    /// Every shard without an index entry gets one at counter `0`. The
    /// allocator only exists once all shards are seeded, so nothing can be
    /// allocated against a stale zero baseline.
    pub async fn seeded_with_picker<S>(
        settings: AllocatorSettings,
        store: &S,
        picker: P,
    ) -> Result<Self, Error>
    where
        S: RecordStore + ?Sized,
    {
        let shard_count = settings.validated_shard_count()?;
        let mut counters = Vec::with_capacity(usize::from(shard_count));

        for shard in ShardId::all(shard_count) {
            let seed_error = |source| Error::Seed { shard, source };

            let counter = match store.load_index(shard).await.map_err(seed_error)? {
                Some(entry) => entry.counter,
                None => {
                    store
                        .save_index(ShardIndexEntry::new(shard, 0))
                        .await
                        .map_err(seed_error)?;
                    0
                }
            };

            trace!(shard = %shard, counter, "seeded shard counter");
            counters.push(counter);
        }

        info!(shard_count, "shard allocator seeded");
        Self::with_counters(counters, picker)
    }

    /// Builds an allocator from known counter values, one per shard.
    pub fn with_counters(counters: Vec<u64>, picker: P) -> Result<Self, Error> {
        AllocatorSettings {
            shard_count: counters.len(),
        }
        .validated_shard_count()?;

        Ok(Self {
            counters: counters.into_iter().map(AtomicU64::new).collect(),
            picker,
        })
    }

    /// Number of shards this allocator draws from.
    pub fn shard_count(&self) -> u8 {
        // Bounded by `validated_shard_count` at construction.
        self.counters.len() as u8
    }

    /// Reserves the next key.
    ///
    /// Never fails and never blocks. Sequences within a shard are strictly
    /// increasing but may have gaps.
    ///
    /// Assumes the picker eventually lands on a shard below `u64::MAX`. If
    /// every shard it can return is exhausted this spins forever; debug
    /// builds panic instead when all shards are exhausted.
    pub fn allocate(&self) -> CompositeKey {
        loop {
            let shard = self.picker.pick(self.shard_count());
            let counter = &self.counters[shard.index()];

            let current = counter.load(Ordering::Acquire);
            let Some(next) = current.checked_add(1) else {
                debug_assert!(
                    self.counters
                        .iter()
                        .any(|counter| counter.load(Ordering::Relaxed) < u64::MAX),
                    "every shard is exhausted"
                );
                continue;
            };

            if counter
                .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return CompositeKey::new(shard, next);
            }

            trace!(shard = %shard, "lost counter race, picking a new shard");
        }
    }

    /// Returns the in-memory counter of `shard`, or `None` if the shard is
    /// not served by this allocator.
    pub fn current(&self, shard: ShardId) -> Option<u64> {
        self.counters
            .get(shard.index())
            .map(|counter| counter.load(Ordering::Acquire))
    }

    /// Captures the counter of `shard` as an index entry ready to persist.
    pub fn snapshot(&self, shard: ShardId) -> Option<ShardIndexEntry> {
        self.current(shard)
            .map(|counter| ShardIndexEntry::new(shard, counter))
    }
}

impl<P: ShardPicker> std::fmt::Debug for ShardAllocator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardAllocator")
            .field("shard_count", &self.shard_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::FixedPicker;
    use async_trait::async_trait;
    use shortbase_core::store::Result as StoreResult;
    use shortbase_core::{CreateOutcome, ReadRecordStore, ShortRecord, StorageError};
    use shortbase_storage::InMemoryRecordStore;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn shard(n: u8) -> ShardId {
        ShardId::new(n).unwrap()
    }

    #[tokio::test]
    async fn seeding_creates_missing_index_entries() {
        let store = InMemoryRecordStore::new();
        let allocator = ShardAllocator::seeded(AllocatorSettings::default(), &store)
            .await
            .unwrap();

        assert_eq!(allocator.shard_count(), 99);
        for s in ShardId::all(99) {
            let entry = store.load_index(s).await.unwrap().unwrap();
            assert_eq!(entry.counter, 0);
            assert_eq!(allocator.current(s), Some(0));
        }
    }

    #[tokio::test]
    async fn seeding_resumes_from_persisted_counter() {
        let store = InMemoryRecordStore::new();
        store
            .save_index(ShardIndexEntry::new(shard(7), 42))
            .await
            .unwrap();

        let allocator = ShardAllocator::seeded_with_picker(
            AllocatorSettings::default(),
            &store,
            FixedPicker(shard(7)),
        )
        .await
        .unwrap();

        assert_eq!(allocator.current(shard(7)), Some(42));
        for expected in 43..1_043 {
            let key = allocator.allocate();
            assert_eq!(key.shard, shard(7));
            assert_eq!(key.sequence, expected);
        }
    }

    #[tokio::test]
    async fn seeding_respects_shard_count() {
        let store = InMemoryRecordStore::new();
        let settings = AllocatorSettings::builder().shard_count(3).build();
        let allocator = ShardAllocator::seeded(settings, &store).await.unwrap();

        assert_eq!(allocator.shard_count(), 3);
        assert!(store.load_index(shard(3)).await.unwrap().is_none());
        for _ in 0..100 {
            assert!(allocator.allocate().shard.get() < 3);
        }
    }

    #[tokio::test]
    async fn seeding_rejects_invalid_shard_count() {
        let store = InMemoryRecordStore::new();
        for shard_count in [0, 100, 300] {
            let settings = AllocatorSettings::builder().shard_count(shard_count).build();
            let err = ShardAllocator::seeded(settings, &store).await.unwrap_err();
            assert!(matches!(err, Error::InvalidShardCount { .. }));
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl ReadRecordStore for UnreachableStore {
        async fn get(&self, _key: &CompositeKey) -> StoreResult<Option<ShortRecord>> {
            Err(StorageError::Unavailable("down".to_string()))
        }
    }

    #[async_trait]
    impl RecordStore for UnreachableStore {
        async fn bootstrap(&self) -> StoreResult<()> {
            Err(StorageError::Unavailable("down".to_string()))
        }

        async fn try_create(
            &self,
            _key: &CompositeKey,
            _record: ShortRecord,
        ) -> StoreResult<CreateOutcome> {
            Err(StorageError::Unavailable("down".to_string()))
        }

        async fn load_index(&self, _shard: ShardId) -> StoreResult<Option<ShardIndexEntry>> {
            Err(StorageError::Unavailable("down".to_string()))
        }

        async fn save_index(&self, _entry: ShardIndexEntry) -> StoreResult<()> {
            Err(StorageError::Unavailable("down".to_string()))
        }

        async fn ping(&self) -> StoreResult<()> {
            Err(StorageError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn seeding_fails_when_store_is_unreachable() {
        let err = ShardAllocator::seeded(AllocatorSettings::default(), &UnreachableStore)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Seed {
                source: StorageError::Unavailable(_),
                ..
            }
        ));
    }

    #[test]
    fn allocate_increments_picked_shard() {
        let allocator = ShardAllocator::with_counters(vec![0; 10], FixedPicker(shard(4))).unwrap();

        let first = allocator.allocate();
        let second = allocator.allocate();

        assert_eq!(first, CompositeKey::new(shard(4), 1));
        assert_eq!(second, CompositeKey::new(shard(4), 2));
        assert_eq!(allocator.current(shard(4)), Some(2));
        assert_eq!(allocator.current(shard(3)), Some(0));
    }

    #[test]
    fn current_is_none_for_unserved_shard() {
        let allocator = ShardAllocator::with_counters(vec![0; 2], RandomPicker).unwrap();
        assert_eq!(allocator.current(shard(5)), None);
        assert!(allocator.snapshot(shard(5)).is_none());
    }

    #[test]
    fn snapshot_reflects_counter() {
        let allocator = ShardAllocator::with_counters(vec![0, 9], FixedPicker(shard(1))).unwrap();
        allocator.allocate();

        let entry = allocator.snapshot(shard(1)).unwrap();
        assert_eq!(entry.shard, shard(1));
        assert_eq!(entry.counter, 10);
    }

    #[test]
    fn exhausted_shard_is_skipped() {
        struct Alternating(std::sync::atomic::AtomicUsize);

        impl ShardPicker for Alternating {
            fn pick(&self, _shard_count: u8) -> ShardId {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                ShardId::new((n % 2) as u8).unwrap()
            }
        }

        let allocator = ShardAllocator::with_counters(
            vec![u64::MAX, 0],
            Alternating(std::sync::atomic::AtomicUsize::new(0)),
        )
        .unwrap();

        assert_eq!(allocator.allocate(), CompositeKey::new(shard(1), 1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "every shard is exhausted")]
    fn fully_exhausted_allocator_panics_in_debug() {
        let allocator =
            ShardAllocator::with_counters(vec![u64::MAX, u64::MAX], RandomPicker).unwrap();

        allocator.allocate();
    }

    #[test]
    fn concurrent_allocations_never_repeat() {
        const THREADS: usize = 16;
        const PER_THREAD: usize = 100_000 / THREADS;

        let allocator = Arc::new(ShardAllocator::with_counters(vec![0; 99], RandomPicker).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| allocator.allocate())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(THREADS * PER_THREAD);
        for handle in handles {
            for key in handle.join().unwrap() {
                assert!(seen.insert(key), "duplicate key {key}");
            }
        }

        assert_eq!(seen.len(), THREADS * PER_THREAD);
        let total: u64 = ShardId::all(99)
            .filter_map(|s| allocator.current(s))
            .sum();
        assert_eq!(total, (THREADS * PER_THREAD) as u64);
    }

    #[test]
    fn concurrent_allocations_on_one_shard_are_dense() {
        let allocator =
            Arc::new(ShardAllocator::with_counters(vec![0; 99], FixedPicker(shard(7))).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || {
                    (0..1_000).map(|_| allocator.allocate().sequence).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut sequences: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        sequences.sort_unstable();

        assert_eq!(sequences, (1..=8_000).collect::<Vec<_>>());
    }
}
