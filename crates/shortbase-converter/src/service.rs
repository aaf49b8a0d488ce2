use crate::error::StartupError;
use async_trait::async_trait;
use jiff::Timestamp;
use shortbase_allocator::{AllocatorSettings, IndexReconciler, ShardAllocator};
use shortbase_core::{
    CacheError, CompositeKey, ConvertError, Converter, CreateOutcome, EncodeParams, RecordStore,
    Redirect, ResolutionCache, ShortCode, ShortRecord, StorageError,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Allocate-and-create cycles per [`Converter::encode_new`] call.
pub const MAX_ATTEMPTS: usize = 3;

/// Concrete [`Converter`] over a record store and a resolution cache.
///
/// Cloning is cheap; clones share the allocator, the store and the cache.
pub struct ConverterService<S: ?Sized, C> {
    store: Arc<S>,
    cache: Arc<C>,
    allocator: Arc<ShardAllocator>,
    reconciler: IndexReconciler,
}

impl<S: ?Sized, C> Clone for ConverterService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            allocator: Arc::clone(&self.allocator),
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<S, C> ConverterService<S, C>
where
    S: RecordStore + ?Sized,
    C: ResolutionCache,
{
    /// Assembles a service from already running parts.
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        allocator: Arc<ShardAllocator>,
        reconciler: IndexReconciler,
    ) -> Self {
        Self {
            store,
            cache,
            allocator,
            reconciler,
        }
    }

    /// Bootstraps the store, seeds the allocator from the shard index and
    /// spawns the index reconciler.
    ///
    /// The returned handle completes once the service and all its clones
    /// are dropped and pending index writes are flushed.
    pub async fn start(
        store: Arc<S>,
        cache: Arc<C>,
        settings: AllocatorSettings,
    ) -> Result<(Self, JoinHandle<()>), StartupError> {
        store.bootstrap().await.map_err(StartupError::Bootstrap)?;
        info!("record store bootstrapped");

        let allocator = Arc::new(ShardAllocator::seeded(settings, store.as_ref()).await?);
        let (reconciler, handle) =
            IndexReconciler::spawn(Arc::clone(&allocator), Arc::clone(&store));

        Ok((Self::new(store, cache, allocator, reconciler), handle))
    }

    pub fn allocator(&self) -> &ShardAllocator {
        &self.allocator
    }

    async fn fetch(&self, key: CompositeKey) -> Result<Option<Redirect>, StorageError> {
        Ok(self.store.get(&key).await?.map(Redirect::from))
    }

    async fn lookup(
        &self,
        code: &ShortCode,
        key: CompositeKey,
    ) -> Result<Option<Redirect>, StorageError> {
        let store = Arc::clone(&self.store);
        let cached = self
            .cache
            .get_or_compute(code, move |_| async move {
                Ok::<_, CacheError>(store.get(&key).await?.map(Redirect::from))
            })
            .await;

        match cached {
            Ok(redirect) => Ok(redirect),
            Err(CacheError::Source(err)) => Err(err),
            Err(err) => {
                warn!(code = %code, error = %err, "resolution cache failed; reading store");
                self.fetch(key).await
            }
        }
    }
}

#[async_trait]
impl<S, C> Converter for ConverterService<S, C>
where
    S: RecordStore + ?Sized,
    C: ResolutionCache,
{
    async fn encode_new(&self, params: EncodeParams) -> Result<Option<ShortCode>, ConvertError> {
        if params.target.trim().is_empty() {
            return Err(ConvertError::Validation("target must not be empty".to_string()));
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let key = self.allocator.allocate();
            let record = ShortRecord {
                target: params.target.clone(),
                permanent: params.permanent,
                preserve_method: params.preserve_method,
                hit_count: 0,
                track_hits: params.track_hits,
                created_at: Timestamp::now(),
            };

            match self.store.try_create(&key, record).await? {
                CreateOutcome::Created => {
                    self.reconciler.notify(key.shard);
                    let code = ShortCode::from_key(&key);
                    debug!(code = %code, key = %key, attempt, "created short code");
                    return Ok(Some(code));
                }
                CreateOutcome::Conflict => {
                    debug!(key = %key, attempt, "composite key already taken; retrying");
                }
            }
        }

        warn!(attempts = MAX_ATTEMPTS, "allocation budget exhausted");
        Ok(None)
    }

    async fn resolve(&self, code: &str) -> Result<Option<Redirect>, ConvertError> {
        let Ok(code) = ShortCode::new(code) else {
            trace!(code, "malformed short code");
            return Ok(None);
        };
        let Ok(key) = code.to_key() else {
            trace!(code = %code, "short code does not decode to a key");
            return Ok(None);
        };

        let redirect = self.lookup(&code, key).await?;
        if redirect.is_none() {
            trace!(code = %code, key = %key, "short code not found");
        }
        Ok(redirect)
    }
}
