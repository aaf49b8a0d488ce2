use async_trait::async_trait;
use moka::future::Cache;
use shortbase_core::cache::{ResolutionCache, Result};
use shortbase_core::{CacheError, Redirect, ShortCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

/// Sizing and expiry of a [`MokaResolutionCache`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct CacheSettings {
    /// Maximum number of entries the cache can hold.
    #[builder(default = 10_000)]
    pub max_capacity: u64,
    /// Entries not read for this long are evicted.
    #[builder(default = Duration::from_secs(600))]
    pub time_to_idle: Duration,
    /// Entries are evicted this long after insertion, read or not.
    #[builder(default = Duration::from_secs(3600))]
    pub time_to_live: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Why a single-flight load produced no value to cache.
#[derive(Debug)]
enum Uncached {
    Missing,
    Failed(CacheError),
}

/// An in-process resolution cache using Moka.
///
/// Entries expire on whichever comes first of the idle and live timeouts.
/// Concurrent lookups of the same missing code share a single fetch.
#[derive(Debug, Clone)]
pub struct MokaResolutionCache {
    cache: Cache<String, Redirect>,
}

impl MokaResolutionCache {
    /// Creates a cache with default settings.
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.max_capacity)
            .time_to_idle(settings.time_to_idle)
            .time_to_live(settings.time_to_live)
            .build();
        Self { cache }
    }

    /// Approximate number of cached entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CacheSettings> for MokaResolutionCache {
    fn from(settings: CacheSettings) -> Self {
        Self::with_settings(settings)
    }
}

#[async_trait]
impl ResolutionCache for MokaResolutionCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<Redirect>> {
        match self.cache.get(code.as_str()).await {
            Some(redirect) => {
                trace!(code = %code, "cache hit in moka");
                Ok(Some(redirect))
            }
            None => {
                trace!(code = %code, "cache miss in moka");
                Ok(None)
            }
        }
    }

    async fn set(&self, code: &ShortCode, redirect: &Redirect) -> Result<()> {
        self.cache
            .insert(code.as_str().to_string(), redirect.clone())
            .await;
        trace!(code = %code, "cached redirect in moka");
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.cache.invalidate(code.as_str()).await;
        Ok(())
    }

    async fn get_or_compute<F, Fut>(&self, code: &ShortCode, fetch: F) -> Result<Option<Redirect>>
    where
        F: FnOnce(&ShortCode) -> Fut + Send,
        Fut: Future<Output = Result<Option<Redirect>>> + Send,
    {
        // try_get_with coalesces concurrent loads of one key. A miss is
        // surfaced as an init error so that it is never inserted.
        let result = self
            .cache
            .try_get_with(code.as_str().to_string(), async {
                trace!(code = %code, "single-flight fetch");
                match fetch(code).await {
                    Ok(Some(redirect)) => Ok(redirect),
                    Ok(None) => Err(Uncached::Missing),
                    Err(err) => Err(Uncached::Failed(err)),
                }
            })
            .await;

        match result {
            Ok(redirect) => Ok(Some(redirect)),
            Err(err) => match err.as_ref() {
                Uncached::Missing => {
                    debug!(code = %code, "code not found; not caching");
                    Ok(None)
                }
                Uncached::Failed(err) => Err(err.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortbase_core::StorageError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn redirect(target: &str) -> Redirect {
        Redirect {
            target: target.to_string(),
            permanent: false,
            preserve_method: true,
        }
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn get_set_del() {
        let cache = MokaResolutionCache::new();
        let c = code("abc123");
        let value = redirect("https://example.com");

        assert!(cache.get(&c).await.unwrap().is_none());

        cache.set(&c, &value).await.unwrap();
        assert_eq!(cache.get(&c).await.unwrap(), Some(value));

        cache.del(&c).await.unwrap();
        assert!(cache.get(&c).await.unwrap().is_none());

        // Deleting a missing key is fine.
        cache.del(&c).await.unwrap();
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MokaResolutionCache::with_settings(
            CacheSettings::builder()
                .max_capacity(100)
                .time_to_live(Duration::from_millis(50))
                .build(),
        );
        let c = code("abc123");

        cache.set(&c, &redirect("https://example.com")).await.unwrap();
        assert!(cache.get(&c).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn idle_entries_expire() {
        let cache: MokaResolutionCache = CacheSettings::builder()
            .time_to_idle(Duration::from_millis(50))
            .build()
            .into();
        let c = code("abc123");

        cache.set(&c, &redirect("https://example.com")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let cache = MokaResolutionCache::new();
        let c = code("abc123");
        let counter = AtomicUsize::new(0);
        let fetches = &counter;

        for _ in 0..3 {
            let result = cache
                .get_or_compute(&c, |_| async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert!(result.is_none());
        }

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(cache.get(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn found_values_are_backfilled() {
        let cache = MokaResolutionCache::new();
        let c = code("abc123");
        let value = redirect("https://example.com");

        let result = cache
            .get_or_compute(&c, |_| async { Ok(Some(redirect("https://example.com"))) })
            .await
            .unwrap();

        assert_eq!(result, Some(value.clone()));
        assert_eq!(cache.get(&c).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn single_flight_prevents_concurrent_fetch() {
        let cache = MokaResolutionCache::new();
        let fetch_count = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..10 {
            let cache = cache.clone();
            let count = fetch_count.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&code("abc123"), |_code| async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        count.fetch_add(1, Ordering::SeqCst);
                        Ok(Some(redirect("https://example.com")))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().unwrap().is_some());
        }

        assert_eq!(fetch_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_error_propagates_and_is_not_cached() {
        let cache = MokaResolutionCache::new();
        let c = code("abc123");

        let err = cache
            .get_or_compute(&c, |_code| async {
                Err(CacheError::Source(StorageError::Timeout(
                    "simulated timeout".to_string(),
                )))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::Source(StorageError::Timeout(_))));
        assert!(cache.get(&c).await.unwrap().is_none());
    }
}
