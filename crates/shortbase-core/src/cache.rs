use crate::error::CacheError;
use crate::shortcode::ShortCode;
use crate::store::Redirect;
use async_trait::async_trait;
use std::future::Future;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A read-through cache of resolved short codes.
///
/// Keyed by the externally visible [`ShortCode`]. Only found records are
/// cached: a miss is never stored, so a code that does not exist yet is
/// looked up again next time.
#[async_trait]
pub trait ResolutionCache: Send + Sync + 'static {
    /// Get a redirect from cache.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get(&self, code: &ShortCode) -> Result<Option<Redirect>>;

    /// Store a redirect in cache.
    async fn set(&self, code: &ShortCode, redirect: &Redirect) -> Result<()>;

    /// Remove a redirect from cache.
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Get a redirect from cache, fetching and backfilling it on a miss.
    ///
    /// `Ok(None)` from `fetch` is passed through and not cached.
    async fn get_or_compute<F, Fut>(&self, code: &ShortCode, fetch: F) -> Result<Option<Redirect>>
    where
        F: FnOnce(&ShortCode) -> Fut + Send,
        Fut: Future<Output = Result<Option<Redirect>>> + Send,
    {
        match self.get(code).await? {
            Some(redirect) => Ok(Some(redirect)),
            None => {
                let redirect = fetch(code).await?;
                if let Some(ref value) = redirect {
                    self.set(code, value).await?;
                }
                Ok(redirect)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct TestCache {
        items: Mutex<HashMap<String, Redirect>>,
    }

    #[async_trait]
    impl ResolutionCache for TestCache {
        async fn get(&self, code: &ShortCode) -> Result<Option<Redirect>> {
            let items = self.items.lock().await;
            Ok(items.get(code.as_str()).cloned())
        }

        async fn set(&self, code: &ShortCode, redirect: &Redirect) -> Result<()> {
            let mut items = self.items.lock().await;
            items.insert(code.as_str().to_string(), redirect.clone());
            Ok(())
        }

        async fn del(&self, code: &ShortCode) -> Result<()> {
            let mut items = self.items.lock().await;
            items.remove(code.as_str());
            Ok(())
        }
    }

    fn redirect(target: &str) -> Redirect {
        Redirect {
            target: target.to_string(),
            permanent: false,
            preserve_method: true,
        }
    }

    #[tokio::test]
    async fn get_or_compute_returns_cached_value_without_fetch() {
        let cache = TestCache::default();
        let code = ShortCode::new_unchecked("abc123");
        let existing = redirect("https://cached.example");
        cache.set(&code, &existing).await.unwrap();

        let fetch_calls = Arc::new(AtomicUsize::new(0));
        let result = cache
            .get_or_compute(&code, {
                let fetch_calls = Arc::clone(&fetch_calls);
                move |_| async move {
                    fetch_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(redirect("https://fetched.example")))
                }
            })
            .await
            .unwrap();

        assert_eq!(result, Some(existing));
        assert_eq!(fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_or_compute_fetches_and_backfills_on_cache_miss() {
        let cache = TestCache::default();
        let code = ShortCode::new_unchecked("miss123");
        let fetched = redirect("https://fetched.example");

        let result = cache
            .get_or_compute(&code, |_code| async { Ok(Some(fetched.clone())) })
            .await
            .unwrap();

        assert_eq!(result, Some(fetched.clone()));
        assert_eq!(cache.get(&code).await.unwrap(), Some(fetched));
    }

    #[tokio::test]
    async fn get_or_compute_does_not_cache_misses() {
        let cache = TestCache::default();
        let code = ShortCode::new_unchecked("nope123");

        let result = cache
            .get_or_compute(&code, |_code| async { Ok(None) })
            .await
            .unwrap();

        assert_eq!(result, None);
        assert!(cache.items.lock().await.is_empty());
    }
}
