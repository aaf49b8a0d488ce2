use async_trait::async_trait;
use jiff::Timestamp;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use shortbase_core::cache::{ResolutionCache, Result};
use shortbase_core::{CacheError, Redirect, ShortCode};
use std::time::Duration;
use tracing::{debug, trace, warn};

const DEFAULT_KEY_PREFIX: &str = "sb:code:";
const DEFAULT_IDLE: Duration = Duration::from_secs(600);
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// A Redis-backed resolution cache shared between instances.
///
/// Redirects are stored as JSON under `{prefix}{code}` together with the
/// time they were cached. Every hit pushes the key's expiry out by the idle
/// window, but never past `cached_at + ttl`.
#[derive(Debug, Clone)]
pub struct RedisResolutionCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
    idle: Duration,
    ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedRedirect {
    redirect: Redirect,
    cached_at: Timestamp,
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        CacheError::Timeout(message)
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

/// Seconds an entry cached at `cached_at` may still live at `now`, or `None`
/// once its absolute lifetime is used up.
fn remaining_secs(
    cached_at: Timestamp,
    now: Timestamp,
    idle_secs: u64,
    ttl_secs: u64,
) -> Option<u64> {
    let age = u64::try_from(now.duration_since(cached_at).as_secs()).unwrap_or(0);
    ttl_secs
        .checked_sub(age)
        .filter(|left| *left > 0)
        .map(|left| left.min(idle_secs))
}

impl RedisResolutionCache {
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            idle: DEFAULT_IDLE,
            ttl: DEFAULT_TTL,
        }
    }

    /// Opens a multiplexed connection to `url` and wraps it.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Initialization(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;
        Ok(Self::new(conn))
    }

    /// Uses `key_prefix` (e.g. `"myapp:code:"`) instead of the default.
    pub fn with_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Sets the sliding expiry window. Rounded down to whole seconds, with a
    /// floor of one second.
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    /// Sets the absolute lifetime of written entries. Rounded down to whole
    /// seconds, with a floor of one second.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }

    fn idle_secs(&self) -> u64 {
        self.idle.as_secs().max(1)
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

#[async_trait]
impl ResolutionCache for RedisResolutionCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<Redirect>> {
        let key = self.cache_key(code);

        let mut conn = self.conn.clone();
        let cached = match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(cached)) => cached,
            Ok(None) => {
                trace!(code = %code, "cache miss in redis");
                return Ok(None);
            }
            Err(e) => {
                warn!(code = %code, error = %e, "redis error on get");
                return Err(map_redis_error("failed to fetch value from Redis", e));
            }
        };

        let entry = serde_json::from_str::<CachedRedirect>(&cached).map_err(|e| {
            warn!(code = %code, error = %e, "failed to deserialize cached redirect");
            CacheError::InvalidData(format!("invalid cached value for key '{key}': {e}"))
        })?;

        let Some(expiry) = remaining_secs(
            entry.cached_at,
            Timestamp::now(),
            self.idle_secs(),
            self.ttl_secs(),
        ) else {
            trace!(code = %code, "cached redirect outlived its ttl");
            self.del(code).await?;
            return Ok(None);
        };

        conn.expire::<_, ()>(&key, i64::try_from(expiry).unwrap_or(i64::MAX))
            .await
            .map_err(|e| map_redis_error("failed to refresh expiry in Redis", e))?;
        trace!(code = %code, expiry_secs = expiry, "cache hit in redis");
        Ok(Some(entry.redirect))
    }

    async fn set(&self, code: &ShortCode, redirect: &Redirect) -> Result<()> {
        let key = self.cache_key(code);
        let entry = CachedRedirect {
            redirect: redirect.clone(),
            cached_at: Timestamp::now(),
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| CacheError::Serialization(format!("failed to serialize redirect: {e}")))?;
        let expiry = self.idle_secs().min(self.ttl_secs());

        let mut conn = self.conn.clone();
        match conn.set_ex::<_, _, ()>(&key, json, expiry).await {
            Ok(()) => {
                debug!(code = %code, expiry_secs = expiry, "cached redirect in redis");
                Ok(())
            }
            Err(e) => {
                warn!(code = %code, error = %e, "failed to cache redirect in redis");
                Err(map_redis_error("failed to write value to Redis", e))
            }
        }
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);

        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| map_redis_error("failed to delete value from Redis", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn at(secs: i64) -> Timestamp {
        Timestamp::UNIX_EPOCH + SignedDuration::from_secs(secs)
    }

    #[test]
    fn fresh_entries_get_the_idle_window() {
        assert_eq!(remaining_secs(at(1000), at(1000), 600, 3600), Some(600));
        assert_eq!(remaining_secs(at(1000), at(1500), 600, 3600), Some(600));
    }

    #[test]
    fn idle_window_is_capped_by_ttl() {
        assert_eq!(remaining_secs(at(1000), at(4000), 600, 3600), Some(600));
        assert_eq!(remaining_secs(at(1000), at(4500), 600, 3600), Some(100));
    }

    #[test]
    fn entries_past_ttl_have_no_lifetime_left() {
        assert_eq!(remaining_secs(at(1000), at(4600), 600, 3600), None);
        assert_eq!(remaining_secs(at(1000), at(9000), 600, 3600), None);
    }

    #[test]
    fn clock_skew_counts_as_fresh() {
        assert_eq!(remaining_secs(at(1000), at(900), 600, 3600), Some(600));
    }
}
