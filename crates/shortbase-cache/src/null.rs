use async_trait::async_trait;
use shortbase_core::cache::{ResolutionCache, Result};
use shortbase_core::{Redirect, ShortCode};

/// A cache that stores nothing. Every lookup goes to the record store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolutionCache;

#[async_trait]
impl ResolutionCache for NullResolutionCache {
    async fn get(&self, _code: &ShortCode) -> Result<Option<Redirect>> {
        Ok(None)
    }

    async fn set(&self, _code: &ShortCode, _redirect: &Redirect) -> Result<()> {
        Ok(())
    }

    async fn del(&self, _code: &ShortCode) -> Result<()> {
        Ok(())
    }
}
