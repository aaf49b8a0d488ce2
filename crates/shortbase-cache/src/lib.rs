//! Resolution cache backends.
//!
//! All backends cache found redirects only. Misses always go back to the
//! record store.

pub mod moka;
pub mod null;
pub mod redis;

pub use self::moka::{CacheSettings, MokaResolutionCache};
pub use self::null::NullResolutionCache;
pub use self::redis::RedisResolutionCache;
pub use shortbase_core::cache::{ResolutionCache, Result};
pub use shortbase_core::CacheError;
