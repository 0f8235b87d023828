use async_trait::async_trait;

use crate::domain::CacheEntry;

use super::Cache;

/// Wired in when `CACHE_URI` is unset. Every call is a pure no-op — the
/// degraded-mode contract as a concrete type rather than an `Option<Cache>`
/// threaded through every call site.
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    async fn set(&self, _key: &str, _value: CacheEntry, _ttl_seconds: u64) {}
}
