//! Cache Layer (spec §4.3): ephemeral key-value store with TTL. Optional —
//! the Resolver must produce correct answers with no cache wired in at all.
//! `get` returns `None` on miss *and* on unavailability; `set` is best-effort.

pub mod null;
pub mod redis;

use async_trait::async_trait;

use crate::domain::CacheEntry;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;

    /// Best-effort write; failures are logged, never surfaced.
    async fn set(&self, key: &str, value: CacheEntry, ttl_seconds: u64);
}
