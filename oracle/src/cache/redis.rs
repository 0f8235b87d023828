use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;

use crate::domain::CacheEntry;
use crate::error::degraded;

use super::Cache;

/// Cache operation timeout (spec §5): on timeout, treat as a miss.
const CACHE_TIMEOUT: Duration = Duration::from_millis(500);

/// Redis-backed [`Cache`]. Holds a [`redis::aio::ConnectionManager`], which
/// reconnects transparently — the shared, thread-safe handle spec §5
/// describes ("no per-call connection acquisition").
pub struct RedisCache {
    manager: redis::aio::ConnectionManager,
}

impl RedisCache {
    pub async fn connect(uri: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(uri)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut conn = self.manager.clone();
        let fetch = async {
            let raw: Option<String> = conn.get(key).await?;
            Ok::<_, redis::RedisError>(raw)
        };

        match timeout(CACHE_TIMEOUT, fetch).await {
            Ok(Ok(Some(raw))) => serde_json::from_str(&raw).ok(),
            Ok(Ok(None)) => None,
            Ok(Err(e)) => {
                degraded("cache.get", e);
                None
            }
            Err(_) => {
                degraded("cache.get", "timed out");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: CacheEntry, ttl_seconds: u64) {
        let mut conn = self.manager.clone();
        let Ok(raw) = serde_json::to_string(&value) else {
            return;
        };

        let write = async move { conn.set_ex::<_, _, ()>(key, raw, ttl_seconds).await };

        match timeout(CACHE_TIMEOUT, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => degraded("cache.set", e),
            Err(_) => degraded("cache.set", "timed out"),
        }
    }
}
