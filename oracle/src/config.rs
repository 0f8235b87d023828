use std::env;

/// The only configuration the core observes directly (spec §6), plus the
/// ambient knobs needed to run the service standalone.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,

    pub store_uri: String,
    pub cache_uri: Option<String>,
    pub cache_ttl_seconds: u64,
    pub queue_uri: Option<String>,
    pub queue_name: String,

    pub upstream_api_key: Option<String>,
    pub upstream_default_network: String,
    /// Threshold, in seconds, below which the upstream adapter asks for the
    /// current price instead of a historical one (spec §4.1, flagged in §9
    /// as a provider-specific heuristic that should be configurable).
    pub upstream_current_threshold_secs: i64,

    pub worker_concurrency: usize,
    /// Fallback lookback window when `firstTransferTimestamp` can't be
    /// determined (spec §4.8 step 1).
    pub backfill_fallback_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let bind_address =
            env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let store_uri = env::var("STORE_URI").unwrap_or_else(|_| "sqlite:oracle.db".to_string());
        let cache_uri = env::var("CACHE_URI").ok().filter(|s| !s.is_empty());
        let cache_ttl_seconds = env::var("CACHE_TTL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| "CACHE_TTL_SECONDS must be a valid number".to_string())?;
        let queue_uri = env::var("QUEUE_URI").ok().filter(|s| !s.is_empty());
        let queue_name =
            env::var("QUEUE_NAME").unwrap_or_else(|_| "backfill".to_string());

        let upstream_api_key = env::var("UPSTREAM_API_KEY").ok().filter(|s| !s.is_empty());
        let upstream_default_network =
            env::var("UPSTREAM_DEFAULT_NETWORK").unwrap_or_else(|_| "ethereum".to_string());
        let upstream_current_threshold_secs = env::var("UPSTREAM_CURRENT_THRESHOLD_SECS")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .map_err(|_| "UPSTREAM_CURRENT_THRESHOLD_SECS must be a valid number".to_string())?;

        let worker_concurrency = env::var("WORKER_CONCURRENCY")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| "WORKER_CONCURRENCY must be a valid number".to_string())?;
        let backfill_fallback_days = env::var("BACKFILL_FALLBACK_DAYS")
            .unwrap_or_else(|_| "365".to_string())
            .parse()
            .map_err(|_| "BACKFILL_FALLBACK_DAYS must be a valid number".to_string())?;

        Ok(Self {
            bind_address,
            store_uri,
            cache_uri,
            cache_ttl_seconds,
            queue_uri,
            queue_name,
            upstream_api_key,
            upstream_default_network,
            upstream_current_threshold_secs,
            worker_concurrency,
            backfill_fallback_days,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.worker_concurrency == 0 {
            return Err("WORKER_CONCURRENCY must be at least 1".to_string());
        }
        if self.cache_ttl_seconds == 0 {
            return Err("CACHE_TTL_SECONDS must be at least 1".to_string());
        }
        if self.upstream_current_threshold_secs <= 0 {
            return Err("UPSTREAM_CURRENT_THRESHOLD_SECS must be positive".to_string());
        }
        if self.backfill_fallback_days <= 0 {
            return Err("BACKFILL_FALLBACK_DAYS must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_worker_concurrency() {
        let mut config = base_config();
        config.worker_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    fn base_config() -> Config {
        Config {
            bind_address: "127.0.0.1:8080".to_string(),
            store_uri: "sqlite::memory:".to_string(),
            cache_uri: None,
            cache_ttl_seconds: 3600,
            queue_uri: None,
            queue_name: "backfill".to_string(),
            upstream_api_key: None,
            upstream_default_network: "ethereum".to_string(),
            upstream_current_threshold_secs: 86400,
            worker_concurrency: 5,
            backfill_fallback_days: 365,
        }
    }
}
