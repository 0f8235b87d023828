//! Price Resolver (spec §4.5): `resolve(token, network, at)` traverses
//! cache -> store -> upstream -> interpolation, writing through to
//! store/cache on the way, and short-circuits at the first success.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::domain::{fingerprint, CacheEntry, Network, Source, Token};
use crate::error::{OracleError, Result};
use crate::interpolation::InterpolationEngine;
use crate::store::PriceStore;
use crate::upstream::{UpstreamAdapter, UpstreamOutcome};

pub struct ResolvedPrice {
    pub price: f64,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    pub token: String,
    pub network: Network,
}

pub struct Resolver {
    cache: Arc<dyn Cache>,
    store: Arc<dyn PriceStore>,
    upstream: Arc<dyn UpstreamAdapter>,
    interpolation: InterpolationEngine,
    upstream_current_threshold_secs: i64,
    cache_ttl_seconds: u64,
}

impl Resolver {
    pub fn new(
        cache: Arc<dyn Cache>,
        store: Arc<dyn PriceStore>,
        upstream: Arc<dyn UpstreamAdapter>,
        upstream_current_threshold_secs: i64,
        cache_ttl_seconds: u64,
    ) -> Self {
        let interpolation = InterpolationEngine::new(store.clone());
        Self {
            cache,
            store,
            upstream,
            interpolation,
            upstream_current_threshold_secs,
            cache_ttl_seconds,
        }
    }

    /// `token`/`network` are taken as given on the wire; `at` is an optional
    /// ISO-8601 instant, defaulting to now. Validation failures never touch
    /// a collaborator (spec §4.5).
    pub async fn resolve(
        &self,
        token_raw: &str,
        network_raw: &str,
        at_raw: Option<&str>,
    ) -> Result<ResolvedPrice> {
        let token = Token::parse(token_raw).map_err(OracleError::InvalidInput)?;
        let network = Network::parse(network_raw)
            .ok_or_else(|| OracleError::InvalidInput(format!("unknown network '{network_raw}'")))?;
        let at = match at_raw {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| OracleError::InvalidInput(format!("invalid timestamp '{raw}': {e}")))?,
            None => Utc::now(),
        };
        if at > Utc::now() {
            return Err(OracleError::InvalidInput(
                "timestamp must not be in the future".to_string(),
            ));
        }

        let unix_ts = at.timestamp();

        // 1. Cache probe.
        let key = fingerprint(&token, network, at);
        if let Some(entry) = self.cache.get(&key).await {
            debug!(token = %token, %network, "cache hit");
            return Ok(ResolvedPrice {
                price: entry.price,
                source: Source::Cache,
                timestamp: entry.timestamp,
                token: token.as_str().to_string(),
                network,
            });
        }

        // 2. Exact store lookup.
        if let Some(point) = self.store.get_by_exact(token.as_str(), network, unix_ts).await {
            debug!(token = %token, %network, "store hit");
            return Ok(ResolvedPrice {
                price: point.price,
                source: point.source,
                timestamp: point.timestamp(),
                token: token.as_str().to_string(),
                network,
            });
        }

        // 3. Upstream fetch. Transient errors are logged and treated as "no
        // data" so the pipeline proceeds to interpolation (spec §7).
        match self
            .upstream
            .fetch_spot_price(&token, network, at, self.upstream_current_threshold_secs)
            .await
        {
            Ok(UpstreamOutcome::Found(point)) => {
                info!(token = %token, %network, price = point.price, "resolved via upstream");
                self.store.insert(point.clone()).await;
                self.write_through_cache(&key, point.price, Source::Upstream, point.timestamp())
                    .await;
                return Ok(ResolvedPrice {
                    price: point.price,
                    source: Source::Upstream,
                    timestamp: point.timestamp(),
                    token: token.as_str().to_string(),
                    network,
                });
            }
            Ok(UpstreamOutcome::NoData) => {
                debug!(token = %token, %network, "upstream has no data, falling back to interpolation");
            }
            Err(e) => {
                warn!(token = %token, %network, error = %e, "transient upstream error, falling back to interpolation");
            }
        }

        // 4. Interpolation.
        if let Some(point) = self.interpolation.interpolate(token.as_str(), network, unix_ts).await {
            info!(token = %token, %network, price = point.price, confidence = point.confidence, "resolved via interpolation");
            self.store.insert(point.clone()).await;
            self.write_through_cache(&key, point.price, Source::Interpolated, point.timestamp())
                .await;
            return Ok(ResolvedPrice {
                price: point.price,
                source: Source::Interpolated,
                timestamp: point.timestamp(),
                token: token.as_str().to_string(),
                network,
            });
        }

        // 5. Exhaustion.
        Err(OracleError::NotFound)
    }

    async fn write_through_cache(&self, key: &str, price: f64, source: Source, timestamp: DateTime<Utc>) {
        let entry = CacheEntry {
            price,
            source,
            timestamp,
            cached_at: Utc::now(),
        };
        self.cache.set(key, entry, self.cache_ttl_seconds).await;
    }
}

#[cfg(test)]
mod tests;
