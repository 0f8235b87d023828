use std::sync::Arc;

use chrono::Utc;

use crate::cache::MockCache;
use crate::domain::{CacheEntry, Network, PricePoint, Source};
use crate::error::OracleError;
use crate::store::MockPriceStore;
use crate::upstream::{MockUpstreamAdapter, TransientUpstream, UpstreamOutcome};

use super::Resolver;

fn empty_store() -> MockPriceStore {
    let mut store = MockPriceStore::new();
    store.expect_get_by_exact().returning(|_, _, _| None);
    store.expect_get_straddling().returning(|_, _, _| (None, None));
    store
}

fn missing_cache() -> MockCache {
    let mut cache = MockCache::new();
    cache.expect_get().returning(|_| None);
    cache.expect_set().returning(|_, _, _| ());
    cache
}

#[tokio::test]
async fn cache_hit_short_circuits_before_any_other_collaborator() {
    let mut cache = MockCache::new();
    let cached_ts = Utc::now();
    cache.expect_get().returning(move |_| {
        Some(CacheEntry {
            price: 2300.5,
            source: Source::Upstream,
            timestamp: cached_ts,
            cached_at: cached_ts,
        })
    });

    let store = MockPriceStore::new(); // no expectations: must not be called
    let upstream = MockUpstreamAdapter::new(); // no expectations: must not be called

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let result = resolver
        .resolve("ETH", "ethereum", Some(&cached_ts.to_rfc3339()))
        .await
        .unwrap();

    assert_eq!(result.price, 2300.5);
    assert_eq!(result.source, Source::Cache);
}

#[tokio::test]
async fn upstream_hit_persists_and_caches() {
    let cache = missing_cache();
    let mut store = MockPriceStore::new();
    store.expect_get_by_exact().returning(|_, _, _| None);
    store.expect_get_straddling().returning(|_, _, _| (None, None));
    store
        .expect_insert()
        .withf(|p: &PricePoint| p.price == 3275.10 && p.source == Source::Upstream)
        .returning(|_| crate::store::InsertOutcome::Inserted);

    let mut upstream = MockUpstreamAdapter::new();
    upstream.expect_fetch_spot_price().returning(|token, network, at, _| {
        Ok(UpstreamOutcome::Found(PricePoint::new(
            token.as_str(),
            network,
            at.timestamp(),
            3275.10,
            Source::Upstream,
            1.0,
        )))
    });

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let result = resolver
        .resolve("BTC", "ethereum", Some("2024-06-15T12:00:00Z"))
        .await
        .unwrap();

    assert_eq!(result.price, 3275.10);
    assert_eq!(result.source, Source::Upstream);
}

#[tokio::test]
async fn transient_upstream_error_falls_through_to_interpolation() {
    let cache = missing_cache();

    let before = PricePoint::new("ETH", Network::Ethereum, 1_704_067_200, 2000.0, Source::Upstream, 1.0);
    let after = PricePoint::new("ETH", Network::Ethereum, 1_704_240_000, 2200.0, Source::Upstream, 1.0);

    let mut store = MockPriceStore::new();
    store.expect_get_by_exact().returning(|_, _, _| None);
    store
        .expect_get_straddling()
        .returning(move |_, _, _| (Some(before.clone()), Some(after.clone())));
    store
        .expect_insert()
        .withf(|p: &PricePoint| p.source == Source::Interpolated)
        .returning(|_| crate::store::InsertOutcome::Inserted);

    let mut upstream = MockUpstreamAdapter::new();
    upstream
        .expect_fetch_spot_price()
        .returning(|_, _, _, _| Err(TransientUpstream("connect timeout".to_string())));

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let result = resolver
        .resolve("ETH", "ethereum", Some("2024-01-02T00:00:00Z"))
        .await
        .unwrap();

    assert_eq!(result.price, 2100.0);
    assert_eq!(result.source, Source::Interpolated);
}

#[tokio::test]
async fn exhaustion_returns_not_found() {
    let cache = missing_cache();
    let store = empty_store();
    let mut upstream = MockUpstreamAdapter::new();
    upstream.expect_fetch_spot_price().returning(|_, _, _, _| Ok(UpstreamOutcome::NoData));

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let result = resolver.resolve("ETH", "ethereum", Some("2024-01-02T00:00:00Z")).await;

    assert!(matches!(result, Err(OracleError::NotFound)));
}

#[tokio::test]
async fn invalid_token_never_touches_a_collaborator() {
    let cache = MockCache::new();
    let store = MockPriceStore::new();
    let upstream = MockUpstreamAdapter::new();

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let result = resolver.resolve("!", "ethereum", None).await;

    assert!(matches!(result, Err(OracleError::InvalidInput(_))));
}

#[tokio::test]
async fn unknown_network_is_rejected() {
    let cache = MockCache::new();
    let store = MockPriceStore::new();
    let upstream = MockUpstreamAdapter::new();

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let result = resolver.resolve("ETH", "fantom", None).await;

    assert!(matches!(result, Err(OracleError::InvalidInput(_))));
}

#[tokio::test]
async fn future_timestamp_is_rejected() {
    let cache = MockCache::new();
    let store = MockPriceStore::new();
    let upstream = MockUpstreamAdapter::new();

    let resolver = Resolver::new(Arc::new(cache), Arc::new(store), Arc::new(upstream), 86400, 3600);
    let future = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
    let result = resolver.resolve("ETH", "ethereum", Some(&future)).await;

    assert!(matches!(result, Err(OracleError::InvalidInput(_))));
}
