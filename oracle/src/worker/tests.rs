use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::domain::{BackfillJob, Network, PricePoint, Source};
use crate::origin::MockAssetOriginProvider;
use crate::queue::MockJobQueue;
use crate::store::MockPriceStore;
use crate::upstream::{MockUpstreamAdapter, UpstreamOutcome};

use super::BackfillWorker;

fn job(token: &str, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>) -> BackfillJob {
    BackfillJob {
        token: token.to_string(),
        network: Network::Ethereum,
        start_date: Some(start),
        end_date: Some(end),
        request_id: "req-1".to_string(),
    }
}

fn permissive_queue() -> MockJobQueue {
    let mut queue = MockJobQueue::new();
    queue.expect_report_progress().returning(|_, _| ());
    queue
}

#[tokio::test]
async fn fills_entire_range_from_upstream_when_store_is_empty() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();

    let mut store = MockPriceStore::new();
    store.expect_get_range().returning(|_, _, _, _| Vec::new());
    store
        .expect_insert_many()
        .withf(|points: &Vec<PricePoint>| points.len() == 7)
        .returning(|points| points.len());

    let mut upstream = MockUpstreamAdapter::new();
    upstream.expect_fetch_spot_price().returning(|token, network, at, _| {
        Ok(UpstreamOutcome::Found(PricePoint::new(
            token.as_str(),
            network,
            at.timestamp(),
            2000.0,
            Source::Upstream,
            1.0,
        )))
    });

    let origin = MockAssetOriginProvider::new();
    let queue = permissive_queue();

    let worker = BackfillWorker::new(
        Arc::new(store),
        Arc::new(upstream),
        Arc::new(origin),
        Arc::new(queue),
        86_400,
        365,
    );

    let result = worker.run("job-1", &job("ETH", start, end)).await.unwrap();
    assert_eq!(result.prices_processed, 7);
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn reruns_on_a_fully_populated_range_insert_nothing_new() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();

    let existing: Vec<PricePoint> = (0..7)
        .map(|d| PricePoint::new("ETH", Network::Ethereum, start.timestamp() + d * 86_400, 2000.0, Source::Upstream, 1.0))
        .collect();

    let mut store = MockPriceStore::new();
    store.expect_get_range().returning(move |_, _, _, _| existing.clone());
    store
        .expect_insert_many()
        .withf(|points: &Vec<PricePoint>| points.is_empty())
        .returning(|_| 0);

    let mut upstream = MockUpstreamAdapter::new();
    upstream.expect_fetch_spot_price().times(0);

    let worker = BackfillWorker::new(
        Arc::new(store),
        Arc::new(upstream),
        Arc::new(MockAssetOriginProvider::new()),
        Arc::new(permissive_queue()),
        86_400,
        365,
    );

    let result = worker.run("job-2", &job("ETH", start, end)).await.unwrap();
    assert_eq!(result.prices_processed, 0);
}

#[tokio::test]
async fn gaps_left_by_upstream_are_filled_by_interpolation() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

    let before = PricePoint::new("ETH", Network::Ethereum, start.timestamp(), 2000.0, Source::Upstream, 1.0);
    let after = PricePoint::new("ETH", Network::Ethereum, end.timestamp(), 2200.0, Source::Upstream, 1.0);

    let mut store = MockPriceStore::new();
    store
        .expect_get_range()
        .returning(move |_, _, _, _| vec![before.clone(), after.clone()]);
    store
        .expect_insert_many()
        .withf(|points: &Vec<PricePoint>| {
            points.len() == 1 && points[0].source == Source::Interpolated
        })
        .returning(|points| points.len());

    let mut upstream = MockUpstreamAdapter::new();
    upstream.expect_fetch_spot_price().returning(|_, _, _, _| Ok(UpstreamOutcome::NoData));

    let worker = BackfillWorker::new(
        Arc::new(store),
        Arc::new(upstream),
        Arc::new(MockAssetOriginProvider::new()),
        Arc::new(permissive_queue()),
        86_400,
        365,
    );

    let result = worker.run("job-3", &job("ETH", start, end)).await.unwrap();
    assert_eq!(result.prices_processed, 1);
}

#[tokio::test]
async fn unknown_creation_date_falls_back_to_lookback_window() {
    let end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

    let mut store = MockPriceStore::new();
    store.expect_get_range().returning(|_, _, _, _| Vec::new());
    store.expect_insert_many().returning(|points| points.len());

    let mut upstream = MockUpstreamAdapter::new();
    upstream.expect_fetch_spot_price().returning(|_, _, _, _| Ok(UpstreamOutcome::NoData));

    let mut origin = MockAssetOriginProvider::new();
    origin.expect_first_transfer_timestamp().returning(|_, _| None);

    let worker = BackfillWorker::new(
        Arc::new(store),
        Arc::new(upstream),
        Arc::new(origin),
        Arc::new(permissive_queue()),
        86_400,
        2,
    );

    let job = BackfillJob {
        token: "ETH".to_string(),
        network: Network::Ethereum,
        start_date: None,
        end_date: Some(end),
        request_id: "req-4".to_string(),
    };

    // With a 2-day fallback window the grid is at most 3 points; this mainly
    // asserts the worker doesn't error out when creation-date lookup misses.
    let result = worker.run("job-4", &job).await.unwrap();
    assert!(result.prices_processed <= 3);
}

#[tokio::test]
async fn up_to_ten_upstream_errors_are_retained() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

    let mut store = MockPriceStore::new();
    store.expect_get_range().returning(|_, _, _, _| Vec::new());
    store.expect_insert_many().returning(|points| points.len());

    let mut upstream = MockUpstreamAdapter::new();
    upstream
        .expect_fetch_spot_price()
        .returning(|_, _, _, _| Err(crate::upstream::TransientUpstream("boom".to_string())));

    let worker = BackfillWorker::new(
        Arc::new(store),
        Arc::new(upstream),
        Arc::new(MockAssetOriginProvider::new()),
        Arc::new(permissive_queue()),
        86_400,
        365,
    );

    let result = worker.run("job-5", &job("ETH", start, end)).await.unwrap();
    assert_eq!(result.errors.len(), 10);
}
