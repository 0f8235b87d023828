//! Backfill Worker (spec §4.8): consumes queue entries, detects a token's
//! creation date, generates a daily timestamp grid, diffs it against the
//! store, fetches missing points in rate-limited batches, interpolates
//! residual gaps, and persists the result — reporting progress at the
//! checkpoints spec §4.8 names so external observers can display it.

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::domain::{iso_date_of, BackfillJob, BackfillResult, PricePoint, Token};
use crate::error::{OracleError, Result};
use crate::interpolation::interpolate_from_straddle;
use crate::origin::AssetOriginProvider;
use crate::queue::JobQueue;
use crate::store::PriceStore;
use crate::upstream::{UpstreamAdapter, UpstreamOutcome};

/// Inter-batch delay (spec §4.8 step 4: "rate-limit courtesy").
const BATCH_DELAY: Duration = Duration::from_millis(100);

pub struct BackfillWorker {
    store: Arc<dyn PriceStore>,
    upstream: Arc<dyn UpstreamAdapter>,
    origin: Arc<dyn AssetOriginProvider>,
    queue: Arc<dyn JobQueue>,
    upstream_current_threshold_secs: i64,
    backfill_fallback_days: i64,
}

impl BackfillWorker {
    pub fn new(
        store: Arc<dyn PriceStore>,
        upstream: Arc<dyn UpstreamAdapter>,
        origin: Arc<dyn AssetOriginProvider>,
        queue: Arc<dyn JobQueue>,
        upstream_current_threshold_secs: i64,
        backfill_fallback_days: i64,
    ) -> Self {
        Self {
            store,
            upstream,
            origin,
            queue,
            upstream_current_threshold_secs,
            backfill_fallback_days,
        }
    }

    /// Poll the queue forever, running jobs as they become available.
    /// `concurrency` mirrors spec §5's default worker pool size.
    pub async fn run_loop(self: Arc<Self>, concurrency: usize) {
        let mut handles = Vec::with_capacity(concurrency);
        for worker_id in 0..concurrency {
            let worker = self.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    match worker.queue.dequeue().await {
                        Some(lease) => {
                            info!(worker_id, job_id = %lease.job_id, token = %lease.job.token, "dequeued backfill job");
                            match worker.run(&lease.job_id, &lease.job).await {
                                Ok(result) => worker.queue.complete(&lease.job_id, result).await,
                                Err(e) => {
                                    worker.queue.fail(&lease.job_id, lease.attempt, e.to_string()).await
                                }
                            }
                        }
                        None => tokio::time::sleep(Duration::from_millis(250)).await,
                    }
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Run a single job to completion (spec §4.8 steps 1-7), reporting
    /// progress against `job_id` on the queue at each checkpoint. Any
    /// unhandled failure propagates as `Err`; the caller (the queue loop, or
    /// a test) is responsible for the retry/backoff decision (spec §4.7).
    /// `job.request_id` is carried through logs only, for correlation with
    /// the originating schedule/request (spec §9 "Untyped job payloads").
    pub async fn run(&self, job_id: &str, job: &BackfillJob) -> Result<BackfillResult> {
        let start = Instant::now();
        let token = Token::parse(&job.token).map_err(OracleError::InvalidInput)?;
        let network = job.network;

        // 1. Creation-date detection -> progress 10.
        let start_date = match job.start_date {
            Some(d) => d,
            None => match self.origin.first_transfer_timestamp(&token, network).await {
                Some(ts) => ts,
                None => {
                    warn!(token = %token, %network, request_id = %job.request_id, "creation date unknown, falling back to lookback window");
                    Utc::now() - chrono::Duration::days(self.backfill_fallback_days)
                }
            },
        };
        self.queue.report_progress(job_id, 10).await;

        // 2. Grid generation -> progress 20, 30.
        let end_date = job.end_date.unwrap_or_else(Utc::now);
        let grid = daily_grid(start_date, end_date);
        self.queue.report_progress(job_id, 20).await;
        debug!(token = %token, %network, grid_len = grid.len(), "generated daily timestamp grid");
        self.queue.report_progress(job_id, 30).await;

        let from_ts = grid.first().copied().unwrap_or_else(|| start_date.timestamp());
        let to_ts = grid.last().copied().unwrap_or_else(|| end_date.timestamp());

        // 3. Diff against store -> progress 40.
        let existing = self.store.get_range(token.as_str(), network, from_ts, to_ts).await;
        let existing_dates: HashSet<String> = existing.iter().map(|p| date_key(p.unix_ts)).collect();
        let missing: Vec<i64> = grid
            .iter()
            .copied()
            .filter(|ts| !existing_dates.contains(&date_key(*ts)))
            .collect();
        self.queue.report_progress(job_id, 40).await;

        // 4. Batched fetch -> progress linearly 40 -> 80.
        let batch_size = if missing.is_empty() {
            10
        } else {
            ((missing.len() as f64 / 10.0).ceil() as usize).clamp(10, 100)
        };

        let mut fetched: Vec<PricePoint> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let fetched_dates_missing = |fetched: &[PricePoint], ts: i64| {
            fetched.iter().any(|p| date_key(p.unix_ts) == date_key(ts))
        };

        let batches: Vec<&[i64]> = missing.chunks(batch_size).collect();
        let total_batches = batches.len().max(1);
        for (i, batch) in batches.iter().enumerate() {
            for &ts in *batch {
                let at = DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now);
                match self
                    .upstream
                    .fetch_spot_price(&token, network, at, self.upstream_current_threshold_secs)
                    .await
                {
                    Ok(UpstreamOutcome::Found(point)) => fetched.push(point),
                    Ok(UpstreamOutcome::NoData) => {}
                    Err(e) => {
                        if errors.len() < 10 {
                            errors.push(format!("{}: {}", at.format("%Y-%m-%d"), e));
                        }
                    }
                }
            }
            tokio::time::sleep(BATCH_DELAY).await;
            let progress = 40 + ((i + 1) * 40 / total_batches) as u8;
            self.queue.report_progress(job_id, progress.min(80)).await;
        }
        if batches.is_empty() {
            self.queue.report_progress(job_id, 80).await;
        }

        // 5. Gap interpolation -> progress 90.
        let mut known: Vec<PricePoint> = existing;
        known.extend(fetched.iter().cloned());
        known.sort_by_key(|p| p.unix_ts);

        let mut interpolated = Vec::new();
        for &ts in missing.iter().filter(|&&ts| !fetched_dates_missing(&fetched, ts)) {
            let before = known.iter().rev().find(|p| p.unix_ts <= ts).cloned();
            let after = known.iter().find(|p| p.unix_ts >= ts).cloned();
            if let Some(point) = interpolate_from_straddle(token.as_str(), network, ts, before, after) {
                interpolated.push(point);
            }
        }
        self.queue.report_progress(job_id, 90).await;

        // 6. Persist -> progress 100.
        let mut to_insert = fetched;
        to_insert.extend(interpolated);
        let prices_processed = self.store.insert_many(to_insert).await;
        self.queue.report_progress(job_id, 100).await;

        info!(token = %token, %network, prices_processed, errors = errors.len(), "backfill complete");

        Ok(BackfillResult {
            prices_processed,
            time_range_start: iso_date_of(from_ts),
            time_range_end: iso_date_of(to_ts),
            duration_ms: start.elapsed().as_millis() as u64,
            errors: errors.into_iter().take(10).collect(),
        })
    }
}

/// UTC-midnight daily timestamps from `start` to `end` inclusive, ascending
/// (spec §4.8 step 2, §8 invariant 7).
fn daily_grid(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<i64> {
    let Some(start_midnight) = start.date_naive().and_hms_opt(0, 0, 0) else {
        return Vec::new();
    };
    let Some(end_midnight) = end.date_naive().and_hms_opt(0, 0, 0) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut cur = start_midnight;
    while cur <= end_midnight {
        out.push(Utc.from_utc_datetime(&cur).timestamp());
        cur += chrono::Duration::days(1);
    }
    out
}

fn date_key(unix_ts: i64) -> String {
    DateTime::from_timestamp(unix_ts, 0)
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d")
        .to_string()
}

#[cfg(test)]
mod grid_tests {
    use super::*;

    #[test]
    fn grid_spans_inclusive_range_with_one_day_steps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 7, 0, 0, 0).unwrap();
        let grid = daily_grid(start, end);

        assert_eq!(grid.len(), 7);
        assert_eq!(grid[0], start.timestamp());
        assert_eq!(*grid.last().unwrap(), end.timestamp());
        assert!(grid.windows(2).all(|w| w[1] - w[0] == 86_400));
    }

    #[test]
    fn grid_ignores_time_of_day_and_snaps_to_midnight() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 15, 30, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        let grid = daily_grid(start, end);

        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0], Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp());
    }
}
