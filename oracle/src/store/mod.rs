//! Durable Price Store (spec §4.2): persistence for `(token, network, unix_ts) ->
//! (price, source)`, with point lookup, straddling queries, and bulk insert.
//!
//! All read operations return empty results — never an error — when the
//! store is unreachable (spec §4.2 Availability / §7 `StoreUnavailable`).
//! Writes may silently drop. [`sqlite::SqlitePriceStore`] is the concrete
//! implementation; it degrades itself rather than requiring callers to
//! special-case a missing store.

pub mod sqlite;

use async_trait::async_trait;

use crate::domain::{Network, PricePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Skipped,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Point lookup; `None` on miss *or* on store unavailability.
    async fn get_by_exact(&self, token: &str, network: Network, unix_ts: i64) -> Option<PricePoint>;

    /// `(before, after)`: the newest record at or before `unix_ts`, and the
    /// oldest at or after it. Either side may be `None`.
    async fn get_straddling(
        &self,
        token: &str,
        network: Network,
        unix_ts: i64,
    ) -> (Option<PricePoint>, Option<PricePoint>);

    /// All records in `[from_ts, to_ts]`, ascending by `unix_ts`.
    async fn get_range(
        &self,
        token: &str,
        network: Network,
        from_ts: i64,
        to_ts: i64,
    ) -> Vec<PricePoint>;

    /// Insert, or no-op on a unique-key conflict.
    async fn insert(&self, point: PricePoint) -> InsertOutcome;

    /// Bulk insert, tolerating per-row conflicts. Returns the count actually inserted.
    async fn insert_many(&self, points: Vec<PricePoint>) -> usize;
}
