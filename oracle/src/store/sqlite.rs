use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Network, PricePoint, Source};
use crate::error::degraded;

use super::{InsertOutcome, PriceStore};

const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(FromRow)]
struct Row {
    token: String,
    network: String,
    unix_ts: i64,
    iso_date: String,
    price: f64,
    source: String,
    confidence: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Row {
    fn into_point(self) -> Option<PricePoint> {
        let network = Network::parse(&self.network)?;
        let source = match self.source.as_str() {
            "upstream" => Source::Upstream,
            "interpolated" => Source::Interpolated,
            "cache" => Source::Cache,
            _ => return None,
        };
        Some(PricePoint {
            token: self.token,
            network,
            unix_ts: self.unix_ts,
            iso_date: self.iso_date,
            price: self.price,
            source,
            confidence: self.confidence,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// `sqlx`-backed implementation of [`PriceStore`]. Connecting never panics
/// and never fails construction: an unreachable database at startup is
/// represented as `pool: None`, and every operation degrades to an empty
/// result rather than surfacing an error (spec §4.2 Availability).
pub struct SqlitePriceStore {
    pool: Option<SqlitePool>,
}

impl SqlitePriceStore {
    pub async fn connect(database_url: &str) -> Self {
        match Self::try_connect(database_url).await {
            Ok(pool) => Self { pool: Some(pool) },
            Err(e) => {
                degraded("store", e);
                Self { pool: None }
            }
        }
    }

    async fn try_connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(OPERATION_TIMEOUT)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(pool)
    }

    /// An in-process store that reports itself unavailable, for exercising
    /// the degraded-mode contract without a real connection failure.
    pub fn unavailable() -> Self {
        Self { pool: None }
    }
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn get_by_exact(&self, token: &str, network: Network, unix_ts: i64) -> Option<PricePoint> {
        let Some(pool) = &self.pool else {
            return None;
        };
        let row = sqlx::query_as::<_, Row>(
            "SELECT token, network, unix_ts, iso_date, price, source, confidence, created_at, updated_at \
             FROM prices WHERE token = ? AND network = ? AND unix_ts = ?",
        )
        .bind(token)
        .bind(network.as_str())
        .bind(unix_ts)
        .fetch_optional(pool)
        .await;

        match row {
            Ok(row) => row.and_then(Row::into_point),
            Err(e) => {
                degraded("store.get_by_exact", e);
                None
            }
        }
    }

    async fn get_straddling(
        &self,
        token: &str,
        network: Network,
        unix_ts: i64,
    ) -> (Option<PricePoint>, Option<PricePoint>) {
        let Some(pool) = &self.pool else {
            return (None, None);
        };

        let before = sqlx::query_as::<_, Row>(
            "SELECT token, network, unix_ts, iso_date, price, source, confidence, created_at, updated_at \
             FROM prices WHERE token = ? AND network = ? AND unix_ts <= ? \
             ORDER BY unix_ts DESC LIMIT 1",
        )
        .bind(token)
        .bind(network.as_str())
        .bind(unix_ts)
        .fetch_optional(pool)
        .await;

        let after = sqlx::query_as::<_, Row>(
            "SELECT token, network, unix_ts, iso_date, price, source, confidence, created_at, updated_at \
             FROM prices WHERE token = ? AND network = ? AND unix_ts >= ? \
             ORDER BY unix_ts ASC LIMIT 1",
        )
        .bind(token)
        .bind(network.as_str())
        .bind(unix_ts)
        .fetch_optional(pool)
        .await;

        let before = match before {
            Ok(row) => row.and_then(Row::into_point),
            Err(e) => {
                degraded("store.get_straddling.before", e);
                None
            }
        };
        let after = match after {
            Ok(row) => row.and_then(Row::into_point),
            Err(e) => {
                degraded("store.get_straddling.after", e);
                None
            }
        };
        (before, after)
    }

    async fn get_range(
        &self,
        token: &str,
        network: Network,
        from_ts: i64,
        to_ts: i64,
    ) -> Vec<PricePoint> {
        let Some(pool) = &self.pool else {
            return Vec::new();
        };

        let rows = sqlx::query_as::<_, Row>(
            "SELECT token, network, unix_ts, iso_date, price, source, confidence, created_at, updated_at \
             FROM prices WHERE token = ? AND network = ? AND unix_ts >= ? AND unix_ts <= ? \
             ORDER BY unix_ts ASC",
        )
        .bind(token)
        .bind(network.as_str())
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(pool)
        .await;

        match rows {
            Ok(rows) => rows.into_iter().filter_map(Row::into_point).collect(),
            Err(e) => {
                degraded("store.get_range", e);
                Vec::new()
            }
        }
    }

    async fn insert(&self, point: PricePoint) -> InsertOutcome {
        let Some(pool) = &self.pool else {
            degraded("store.insert", "no connection, write dropped");
            return InsertOutcome::Skipped;
        };

        let result = sqlx::query(
            "INSERT INTO prices (token, network, unix_ts, iso_date, price, source, confidence, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (token, network, unix_ts) DO NOTHING",
        )
        .bind(&point.token)
        .bind(point.network.as_str())
        .bind(point.unix_ts)
        .bind(&point.iso_date)
        .bind(point.price)
        .bind(point.source.as_str())
        .bind(point.confidence)
        .bind(point.created_at)
        .bind(point.updated_at)
        .execute(pool)
        .await;

        match result {
            Ok(r) if r.rows_affected() > 0 => InsertOutcome::Inserted,
            Ok(_) => InsertOutcome::Skipped,
            Err(e) => {
                degraded("store.insert", e);
                InsertOutcome::Skipped
            }
        }
    }

    async fn insert_many(&self, points: Vec<PricePoint>) -> usize {
        let mut inserted = 0;
        for point in points {
            if self.insert(point).await == InsertOutcome::Inserted {
                inserted += 1;
            }
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqlitePriceStore {
        SqlitePriceStore::connect("sqlite::memory:").await
    }

    fn sample(unix_ts: i64, price: f64) -> PricePoint {
        PricePoint::new("ETH", Network::Ethereum, unix_ts, price, Source::Upstream, 1.0)
    }

    #[tokio::test]
    async fn insert_then_get_by_exact_round_trips() {
        let store = store().await;
        store.insert(sample(1_700_000_000, 2000.0)).await;

        let found = store
            .get_by_exact("ETH", Network::Ethereum, 1_700_000_000)
            .await
            .expect("point should be found");
        assert_eq!(found.price, 2000.0);
    }

    #[tokio::test]
    async fn second_insert_on_same_key_is_a_no_op() {
        let store = store().await;
        assert_eq!(store.insert(sample(1_700_000_000, 2000.0)).await, InsertOutcome::Inserted);
        assert_eq!(store.insert(sample(1_700_000_000, 9999.0)).await, InsertOutcome::Skipped);

        let found = store
            .get_by_exact("ETH", Network::Ethereum, 1_700_000_000)
            .await
            .unwrap();
        assert_eq!(found.price, 2000.0, "the original value must survive the skipped insert");
    }

    #[tokio::test]
    async fn get_straddling_returns_nearest_before_and_after() {
        let store = store().await;
        store.insert(sample(1_700_000_000, 2000.0)).await;
        store.insert(sample(1_700_200_000, 2200.0)).await;

        let (before, after) = store
            .get_straddling("ETH", Network::Ethereum, 1_700_100_000)
            .await;
        assert_eq!(before.unwrap().price, 2000.0);
        assert_eq!(after.unwrap().price, 2200.0);
    }

    #[tokio::test]
    async fn unavailable_store_returns_empty_without_error() {
        let store = SqlitePriceStore::unavailable();
        assert!(store.get_by_exact("ETH", Network::Ethereum, 0).await.is_none());
        assert_eq!(store.get_straddling("ETH", Network::Ethereum, 0).await, (None, None));
        assert!(store.get_range("ETH", Network::Ethereum, 0, 1).await.is_empty());
        assert_eq!(store.insert(sample(0, 1.0)).await, InsertOutcome::Skipped);
    }
}
