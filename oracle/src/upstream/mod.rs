//! Upstream Adapter (spec §4.1): `fetchSpotPrice(token, network, at)` against
//! an external market-data capability. Never throws — "no data" and
//! transient failures are distinct, typed outcomes the Resolver branches on.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Network, PricePoint, Token};

/// A successful call that found no price for this token, or a price point.
#[derive(Debug)]
pub enum UpstreamOutcome {
    Found(PricePoint),
    NoData,
}

/// HTTP 5xx / connection failure — swallowed at the Resolver boundary (spec
/// §7 `TransientUpstream`), never a variant of [`crate::error::OracleError`].
#[derive(Debug)]
pub struct TransientUpstream(pub String);

impl std::fmt::Display for TransientUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transient upstream error: {}", self.0)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamAdapter: Send + Sync {
    /// `current_threshold_secs`: below this age, ask for the current price;
    /// otherwise ask for the historical price at `at`'s calendar day (spec §4.1).
    async fn fetch_spot_price(
        &self,
        token: &Token,
        network: Network,
        at: DateTime<Utc>,
        current_threshold_secs: i64,
    ) -> Result<UpstreamOutcome, TransientUpstream>;
}
