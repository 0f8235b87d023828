//! Interpolation Engine (spec §4.4): linear interpolation between the two
//! known price points straddling a target timestamp, with a confidence
//! score blending gap size, price stability, and position within the gap.

use std::sync::Arc;

use crate::domain::{round2, Network, PricePoint, Source};
use crate::store::PriceStore;

const MAX_GAP_SECS: f64 = 7.0 * 24.0 * 3600.0;
const MAX_RELATIVE_CHANGE: f64 = 0.50;

pub struct InterpolationEngine {
    store: Arc<dyn PriceStore>,
}

impl InterpolationEngine {
    pub fn new(store: Arc<dyn PriceStore>) -> Self {
        Self { store }
    }

    /// Interpolate a single `target_ts`. `None` if either side is missing or
    /// the two sides share the same timestamp (spec §4.4, invariants 5-6).
    pub async fn interpolate(
        &self,
        token: &str,
        network: Network,
        target_ts: i64,
    ) -> Option<PricePoint> {
        let (before, after) = self.store.get_straddling(token, network, target_ts).await;
        interpolate_from_straddle(token, network, target_ts, before, after)
    }

    /// Batch form (spec §4.4): one store round-trip per timestamp is fine
    /// here since [`PriceStore::get_straddling`] is already an indexed
    /// lookup; callers that can coalesce queries should do so themselves
    /// and call [`interpolate_from_straddle`] directly.
    pub async fn batch_interpolate(
        &self,
        token: &str,
        network: Network,
        timestamps: &[i64],
    ) -> Vec<Option<PricePoint>> {
        let mut results = Vec::with_capacity(timestamps.len());
        for &ts in timestamps {
            results.push(self.interpolate(token, network, ts).await);
        }
        results
    }
}

/// The pure computation behind [`InterpolationEngine::interpolate`], split
/// out so the worker can feed it an in-memory straddling pair (spec §4.8
/// step 5: interpolating against the union of pre-existing and freshly
/// fetched points) without a redundant store round-trip.
pub fn interpolate_from_straddle(
    token: &str,
    network: Network,
    target_ts: i64,
    before: Option<PricePoint>,
    after: Option<PricePoint>,
) -> Option<PricePoint> {
    let before = before?;
    let after = after?;

    if before.unix_ts == after.unix_ts {
        return None;
    }

    let gap = (after.unix_ts - before.unix_ts) as f64;
    let ratio = (target_ts - before.unix_ts) as f64 / gap;
    let price = before.price + (after.price - before.price) * ratio;

    let time_conf = (1.0 - gap / MAX_GAP_SECS).max(0.0);

    let rel_change = if before.price.abs() > f64::EPSILON {
        ((after.price - before.price) / before.price).abs()
    } else {
        MAX_RELATIVE_CHANGE
    };
    let stability_conf = (1.0 - rel_change / MAX_RELATIVE_CHANGE).max(0.0);

    let d_before = (target_ts - before.unix_ts) as f64;
    let d_after = (after.unix_ts - target_ts) as f64;
    let position_conf = if d_before.max(d_after) > 0.0 {
        d_before.min(d_after) / d_before.max(d_after)
    } else {
        1.0
    };

    let confidence =
        (0.4 * time_conf + 0.4 * stability_conf + 0.2 * position_conf).clamp(0.0, 1.0);

    Some(PricePoint::new(
        token,
        network,
        target_ts,
        round2(price),
        Source::Interpolated,
        confidence,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(unix_ts: i64, price: f64) -> PricePoint {
        PricePoint::new("ETH", Network::Ethereum, unix_ts, price, Source::Upstream, 1.0)
    }

    #[test]
    fn midpoint_linear_interpolation_over_a_two_day_gap() {
        let before = point(1_704_067_200, 2000.0); // 2024-01-01T00:00:00Z
        let after = point(1_704_240_000, 2200.0); // 2024-01-03T00:00:00Z
        let target = 1_704_153_600; // 2024-01-02T00:00:00Z

        let result =
            interpolate_from_straddle("ETH", Network::Ethereum, target, Some(before), Some(after))
                .expect("both sides present");

        assert_eq!(result.price, 2100.0);
        assert_eq!(result.source, Source::Interpolated);
        // time_conf = 1 - 2/7 = 0.7143, stability_conf = 1 - 0.1/0.5 = 0.8, position_conf = 1.0
        assert_approx_eq::assert_approx_eq!(result.confidence, 0.8057, 0.001);
    }

    #[test]
    fn same_timestamp_on_both_sides_returns_none() {
        let p = point(1_700_000_000, 2000.0);
        assert!(interpolate_from_straddle("ETH", Network::Ethereum, 1_700_000_000, Some(p.clone()), Some(p)).is_none());
    }

    #[test]
    fn missing_before_returns_none() {
        let after = point(1_700_000_000, 2000.0);
        assert!(interpolate_from_straddle("ETH", Network::Ethereum, 1_699_000_000, None, Some(after)).is_none());
    }

    #[test]
    fn missing_after_returns_none() {
        let before = point(1_700_000_000, 2000.0);
        assert!(interpolate_from_straddle("ETH", Network::Ethereum, 1_701_000_000, Some(before), None).is_none());
    }

    #[test]
    fn confidence_is_always_in_unit_range() {
        let before = point(0, 1.0);
        let after = point(1_000_000_000, 1_000_000.0); // huge gap, huge relative change
        let result =
            interpolate_from_straddle("ETH", Network::Ethereum, 500_000_000, Some(before), Some(after))
                .unwrap();
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}
