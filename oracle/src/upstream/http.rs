use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use symbol_map::provider_id;
use tracing::{debug, warn};

use crate::domain::{round2, Network, PricePoint, Source, Token};

use super::{TransientUpstream, UpstreamAdapter, UpstreamOutcome};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Generic spot/historical price provider, following the donor's pattern of
/// a small `reqwest::Client` wrapper with one base URL and typed methods
/// (`stellar::HorizonClient`). The concrete endpoint shape is provider
/// detail — the adapter contract (spec §4.1) is what matters.
pub struct HttpUpstreamAdapter {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpUpstreamAdapter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout always builds");
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct SpotResponse {
    price: f64,
    #[serde(default)]
    timestamp: Option<i64>,
}

#[async_trait]
impl UpstreamAdapter for HttpUpstreamAdapter {
    async fn fetch_spot_price(
        &self,
        token: &Token,
        network: Network,
        at: DateTime<Utc>,
        current_threshold_secs: i64,
    ) -> Result<UpstreamOutcome, TransientUpstream> {
        let Some(provider_id) = provider_id(token) else {
            debug!(token = %token, "token has no provider mapping, no data");
            return Ok(UpstreamOutcome::NoData);
        };

        let age_secs = (Utc::now() - at).num_seconds();
        let mut url = if age_secs <= current_threshold_secs {
            format!("{}/price/current?symbol={}", self.base_url, provider_id)
        } else {
            format!(
                "{}/price/historical?symbol={}&date={}",
                self.base_url,
                provider_id,
                at.format("%Y-%m-%d"),
            )
        };
        url.push_str(&format!("&network={}", network.as_str()));

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransientUpstream(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransientUpstream(format!("upstream returned {status}")));
        }
        if !status.is_success() {
            warn!(%status, token = %token, "upstream rejected request, treating as no data");
            return Ok(UpstreamOutcome::NoData);
        }

        let parsed: Result<SpotResponse, _> = response.json().await;
        let Ok(body) = parsed else {
            warn!(token = %token, "malformed upstream payload, treating as no data");
            return Ok(UpstreamOutcome::NoData);
        };

        let unix_ts = body.timestamp.unwrap_or_else(|| at.timestamp());
        let point = PricePoint::new(
            token.as_str(),
            network,
            unix_ts,
            round2(body.price),
            Source::Upstream,
            1.0,
        );
        Ok(UpstreamOutcome::Found(point))
    }
}

/// Static symbol -> provider-id map (spec §4.1: "symbols are resolved
/// through an internal map to a provider-specific coin identifier").
/// Grounded on the donor's Reflector asset list (`oracle_cache.rs`).
mod symbol_map {
    use crate::domain::Token;

    const SYMBOLS: &[(&str, &str)] = &[
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("XLM", "stellar"),
        ("SOL", "solana"),
        ("USDT", "tether"),
        ("USDC", "usd-coin"),
        ("XRP", "ripple"),
        ("ADA", "cardano"),
        ("AVAX", "avalanche-2"),
        ("DOT", "polkadot"),
        ("MATIC", "matic-network"),
        ("LINK", "chainlink"),
        ("DAI", "dai"),
        ("ATOM", "cosmos"),
        ("UNI", "uniswap"),
        ("EURC", "euro-coin"),
    ];

    /// `None` for unmapped symbols and for any 0x-prefixed address, per spec §4.1.
    pub fn provider_id(token: &Token) -> Option<&'static str> {
        let symbol = token.as_str();
        SYMBOLS
            .iter()
            .find(|(sym, _)| *sym == symbol)
            .map(|(_, id)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::symbol_map::provider_id;
    use crate::domain::Token;

    #[test]
    fn known_symbol_maps_to_provider_id() {
        let token = Token::parse("BTC").unwrap();
        assert_eq!(provider_id(&token), Some("bitcoin"));
    }

    #[test]
    fn unmapped_address_has_no_provider_id() {
        let token = Token::parse("0xabc123").unwrap();
        assert_eq!(provider_id(&token), None);
    }
}
