//! Core entities (spec §3): `PricePoint`, `CacheEntry`, `ScheduleRecord`,
//! `BackfillJob`, `BackfillResult`, plus the token/network normalization and
//! validation rules the Resolver applies before touching any collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use shared::dto::common::{Interval, Network, Source};

/// A validated, normalized token identifier: either an uppercased 2-10
/// character alphanumeric symbol or a 0x-prefixed hex address (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    pub fn parse(raw: &str) -> Result<Self, String> {
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            if !hex.is_empty()
                && hex.len() <= 40
                && hex.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Ok(Self(format!("0x{}", hex.to_ascii_lowercase())));
            }
            return Err(format!("'{raw}' is not a valid 0x-prefixed address"));
        }

        if (2..=10).contains(&raw.len()) && raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(Self(raw.to_ascii_uppercase()));
        }

        Err(format!(
            "'{raw}' is neither a 2-10 character symbol nor a 0x-prefixed address"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased rendering, used in cache fingerprints.
    pub fn lower(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The atomic persisted record (spec §3). `(token, network, unix_ts)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub token: String,
    pub network: Network,
    pub unix_ts: i64,
    pub iso_date: String,
    pub price: f64,
    pub source: Source,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricePoint {
    /// Build a point for `unix_ts`, deriving `iso_date` from it so the two
    /// never disagree (spec §3 invariant).
    pub fn new(
        token: impl Into<String>,
        network: Network,
        unix_ts: i64,
        price: f64,
        source: Source,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            network,
            unix_ts,
            iso_date: iso_date_of(unix_ts),
            price: round2(price),
            source,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.unix_ts, 0).unwrap_or(self.created_at)
    }
}

pub fn iso_date_of(unix_ts: i64) -> String {
    DateTime::from_timestamp(unix_ts, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Canonical cache fingerprint shared by every caller of the Cache Layer
/// (spec §3/§4.3): `price:{token_lower}:{network_lower}:{iso_timestamp}`.
pub fn fingerprint(token: &Token, network: Network, at: DateTime<Utc>) -> String {
    format!(
        "price:{}:{}:{}",
        token.lower(),
        network.as_str(),
        at.to_rfc3339()
    )
}

/// Ephemeral lookup value stored under a fingerprint (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub price: f64,
    pub source: Source,
    pub timestamp: DateTime<Utc>,
    pub cached_at: DateTime<Utc>,
}

/// A backfill definition (spec §3). Owned by the Job Registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub id: String,
    pub token: String,
    pub network: Network,
    pub interval: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
}

/// A unit of work placed on the Job Queue (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillJob {
    pub token: String,
    pub network: Network,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub request_id: String,
}

/// What the worker returns on completion (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillResult {
    pub prices_processed: usize,
    pub time_range_start: String,
    pub time_range_end: String,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_uppercase_symbol() {
        assert_eq!(Token::parse("eth").unwrap().as_str(), "ETH");
    }

    #[test]
    fn accepts_address() {
        let addr = "0x1234abcd";
        assert_eq!(Token::parse(addr).unwrap().as_str(), addr);
    }

    #[test]
    fn address_case_is_normalized_to_lowercase() {
        assert_eq!(Token::parse("0x1234ABCD").unwrap().as_str(), "0x1234abcd");
        assert_eq!(
            Token::parse("0x1234ABCD").unwrap(),
            Token::parse("0x1234abcd").unwrap()
        );
    }

    #[test]
    fn rejects_single_char_symbol() {
        assert!(Token::parse("a").is_err());
    }

    #[test]
    fn rejects_overlong_symbol() {
        assert!(Token::parse("abcdefghijk").is_err());
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(Token::parse("0xzzzz").is_err());
    }

    #[test]
    fn fingerprint_is_lowercase_and_stable() {
        let token = Token::parse("ETH").unwrap();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let fp1 = fingerprint(&token, Network::Ethereum, at);
        let fp2 = fingerprint(&token, Network::Ethereum, at);
        assert_eq!(fp1, fp2);
        assert!(fp1.starts_with("price:eth:ethereum:"));
    }

    #[test]
    fn round2_rounds_to_two_decimals() {
        assert_eq!(round2(3275.104), 3275.1);
        assert_eq!(round2(2099.996), 2100.0);
    }
}
