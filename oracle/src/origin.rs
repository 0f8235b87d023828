//! The blockchain asset-transfer provider (spec §1: out of scope, treated as
//! an opaque `firstTransferTimestamp(token, network)` capability). Only the
//! contract is specified; [`HttpAssetOriginProvider`] is one idiomatic,
//! best-effort implementation so the Backfill Worker has something to call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::domain::{Network, Token};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetOriginProvider: Send + Sync {
    /// Timestamp of the token's first on-chain transfer, if determinable.
    async fn first_transfer_timestamp(&self, token: &Token, network: Network) -> Option<DateTime<Utc>>;
}

#[derive(Deserialize)]
struct OriginResponse {
    first_transfer_at: i64,
}

pub struct HttpAssetOriginProvider {
    client: Client,
    base_url: String,
}

impl HttpAssetOriginProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout always builds");
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl AssetOriginProvider for HttpAssetOriginProvider {
    async fn first_transfer_timestamp(&self, token: &Token, network: Network) -> Option<DateTime<Utc>> {
        let url = format!(
            "{}/origin?token={}&network={}",
            self.base_url,
            token.as_str(),
            network.as_str()
        );

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(token = %token, error = %e, "asset origin lookup failed, caller should fall back");
                return None;
            }
        };

        if !response.status().is_success() {
            return None;
        }

        let body: OriginResponse = match response.json().await {
            Ok(b) => b,
            Err(_) => return None,
        };

        DateTime::from_timestamp(body.first_transfer_at, 0)
    }
}

/// Always reports unknown origin, forcing the fallback-lookback branch
/// (spec §4.8 step 1). Useful for running the worker without a configured
/// asset-transfer provider.
pub struct UnknownOriginProvider;

#[async_trait]
impl AssetOriginProvider for UnknownOriginProvider {
    async fn first_transfer_timestamp(&self, _token: &Token, _network: Network) -> Option<DateTime<Utc>> {
        None
    }
}
