//! Point-price resolution contract (spec §6: Resolve request/response).

use serde::{Deserialize, Serialize};

use super::common::Source;

/// `{ token, network, timestamp? }`. Normalization (`token` -> uppercase,
/// `network` -> lowercase) and timestamp defaulting happen in the resolver,
/// not here — this type carries the wire shape as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub token: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// `{ price, source, timestamp, token, network }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub price: f64,
    pub source: Source,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub token: String,
    pub network: String,
}
