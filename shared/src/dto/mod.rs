//! # Data Transfer Objects (DTOs)
//!
//! Data structures exchanged between the oracle service and its callers.
//!
//! ## Module Organization
//!
//! - [`common`] - closed enumerations and the error envelope
//! - [`resolve`] - point-price resolution request/response
//! - [`schedule`] - backfill schedule CRUD request/response
//!
//! ## Serialization Format
//!
//! - **Field naming**: snake_case by default, except `ScheduleResponse` and
//!   `ErrorEnvelope`, whose wire field names are normative per spec §6 and
//!   so render as camelCase (`jobId`, `statusCode`, ...)
//! - **Optional fields**: omitted when `None` using `#[serde(skip_serializing_if = "Option::is_none")]`
//! - **Enums**: serialize to lowercase strings using `#[serde(rename_all = "lowercase")]`
//!
//! ## Example JSON Communication
//!
//! ```text
//! POST /resolve
//! Content-Type: application/json
//!
//! { "token": "ETH", "network": "ethereum", "timestamp": "2024-06-15T12:00:00Z" }
//! ```
//!
//! ```text
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! { "price": 3275.10, "source": "upstream", "timestamp": "2024-06-15T12:00:00Z", "token": "BTC", "network": "ethereum" }
//! ```

pub mod common;
pub mod resolve;
pub mod schedule;

pub use common::*;
pub use resolve::*;
pub use schedule::*;
