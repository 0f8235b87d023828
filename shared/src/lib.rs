//! # Shared Data Transfer Objects Library
//!
//! Defines the wire contract between the oracle service and its callers.
//! All DTOs use JSON serialization via `serde`.
//!
//! ## Structure
//!
//! - **[`dto::common`]**: closed enumerations (`Network`, `Source`, `Interval`) and the error envelope
//! - **[`dto::resolve`]**: the point-price resolution request/response pair
//! - **[`dto::schedule`]**: backfill schedule CRUD request/response pairs
//!
//! ## Wire Format
//!
//! - Field names use **snake_case** in Rust, which maps to **snake_case** in JSON by default
//! - Optional fields are omitted from JSON when `None` (`#[serde(skip_serializing_if = "Option::is_none")]`)
//! - All structs implement both `Serialize` and `Deserialize`

pub mod dto;

pub use dto::*;
