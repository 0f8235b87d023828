//! # Token Price Oracle — core
//!
//! Resolves the USD price of `(token, network, timestamp)` through a tiered
//! pipeline (cache -> durable store -> upstream -> interpolation) and
//! backfills historical price series through a persistent job queue.
//!
//! ## Module map
//!
//! - [`domain`] — entities and validation (spec §3)
//! - [`cache`] — ephemeral key-value cache (spec §4.3)
//! - [`store`] — durable price store (spec §4.2)
//! - [`upstream`] — market-data adapter (spec §4.1)
//! - [`origin`] — asset-transfer provider, for backfill creation-date detection
//! - [`interpolation`] — linear interpolation engine (spec §4.4)
//! - [`resolver`] — the point-read pipeline (spec §4.5)
//! - [`registry`] — scheduled backfill definitions (spec §4.6)
//! - [`queue`] — durable job queue (spec §4.7)
//! - [`worker`] — the backfill worker (spec §4.8)
//! - [`server`] — the thin Axum composition root (spec §6)

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod interpolation;
pub mod origin;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod store;
pub mod upstream;
pub mod worker;

pub use config::Config;
pub use error::{OracleError, Result};
