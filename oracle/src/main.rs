//! Composition root / binary entry point: loads configuration, builds every
//! component from spec §4 (C1-C8), wires them into an [`AppState`], spawns
//! the backfill worker pool, and serves the routes spec §6 names. No
//! process-global mutable state (spec §9 "module-level service singletons").

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oracle::cache::null::NullCache;
use oracle::cache::redis::RedisCache;
use oracle::cache::Cache;
use oracle::config::Config;
use oracle::origin::{AssetOriginProvider, UnknownOriginProvider};
use oracle::queue::null::NullJobQueue;
use oracle::queue::redis::RedisJobQueue;
use oracle::queue::JobQueue;
use oracle::registry::JobRegistry;
use oracle::resolver::Resolver;
use oracle::server::{router, AppState};
use oracle::store::sqlite::SqlitePriceStore;
use oracle::store::PriceStore;
use oracle::upstream::http::HttpUpstreamAdapter;
use oracle::upstream::UpstreamAdapter;
use oracle::worker::BackfillWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    info!(bind_address = %config.bind_address, "starting token price oracle");

    let store: Arc<dyn PriceStore> = Arc::new(SqlitePriceStore::connect(&config.store_uri).await);

    let cache: Arc<dyn Cache> = match &config.cache_uri {
        Some(uri) => match RedisCache::connect(uri).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(error = %e, "cache unreachable at startup, running in degraded mode");
                Arc::new(NullCache)
            }
        },
        None => Arc::new(NullCache),
    };

    let upstream: Arc<dyn UpstreamAdapter> = Arc::new(HttpUpstreamAdapter::new(
        "https://api.example-market-data.io",
        config.upstream_api_key.clone(),
    ));

    // No asset-transfer provider is configured by default; the worker falls
    // back to `BACKFILL_FALLBACK_DAYS` lookback (spec §4.8 step 1).
    let origin: Arc<dyn AssetOriginProvider> = Arc::new(UnknownOriginProvider);

    let queue: Arc<dyn JobQueue> = match &config.queue_uri {
        Some(uri) => match RedisJobQueue::connect(uri, config.queue_name.clone()).await {
            Ok(queue) => Arc::new(queue),
            Err(e) => {
                warn!(error = %e, "queue unreachable at startup, scheduling degrades to best-effort");
                Arc::new(NullJobQueue)
            }
        },
        None => Arc::new(NullJobQueue),
    };

    let resolver = Arc::new(Resolver::new(
        cache.clone(),
        store.clone(),
        upstream.clone(),
        config.upstream_current_threshold_secs,
        config.cache_ttl_seconds,
    ));

    let registry = Arc::new(JobRegistry::new(queue.clone()));

    let worker = Arc::new(BackfillWorker::new(
        store.clone(),
        upstream.clone(),
        origin.clone(),
        queue.clone(),
        config.upstream_current_threshold_secs,
        config.backfill_fallback_days,
    ));
    tokio::spawn(worker.run_loop(config.worker_concurrency));

    let app = router(AppState { resolver, registry });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(bind_address = %config.bind_address, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
