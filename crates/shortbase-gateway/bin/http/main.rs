mod cli;

use crate::cli::{CacheBackendArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use shortbase_allocator::AllocatorSettings;
use shortbase_cache::{
    CacheSettings, MokaResolutionCache, NullResolutionCache, RedisResolutionCache,
    ResolutionCache,
};
use shortbase_converter::ConverterService;
use shortbase_core::RecordStore;
use shortbase_gateway::{App, AppState};
use shortbase_storage::{InMemoryRecordStore, MySqlRecordStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_json);

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        shard_count = config.shard_count,
        "starting shortbase gateway"
    );

    match config.storage {
        StorageBackendArg::InMemory => with_cache(config, InMemoryRecordStore::new()).await,
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .clone()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlRecordStore::connect(&dsn).await?;
            with_cache(config, store).await
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn with_cache<S: RecordStore>(config: CLI, store: S) -> anyhow::Result<()> {
    match config.cache {
        CacheBackendArg::None => serve(config, store, NullResolutionCache).await,
        CacheBackendArg::Moka => {
            let settings = CacheSettings::builder()
                .max_capacity(config.cache_capacity)
                .time_to_idle(Duration::from_secs(config.cache_idle_secs))
                .time_to_live(Duration::from_secs(config.cache_ttl_secs))
                .build();
            serve(config, store, MokaResolutionCache::with_settings(settings)).await
        }
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .clone()
                .context("redis url is required when cache backend is redis")?;
            let cache = RedisResolutionCache::connect(&url)
                .await?
                .with_idle(Duration::from_secs(config.cache_idle_secs))
                .with_ttl(Duration::from_secs(config.cache_ttl_secs));
            serve(config, store, cache).await
        }
    }
}

async fn serve<S, C>(config: CLI, store: S, cache: C) -> anyhow::Result<()>
where
    S: RecordStore,
    C: ResolutionCache,
{
    let store = Arc::new(store);
    let settings = AllocatorSettings::builder()
        .shard_count(config.shard_count)
        .build();
    let (converter, reconciler) =
        ConverterService::start(Arc::clone(&store), Arc::new(cache), settings).await?;

    let state = AppState::new(Arc::new(converter), store, config.domain)
        .with_access_keys(&config.access_keys);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, App::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last converter handle; wait for pending index
    // writes before exiting.
    reconciler.await?;
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
