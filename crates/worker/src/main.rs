//! swcache gateway entry point.
//!
//! Boot order mirrors a service worker lifecycle: load configuration, run
//! the install step (pre-cache the application shell), and only then start
//! intercepting requests. A failed install aborts the process before the
//! gateway binds its listener.

use std::sync::Arc;

use anyhow::{Context, Result};
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod gateway;
mod install;
mod interceptor;

#[cfg(test)]
mod stub;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    tracing::info!(cache = %config.cache_name, db = %config.db_path.display(), "starting swcache gateway");

    let db = CacheDb::open(&config.db_path)
        .await
        .context("failed to open cache database")?;

    let fetcher = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })
    .context("failed to build fetch client")?;

    // waitUntil analog: the gateway must not serve until install completes.
    install::run(&db, &fetcher, &config)
        .await
        .context("install failed")?;

    let state = gateway::GatewayState::new(db, Arc::new(fetcher), &config).context("invalid gateway configuration")?;

    gateway::serve(state, &config.bind_addr).await
}
