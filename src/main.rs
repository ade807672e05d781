// =============================================================================
// market-pulse — Main Entry Point
// =============================================================================
//
// Serves indicator tables over HTTP and refreshes the per-ticker metrics store
// once a day.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod batch;
mod correlation;
mod engine;
mod error;
mod export;
mod indicators;
mod metrics;
mod provider;
mod runtime_config;
mod store;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::provider::{MarketDataProvider, YahooClient};
use crate::runtime_config::RuntimeConfig;
use crate::store::{JsonFileStore, MemoryStore, MetricsStore};

const CONFIG_PATH: &str = "market_pulse.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "market-pulse starting up");

    let mut config = match RuntimeConfig::load(CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            let cfg = RuntimeConfig::default();
            if !std::path::Path::new(CONFIG_PATH).exists() {
                if let Err(e) = cfg.save(CONFIG_PATH) {
                    warn!(error = %e, "Failed to write default config");
                }
            }
            cfg
        }
    };
    config.apply_overrides(|key| std::env::var(key).ok());

    info!(
        tickers = config.tickers.len(),
        history_days = config.history_days,
        warmup = %config.indicators.warmup,
        rsi_smoothing = %config.indicators.rsi_smoothing,
        schedule_hour_utc = config.schedule_hour_utc,
        "Configuration ready"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let yahoo = Arc::new(
        YahooClient::new(
            config.provider_base_url.clone(),
            Duration::from_millis(config.provider_spacing_ms),
        )
        .context("failed to build market-data client")?,
    );
    let provider: Arc<dyn MarketDataProvider> = yahoo.clone();

    let store: Arc<dyn MetricsStore> = match JsonFileStore::open(&config.store_dir) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "Store directory unavailable, keeping metrics in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    // ── 3. Build shared state ────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, provider, store));

    // ── 4. Daily metrics update ──────────────────────────────────────────
    tokio::spawn(batch::run_scheduler(state.clone()));

    // ── 5. API server (runs until Ctrl+C) ────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    let pacer = yahoo.pacer_snapshot();
    info!(
        provider_requests = pacer.requests_sent,
        provider_throttled = pacer.throttled,
        uptime_secs = state.uptime_secs(),
        "market-pulse shut down complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
