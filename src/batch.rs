// =============================================================================
// Scheduled Metrics Update
// =============================================================================
//
// For every configured ticker:
//
//   fetch ~2y of daily bars → compute metrics → fetch fundamentals →
//   merge into a TickerRecord → upsert into the store → (optional) CSV export
//
// Each ticker is an independent unit bounded by a timeout. A failing ticker
// is logged, recorded in the report and skipped; it never aborts the batch.
// Fundamentals are best-effort: a provider failure there yields an empty
// snapshot rather than a failed ticker.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::engine::{compute_indicators, IndicatorConfig};
use crate::export::{export_path, write_indicator_csv};
use crate::metrics::compute_metrics;
use crate::provider::MarketDataProvider;
use crate::runtime_config::RuntimeConfig;
use crate::store::MetricsStore;
use crate::types::TickerRecord;

/// Per-run settings, derived from [`RuntimeConfig`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub history_days: u32,
    pub ticker_timeout: Duration,
    pub export_dir: Option<PathBuf>,
    pub indicators: IndicatorConfig,
}

impl BatchOptions {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            history_days: config.history_days,
            ticker_timeout: Duration::from_secs(config.ticker_timeout_secs.max(1)),
            export_dir: config.export_dir.clone(),
            indicators: config.indicators,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerFailure {
    pub ticker: String,
    pub reason: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: Vec<String>,
    pub failed: Vec<TickerFailure>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }
}

/// Refresh every ticker in `tickers`, in order.
pub async fn run_batch(
    tickers: &[String],
    provider: &dyn MarketDataProvider,
    store: &dyn MetricsStore,
    options: &BatchOptions,
) -> BatchReport {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    info!(%run_id, tickers = tickers.len(), "metrics update started");

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for ticker in tickers {
        let outcome = tokio::time::timeout(
            options.ticker_timeout,
            update_ticker(ticker, provider, store, options),
        )
        .await;

        match outcome {
            Ok(Ok(())) => {
                info!(%run_id, ticker = %ticker, "ticker updated");
                succeeded.push(ticker.clone());
            }
            Ok(Err(e)) => {
                let reason = format!("{e:#}");
                error!(%run_id, ticker = %ticker, error = %reason, "ticker update failed");
                failed.push(TickerFailure {
                    ticker: ticker.clone(),
                    reason,
                });
            }
            Err(_) => {
                error!(
                    %run_id,
                    ticker = %ticker,
                    timeout_secs = options.ticker_timeout.as_secs(),
                    "ticker update timed out"
                );
                failed.push(TickerFailure {
                    ticker: ticker.clone(),
                    reason: format!("timed out after {}s", options.ticker_timeout.as_secs()),
                });
            }
        }
    }

    let report = BatchReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        succeeded,
        failed,
    };
    info!(
        %run_id,
        succeeded = report.success_count(),
        failed = report.failed.len(),
        "metrics update finished"
    );
    report
}

async fn update_ticker(
    ticker: &str,
    provider: &dyn MarketDataProvider,
    store: &dyn MetricsStore,
    options: &BatchOptions,
) -> Result<()> {
    // The end bound is exclusive, so include today.
    let end = Utc::now().date_naive() + Days::new(1);
    let start = end - Days::new(u64::from(options.history_days));

    let bars = provider
        .fetch_bars(ticker, start, end)
        .await
        .context("fetching daily bars")?;
    let metrics = compute_metrics(&bars).context("computing performance metrics")?;

    let fundamentals = match provider.fetch_fundamentals(ticker).await {
        Ok(f) => f,
        Err(e) => {
            warn!(ticker, error = %e, "fundamentals unavailable, storing metrics only");
            Default::default()
        }
    };

    let record = TickerRecord {
        ticker: ticker.to_string(),
        fundamentals,
        metrics,
        updated_at: Utc::now(),
    };
    store.upsert(&record).context("persisting ticker record")?;

    if let Some(dir) = &options.export_dir {
        let path = export_path(dir, ticker);
        let exported = compute_indicators(&bars, &options.indicators)
            .map_err(anyhow::Error::from)
            .and_then(|rows| write_indicator_csv(&path, &rows));
        if let Err(e) = exported {
            warn!(ticker, path = %path.display(), error = ?e, "csv export failed");
        }
    }

    Ok(())
}

// =============================================================================
// Scheduling
// =============================================================================

/// Time from `now` until the next `hour:00:00` UTC. Always positive: when
/// `now` is exactly on the hour, the next run is a day later.
pub fn until_next_run(now: DateTime<Utc>, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next = now.date_naive().and_time(at).and_utc();
    if next <= now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::from_secs(1))
}

/// Clears the running flag when dropped, including on cancellation or panic.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Run one batch over the configured tickers unless a run is already in
/// progress. The report is kept on `state` for the API.
pub async fn run_exclusive(state: &AppState) -> Option<BatchReport> {
    if state
        .batch_running
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        warn!("metrics update already running, skipping trigger");
        return None;
    }
    let _running = RunningGuard(&state.batch_running);

    let (tickers, options) = {
        let config = state.runtime_config.read();
        (config.tickers.clone(), BatchOptions::from_config(&config))
    };
    let report = run_batch(
        &tickers,
        state.provider.as_ref(),
        state.store.as_ref(),
        &options,
    )
    .await;

    *state.last_batch.write() = Some(report.clone());
    Some(report)
}

/// Daily scheduler loop. Never returns.
pub async fn run_scheduler(state: Arc<AppState>) {
    if state.runtime_config.read().run_on_startup {
        info!("running metrics update on startup");
        run_exclusive(&state).await;
    }

    loop {
        let hour = state.runtime_config.read().schedule_hour_utc;
        let wait = until_next_run(Utc::now(), hour);
        info!(hour_utc = hour, wait_secs = wait.as_secs(), "next metrics update scheduled");
        tokio::time::sleep(wait).await;
        run_exclusive(&state).await;
    }
}
