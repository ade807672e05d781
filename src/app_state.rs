// =============================================================================
// Central Application State — market-pulse service
// =============================================================================
//
// Built once in `main` and shared by the HTTP handlers and the batch
// scheduler through `Arc<AppState>`.
//
// Thread safety:
//   - parking_lot::RwLock for the mutable config and the last batch report.
//   - AtomicBool guard so only one batch runs at a time.
//   - Provider and store are trait objects with their own interior
//     mutability.
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::batch::BatchReport;
use crate::provider::MarketDataProvider;
use crate::runtime_config::RuntimeConfig;
use crate::store::MetricsStore;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: Arc<RwLock<RuntimeConfig>>,

    // ── Collaborators ───────────────────────────────────────────────────
    pub provider: Arc<dyn MarketDataProvider>,
    pub store: Arc<dyn MetricsStore>,

    // ── Batch ───────────────────────────────────────────────────────────
    pub last_batch: RwLock<Option<BatchReport>>,
    pub batch_running: AtomicBool,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn MetricsStore>,
    ) -> Self {
        Self {
            runtime_config: Arc::new(RwLock::new(config)),
            provider,
            store,
            last_batch: RwLock::new(None),
            batch_running: AtomicBool::new(false),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn is_batch_running(&self) -> bool {
        self.batch_running.load(Ordering::Acquire)
    }

    /// Uptime in whole seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tickers", &self.runtime_config.read().tickers.len())
            .field("batch_running", &self.is_batch_running())
            .field("uptime_secs", &self.uptime_secs())
            .finish()
    }
}
