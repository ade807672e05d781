// =============================================================================
// Runtime Configuration — service settings with atomic save
// =============================================================================
//
// Central configuration for the market-pulse service: the ticker universe,
// indicator semantics, provider pacing, storage locations, batch schedule and
// HTTP bind address.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::IndicatorConfig;
use crate::provider::yahoo::DEFAULT_BASE_URL;

pub const ENV_TICKERS: &str = "MARKET_PULSE_TICKERS";
pub const ENV_BIND_ADDR: &str = "MARKET_PULSE_BIND_ADDR";
pub const ENV_STORE_DIR: &str = "MARKET_PULSE_STORE_DIR";

/// Santiago Stock Exchange constituents tracked by default.
pub const TICKERS_CL: [&str; 43] = [
    "ENELCHILE.SN",
    "ENELAM.SN",
    "CHILE.SN",
    "BSANTANDER.SN",
    "COPEC.SN",
    "CENCOSUD.SN",
    "FALABELLA.SN",
    "PARAUCO.SN",
    "CMPC.SN",
    "AGUAS-A.SN",
    "AGUAS-C.SN",
    "CAP.SN",
    "CCU.SN",
    "VAPORES.SN",
    "BCI.SN",
    "ANDINA-B.SN",
    "ANDINA-A.SN",
    "IAM.SN",
    "SQM-A.SN",
    "SQM-B.SN",
    "ITAUCORP.SN",
    "ENTEL.SN",
    "SECURITY.SN",
    "COLBUN.SN",
    "ECL.SN",
    "AESGENER.SN",
    "FORUS.SN",
    "SALFACORP.SN",
    "VINA.SN",
    "HF.SN",
    "LTM.SN",
    "PAZ.SN",
    "ILC.SN",
    "CGE.SN",
    "SMU.SN",
    "VSPT.SN",
    "BESALCO.SN",
    "MELON.SN",
    "BLUMAR.SN",
    "NEXO.SN",
    "NAVIERA.SN",
    "MADECO.SN",
    "MULTIFOODS.SN",
];

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_tickers() -> Vec<String> {
    TICKERS_CL.iter().map(|t| t.to_string()).collect()
}

fn default_history_days() -> u32 {
    730
}

fn default_ticker_timeout_secs() -> u64 {
    30
}

fn default_provider_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_provider_spacing_ms() -> u64 {
    500
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("data/tickers")
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the market-pulse service.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Universe ------------------------------------------------------------

    /// Tickers refreshed by the scheduled batch.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    /// Calendar days of history fetched per ticker (~2 years).
    #[serde(default = "default_history_days")]
    pub history_days: u32,

    // --- Indicators ----------------------------------------------------------

    #[serde(default)]
    pub indicators: IndicatorConfig,

    // --- Provider ------------------------------------------------------------

    /// Upper bound on fetch + compute + persist for a single ticker.
    #[serde(default = "default_ticker_timeout_secs")]
    pub ticker_timeout_secs: u64,

    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Minimum delay between two provider requests.
    #[serde(default = "default_provider_spacing_ms")]
    pub provider_spacing_ms: u64,

    // --- Storage -------------------------------------------------------------

    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// When set, the batch also writes `<export_dir>/<TICKER>.csv`.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    // --- Schedule ------------------------------------------------------------

    /// UTC hour (0-23) of the daily batch run.
    #[serde(default)]
    pub schedule_hour_utc: u32,

    #[serde(default)]
    pub run_on_startup: bool,

    // --- HTTP ----------------------------------------------------------------

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            history_days: default_history_days(),
            indicators: IndicatorConfig::default(),
            ticker_timeout_secs: default_ticker_timeout_secs(),
            provider_base_url: default_provider_base_url(),
            provider_spacing_ms: default_provider_spacing_ms(),
            store_dir: default_store_dir(),
            export_dir: None,
            schedule_hour_utc: 0,
            run_on_startup: false,
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;
        config.normalise();

        info!(
            path = %path.display(),
            tickers = config.tickers.len(),
            warmup = %config.indicators.warmup,
            rsi_smoothing = %config.indicators.rsi_smoothing,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `MARKET_PULSE_*` overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = lookup(ENV_TICKERS) {
            self.tickers = parse_ticker_list(&list);
            info!(tickers = self.tickers.len(), "tickers overridden from environment");
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR).filter(|a| !a.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_STORE_DIR).filter(|d| !d.trim().is_empty()) {
            self.store_dir = PathBuf::from(dir.trim());
        }
        self.normalise();
    }

    /// Clamp out-of-range values and restore an empty universe.
    fn normalise(&mut self) {
        if self.schedule_hour_utc > 23 {
            warn!(hour = self.schedule_hour_utc, "schedule hour out of range, using 0");
            self.schedule_hour_utc = 0;
        }
        if self.history_days < 2 {
            warn!(days = self.history_days, "history window too short, using default");
            self.history_days = default_history_days();
        }
        if self.tickers.is_empty() {
            warn!("no tickers configured, using the default universe");
            self.tickers = default_tickers();
        }
    }
}

/// Split a comma-separated ticker list, trimming and upper-casing entries.
pub fn parse_ticker_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
