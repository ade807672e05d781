//! Flat-file export of indicator tables.
//!
//! Columns match the historical-data JSON payload, one row per bar. Undefined
//! indicator values are written as empty fields.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::store::file_stem;
use crate::types::IndicatorRow;

pub const CSV_HEADER: [&str; 14] = [
    "Date", "Open", "High", "Low", "Close", "Volume", "SMA_20", "SMA_50", "RSI", "BB_upper",
    "BB_lower", "MACD", "Signal", "MACD_Hist",
];

/// `<dir>/<TICKER>.csv`.
pub fn export_path(dir: &Path, ticker: &str) -> PathBuf {
    dir.join(format!("{}.csv", file_stem(ticker)))
}

/// Write `rows` to `path`, replacing any existing file.
pub fn write_indicator_csv(path: &Path, rows: &[IndicatorRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writer.write_record(CSV_HEADER)?;

    for row in rows {
        let bar = &row.bar;
        writer.write_record([
            bar.date.to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.map(|v| v.to_string()).unwrap_or_default(),
            cell(row.sma20),
            cell(row.sma50),
            cell(row.rsi14),
            cell(row.bb_upper),
            cell(row.bb_lower),
            cell(row.macd),
            cell(row.macd_signal),
            cell(row.macd_hist),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    debug!(path = %path.display(), rows = rows.len(), "indicator csv written");
    Ok(())
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
