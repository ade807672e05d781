use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::{debug, info};

use super::MetricsStore;
use crate::types::TickerRecord;

/// Stores each ticker as `<dir>/<TICKER>.json`.
///
/// Writes go to a `.json.tmp` sibling first and are renamed into place, so a
/// reader never observes a half-written document.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    // Serialises writers; two upserts of the same ticker would otherwise race
    // on the shared tmp file.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) the store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create store directory {}", dir.display()))?;
        info!(dir = %dir.display(), "json file store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(ticker)))
    }
}

impl MetricsStore for JsonFileStore {
    fn upsert(&self, record: &TickerRecord) -> Result<()> {
        let path = self.path_for(&record.ticker);
        let content = serde_json::to_string_pretty(record)
            .with_context(|| format!("failed to serialise record for {}", record.ticker))?;

        let _guard = self.write_lock.lock();
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("failed to rename {} into place", tmp_path.display()))?;

        debug!(ticker = %record.ticker, path = %path.display(), "record stored");
        Ok(())
    }

    fn get(&self, ticker: &str) -> Result<Option<TickerRecord>> {
        let path = self.path_for(ticker);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let record = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(record))
    }
}

/// Map a ticker to a safe file name: upper-cased, anything outside
/// `[A-Z0-9.-^=]` replaced by `_`.
pub(crate) fn file_stem(ticker: &str) -> String {
    ticker
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'A'..='Z' | '0'..='9' | '.' | '-' | '^' | '=' => c,
            _ => '_',
        })
        .collect()
}
