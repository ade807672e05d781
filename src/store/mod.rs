// =============================================================================
// Metrics store — persisted per-ticker documents
// =============================================================================
//
// One `TickerRecord` per ticker. `upsert` overwrites the previous document in
// full; there is no history or versioning.
// =============================================================================

mod json_file;
mod memory;

use anyhow::Result;

use crate::types::TickerRecord;

pub(crate) use json_file::file_stem;
pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Keyed document sink for the scheduled metrics update.
pub trait MetricsStore: Send + Sync {
    /// Insert or replace the document for `record.ticker`.
    fn upsert(&self, record: &TickerRecord) -> Result<()>;

    fn get(&self, ticker: &str) -> Result<Option<TickerRecord>>;
}
