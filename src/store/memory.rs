use std::collections::HashMap;

use anyhow::Result;
use parking_lot::RwLock;

use super::MetricsStore;
use crate::types::TickerRecord;

/// Process-local store. Used when no store directory is configured and in
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, TickerRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsStore for MemoryStore {
    fn upsert(&self, record: &TickerRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.ticker.clone(), record.clone());
        Ok(())
    }

    fn get(&self, ticker: &str) -> Result<Option<TickerRecord>> {
        Ok(self.records.read().get(ticker).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn upsert_replaces_by_ticker() {
        let store = MemoryStore::new();
        let mut rec = TickerRecord {
            ticker: "SQM-B.SN".into(),
            fundamentals: Default::default(),
            metrics: Default::default(),
            updated_at: Utc::now(),
        };
        store.upsert(&rec).unwrap();
        rec.metrics.sharpe_ratio = Some(0.8);
        store.upsert(&rec).unwrap();

        assert_eq!(store.records.read().len(), 1);
        assert_eq!(store.get("SQM-B.SN").unwrap().unwrap().metrics.sharpe_ratio, Some(0.8));
        assert!(store.get("SQM-A.SN").unwrap().is_none());
    }
}
