// =============================================================================
// Market-data provider boundary
// =============================================================================
//
// The batch updater and the HTTP layer only see `MarketDataProvider`; the
// concrete Yahoo client lives behind it so tests can swap in fixtures.
// =============================================================================

pub mod error;
pub mod rate_limit;
pub mod yahoo;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::{Bar, FundamentalsSnapshot};

pub use error::ProviderError;
pub use yahoo::YahooClient;

/// Source of daily price history and company fundamentals.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `ticker` with `start <= date < end`, ascending.
    ///
    /// An empty vector means the symbol exists but did not trade in the range.
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ProviderError>;

    async fn fetch_fundamentals(&self, ticker: &str) -> Result<FundamentalsSnapshot, ProviderError>;
}

#[cfg(test)]
pub mod fixture {
    //! In-memory provider used by the batch and API tests.

    use std::collections::HashMap;
    use std::time::Duration;

    use chrono::Days;

    use super::*;

    #[derive(Debug, Default)]
    pub struct StaticProvider {
        bars: HashMap<String, Vec<Bar>>,
        fundamentals: HashMap<String, FundamentalsSnapshot>,
        failing: Vec<String>,
        delays: HashMap<String, Duration>,
    }

    impl StaticProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register `closes` for `ticker`, one bar per day from `start`.
        pub fn with_closes(mut self, ticker: &str, start: NaiveDate, closes: &[f64]) -> Self {
            let bars = closes
                .iter()
                .enumerate()
                .map(|(i, &c)| Bar::flat(start + Days::new(i as u64), c))
                .collect();
            self.bars.insert(ticker.to_string(), bars);
            self
        }

        pub fn with_fundamentals(mut self, ticker: &str, snapshot: FundamentalsSnapshot) -> Self {
            self.fundamentals.insert(ticker.to_string(), snapshot);
            self
        }

        /// Make every call for `ticker` fail with an API error.
        pub fn failing(mut self, ticker: &str) -> Self {
            self.failing.push(ticker.to_string());
            self
        }

        /// Make `fetch_bars` for `ticker` sleep for `delay` before answering.
        pub fn slow(mut self, ticker: &str, delay: Duration) -> Self {
            self.delays.insert(ticker.to_string(), delay);
            self
        }

        fn check(&self, ticker: &str) -> Result<(), ProviderError> {
            if self.failing.iter().any(|t| t == ticker) {
                return Err(ProviderError::Api {
                    status: 503,
                    message: "upstream unavailable".into(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MarketDataProvider for StaticProvider {
        async fn fetch_bars(
            &self,
            ticker: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<Bar>, ProviderError> {
            if let Some(delay) = self.delays.get(ticker) {
                tokio::time::sleep(*delay).await;
            }
            self.check(ticker)?;
            let bars = self
                .bars
                .get(ticker)
                .ok_or_else(|| ProviderError::NotFound(ticker.to_string()))?;
            Ok(bars
                .iter()
                .filter(|b| b.date >= start && b.date < end)
                .cloned()
                .collect())
        }

        async fn fetch_fundamentals(
            &self,
            ticker: &str,
        ) -> Result<FundamentalsSnapshot, ProviderError> {
            self.check(ticker)?;
            self.fundamentals
                .get(ticker)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(ticker.to_string()))
        }
    }
}
