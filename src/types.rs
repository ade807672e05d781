// =============================================================================
// Shared types used across the market-pulse service
// =============================================================================
//
// Wire names follow the column names of the historical-data payload consumed
// by the dashboard client ("Date", "Close", "SMA_20", ...) and the field names
// of the persisted ticker documents ("AnnualReturn", "SharpeRatio", ...).
// =============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One daily OHLC(V) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<u64>,
}

impl Bar {
    /// Bar whose open/high/low all equal `close`. Handy for fixtures and for
    /// provider rows that only carry a close.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: None,
        }
    }
}

/// A [`Bar`] extended with the derived indicator columns.
///
/// Every derived field is `None` exactly when the series does not yet hold
/// enough history to define it under the active warm-up policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub bar: Bar,
    #[serde(rename = "SMA_20")]
    pub sma20: Option<f64>,
    #[serde(rename = "SMA_50")]
    pub sma50: Option<f64>,
    #[serde(rename = "RSI")]
    pub rsi14: Option<f64>,
    #[serde(rename = "BB_upper")]
    pub bb_upper: Option<f64>,
    #[serde(rename = "BB_lower")]
    pub bb_lower: Option<f64>,
    #[serde(rename = "MACD")]
    pub macd: Option<f64>,
    #[serde(rename = "Signal")]
    pub macd_signal: Option<f64>,
    #[serde(rename = "MACD_Hist")]
    pub macd_hist: Option<f64>,
}

/// Return/risk summary of one price series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(rename = "AnnualReturn")]
    pub annualized_return: Option<f64>,
    #[serde(rename = "AnnualVolatility")]
    pub annualized_volatility: Option<f64>,
    /// `None` whenever annualized volatility is zero or undefined.
    #[serde(rename = "SharpeRatio")]
    pub sharpe_ratio: Option<f64>,
    /// Non-positive; `Some(0.0)` when the cumulative return never dips.
    #[serde(rename = "MaxDrawdown")]
    pub max_drawdown: Option<f64>,
}

/// Company fundamentals as reported by the market-data provider. Passed
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    #[serde(rename = "Company")]
    pub company_name: Option<String>,
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
    #[serde(rename = "MarketCap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "PE")]
    pub trailing_pe: Option<f64>,
    #[serde(rename = "PB")]
    pub price_to_book: Option<f64>,
    #[serde(rename = "ROE")]
    pub return_on_equity: Option<f64>,
    #[serde(rename = "DebtToEquity")]
    pub debt_to_equity: Option<f64>,
    #[serde(rename = "DividendYield")]
    pub dividend_yield: Option<f64>,
}

/// The document persisted per ticker by the scheduled update: fundamentals
/// merged with performance metrics plus a server-assigned timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(flatten)]
    pub fundamentals: FundamentalsSnapshot,
    #[serde(flatten)]
    pub metrics: PerformanceMetrics,
    #[serde(rename = "Timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// How simple moving averages (and the Bollinger window built on them)
/// behave before the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPolicy {
    /// Average whatever history is available (`min_periods = 1`).
    Expand,
    /// `None` until the full window is available.
    Strict,
}

impl Default for WarmupPolicy {
    fn default() -> Self {
        Self::Expand
    }
}

impl std::fmt::Display for WarmupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expand => write!(f, "expand"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Averaging applied to RSI gains and losses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiSmoothing {
    /// Exponential smoothing with `alpha = 1 / period`, seeded with the mean
    /// of the first `period` gains/losses.
    Wilder,
    /// Plain rolling mean over the last `period` gains/losses.
    Simple,
}

impl Default for RsiSmoothing {
    fn default() -> Self {
        Self::Wilder
    }
}

impl std::fmt::Display for RsiSmoothing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wilder => write!(f, "wilder"),
            Self::Simple => write!(f, "simple"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn indicator_row_uses_dashboard_column_names() {
        let row = IndicatorRow {
            bar: Bar::flat(day(4), 10.0),
            sma20: Some(10.0),
            sma50: Some(10.0),
            rsi14: None,
            bb_upper: None,
            bb_lower: None,
            macd: Some(0.0),
            macd_signal: Some(0.0),
            macd_hist: Some(0.0),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Date"], "2024-03-04");
        assert_eq!(json["Close"], 10.0);
        assert_eq!(json["SMA_20"], 10.0);
        assert!(json["RSI"].is_null());
        assert!(json["BB_upper"].is_null());
        assert_eq!(json["MACD_Hist"], 0.0);
    }

    #[test]
    fn ticker_record_flattens_fundamentals_and_metrics() {
        let record = TickerRecord {
            ticker: "CHILE.SN".into(),
            fundamentals: FundamentalsSnapshot {
                company_name: Some("Banco de Chile".into()),
                trailing_pe: Some(9.5),
                ..Default::default()
            },
            metrics: PerformanceMetrics {
                annualized_return: Some(0.12),
                annualized_volatility: Some(0.2),
                sharpe_ratio: Some(0.6),
                max_drawdown: Some(-0.15),
            },
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Ticker"], "CHILE.SN");
        assert_eq!(json["Company"], "Banco de Chile");
        assert_eq!(json["PE"], 9.5);
        assert!(json["Sector"].is_null());
        assert_eq!(json["SharpeRatio"], 0.6);

        let back: TickerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn policies_deserialise_lowercase() {
        let p: WarmupPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(p, WarmupPolicy::Strict);
        let s: RsiSmoothing = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(s, RsiSmoothing::Simple);
        assert_eq!(WarmupPolicy::default(), WarmupPolicy::Expand);
        assert_eq!(RsiSmoothing::default(), RsiSmoothing::Wilder);
    }
}
