// =============================================================================
// Yahoo Finance REST client — daily bars and company fundamentals
// =============================================================================
//
// Uses the public chart endpoint for price history and the quoteSummary
// endpoint for fundamentals. Numeric fields in quoteSummary come wrapped as
// `{ "raw": 1.23, "fmt": "1.23" }`; only `raw` is read.
//
// Daily timestamps are exchange-local midnights expressed in UTC, so the bar
// date is taken after applying the exchange's `gmtoffset`.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use super::error::ProviderError;
use super::rate_limit::{PacerSnapshot, RequestPacer};
use super::MarketDataProvider;
use crate::types::{Bar, FundamentalsSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const QUOTE_SUMMARY_MODULES: &str =
    "price,summaryProfile,summaryDetail,defaultKeyStatistics,financialData";

/// Yahoo Finance client with request pacing.
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
    pacer: RequestPacer,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `YahooClient`.
    ///
    /// # Arguments
    /// * `base_url`: API root, normally [`DEFAULT_BASE_URL`].
    /// * `min_spacing`: minimum delay between two consecutive requests.
    pub fn new(base_url: impl Into<String>, min_spacing: Duration) -> Result<Self, ProviderError> {
        let mut default_headers = HeaderMap::new();
        // Requests without a browser-like agent are rejected outright.
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (compatible; market-pulse/1.0)"),
        );

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "YahooClient initialised");

        Ok(Self {
            base_url,
            client,
            pacer: RequestPacer::new(min_spacing),
        })
    }

    pub fn pacer_snapshot(&self) -> PacerSnapshot {
        self.pacer.snapshot()
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// GET `url` and decode the JSON body. 404 bodies are still returned so
    /// the caller can read Yahoo's structured error.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ProviderError> {
        self.pacer.acquire().await;

        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            self.pacer.record_throttled();
        }

        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: truncate(&message, 200),
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    /// GET /v8/finance/chart/{ticker} for `[start, end)` at daily interval.
    #[instrument(skip(self), name = "yahoo::fetch_bars")]
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ProviderError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=div%2Csplit",
            self.base_url, ticker, period1, period2
        );

        let body = self.get_json(&url).await?;
        let bars: Vec<Bar> = parse_chart(ticker, &body)?
            .into_iter()
            .filter(|b| b.date >= start && b.date < end)
            .collect();

        debug!(ticker, count = bars.len(), "bars fetched");
        Ok(bars)
    }

    /// GET /v10/finance/quoteSummary/{ticker}.
    #[instrument(skip(self), name = "yahoo::fetch_fundamentals")]
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<FundamentalsSnapshot, ProviderError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, ticker, QUOTE_SUMMARY_MODULES
        );
        let body = self.get_json(&url).await?;
        let snapshot = parse_fundamentals(ticker, &body)?;
        debug!(ticker, company = ?snapshot.company_name, "fundamentals fetched");
        Ok(snapshot)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .field("pacer", &self.pacer)
            .finish()
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Turn a chart response into ascending, date-unique bars.
///
/// Rows without a close are skipped. A repeated date (Yahoo appends the live
/// session as an extra row) replaces the earlier row. Missing open/high/low
/// fall back to the close.
pub(crate) fn parse_chart(ticker: &str, body: &serde_json::Value) -> Result<Vec<Bar>, ProviderError> {
    let chart = &body["chart"];
    check_error(ticker, &chart["error"])?;

    let result = chart["result"]
        .as_array()
        .and_then(|r| r.first())
        .ok_or_else(|| ProviderError::Malformed("chart.result is missing".into()))?;

    // No trading days in range: Yahoo omits the timestamp array entirely.
    let Some(timestamps) = result["timestamp"].as_array() else {
        return Ok(Vec::new());
    };

    let gmt_offset = result["meta"]["gmtoffset"].as_i64().unwrap_or(0);
    let quote = &result["indicators"]["quote"][0];
    let column = |name: &str| quote[name].as_array().cloned().unwrap_or_default();
    let (opens, highs, lows, closes, volumes) = (
        column("open"),
        column("high"),
        column("low"),
        column("close"),
        column("volume"),
    );

    let mut bars: Vec<Bar> = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, ts) in timestamps.iter().enumerate() {
        let ts = ts
            .as_i64()
            .ok_or_else(|| ProviderError::Malformed(format!("timestamp[{i}] is not an integer")))?;
        let Some(close) = closes.get(i).and_then(|v| v.as_f64()) else {
            skipped += 1;
            continue;
        };
        let date = DateTime::from_timestamp(ts + gmt_offset, 0)
            .ok_or_else(|| ProviderError::Malformed(format!("timestamp {ts} out of range")))?
            .date_naive();

        let price = |col: &[serde_json::Value]| col.get(i).and_then(|v| v.as_f64()).unwrap_or(close);
        let bar = Bar {
            open: price(&opens),
            high: price(&highs),
            low: price(&lows),
            volume: volumes
                .get(i)
                .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64))),
            ..Bar::flat(date, close)
        };

        match bars.last().map(|b| b.date) {
            Some(prev) if prev == bar.date => {
                bars.pop();
                bars.push(bar);
            }
            Some(prev) if prev > bar.date => {
                warn!(ticker, date = %bar.date, "out-of-order bar dropped");
            }
            _ => bars.push(bar),
        }
    }

    if skipped > 0 {
        debug!(ticker, skipped, "rows without close skipped");
    }
    Ok(bars)
}

/// Extract the fundamentals fields from a quoteSummary response.
pub(crate) fn parse_fundamentals(
    ticker: &str,
    body: &serde_json::Value,
) -> Result<FundamentalsSnapshot, ProviderError> {
    let summary = &body["quoteSummary"];
    check_error(ticker, &summary["error"])?;

    let result = summary["result"]
        .as_array()
        .and_then(|r| r.first())
        .ok_or_else(|| ProviderError::Malformed("quoteSummary.result is missing".into()))?;

    let raw = |module: &str, field: &str| -> Option<f64> {
        let value = &result[module][field];
        value["raw"].as_f64().or_else(|| value.as_f64())
    };
    let text = |module: &str, field: &str| -> Option<String> {
        result[module][field].as_str().map(str::to_string)
    };

    Ok(FundamentalsSnapshot {
        company_name: text("price", "longName").or_else(|| text("price", "shortName")),
        sector: text("summaryProfile", "sector"),
        market_cap: raw("price", "marketCap").or_else(|| raw("summaryDetail", "marketCap")),
        trailing_pe: raw("summaryDetail", "trailingPE"),
        price_to_book: raw("defaultKeyStatistics", "priceToBook"),
        return_on_equity: raw("financialData", "returnOnEquity"),
        debt_to_equity: raw("financialData", "debtToEquity"),
        dividend_yield: raw("summaryDetail", "dividendYield"),
    })
}

/// Map Yahoo's `{ "code": ..., "description": ... }` error object.
fn check_error(ticker: &str, error: &serde_json::Value) -> Result<(), ProviderError> {
    if error.is_null() {
        return Ok(());
    }
    let code = error["code"].as_str().unwrap_or_default();
    let description = error["description"].as_str().unwrap_or_default();
    if code.eq_ignore_ascii_case("Not Found") {
        return Err(ProviderError::NotFound(ticker.to_string()));
    }
    Err(ProviderError::Api {
        status: 200,
        message: format!("{code}: {description}"),
    })
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_chart_ok() {
        // 2024-01-02 and 2024-01-03 13:30 UTC, NYSE offset -18000.
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL", "gmtoffset": -18000 },
                    "timestamp": [1704205800, 1704292200],
                    "indicators": { "quote": [{
                        "open":   [187.15, 184.22],
                        "high":   [188.44, 185.88],
                        "low":    [183.89, 183.43],
                        "close":  [185.64, 184.25],
                        "volume": [82488700, 58414500]
                    }]}
                }],
                "error": null
            }
        });
        let bars = parse_chart("AAPL", &body).expect("should parse");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 2));
        assert_eq!(bars[1].date, date(2024, 1, 3));
        assert!((bars[0].close - 185.64).abs() < f64::EPSILON);
        assert_eq!(bars[1].volume, Some(58_414_500));
    }

    #[test]
    fn parse_chart_skips_null_close_and_dedups_dates() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 0 },
                    "timestamp": [1704153600, 1704240000, 1704326400, 1704330000],
                    "indicators": { "quote": [{
                        "open":   [1.0, null, null, 3.1],
                        "high":   [1.0, null, null, 3.2],
                        "low":    [1.0, null, null, 2.9],
                        "close":  [1.0, null, 3.0, 3.05],
                        "volume": [10, null, 30, 35]
                    }]}
                }],
                "error": null
            }
        });
        let bars = parse_chart("X", &body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, date(2024, 1, 2));
        assert_eq!(bars[1].date, date(2024, 1, 4));
        // The later row of the same day wins.
        assert_eq!(bars[1].close, 3.05);
        assert_eq!(bars[1].open, 3.1);
    }

    #[test]
    fn parse_chart_missing_open_falls_back_to_close() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {},
                    "timestamp": [1704153600],
                    "indicators": { "quote": [{ "close": [7.5] }] }
                }],
                "error": null
            }
        });
        let bars = parse_chart("X", &body).unwrap();
        assert_eq!(bars[0], Bar::flat(date(2024, 1, 2), 7.5));
    }

    #[test]
    fn parse_chart_empty_range() {
        let body = json!({
            "chart": {
                "result": [{ "meta": {}, "indicators": { "quote": [{}] } }],
                "error": null
            }
        });
        assert!(parse_chart("X", &body).unwrap().is_empty());
    }

    #[test]
    fn parse_chart_not_found() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        assert!(matches!(
            parse_chart("NOPE.SN", &body),
            Err(ProviderError::NotFound(t)) if t == "NOPE.SN"
        ));
    }

    #[test]
    fn parse_chart_other_error() {
        let body = json!({
            "chart": { "result": null, "error": { "code": "Bad Request", "description": "Invalid input" } }
        });
        assert!(matches!(parse_chart("X", &body), Err(ProviderError::Api { .. })));
    }

    #[test]
    fn parse_fundamentals_ok() {
        let body = json!({
            "quoteSummary": {
                "result": [{
                    "price": { "longName": "Banco Santander-Chile", "marketCap": { "raw": 8.9e12, "fmt": "8.9T" } },
                    "summaryProfile": { "sector": "Financial Services" },
                    "summaryDetail": { "trailingPE": { "raw": 10.2 }, "dividendYield": { "raw": 0.061 } },
                    "defaultKeyStatistics": { "priceToBook": { "raw": 2.1 } },
                    "financialData": { "returnOnEquity": { "raw": 0.19 }, "debtToEquity": {} }
                }],
                "error": null
            }
        });
        let f = parse_fundamentals("BSANTANDER.SN", &body).unwrap();
        assert_eq!(f.company_name.as_deref(), Some("Banco Santander-Chile"));
        assert_eq!(f.sector.as_deref(), Some("Financial Services"));
        assert_eq!(f.market_cap, Some(8.9e12));
        assert_eq!(f.trailing_pe, Some(10.2));
        assert_eq!(f.price_to_book, Some(2.1));
        assert_eq!(f.return_on_equity, Some(0.19));
        assert_eq!(f.debt_to_equity, None);
        assert_eq!(f.dividend_yield, Some(0.061));
    }

    #[test]
    fn parse_fundamentals_missing_result() {
        let body = json!({ "quoteSummary": { "result": [], "error": null } });
        assert!(matches!(
            parse_fundamentals("X", &body),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn truncate_long_messages() {
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn debug_output_hides_http_client() {
        let client = YahooClient::new("https://example.test/", Duration::ZERO).unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("https://example.test"));
        assert!(!debug.contains("example.test/\""));
    }
}
