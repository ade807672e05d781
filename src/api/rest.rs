// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Request bodies follow the callable
// envelope used by the dashboard client: `{ "data": { ... } }`. Every failure
// is returned as `{ "error", "code" }` via `ApiError`; malformed JSON is
// caught here rather than by axum's extractor so that shape holds for it too.
//
// CORS is configured permissively; the service is read-only.
// =============================================================================

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::ApiError;
use crate::app_state::AppState;
use crate::batch::BatchReport;
use crate::correlation::{return_correlation, CorrelationMatrix};
use crate::engine::compute_indicators;
use crate::indicators::rsi::{zone, RsiZone};
use crate::provider::ProviderError;
use crate::types::{IndicatorRow, TickerRecord};

/// Upper bound on tickers in one correlation request.
const MAX_CORRELATION_TICKERS: usize = 25;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/historical", post(historical))
        .route("/api/v1/correlation", post(correlation))
        .route("/api/v1/tickers/:ticker", get(ticker_record))
        .route("/api/v1/batch/last", get(last_batch))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    batch_running: bool,
    tickers: usize,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        batch_running: state.is_batch_running(),
        tickers: state.runtime_config.read().tickers.len(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Request envelope
// =============================================================================

#[derive(Deserialize)]
struct Envelope {
    data: Option<serde_json::Value>,
}

/// Unwrap `{ "data": ... }` and decode the payload as `T`.
fn request_data<T: DeserializeOwned>(body: &[u8], missing: &str) -> Result<T, ApiError> {
    let envelope: Envelope = serde_json::from_slice(body).map_err(|_| {
        ApiError::InvalidArgument("Invalid request format. Missing 'data' field.".into())
    })?;
    let data = envelope
        .data
        .filter(|d| d.is_object())
        .ok_or_else(|| {
            ApiError::InvalidArgument("Invalid request format. Missing 'data' field.".into())
        })?;
    serde_json::from_value(data).map_err(|_| ApiError::InvalidArgument(missing.to_string()))
}

/// Parse a `[startDate, endDate)` pair; both `YYYY-MM-DD`.
fn date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let parse = |name: &str, value: &str| {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::InvalidArgument(format!("Invalid {name} '{value}'. Expected YYYY-MM-DD."))
        })
    };
    let start = parse("startDate", start)?;
    let end = parse("endDate", end)?;
    if start >= end {
        return Err(ApiError::InvalidArgument(
            "startDate must be before endDate.".into(),
        ));
    }
    Ok((start, end))
}

fn no_data(ticker: &str) -> ApiError {
    ApiError::NotFound(format!(
        "No historical data found for {ticker} within the specified range."
    ))
}

fn fetch_failed(ticker: &str, e: ProviderError) -> ApiError {
    match e {
        ProviderError::NotFound(_) => no_data(ticker),
        other => other.into(),
    }
}

// =============================================================================
// Historical data with indicators
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoricalParams {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    end_date: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoricalResponse {
    ticker: String,
    historical_data: Vec<IndicatorRow>,
    /// Zone of the most recent defined RSI reading.
    rsi_zone: Option<RsiZone>,
}

async fn historical(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<HistoricalResponse>, ApiError> {
    const MISSING: &str = "Missing ticker, startDate, or endDate parameters.";

    let params: HistoricalParams = request_data(&body, MISSING)?;
    let ticker = params.ticker.trim().to_uppercase();
    if ticker.is_empty() || params.start_date.trim().is_empty() || params.end_date.trim().is_empty()
    {
        return Err(ApiError::InvalidArgument(MISSING.into()));
    }
    let (start, end) = date_range(&params.start_date, &params.end_date)?;

    let bars = state
        .provider
        .fetch_bars(&ticker, start, end)
        .await
        .map_err(|e| fetch_failed(&ticker, e))?;
    if bars.is_empty() {
        return Err(no_data(&ticker));
    }

    let indicators = state.runtime_config.read().indicators;
    let rows = compute_indicators(&bars, &indicators)?;
    let rsi_zone = rows.iter().rev().find_map(|r| r.rsi14).map(zone);

    info!(ticker = %ticker, %start, %end, rows = rows.len(), "historical data served");

    Ok(Json(HistoricalResponse {
        ticker,
        historical_data: rows,
        rsi_zone,
    }))
}

// =============================================================================
// Return correlation
// =============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorrelationParams {
    #[serde(default)]
    tickers: Vec<String>,
    #[serde(default)]
    start_date: String,
    #[serde(default)]
    end_date: String,
}

async fn correlation(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CorrelationMatrix>, ApiError> {
    const MISSING: &str = "Missing tickers, startDate, or endDate parameters.";

    let params: CorrelationParams = request_data(&body, MISSING)?;
    let mut tickers: Vec<String> = Vec::with_capacity(params.tickers.len());
    for t in &params.tickers {
        let t = t.trim().to_uppercase();
        if !t.is_empty() && !tickers.contains(&t) {
            tickers.push(t);
        }
    }
    if tickers.len() < 2 {
        return Err(ApiError::InvalidArgument(
            "At least two distinct tickers are required.".into(),
        ));
    }
    if tickers.len() > MAX_CORRELATION_TICKERS {
        return Err(ApiError::InvalidArgument(format!(
            "At most {MAX_CORRELATION_TICKERS} tickers per request."
        )));
    }
    if params.start_date.trim().is_empty() || params.end_date.trim().is_empty() {
        return Err(ApiError::InvalidArgument(MISSING.into()));
    }
    let (start, end) = date_range(&params.start_date, &params.end_date)?;

    let mut series = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let bars = state
            .provider
            .fetch_bars(&ticker, start, end)
            .await
            .map_err(|e| fetch_failed(&ticker, e))?;
        if bars.is_empty() {
            return Err(no_data(&ticker));
        }
        series.push((ticker, bars));
    }

    let matrix = return_correlation(&series)?;
    info!(
        tickers = matrix.tickers.len(),
        observations = matrix.observations,
        "correlation matrix served"
    );
    Ok(Json(matrix))
}

// =============================================================================
// Stored metrics & batch status
// =============================================================================

async fn ticker_record(
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Result<Json<TickerRecord>, ApiError> {
    let ticker = ticker.trim().to_uppercase();
    state
        .store
        .get(&ticker)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No stored metrics for {ticker}.")))
}

async fn last_batch(State(state): State<Arc<AppState>>) -> Result<Json<BatchReport>, ApiError> {
    state
        .last_batch
        .read()
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No metrics update has run yet.".into()))
}
