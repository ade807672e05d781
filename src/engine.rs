// =============================================================================
// Indicator Engine
// =============================================================================
//
// Turns an ordered series of daily bars into the indicator table served by the
// historical-data endpoint and written by the CSV exporter:
//
//   SMA 20 / SMA 50        warm-up per `WarmupPolicy`
//   RSI 14                 `None` until 14 deltas exist
//   Bollinger 20, k = 2    `None` with fewer than two samples in the window
//   MACD 12 / 26 / 9       defined from the first bar
//
// The engine is a pure function of (bars, config): no I/O, no logging, no
// hidden state.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::indicators::bollinger::calculate_bollinger;
use crate::indicators::macd::calculate_macd;
use crate::indicators::rsi::calculate_rsi;
use crate::indicators::sma::calculate_sma;
use crate::types::{Bar, IndicatorRow, RsiSmoothing, WarmupPolicy};

pub const SMA_SHORT_WINDOW: usize = 20;
pub const SMA_LONG_WINDOW: usize = 50;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_NUM_STD: f64 = 2.0;
pub const MACD_FAST_SPAN: usize = 12;
pub const MACD_SLOW_SPAN: usize = 26;
pub const MACD_SIGNAL_SPAN: usize = 9;

/// Knobs that change indicator semantics. Window sizes are fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default)]
    pub warmup: WarmupPolicy,
    #[serde(default)]
    pub rsi_smoothing: RsiSmoothing,
}

/// Compute the indicator table for `series`, one row per bar, in order.
///
/// # Errors
/// - [`EngineError::NoData`] for an empty series.
/// - [`EngineError::InsufficientField`] when a close is missing (non-finite)
///   or non-positive. The whole computation is rejected rather than emitting
///   rows built on a hole.
/// - [`EngineError::UnorderedSeries`] when dates are not strictly ascending.
pub fn compute_indicators(
    series: &[Bar],
    config: &IndicatorConfig,
) -> Result<Vec<IndicatorRow>, EngineError> {
    let closes = validated_closes(series)?;

    let sma20 = calculate_sma(&closes, SMA_SHORT_WINDOW, config.warmup);
    let sma50 = calculate_sma(&closes, SMA_LONG_WINDOW, config.warmup);
    let rsi = calculate_rsi(&closes, RSI_PERIOD, config.rsi_smoothing);
    let bands = calculate_bollinger(&closes, BOLLINGER_WINDOW, BOLLINGER_NUM_STD, config.warmup);
    let macd = calculate_macd(&closes, MACD_FAST_SPAN, MACD_SLOW_SPAN, MACD_SIGNAL_SPAN);

    let rows = series
        .iter()
        .enumerate()
        .map(|(i, bar)| IndicatorRow {
            bar: bar.clone(),
            sma20: sma20[i],
            sma50: sma50[i],
            rsi14: rsi[i],
            bb_upper: bands[i].map(|b| b.upper),
            bb_lower: bands[i].map(|b| b.lower),
            macd: macd.macd.get(i).copied(),
            macd_signal: macd.signal.get(i).copied(),
            macd_hist: macd.histogram.get(i).copied(),
        })
        .collect();

    Ok(rows)
}

/// Validate the series contract and extract the close prices.
pub(crate) fn validated_closes(series: &[Bar]) -> Result<Vec<f64>, EngineError> {
    if series.is_empty() {
        return Err(EngineError::NoData);
    }

    let mut closes = Vec::with_capacity(series.len());
    for (index, bar) in series.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(EngineError::InsufficientField {
                index,
                field: "close",
            });
        }
        if index > 0 && bar.date <= series[index - 1].date {
            return Err(EngineError::UnorderedSeries { index });
        }
        closes.push(bar.close);
    }
    Ok(closes)
}
