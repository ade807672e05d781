// =============================================================================
// MACD (Moving Average Convergence Divergence)
// =============================================================================
//
//   MACD      = EMA_fast(close) - EMA_slow(close)
//   Signal    = EMA_signal(MACD)
//   Histogram = MACD - Signal
//
// Every EMA is seeded at its first observation, so all three lines are
// defined from the first bar onward.
// =============================================================================

use crate::indicators::ema::calculate_ema;

/// MACD line, signal line and histogram, each one entry per close.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Calculate MACD for `closes`.
///
/// Returns empty series when any span is zero or the input is empty.
pub fn calculate_macd(
    closes: &[f64],
    fast_span: usize,
    slow_span: usize,
    signal_span: usize,
) -> MacdSeries {
    let fast = calculate_ema(closes, fast_span);
    let slow = calculate_ema(closes, slow_span);
    if fast.is_empty() || slow.is_empty() || signal_span == 0 {
        return MacdSeries::default();
    }

    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = calculate_ema(&macd, signal_span);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    MacdSeries {
        macd,
        signal,
        histogram,
    }
}
