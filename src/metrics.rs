//! Return-based performance metrics for a single price series.
//!
//! Daily simple returns are annualised with a fixed 252-trading-day year,
//! independent of the calendar span the series actually covers.

use crate::engine::validated_closes;
use crate::error::EngineError;
use crate::indicators::bollinger::sample_std_dev;
use crate::indicators::sma::mean;
use crate::types::{Bar, PerformanceMetrics};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Compute annualised return/volatility, Sharpe ratio and max drawdown.
///
/// # Errors
/// - [`EngineError::NoData`] for an empty series.
/// - [`EngineError::InsufficientHistory`] with a single bar (no return can be
///   formed).
/// - [`EngineError::InsufficientField`] / [`EngineError::UnorderedSeries`] as
///   for the indicator engine.
pub fn compute_metrics(series: &[Bar]) -> Result<PerformanceMetrics, EngineError> {
    let closes = validated_closes(series)?;
    if closes.len() < 2 {
        return Err(EngineError::InsufficientHistory {
            required: 2,
            actual: closes.len(),
        });
    }

    let returns = daily_returns(&closes);

    let annualized_return = mean(&returns)
        .map(|m| m * TRADING_DAYS_PER_YEAR)
        .filter(|v| v.is_finite());
    let annualized_volatility = mean(&returns)
        .and_then(|m| sample_std_dev(&returns, m))
        .map(|v| v * TRADING_DAYS_PER_YEAR.sqrt())
        .filter(|v| v.is_finite());

    let sharpe_ratio = match (annualized_return, annualized_volatility) {
        (Some(ret), Some(vol)) if vol > 0.0 => Some(ret / vol).filter(|v| v.is_finite()),
        _ => None,
    };

    Ok(PerformanceMetrics {
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(&returns),
    })
}

/// `close[i] / close[i-1] - 1` for every consecutive pair.
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Largest peak-to-trough decline of the compounded return path.
///
/// The path starts at 1.0 before the first return, so an initial loss counts
/// as a drawdown. Returns `Some(0.0)` when the path never falls below a prior
/// peak and `None` for an empty return series.
pub fn max_drawdown(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }

    let mut cumulative = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;

    for r in returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        worst = worst.min(cumulative / peak - 1.0);
    }

    worst.is_finite().then_some(worst)
}
