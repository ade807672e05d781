// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA_w[i] = mean(close[max(0, i-w+1) ..= i])
//
// Under `WarmupPolicy::Expand` the first `w-1` rows average whatever history
// exists; under `WarmupPolicy::Strict` they are `None`.
// =============================================================================

use crate::types::WarmupPolicy;

/// Trailing window ending at `index`, or `None` when the policy says the
/// window is not yet usable.
///
/// Shared with the Bollinger calculation so the middle band and the SMA are
/// computed from the exact same samples.
pub(crate) fn trailing_window(
    values: &[f64],
    index: usize,
    window: usize,
    policy: WarmupPolicy,
) -> Option<&[f64]> {
    if window == 0 || index >= values.len() {
        return None;
    }
    if policy == WarmupPolicy::Strict && index + 1 < window {
        return None;
    }
    let start = (index + 1).saturating_sub(window);
    Some(&values[start..=index])
}

/// Arithmetic mean, accumulated as offsets from the first value so that a
/// constant window yields exactly that value.
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    let (&first, _) = values.split_first()?;
    let offset = values.iter().map(|x| x - first).sum::<f64>() / values.len() as f64;
    Some(first + offset)
}

/// Compute the SMA series, one entry per close.
pub fn calculate_sma(closes: &[f64], window: usize, policy: WarmupPolicy) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| trailing_window(closes, i, window, policy).and_then(mean))
        .collect()
}
