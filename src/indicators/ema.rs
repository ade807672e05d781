// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   alpha  = 2 / (span + 1)
//   EMA_0  = value_0
//   EMA_t  = alpha * value_t + (1 - alpha) * EMA_{t-1}
//          = EMA_{t-1} + alpha * (value_t - EMA_{t-1})
//
// Seeded at the first observation, so the series is defined from index 0.
// The second (incremental) form is evaluated: it keeps a flat input exactly
// flat.
// =============================================================================

/// Compute the EMA series for `values` with the given `span`.
///
/// The output has the same length as the input.
///
/// # Edge cases
/// - `span == 0` => empty vec
/// - empty input => empty vec
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return Vec::new();
    }
    let Some((&first, rest)) = values.split_first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (span as f64 + 1.0);

    let mut result = Vec::with_capacity(values.len());
    result.push(first);

    let mut prev = first;
    for &value in rest {
        let ema = prev + alpha * (value - prev);
        result.push(ema);
        prev = ema;
    }

    result
}
