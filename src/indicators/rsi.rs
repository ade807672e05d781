// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — delta[i] = close[i] - close[i-1] (undefined at i = 0).
// Step 2 — gain = max(delta, 0), loss = max(-delta, 0).
// Step 3 — Average gains / losses over `period` deltas, either
//            Wilder:  seed with the mean of the first `period` values, then
//                     avg = avg + alpha * (value - avg), alpha = 1 / period
//            Simple:  rolling mean of the last `period` values
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// Rows before index `period` have fewer than `period` deltas and are `None`.
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use serde::Serialize;

use crate::types::RsiSmoothing;

/// Compute the RSI series for `closes`, one entry per close.
///
/// # Edge cases
/// - `period == 0` or `closes.len() <= period` => all `None`
/// - average loss zero (only gains) => 100.0
/// - average gain and loss both zero (no movement) => `None`
pub fn calculate_rsi(closes: &[f64], period: usize, smoothing: RsiSmoothing) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    // deltas[j] is the change into close[j + 1].
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let period_f = period as f64;

    match smoothing {
        RsiSmoothing::Wilder => {
            let alpha = 1.0 / period_f;
            let mut avg_gain = gains[..period].iter().sum::<f64>() / period_f;
            let mut avg_loss = losses[..period].iter().sum::<f64>() / period_f;
            result[period] = rsi_from_averages(avg_gain, avg_loss);

            for j in period..gains.len() {
                avg_gain += alpha * (gains[j] - avg_gain);
                avg_loss += alpha * (losses[j] - avg_loss);
                result[j + 1] = rsi_from_averages(avg_gain, avg_loss);
            }
        }
        RsiSmoothing::Simple => {
            for j in (period - 1)..gains.len() {
                let from = j + 1 - period;
                let avg_gain = gains[from..=j].iter().sum::<f64>() / period_f;
                let avg_loss = losses[from..=j].iter().sum::<f64>() / period_f;
                result[j + 1] = rsi_from_averages(avg_gain, avg_loss);
            }
        }
    }

    result
}

/// Overbought / oversold classification of an RSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl std::fmt::Display for RsiZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overbought => write!(f, "OVERBOUGHT"),
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Classify an RSI value against the 70 / 30 thresholds.
pub fn zone(rsi: f64) -> RsiZone {
    if rsi >= 70.0 {
        RsiZone::Overbought
    } else if rsi <= 30.0 {
        RsiZone::Oversold
    } else {
        RsiZone::Neutral
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return None;
    }
    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|x| x as f64).collect()
    }

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], 14, RsiSmoothing::Wilder).is_empty());
    }

    #[test]
    fn rsi_period_zero() {
        let rsi = calculate_rsi(&[1.0, 2.0, 3.0], 0, RsiSmoothing::Wilder);
        assert_eq!(rsi, vec![None, None, None]);
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let rsi = calculate_rsi(&ascending(14), 14, RsiSmoothing::Wilder);
        assert_eq!(rsi.len(), 14);
        assert!(rsi.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_seeds_at_index_period() {
        let closes = [
            10.0, 11.0, 12.0, 11.0, 10.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0,
            18.0,
        ];
        for smoothing in [RsiSmoothing::Wilder, RsiSmoothing::Simple] {
            let rsi = calculate_rsi(&closes, 14, smoothing);
            assert!(rsi[..14].iter().all(Option::is_none));
            // Gains: 1+1+1+1+1+1+1+1+1+1+1 = 11, losses: 1+1+1 = 3.
            let expected = 100.0 - 100.0 / (1.0 + 11.0 / 3.0);
            let value = rsi[14].unwrap();
            assert!((value - expected).abs() < 1e-10, "{smoothing}: {value}");
        }
    }

    #[test]
    fn rsi_wilder_smoothing_after_seed() {
        // 15 deltas: first 14 are +1, the 15th is -2.
        let mut closes = ascending(15);
        closes.push(13.0);
        let rsi = calculate_rsi(&closes, 14, RsiSmoothing::Wilder);

        let alpha = 1.0 / 14.0;
        let avg_gain = 1.0 + alpha * (0.0 - 1.0);
        let avg_loss = 0.0 + alpha * (2.0 - 0.0);
        let expected = 100.0 - 100.0 / (1.0 + avg_gain / avg_loss);
        assert!((rsi[15].unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn rsi_simple_rolls_window() {
        let mut closes = ascending(15);
        closes.push(13.0);
        let rsi = calculate_rsi(&closes, 14, RsiSmoothing::Simple);
        // Window of the last 14 deltas: 13 gains of 1, one loss of 2.
        let expected = 100.0 - 100.0 / (1.0 + 13.0 / 2.0);
        assert!((rsi[15].unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn rsi_all_gains() {
        for smoothing in [RsiSmoothing::Wilder, RsiSmoothing::Simple] {
            let rsi = calculate_rsi(&ascending(40), 14, smoothing);
            for v in rsi.iter().skip(14) {
                assert_eq!(*v, Some(100.0));
            }
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=40).rev().map(|x| x as f64).collect();
        let rsi = calculate_rsi(&closes, 14, RsiSmoothing::Wilder);
        for v in rsi.iter().skip(14) {
            assert!(v.unwrap().abs() < 1e-10);
        }
    }

    #[test]
    fn rsi_flat_market_is_undefined() {
        let rsi = calculate_rsi(&[100.0; 40], 14, RsiSmoothing::Wilder);
        assert!(rsi.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for v in calculate_rsi(&closes, 14, RsiSmoothing::Wilder).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn zone_thresholds() {
        assert_eq!(zone(100.0), RsiZone::Overbought);
        assert_eq!(zone(70.0), RsiZone::Overbought);
        assert_eq!(zone(50.0), RsiZone::Neutral);
        assert_eq!(zone(30.0), RsiZone::Oversold);
        assert_eq!(zone(0.0).to_string(), "OVERSOLD");
    }
}
