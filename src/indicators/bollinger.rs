// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the *sample* standard deviation
// (n - 1 denominator) of the closes in the SMA's trailing window.
//
// A mean is defined for one sample, a sample standard deviation is not: with
// fewer than two closes in the window the bands are `None` even though the
// middle band exists under the expanding warm-up policy.
// =============================================================================

use crate::indicators::sma::{mean, trailing_window};
use crate::types::WarmupPolicy;

/// One row of Bollinger output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Calculate Bollinger Bands for every close.
///
/// Returns `None` for a row when:
/// - the warm-up policy leaves the window undefined, or
/// - the window holds fewer than two closes.
pub fn calculate_bollinger(
    closes: &[f64],
    period: usize,
    num_std: f64,
    policy: WarmupPolicy,
) -> Vec<Option<BollingerBand>> {
    (0..closes.len())
        .map(|i| {
            let window = trailing_window(closes, i, period, policy)?;
            let middle = mean(window)?;
            let std_dev = sample_std_dev(window, middle)?;
            Some(BollingerBand {
                upper: middle + num_std * std_dev,
                middle,
                lower: middle - num_std * std_dev,
            })
        })
        .collect()
}

/// Sample standard deviation around a precomputed `mean`.
pub(crate) fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    let std_dev = variance.sqrt();
    std_dev.is_finite().then_some(std_dev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bands = calculate_bollinger(&closes, 20, 2.0, WarmupPolicy::Strict);
        let bb = bands[19].unwrap();
        assert!((bb.middle - 10.5).abs() < 1e-12);
        // Sample variance of 1..=20 is 35.
        let std = 35.0_f64.sqrt();
        assert!((bb.upper - (10.5 + 2.0 * std)).abs() < 1e-10);
        assert!((bb.lower - (10.5 - 2.0 * std)).abs() < 1e-10);
        assert!(bands[..19].iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_single_sample_undefined_under_expand() {
        let bands = calculate_bollinger(&[5.0, 7.0], 20, 2.0, WarmupPolicy::Expand);
        assert!(bands[0].is_none());
        let bb = bands[1].unwrap();
        assert_eq!(bb.middle, 6.0);
        // std of {5, 7} = sqrt(2)
        assert!((bb.upper - (6.0 + 2.0 * 2.0_f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn bollinger_flat() {
        let bands = calculate_bollinger(&[100.0; 25], 20, 2.0, WarmupPolicy::Expand);
        for bb in bands.into_iter().skip(1) {
            let bb = bb.unwrap();
            assert_eq!(bb.upper, 100.0);
            assert_eq!(bb.lower, 100.0);
        }
    }

    #[test]
    fn bollinger_flat_inexact_price_has_zero_width() {
        let bands = calculate_bollinger(&[17.3; 30], 20, 2.0, WarmupPolicy::Expand);
        for bb in bands.into_iter().skip(1) {
            let bb = bb.unwrap();
            assert_eq!(bb.middle, 17.3);
            assert_eq!(bb.upper, 17.3);
            assert_eq!(bb.lower, 17.3);
        }
        assert_eq!(sample_std_dev(&[0.1; 20], 0.1), Some(0.0));
    }

    #[test]
    fn sample_std_dev_needs_two_values() {
        assert!(sample_std_dev(&[1.0], 1.0).is_none());
        assert_eq!(sample_std_dev(&[1.0, 3.0], 2.0), Some(2.0_f64.sqrt()));
    }
}
