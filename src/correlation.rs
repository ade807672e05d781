// =============================================================================
// Return Correlation
// =============================================================================
//
// Pearson correlation of daily simple returns across several tickers. Series
// are first aligned on the dates every ticker traded; returns are then taken
// between consecutive aligned dates.
// =============================================================================

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::validated_closes;
use crate::error::EngineError;
use crate::indicators::sma::mean;
use crate::metrics::daily_returns;
use crate::types::Bar;

/// Symmetric correlation matrix; `matrix[i][j]` pairs `tickers[i]` with
/// `tickers[j]`. A cell is `None` when either return series is constant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub matrix: Vec<Vec<Option<f64>>>,
    /// Number of aligned returns each coefficient was computed from.
    pub observations: usize,
}

/// Correlate the daily returns of every `(ticker, bars)` pair.
///
/// # Errors
/// - [`EngineError::NoData`] when no series is given or any series is empty.
/// - [`EngineError::InsufficientHistory`] when fewer than three common dates
///   exist (two returns are the minimum for a correlation).
/// - Series validation errors from the indicator engine.
pub fn return_correlation(series: &[(String, Vec<Bar>)]) -> Result<CorrelationMatrix, EngineError> {
    if series.is_empty() {
        return Err(EngineError::NoData);
    }
    for (_, bars) in series {
        validated_closes(bars)?;
    }

    let common = common_dates(series);
    if common.len() < 3 {
        return Err(EngineError::InsufficientHistory {
            required: 3,
            actual: common.len(),
        });
    }

    let returns: Vec<Vec<f64>> = series
        .iter()
        .map(|(_, bars)| {
            let aligned: Vec<f64> = bars
                .iter()
                .filter(|b| common.contains(&b.date))
                .map(|b| b.close)
                .collect();
            daily_returns(&aligned)
        })
        .collect();

    let n = series.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let value = pearson(&returns[i], &returns[j]).map(|v| if i == j { 1.0 } else { v });
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }

    Ok(CorrelationMatrix {
        tickers: series.iter().map(|(t, _)| t.clone()).collect(),
        matrix,
        observations: common.len() - 1,
    })
}

fn common_dates(series: &[(String, Vec<Bar>)]) -> BTreeSet<NaiveDate> {
    let mut iter = series.iter();
    let Some((_, first)) = iter.next() else {
        return BTreeSet::new();
    };
    let mut common: BTreeSet<NaiveDate> = first.iter().map(|b| b.date).collect();
    for (_, bars) in iter {
        let dates: BTreeSet<NaiveDate> = bars.iter().map(|b| b.date).collect();
        common.retain(|d| dates.contains(d));
    }
    common
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return None;
    }
    let r = cov / (var_a.sqrt() * var_b.sqrt());
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn bars(closes: &[f64], skip: &[usize]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .filter(|(i, _)| !skip.contains(i))
            .map(|(i, &c)| Bar::flat(start + Days::new(i as u64), c))
            .collect()
    }

    #[test]
    fn identical_moves_correlate_perfectly() {
        let a = bars(&[10.0, 11.0, 10.5, 12.0, 11.0], &[]);
        let b = bars(&[20.0, 22.0, 21.0, 24.0, 22.0], &[]);
        let out = return_correlation(&[("A".into(), a), ("B".into(), b)]).unwrap();
        assert_eq!(out.observations, 4);
        assert_eq!(out.matrix[0][0], Some(1.0));
        assert!((out.matrix[0][1].unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(out.matrix[0][1], out.matrix[1][0]);
    }

    #[test]
    fn opposite_moves_correlate_negatively() {
        let a = bars(&[10.0, 11.0, 10.0, 11.0, 10.0], &[]);
        let b = bars(&[10.0, 9.0, 10.0, 9.0, 10.0], &[]);
        let out = return_correlation(&[("A".into(), a), ("B".into(), b)]).unwrap();
        assert!(out.matrix[0][1].unwrap() < -0.9);
    }

    #[test]
    fn series_are_aligned_on_common_dates() {
        let a = bars(&[10.0, 11.0, 12.0, 13.0, 12.0, 14.0], &[]);
        let b = bars(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0], &[2]);
        let out = return_correlation(&[("A".into(), a), ("B".into(), b)]).unwrap();
        assert_eq!(out.observations, 4);
    }

    #[test]
    fn constant_series_has_undefined_correlation() {
        let a = bars(&[10.0; 5], &[]);
        let b = bars(&[1.0, 2.0, 3.0, 2.0, 1.0], &[]);
        let out = return_correlation(&[("A".into(), a), ("B".into(), b)]).unwrap();
        assert_eq!(out.matrix[0][0], None);
        assert_eq!(out.matrix[0][1], None);
        assert_eq!(out.matrix[1][1], Some(1.0));
    }

    #[test]
    fn too_few_common_dates() {
        let a = bars(&[10.0, 11.0, 12.0], &[]);
        let b = bars(&[10.0, 11.0, 12.0], &[1]);
        let err = return_correlation(&[("A".into(), a), ("B".into(), b)]).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientHistory {
                required: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn empty_input_is_no_data() {
        assert_eq!(return_correlation(&[]).unwrap_err(), EngineError::NoData);
        assert_eq!(
            return_correlation(&[("A".into(), Vec::new())]).unwrap_err(),
            EngineError::NoData
        );
    }
}
