//! Residual diagnostics
//!
//! The Ljung-Box portmanteau test flags residual autocorrelation left over
//! by the fixed AR(2) structure. The result is advisory: a flagged fit is
//! still returned.

use gating_core::math::distributions::chi_squared_upper_tail;
use gating_core::Result;
use serde::Serialize;

/// Level below which residuals are flagged as autocorrelated
pub const MISSPECIFICATION_LEVEL: f64 = 0.05;

/// Lag coefficients already estimated, subtracted from the test's df
const FITTED_LAGS: usize = 2;

/// Outcome of a Ljung-Box test on model residuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LjungBox {
    pub statistic: f64,
    pub lags: usize,
    pub df: usize,
    pub p_value: f64,
    /// Residuals are not white noise at the 5% level
    pub misspecified: bool,
}

/// Sample autocorrelation at `lag` (biased estimator)
pub fn autocorrelation(data: &[f64], lag: usize) -> f64 {
    let n = data.len();
    if lag >= n {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let denom: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
    if denom <= 0.0 {
        return 0.0;
    }
    let num: f64 = (lag..n)
        .map(|t| (data[t] - mean) * (data[t - lag] - mean))
        .sum();
    num / denom
}

/// Ljung-Box test up to `max_lags` (capped at n − 1).
///
/// Returns `None` when there are fewer than four residuals or the residuals
/// have no variance.
pub fn ljung_box(residuals: &[f64], max_lags: usize) -> Result<Option<LjungBox>> {
    let n = residuals.len();
    if n < 4 || max_lags == 0 {
        return Ok(None);
    }
    let mean = residuals.iter().sum::<f64>() / n as f64;
    if residuals.iter().all(|r| (r - mean).abs() <= f64::EPSILON * mean.abs().max(1.0)) {
        return Ok(None);
    }

    let lags = max_lags.min(n - 1);
    let nf = n as f64;
    let statistic = nf
        * (nf + 2.0)
        * (1..=lags)
            .map(|k| autocorrelation(residuals, k).powi(2) / (nf - k as f64))
            .sum::<f64>();

    let df = lags.saturating_sub(FITTED_LAGS).max(1);
    let p_value = chi_squared_upper_tail(statistic, df as f64)?;

    Ok(Some(LjungBox {
        statistic,
        lags,
        df,
        p_value,
        misspecified: p_value < MISSPECIFICATION_LEVEL,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_autocorrelation() {
        let alternating: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(autocorrelation(&alternating, 1) < -0.9);
        assert!(autocorrelation(&alternating, 2) > 0.8);
        assert_eq!(autocorrelation(&[1.0, 1.0, 1.0], 1), 0.0);
        assert_eq!(autocorrelation(&[1.0, 2.0], 5), 0.0);
    }

    #[test]
    fn test_strongly_autocorrelated_residuals_flagged() {
        let residuals: Vec<f64> = (0..40).map(|i| (i as f64 * 0.3).sin()).collect();
        let result = ljung_box(&residuals, 10).unwrap().unwrap();
        assert_eq!(result.lags, 10);
        assert_eq!(result.df, 8);
        assert!(result.misspecified);
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_lags_capped_by_length() {
        let residuals = [0.3, -0.1, 0.4, -0.5, 0.2];
        let result = ljung_box(&residuals, 10).unwrap().unwrap();
        assert_eq!(result.lags, 4);
        assert_eq!(result.df, 2);
        assert!(result.statistic >= 0.0);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_degenerate_inputs_skipped() {
        assert!(ljung_box(&[0.1, 0.2], 5).unwrap().is_none());
        assert!(ljung_box(&[0.0; 12], 5).unwrap().is_none());
    }

    #[test]
    fn test_statistic_matches_hand_computation() {
        let residuals = [1.0, -1.0, 1.0, -1.0];
        // ρ₁ = −0.75, ρ₂ = 0.5, ρ₃ = −0.25
        let expected = 4.0 * 6.0 * (0.5625 / 3.0 + 0.25 / 2.0 + 0.0625 / 1.0);
        let result = ljung_box(&residuals, 3).unwrap().unwrap();
        assert_abs_diff_eq!(result.statistic, expected, epsilon = 1e-12);
    }
}
