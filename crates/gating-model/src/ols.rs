//! Ordinary least squares through a singular value decomposition
//!
//! The SVD gives both the coefficients and the unscaled covariance
//! (XᵀX)⁻¹ = V Σ⁻² Vᵀ without forming XᵀX, and its singular value ratio is
//! the conditioning test that turns degenerate designs into
//! [`Error::SingularDesign`].

use gating_core::{Error, Result};
use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Smallest accepted ratio between the smallest and largest singular value
pub const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Residual sum of squares below this fraction of the total sum of squares
/// is treated as an exact fit
pub const PERFECT_FIT_TOLERANCE: f64 = 1e-20;

/// Result of an ordinary least squares fit
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    pub standard_errors: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Residual sum of squares (exactly zero for a perfect fit)
    pub rss: f64,
    /// Total sum of squares around the response mean
    pub tss: f64,
    pub r_squared: f64,
    pub df_residual: usize,
    /// Residual variance estimate rss / df
    pub sigma2: f64,
}

impl OlsFit {
    pub fn is_perfect(&self) -> bool {
        self.rss == 0.0
    }
}

/// Fit `y = X β + ε` by least squares.
///
/// Requires more rows than columns. The design is rejected when its
/// singular value ratio falls below [`SINGULAR_TOLERANCE`].
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit> {
    let (n, p) = x.shape();
    if y.len() != n {
        return Err(Error::size_mismatch(n, y.len(), "OLS response"));
    }
    if n <= p {
        return Err(Error::InsufficientData {
            expected: p + 1,
            actual: n,
        });
    }
    if x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
        return Err(Error::non_finite("regression design"));
    }

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    let ratio = if max_sv > 0.0 { min_sv / max_sv } else { 0.0 };
    trace!(n, p, ratio, "design conditioning");
    if !(ratio >= SINGULAR_TOLERANCE) {
        return Err(Error::SingularDesign {
            ratio,
            tolerance: SINGULAR_TOLERANCE,
        });
    }

    let beta = svd
        .solve(y, f64::EPSILON * max_sv)
        .map_err(|e| Error::Computation(format!("least squares solve failed: {e}")))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| Error::Computation("SVD did not produce V".to_string()))?;

    let fitted = x * &beta;
    let residuals: DVector<f64> = y - fitted;

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let mut rss = residuals.norm_squared();
    if rss <= PERFECT_FIT_TOLERANCE * tss.max(f64::MIN_POSITIVE) {
        rss = 0.0;
    }

    let df_residual = n - p;
    let sigma2 = rss / df_residual as f64;

    // diag((XᵀX)⁻¹)_j = Σ_k V[j,k]² / s_k²
    let standard_errors = (0..p)
        .map(|j| {
            let unscaled: f64 = (0..p)
                .map(|k| v_t[(k, j)].powi(2) / svd.singular_values[k].powi(2))
                .sum();
            (sigma2 * unscaled).sqrt()
        })
        .collect();

    let r_squared = if tss > 0.0 {
        (1.0 - rss / tss).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        standard_errors,
        residuals: residuals.iter().copied().collect(),
        rss,
        tss,
        r_squared,
        df_residual,
        sigma2,
    })
}
