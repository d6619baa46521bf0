//! Mathematical utilities shared by the gating crates
//!
//! Thin wrappers over `statrs` distributions that return tail probabilities
//! directly and handle the degenerate inputs (infinite statistics, zero
//! degrees of freedom) that come out of perfect or near-perfect fits.

/// Distribution-related mathematical functions
pub mod distributions {
    use crate::{Error, Result};
    use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

    fn clamp_probability(p: f64) -> f64 {
        if p.is_nan() {
            1.0
        } else {
            p.clamp(0.0, 1.0)
        }
    }

    /// Two-sided p-value of a Student-t statistic
    pub fn student_t_two_sided(t: f64, df: f64) -> Result<f64> {
        if t.is_nan() {
            return Ok(1.0);
        }
        if t.is_infinite() {
            return Ok(0.0);
        }
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| Error::Computation(format!("Student-t with {df} df: {e}")))?;
        Ok(clamp_probability(2.0 * (1.0 - dist.cdf(t.abs()))))
    }

    /// Quantile of the standard Student-t distribution
    pub fn student_t_quantile(p: f64, df: f64) -> Result<f64> {
        if !(p > 0.0 && p < 1.0) {
            return Err(Error::InvalidParameter(format!("probability {p} must be in (0, 1)")));
        }
        let dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| Error::Computation(format!("Student-t with {df} df: {e}")))?;
        Ok(dist.inverse_cdf(p))
    }

    /// Upper-tail probability of an F statistic
    pub fn f_upper_tail(f: f64, df1: f64, df2: f64) -> Result<f64> {
        if f.is_nan() || f <= 0.0 {
            return Ok(1.0);
        }
        if f.is_infinite() {
            return Ok(0.0);
        }
        let dist = FisherSnedecor::new(df1, df2)
            .map_err(|e| Error::Computation(format!("F({df1}, {df2}): {e}")))?;
        Ok(clamp_probability(1.0 - dist.cdf(f)))
    }

    /// Upper-tail probability of a chi-squared statistic
    pub fn chi_squared_upper_tail(x: f64, df: f64) -> Result<f64> {
        if x.is_nan() || x <= 0.0 {
            return Ok(1.0);
        }
        if x.is_infinite() {
            return Ok(0.0);
        }
        let dist = ChiSquared::new(df)
            .map_err(|e| Error::Computation(format!("chi-squared with {df} df: {e}")))?;
        Ok(clamp_probability(1.0 - dist.cdf(x)))
    }

    /// Two-sided p-value of a standard normal statistic
    pub fn normal_two_sided(z: f64) -> f64 {
        if z.is_nan() {
            return 1.0;
        }
        if z.is_infinite() {
            return 0.0;
        }
        // Standard normal parameters are always valid
        match Normal::new(0.0, 1.0) {
            Ok(dist) => clamp_probability(2.0 * (1.0 - dist.cdf(z.abs()))),
            Err(_) => 1.0,
        }
    }
}

/// Descriptive statistics over plain slices
pub mod descriptive {
    /// Arithmetic mean; NaN for an empty slice
    pub fn mean(data: &[f64]) -> f64 {
        if data.is_empty() {
            return f64::NAN;
        }
        data.iter().sum::<f64>() / data.len() as f64
    }

    /// Sample standard deviation (n - 1); zero for fewer than two values
    pub fn sample_std(data: &[f64]) -> f64 {
        if data.len() < 2 {
            return 0.0;
        }
        let m = mean(data);
        let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
        (ss / (data.len() - 1) as f64).sqrt()
    }

    /// Empirical quantile of already sorted data (linear interpolation)
    pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return f64::NAN;
        }
        let p = p.clamp(0.0, 1.0);
        let pos = p * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }

    /// Percentage of values strictly below `x`, counting ties as half
    pub fn percentile_rank(data: &[f64], x: f64) -> f64 {
        if data.is_empty() {
            return f64::NAN;
        }
        let below = data.iter().filter(|&&v| v < x).count() as f64;
        let ties = data.iter().filter(|&&v| v == x).count() as f64;
        100.0 * (below + 0.5 * ties) / data.len() as f64
    }
}
