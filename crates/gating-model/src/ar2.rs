//! AR(2) model with clock-phase interaction terms
//!
//! For a target series R and clock phase φ(t) = 2πt / period the full model is
//!
//! ```text
//! R(t) = β₀ + β₁R(t−1) + β₂R(t−1)cosφ(t) + β₃R(t−1)sinφ(t)
//!            + β₄R(t−2) + β₅R(t−2)cosφ(t) + β₆R(t−2)sinφ(t) + ε
//! ```
//!
//! and the reduced model drops the four interaction terms. Phase gating is
//! tested by the joint F test between the two and by per-term t tests.
//! Averaging the interaction terms over a full cycle leaves the marginal lag
//! coefficients φ₁ = β₁ and φ₂ = β₄.

use crate::diagnostics::{ljung_box, LjungBox};
use crate::effect::EffectSize;
use crate::ols::{ols, OlsFit};
use gating_core::math::distributions::{f_upper_tail, student_t_quantile, student_t_two_sided};
use gating_core::{AnalysisConfig, Error, Result, TimeSeries};
use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use std::f64::consts::PI;
use tracing::{debug, instrument};

/// Lags dropped from the start of the series before the first response
pub const WARM_UP: usize = 2;
/// Parameters of the full model
pub const FULL_PARAMS: usize = 7;
/// Parameters of the reduced (plain AR(2)) model
pub const REDUCED_PARAMS: usize = 3;
/// Residual degrees of freedom every fit must keep
pub const MIN_RESIDUAL_DF: usize = 2;
/// Shortest series accepted by [`Ar2PhaseModel::fit`]
pub const MIN_TIMEPOINTS: usize = WARM_UP + FULL_PARAMS + MIN_RESIDUAL_DF;
/// Shortest series accepted by [`Ar2PhaseModel::fit_univariate`]
pub const MIN_UNIVARIATE_TIMEPOINTS: usize = WARM_UP + REDUCED_PARAMS + MIN_RESIDUAL_DF;

/// Names of the seven coefficients in design-matrix order
pub const TERM_NAMES: [&str; FULL_PARAMS] = [
    "intercept",
    "lag1",
    "lag1_cos",
    "lag1_sin",
    "lag2",
    "lag2_cos",
    "lag2_sin",
];

/// One of the four phase-interaction terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseTerm {
    Lag1Cos,
    Lag1Sin,
    Lag2Cos,
    Lag2Sin,
}

impl PhaseTerm {
    pub const ALL: [PhaseTerm; 4] = [
        PhaseTerm::Lag1Cos,
        PhaseTerm::Lag1Sin,
        PhaseTerm::Lag2Cos,
        PhaseTerm::Lag2Sin,
    ];

    /// Position of the term's coefficient in the full model
    pub fn coefficient_index(self) -> usize {
        match self {
            Self::Lag1Cos => 2,
            Self::Lag1Sin => 3,
            Self::Lag2Cos => 5,
            Self::Lag2Sin => 6,
        }
    }

    pub fn name(self) -> &'static str {
        TERM_NAMES[self.coefficient_index()]
    }
}

/// Estimate, standard error and t test for one coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TermStatistic {
    pub name: &'static str,
    pub estimate: f64,
    pub std_error: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

/// Joint F test of the phase-interaction block
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointTest {
    pub f_statistic: f64,
    pub df_numerator: usize,
    pub df_denominator: usize,
    pub p_value: f64,
}

/// Cosinor summary of the clock series (mesor + amplitude·cos(φ − acrophase))
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClockRhythm {
    pub mesor: f64,
    pub amplitude: f64,
    /// Phase of the peak in radians, in [0, 2π)
    pub acrophase: f64,
    pub r_squared: f64,
}

/// A fitted phase-interaction model for one (clock, target) pair
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub target_gene: String,
    pub clock_gene: String,
    pub period: f64,
    /// β₀..β₆ in [`TERM_NAMES`] order
    pub coefficients: [f64; FULL_PARAMS],
    /// Marginal lag-1 coefficient
    pub phi1: f64,
    /// Marginal lag-2 coefficient
    pub phi2: f64,
    pub residuals: Vec<f64>,
    pub r_squared: f64,
    pub r_squared_reduced: f64,
    pub n_observations: usize,
    pub df_residual: usize,
    pub terms: Vec<TermStatistic>,
    pub joint_test: JointTest,
    pub effect_size: EffectSize,
    pub residual_check: Option<LjungBox>,
    pub clock_rhythm: Option<ClockRhythm>,
}

impl FittedModel {
    /// Per-term p-values of the four interaction terms, in [`PhaseTerm::ALL`] order
    pub fn phase_term_p_values(&self) -> [f64; 4] {
        PhaseTerm::ALL.map(|term| self.terms[term.coefficient_index()].p_value)
    }

    /// R² gained by adding the phase terms
    pub fn r_squared_change(&self) -> f64 {
        (self.r_squared - self.r_squared_reduced).max(0.0)
    }

    pub fn term(&self, name: &str) -> Option<&TermStatistic> {
        self.terms.iter().find(|t| t.name == name)
    }
}

/// Plain AR(2) fit of a single series
#[derive(Debug, Clone, Serialize)]
pub struct UnivariateFit {
    pub gene: String,
    pub intercept: f64,
    pub phi1: f64,
    pub phi2: f64,
    pub r_squared: f64,
    pub n_observations: usize,
}

/// Fits the fixed AR(2)-with-phase-interaction model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ar2PhaseModel {
    period: f64,
    confidence_level: f64,
    ljung_box_lags: usize,
}

impl Ar2PhaseModel {
    /// Create a model for the given oscillation period
    pub fn new(period: f64) -> Result<Self> {
        if !(period.is_finite() && period > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "period must be positive, got {period}"
            )));
        }
        Ok(Self {
            period,
            confidence_level: 0.95,
            ljung_box_lags: 10,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        Ok(Self::new(config.period)?
            .with_confidence_level(config.confidence_level)
            .with_ljung_box_lags(config.ljung_box_lags))
    }

    /// Set the confidence level for coefficient intervals
    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        assert!(
            confidence_level > 0.0 && confidence_level < 1.0,
            "Confidence level must be in (0, 1)"
        );
        self.confidence_level = confidence_level;
        self
    }

    pub fn with_ljung_box_lags(mut self, lags: usize) -> Self {
        self.ljung_box_lags = lags;
        self
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    fn phase(&self, t: f64) -> f64 {
        2.0 * PI * t / self.period
    }

    /// Fit the full and reduced models for one (clock, target) pair
    pub fn fit(&self, target: &TimeSeries, clock: &TimeSeries) -> Result<FittedModel> {
        self.fit_with_rhythm(target, clock, self.clock_rhythm(clock))
    }

    /// [`Self::fit`] with the clock's cosinor supplied by the caller.
    ///
    /// `rhythm` should come from [`Self::clock_rhythm`] on the same `clock`;
    /// screens testing many targets against one clock compute it once.
    #[instrument(level = "debug", skip(self, target, clock, rhythm), fields(target = target.gene(), clock = clock.gene(), n = target.len()))]
    pub fn fit_with_rhythm(
        &self,
        target: &TimeSeries,
        clock: &TimeSeries,
        rhythm: Option<ClockRhythm>,
    ) -> Result<FittedModel> {
        if target.len() != clock.len() {
            return Err(Error::size_mismatch(target.len(), clock.len(), "clock series"));
        }
        if !target.shares_axis(clock) {
            return Err(Error::InvalidInput(format!(
                "clock '{}' and target '{}' are sampled on different timepoints",
                clock.gene(),
                target.gene()
            )));
        }
        if target.len() < MIN_TIMEPOINTS {
            return Err(Error::InsufficientData {
                expected: MIN_TIMEPOINTS,
                actual: target.len(),
            });
        }

        let values = target.values();
        let times = target.timepoints();
        let rows = values.len() - WARM_UP;

        let full_design = DMatrix::from_fn(rows, FULL_PARAMS, |i, j| {
            let t = i + WARM_UP;
            let phase = self.phase(times[t]);
            let (lag1, lag2) = (values[t - 1], values[t - 2]);
            match j {
                0 => 1.0,
                1 => lag1,
                2 => lag1 * phase.cos(),
                3 => lag1 * phase.sin(),
                4 => lag2,
                5 => lag2 * phase.cos(),
                _ => lag2 * phase.sin(),
            }
        });
        let reduced_design = full_design.select_columns(&[0, 1, 4]);
        let response = DVector::from_iterator(rows, values[WARM_UP..].iter().copied());

        let full = ols(&full_design, &response)?;
        let reduced = ols(&reduced_design, &response)?;

        let terms = self.term_statistics(&full)?;
        let joint_test = joint_f_test(&full, &reduced)?;
        let effect_size = EffectSize::from_r_squared(full.r_squared, reduced.r_squared);
        let residual_check = if full.is_perfect() {
            None
        } else {
            ljung_box(&full.residuals, self.ljung_box_lags)?
        };

        let mut coefficients = [0.0; FULL_PARAMS];
        coefficients.copy_from_slice(&full.coefficients);

        debug!(
            r_squared = full.r_squared,
            f = joint_test.f_statistic,
            p = joint_test.p_value,
            "fitted phase model"
        );

        Ok(FittedModel {
            target_gene: target.gene().to_string(),
            clock_gene: clock.gene().to_string(),
            period: self.period,
            coefficients,
            phi1: coefficients[1],
            phi2: coefficients[4],
            residuals: full.residuals,
            r_squared: full.r_squared,
            r_squared_reduced: reduced.r_squared,
            n_observations: rows,
            df_residual: full.df_residual,
            terms,
            joint_test,
            effect_size,
            residual_check,
            clock_rhythm: rhythm,
        })
    }

    /// Fit the plain AR(2) model (intercept and two lags) to one series
    pub fn fit_univariate(&self, series: &TimeSeries) -> Result<UnivariateFit> {
        fit_ar2(series)
    }

    fn term_statistics(&self, fit: &OlsFit) -> Result<Vec<TermStatistic>> {
        let df = fit.df_residual as f64;
        let critical = student_t_quantile(1.0 - (1.0 - self.confidence_level) / 2.0, df)?;
        let scale = fit
            .coefficients
            .iter()
            .fold(1.0f64, |acc, b| acc.max(b.abs()));

        TERM_NAMES
            .iter()
            .zip(fit.coefficients.iter().zip(&fit.standard_errors))
            .map(|(&name, (&estimate, &std_error))| {
                let t_statistic = if std_error > 0.0 {
                    estimate / std_error
                } else if estimate.abs() <= 1e-9 * scale {
                    0.0
                } else {
                    estimate.signum() * f64::INFINITY
                };
                Ok(TermStatistic {
                    name,
                    estimate,
                    std_error,
                    t_statistic,
                    p_value: student_t_two_sided(t_statistic, df)?,
                    ci_lower: estimate - critical * std_error,
                    ci_upper: estimate + critical * std_error,
                })
            })
            .collect()
    }

    /// Cosinor fit of the clock series; `None` if the fit is degenerate
    pub fn clock_rhythm(&self, clock: &TimeSeries) -> Option<ClockRhythm> {
        let times = clock.timepoints();
        let n = clock.len();
        let design = DMatrix::from_fn(n, 3, |i, j| {
            let phase = self.phase(times[i]);
            match j {
                0 => 1.0,
                1 => phase.cos(),
                _ => phase.sin(),
            }
        });
        let response = DVector::from_column_slice(clock.values());
        let fit = ols(&design, &response).ok()?;
        let (mesor, a, b) = (fit.coefficients[0], fit.coefficients[1], fit.coefficients[2]);
        Some(ClockRhythm {
            mesor,
            amplitude: a.hypot(b),
            acrophase: b.atan2(a).rem_euclid(2.0 * PI),
            r_squared: fit.r_squared,
        })
    }
}

/// Fit R(t) = c + φ₁R(t−1) + φ₂R(t−2) to a single series
pub fn fit_ar2(series: &TimeSeries) -> Result<UnivariateFit> {
    fit_ar2_values(series.gene(), series.values())
}

/// [`fit_ar2`] over raw values, used by resampling where no axis is needed
pub fn fit_ar2_values(gene: &str, values: &[f64]) -> Result<UnivariateFit> {
    if values.len() < MIN_UNIVARIATE_TIMEPOINTS {
        return Err(Error::InsufficientData {
            expected: MIN_UNIVARIATE_TIMEPOINTS,
            actual: values.len(),
        });
    }
    let rows = values.len() - WARM_UP;
    let design = DMatrix::from_fn(rows, REDUCED_PARAMS, |i, j| match j {
        0 => 1.0,
        1 => values[i + WARM_UP - 1],
        _ => values[i + WARM_UP - 2],
    });
    let response = DVector::from_iterator(rows, values[WARM_UP..].iter().copied());
    let fit = ols(&design, &response)?;

    Ok(UnivariateFit {
        gene: gene.to_string(),
        intercept: fit.coefficients[0],
        phi1: fit.coefficients[1],
        phi2: fit.coefficients[2],
        r_squared: fit.r_squared,
        n_observations: rows,
    })
}

/// F test of the interaction block: full model against the reduced model
fn joint_f_test(full: &OlsFit, reduced: &OlsFit) -> Result<JointTest> {
    let df_numerator = FULL_PARAMS - REDUCED_PARAMS;
    let df_denominator = full.df_residual;
    let gain = (reduced.rss - full.rss).max(0.0);

    let f_statistic = if full.rss > 0.0 {
        (gain / df_numerator as f64) / (full.rss / df_denominator as f64)
    } else if gain > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let p_value = f_upper_tail(f_statistic, df_numerator as f64, df_denominator as f64)?;

    Ok(JointTest {
        f_statistic,
        df_numerator,
        df_denominator,
        p_value,
    })
}
