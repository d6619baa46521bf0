//! Hypothesis records and batch correction
//!
//! A [`Hypothesis`] built with [`Hypothesis::from_fit`] carries placeholder
//! FDR fields; they refer to the whole run family only once the hypothesis
//! has passed through a [`HypothesisBatch`].

use crate::correction::{correct_across_pairs, correct_within_pair, step_up_significance};
use gating_core::{AnalysisConfig, Error, Result};
use gating_model::{
    EffectSize, EigenvalueClassifier, EigenvalueResult, FittedModel, JointTest, PhaseTerm,
};
use serde::Serialize;
use tracing::{debug, warn};

/// Confidence interval of one model coefficient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientInterval {
    pub name: &'static str,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Outcome of testing one (clock, target) pair in one unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hypothesis {
    pub unit: String,
    pub clock_gene: String,
    pub target_gene: String,
    /// Pair p-value below alpha before FDR
    pub significant: bool,
    /// Bonferroni-corrected pair p-value
    pub p_value: f64,
    pub min_term_p_value: f64,
    pub q_value: f64,
    pub significant_after_fdr: bool,
    pub effect_size: EffectSize,
    pub r_squared_change: f64,
    /// Phase terms whose Bonferroni-adjusted p-value is below alpha
    pub significant_terms: Vec<String>,
    pub confidence_intervals: Vec<CoefficientInterval>,
    pub joint_test: JointTest,
    /// Roots of the target's marginal lag coefficients
    pub eigenvalue: Option<EigenvalueResult>,
    pub residuals_misspecified: bool,
}

impl Hypothesis {
    /// Summarize one fit before multiple-testing correction.
    ///
    /// `q_value` equals `p_value` and `significant_after_fdr` is false until
    /// [`HypothesisBatch::from_hypotheses`] corrects the family. Nothing of the
    /// model is retained, so callers fitting many pairs can drop each model
    /// right away.
    pub fn from_fit(
        unit: &str,
        model: &FittedModel,
        alpha: f64,
        classifier: &EigenvalueClassifier,
    ) -> Result<Self> {
        let term_p = model.phase_term_p_values();
        let p_value = correct_within_pair(term_p)?;
        let min_term_p_value = term_p.iter().copied().fold(1.0, f64::min);

        let significant_terms = PhaseTerm::ALL
            .iter()
            .zip(term_p)
            .filter(|(_, p)| crate::correction::bonferroni(*p, term_p.len()) < alpha)
            .map(|(term, _)| term.name().to_string())
            .collect();

        let confidence_intervals = model
            .terms
            .iter()
            .map(|t| CoefficientInterval {
                name: t.name,
                estimate: t.estimate,
                lower: t.ci_lower,
                upper: t.ci_upper,
            })
            .collect();

        let eigenvalue = match classifier.classify(model.phi1, model.phi2) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(target_gene = %model.target_gene, error = %e, "eigenvalue classification failed");
                None
            }
        };

        Ok(Self {
            unit: unit.to_string(),
            clock_gene: model.clock_gene.clone(),
            target_gene: model.target_gene.clone(),
            significant: p_value < alpha,
            p_value,
            min_term_p_value,
            q_value: p_value,
            significant_after_fdr: false,
            effect_size: model.effect_size,
            r_squared_change: model.r_squared_change(),
            significant_terms,
            confidence_intervals,
            joint_test: model.joint_test,
            eigenvalue,
            residuals_misspecified: model
                .residual_check
                .map(|lb| lb.misspecified)
                .unwrap_or(false),
        })
    }
}

/// A pair that could not be tested, kept so it is reported rather than dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedPair {
    pub unit: String,
    pub clock_gene: String,
    pub target_gene: String,
    pub kind: String,
    pub message: String,
}

impl FailedPair {
    pub fn new(unit: &str, clock_gene: &str, target_gene: &str, error: &Error) -> Self {
        Self {
            unit: unit.to_string(),
            clock_gene: clock_gene.to_string(),
            target_gene: target_gene.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// A fitted model tagged with the unit it came from
#[derive(Debug, Clone)]
pub struct UnitFit {
    pub unit: String,
    pub model: FittedModel,
}

impl UnitFit {
    pub fn new(unit: impl Into<String>, model: FittedModel) -> Self {
        Self {
            unit: unit.into(),
            model,
        }
    }
}

/// Every hypothesis of one run, corrected as a single FDR family
#[derive(Debug, Clone, Default, Serialize)]
pub struct HypothesisBatch {
    hypotheses: Vec<Hypothesis>,
    failures: Vec<FailedPair>,
}

impl HypothesisBatch {
    /// Build hypotheses from fits and apply Benjamini-Hochberg over all of them
    pub fn from_fits(
        fits: &[UnitFit],
        failures: Vec<FailedPair>,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let classifier = EigenvalueClassifier::new(config.stability_band);
        let hypotheses = fits
            .iter()
            .map(|fit| Hypothesis::from_fit(&fit.unit, &fit.model, config.alpha, &classifier))
            .collect::<Result<Vec<_>>>()?;
        Self::from_hypotheses(hypotheses, failures, config.alpha)
    }

    /// Apply Benjamini-Hochberg to hypotheses built with [`Hypothesis::from_fit`].
    ///
    /// Any FDR fields already set are overwritten; the family is exactly
    /// `hypotheses`.
    pub fn from_hypotheses(
        mut hypotheses: Vec<Hypothesis>,
        failures: Vec<FailedPair>,
        alpha: f64,
    ) -> Result<Self> {
        let p_values: Vec<f64> = hypotheses.iter().map(|h| h.p_value).collect();
        let q_values = correct_across_pairs(&p_values)?;
        let flags = if p_values.is_empty() {
            Vec::new()
        } else {
            step_up_significance(&p_values, alpha)?
        };

        for ((hypothesis, q), flag) in hypotheses.iter_mut().zip(q_values).zip(flags) {
            hypothesis.q_value = q;
            hypothesis.significant_after_fdr = flag;
        }

        for failure in &failures {
            warn!(
                unit = %failure.unit,
                clock = %failure.clock_gene,
                target = %failure.target_gene,
                kind = %failure.kind,
                "pair not tested: {}",
                failure.message
            );
        }

        let batch = Self {
            hypotheses,
            failures,
        };
        debug!(
            tested = batch.hypotheses.len(),
            failed = batch.failures.len(),
            fdr_significant = batch.fdr_significant_count(),
            "corrected hypothesis batch"
        );
        Ok(batch)
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn failures(&self) -> &[FailedPair] {
        &self.failures
    }

    pub fn into_parts(self) -> (Vec<Hypothesis>, Vec<FailedPair>) {
        (self.hypotheses, self.failures)
    }

    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    pub fn significant_count(&self) -> usize {
        self.hypotheses.iter().filter(|h| h.significant).count()
    }

    pub fn fdr_significant_count(&self) -> usize {
        self.hypotheses
            .iter()
            .filter(|h| h.significant_after_fdr)
            .count()
    }

    /// Data-quality warnings for the run summary
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .failures
            .iter()
            .map(|f| {
                format!(
                    "{} -> {} in {}: not tested ({}: {})",
                    f.clock_gene, f.target_gene, f.unit, f.kind, f.message
                )
            })
            .collect();

        let misspecified = self
            .hypotheses
            .iter()
            .filter(|h| h.residuals_misspecified)
            .count();
        if misspecified > 0 {
            warnings.push(format!(
                "{misspecified} of {} fits show autocorrelated residuals (Ljung-Box p < 0.05)",
                self.hypotheses.len()
            ));
        }

        let unclassified = self
            .hypotheses
            .iter()
            .filter(|h| h.eigenvalue.is_none())
            .count();
        if unclassified > 0 {
            warnings.push(format!(
                "{unclassified} of {} fits have lag coefficients that could not be classified; eigenvalues omitted",
                self.hypotheses.len()
            ));
        }

        if self.hypotheses.len() > 1 {
            let first = self.hypotheses[0].effect_size.f_squared;
            if self
                .hypotheses
                .iter()
                .all(|h| h.effect_size.f_squared == first)
            {
                warnings.push(format!(
                    "all {} pairs report the same effect size (f² = {first:.3}); check the input data",
                    self.hypotheses.len()
                ));
            }
        }
        warnings
    }
}
