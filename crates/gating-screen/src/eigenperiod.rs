//! Eigenperiods of univariate AR(2) fits and their comparison between groups

use crate::wilcoxon::{rank_sum_test, RankSumTest};
use gating_core::math::descriptive::mean;
use gating_core::{ExpressionMatrix, Result};
use gating_model::{fit_ar2_values, EigenvalueClassifier};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

/// Oscillation period of every gene whose AR(2) roots are complex.
///
/// Genes whose fit fails or whose roots are real have no eigenperiod and are
/// left out. Periods are in the matrix's time units.
pub fn gene_eigenperiods(
    matrix: &ExpressionMatrix,
    classifier: &EigenvalueClassifier,
) -> Vec<(String, f64)> {
    let Some(interval) = matrix.sampling_interval() else {
        return Vec::new();
    };
    let periods: Vec<(String, f64)> = (0..matrix.n_genes())
        .into_par_iter()
        .filter_map(|idx| {
            let gene = &matrix.genes()[idx];
            let fit = fit_ar2_values(gene, matrix.row(idx)).ok()?;
            let roots = classifier.classify(fit.phi1, fit.phi2).ok()?;
            roots.eigenperiod(interval).map(|p| (gene.clone(), p))
        })
        .collect();
    debug!(genes = matrix.n_genes(), oscillatory = periods.len(), "eigenperiods");
    periods
}

/// Mean eigenperiod of two groups and a rank-sum test between them
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EigenperiodComparison {
    pub first_mean: f64,
    pub second_mean: f64,
    pub n_first: usize,
    pub n_second: usize,
    pub test: RankSumTest,
}

impl EigenperiodComparison {
    pub fn p_value(&self) -> f64 {
        self.test.p_value
    }
}

/// Compare two samples of eigenperiods; either side empty is `InsufficientData`
pub fn compare_eigenperiods(first: &[f64], second: &[f64]) -> Result<EigenperiodComparison> {
    let test = rank_sum_test(first, second)?;
    Ok(EigenperiodComparison {
        first_mean: mean(first),
        second_mean: mean(second),
        n_first: first.len(),
        n_second: second.len(),
        test,
    })
}
