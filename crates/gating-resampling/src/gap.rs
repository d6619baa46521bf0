//! The eigenvalue gap statistic
//!
//! gap = mean modulus of the clock set − mean modulus of the target set, with
//! each gene's modulus taken from its univariate AR(2) fit.

use gating_core::{Error, ExpressionMatrix, Result};
use gating_model::{fit_ar2_values, EigenvalueClassifier};
use rayon::prelude::*;

/// Dominant root modulus of one gene's univariate AR(2) fit
pub fn gene_modulus(values: &[f64], classifier: &EigenvalueClassifier) -> Result<f64> {
    let fit = fit_ar2_values("", values)?;
    Ok(classifier.classify(fit.phi1, fit.phi2)?.modulus)
}

/// Difference of mean moduli between two gene sets
pub fn eigenvalue_gap(clock_moduli: &[f64], target_moduli: &[f64]) -> Result<f64> {
    if clock_moduli.is_empty() || target_moduli.is_empty() {
        return Err(Error::InvalidInput(
            "eigenvalue gap needs at least one clock and one target modulus".to_string(),
        ));
    }
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    Ok(mean(clock_moduli) - mean(target_moduli))
}

/// Expression rows of a clock set and a target set, copied out of a matrix
#[derive(Debug, Clone)]
pub struct GeneSets {
    pub clock: Vec<Vec<f64>>,
    pub target: Vec<Vec<f64>>,
    pub sampling_interval: Option<f64>,
}

impl GeneSets {
    /// Look up both gene sets; unknown genes, empty sets and overlap are rejected
    pub fn from_matrix(
        matrix: &ExpressionMatrix,
        clock_genes: &[String],
        target_genes: &[String],
    ) -> Result<Self> {
        if clock_genes.is_empty() || target_genes.is_empty() {
            return Err(Error::InvalidInput(
                "clock and target gene sets must both be non-empty".to_string(),
            ));
        }
        if let Some(shared) = clock_genes.iter().find(|g| target_genes.contains(*g)) {
            return Err(Error::InvalidInput(format!(
                "gene '{shared}' appears in both the clock and target sets"
            )));
        }
        let rows = |genes: &[String]| -> Result<Vec<Vec<f64>>> {
            genes
                .iter()
                .map(|g| {
                    matrix
                        .position(g)
                        .map(|idx| matrix.row(idx).to_vec())
                        .ok_or_else(|| Error::InvalidInput(format!("unknown gene '{g}'")))
                })
                .collect()
        };
        Ok(Self {
            clock: rows(clock_genes)?,
            target: rows(target_genes)?,
            sampling_interval: matrix.sampling_interval(),
        })
    }

    pub fn n_timepoints(&self) -> usize {
        self.clock.first().map(Vec::len).unwrap_or(0)
    }

    /// Gap after applying `transform` to every row; any failing gene fails the gap
    pub fn gap_with<F>(&self, classifier: &EigenvalueClassifier, transform: F) -> Result<f64>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>> + Sync,
    {
        let moduli = |rows: &[Vec<f64>]| -> Result<Vec<f64>> {
            rows.iter()
                .map(|row| gene_modulus(&transform(row)?, classifier))
                .collect()
        };
        eigenvalue_gap(&moduli(&self.clock)?, &moduli(&self.target)?)
    }

    /// Gap on the unmodified rows
    pub fn gap(&self, classifier: &EigenvalueClassifier) -> Result<f64> {
        self.gap_with(classifier, |row| Ok(row.to_vec()))
    }
}

/// Per-gene moduli for every gene of a matrix; `None` where the fit failed
pub fn genome_moduli(
    matrix: &ExpressionMatrix,
    classifier: &EigenvalueClassifier,
) -> Vec<Option<f64>> {
    (0..matrix.n_genes())
        .into_par_iter()
        .map(|idx| gene_modulus(matrix.row(idx), classifier).ok())
        .collect()
}
