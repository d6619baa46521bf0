//! Multiple-comparison correction
//!
//! Two stages: a Bonferroni correction over the four phase-interaction terms
//! of one pair, then Benjamini-Hochberg across every pair in the run.

use gating_core::{Error, Result};
use ordered_float::OrderedFloat;

/// Number of phase-interaction terms tested within one pair
pub const PHASE_TERM_COUNT: usize = 4;

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    if let Some(bad) = p_values
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(Error::InvalidInput(format!(
            "p-values must be finite and in [0, 1], got {bad}"
        )));
    }
    Ok(())
}

fn validate_alpha(alpha: f64) -> Result<()> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "alpha must be in (0, 1), got {alpha}"
        )));
    }
    Ok(())
}

/// Bonferroni adjustment of one p-value for `m` tests
pub fn bonferroni(p_value: f64, m: usize) -> f64 {
    (p_value * m as f64).min(1.0)
}

/// Pair p-value: min(1, 4 · min term p)
pub fn correct_within_pair(term_p_values: [f64; PHASE_TERM_COUNT]) -> Result<f64> {
    validate_p_values(&term_p_values)?;
    let min_p = term_p_values.iter().copied().fold(1.0, f64::min);
    Ok(bonferroni(min_p, PHASE_TERM_COUNT))
}

/// Indices of `p_values` in ascending order; ties keep input order
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by_key(|&i| OrderedFloat(p_values[i]));
    order
}

/// Benjamini-Hochberg q-values, returned in input order
pub fn correct_across_pairs(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let m = p_values.len();
    let mut q_values = vec![0.0; m];
    if m == 0 {
        return Ok(q_values);
    }

    let order = ascending_order(p_values);
    let mut running_min = 1.0f64;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let scaled = p_values[idx] * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(scaled);
        q_values[idx] = running_min.clamp(0.0, 1.0);
    }
    Ok(q_values)
}

/// Step-up rejection flags: the largest k with p(k) ≤ (k/m)·α marks p(1..k)
pub fn step_up_significance(p_values: &[f64], alpha: f64) -> Result<Vec<bool>> {
    validate_p_values(p_values)?;
    validate_alpha(alpha)?;
    let m = p_values.len();
    let order = ascending_order(p_values);

    let cutoff = order
        .iter()
        .enumerate()
        .filter(|&(rank, &idx)| p_values[idx] <= (rank + 1) as f64 / m as f64 * alpha)
        .map(|(rank, _)| rank + 1)
        .last()
        .unwrap_or(0);

    let mut flags = vec![false; m];
    for &idx in &order[..cutoff] {
        flags[idx] = true;
    }
    Ok(flags)
}
