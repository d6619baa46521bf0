//! Wilcoxon rank-sum (Mann-Whitney U) test

use gating_core::math::distributions::normal_two_sided;
use gating_core::{Error, Result};
use ordered_float::OrderedFloat;
use serde::Serialize;

/// Result of a two-sided rank-sum test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankSumTest {
    /// U statistic of the first sample
    pub u_statistic: f64,
    pub z_score: f64,
    pub p_value: f64,
    pub n_first: usize,
    pub n_second: usize,
}

/// Average ranks (1-based) of already sorted values, ties sharing their mean rank
fn average_ranks(sorted: &[f64]) -> Vec<f64> {
    let mut ranks = vec![0.0; sorted.len()];
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        ranks[i..=j].fill(rank);
        i = j + 1;
    }
    ranks
}

/// Σ(t³ − t) over tie groups of sorted values
fn tie_correction(sorted: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        let t = (j - i + 1) as f64;
        total += t * t * t - t;
        i = j + 1;
    }
    total
}

/// Two-sided rank-sum test of `first` against `second` with a tie-corrected
/// normal approximation
pub fn rank_sum_test(first: &[f64], second: &[f64]) -> Result<RankSumTest> {
    let (n1, n2) = (first.len(), second.len());
    if n1 == 0 || n2 == 0 {
        return Err(Error::InsufficientData {
            expected: 1,
            actual: n1.min(n2),
        });
    }
    if first.iter().chain(second).any(|v| !v.is_finite()) {
        return Err(Error::non_finite("rank-sum samples"));
    }

    let mut combined: Vec<(f64, bool)> = first
        .iter()
        .map(|&v| (v, true))
        .chain(second.iter().map(|&v| (v, false)))
        .collect();
    combined.sort_by_key(|&(v, _)| OrderedFloat(v));
    let values: Vec<f64> = combined.iter().map(|&(v, _)| v).collect();
    let ranks = average_ranks(&values);

    let r1: f64 = combined
        .iter()
        .zip(&ranks)
        .filter(|((_, in_first), _)| *in_first)
        .map(|(_, &r)| r)
        .sum();

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let n = n1f + n2f;
    let u_statistic = r1 - n1f * (n1f + 1.0) / 2.0;
    let mu = n1f * n2f / 2.0;
    let variance = if n > 1.0 {
        n1f * n2f / 12.0 * (n + 1.0 - tie_correction(&values) / (n * (n - 1.0)))
    } else {
        0.0
    };

    let (z_score, p_value) = if variance > 0.0 {
        let z = (u_statistic - mu) / variance.sqrt();
        (z, normal_two_sided(z))
    } else {
        (0.0, 1.0)
    };

    Ok(RankSumTest {
        u_statistic,
        z_score,
        p_value,
        n_first: n1,
        n_second: n2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_average_ranks_with_ties() {
        assert_eq!(average_ranks(&[1.0, 2.0, 2.0, 3.0]), vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(tie_correction(&[1.0, 2.0, 2.0, 3.0]), 6.0);
        assert_eq!(tie_correction(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_separated_samples() {
        let first = [0.8, 0.85, 0.9, 0.95, 0.82, 0.88];
        let second: Vec<f64> = (0..30).map(|i| 0.1 + i as f64 * 0.01).collect();
        let result = rank_sum_test(&first, &second).unwrap();
        // every first value outranks every second value
        assert_abs_diff_eq!(result.u_statistic, 180.0, epsilon = 1e-12);
        assert!(result.z_score > 3.0);
        assert!(result.p_value < 0.001);
    }

    #[test]
    fn test_identical_samples() {
        let result = rank_sum_test(&[1.0, 1.0], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.z_score, 0.0);
    }

    #[test]
    fn test_symmetric_samples_not_significant() {
        let first = [1.0, 3.0, 5.0, 7.0];
        let second = [2.0, 4.0, 6.0, 8.0, 0.0];
        let result = rank_sum_test(&first, &second).unwrap();
        assert!(result.p_value > 0.5);
    }

    #[test]
    fn test_invalid_input() {
        assert!(rank_sum_test(&[], &[1.0]).is_err());
        assert!(rank_sum_test(&[f64::NAN], &[1.0]).is_err());
    }
}
