//! Fixed-bin streaming histogram of eigenvalue moduli

use serde::Serialize;
use std::fmt;

/// Default upper edge; moduli of stable fits stay below 1
pub const DEFAULT_UPPER: f64 = 1.5;
pub const DEFAULT_BINS: usize = 30;

/// One bin of an [`EigenHistogram`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Left edge (inclusive)
    pub left: f64,
    /// Right edge (exclusive)
    pub right: f64,
    pub count: u64,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

impl fmt::Display for HistogramBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.3}, {:.3}): count={}", self.left, self.right, self.count)
    }
}

/// Histogram over [0, upper) with equal-width bins and an overflow count.
///
/// Values are added one at a time and partial histograms from parallel
/// batches can be merged, so the full modulus set never has to be sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenHistogram {
    upper: f64,
    counts: Vec<u64>,
    overflow: u64,
    total: u64,
}

impl Default for EigenHistogram {
    fn default() -> Self {
        Self::new(DEFAULT_BINS, DEFAULT_UPPER)
    }
}

impl EigenHistogram {
    /// Create an empty histogram; `bins` and `upper` must be positive
    pub fn new(bins: usize, upper: f64) -> Self {
        assert!(bins > 0, "Histogram needs at least one bin");
        assert!(upper > 0.0 && upper.is_finite(), "Upper edge must be positive");
        Self {
            upper,
            counts: vec![0; bins],
            overflow: 0,
            total: 0,
        }
    }

    /// Add one modulus; non-finite values are ignored
    pub fn insert(&mut self, modulus: f64) {
        if !modulus.is_finite() || modulus < 0.0 {
            return;
        }
        self.total += 1;
        if modulus >= self.upper {
            self.overflow += 1;
            return;
        }
        let width = self.upper / self.counts.len() as f64;
        let idx = ((modulus / width) as usize).min(self.counts.len() - 1);
        self.counts[idx] += 1;
    }

    /// Fold another histogram with the same layout into this one
    pub fn merge(&mut self, other: &EigenHistogram) {
        debug_assert_eq!(self.counts.len(), other.counts.len());
        for (a, b) in self.counts.iter_mut().zip(&other.counts) {
            *a += b;
        }
        self.overflow += other.overflow;
        self.total += other.total;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn bins(&self) -> Vec<HistogramBin> {
        let width = self.upper / self.counts.len() as f64;
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| HistogramBin {
                left: i as f64 * width,
                right: (i + 1) as f64 * width,
                count,
            })
            .collect()
    }

    /// Fraction of inserted values in [low, high]; bins are counted whole
    /// when their center falls inside
    pub fn fraction_between(&self, low: f64, high: f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let inside: u64 = self
            .bins()
            .iter()
            .filter(|b| (low..=high).contains(&b.center()))
            .map(|b| b.count)
            .sum();
        inside as f64 / self.total as f64
    }
}
