//! Time-series containers
//!
//! [`TimeSeries`] holds one gene's expression values on an evenly spaced
//! timepoint axis. [`ExpressionMatrix`] holds many genes sharing one axis and
//! is the batch-level input to the engine; its constructor performs every
//! check that must fail before per-pair work begins.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Relative tolerance when checking that timepoints are evenly spaced
pub const SPACING_TOLERANCE: f64 = 1e-6;

/// Check that timepoints are finite, strictly increasing and evenly spaced.
///
/// Returns the sampling interval (`None` for fewer than two timepoints).
pub fn validate_timepoints(timepoints: &[f64]) -> Result<Option<f64>> {
    if timepoints.iter().any(|t| !t.is_finite()) {
        return Err(Error::non_finite("timepoints"));
    }
    if timepoints.len() < 2 {
        return Ok(None);
    }

    let interval = timepoints[1] - timepoints[0];
    if interval <= 0.0 {
        return Err(Error::InvalidInput(
            "timepoints must be strictly increasing".to_string(),
        ));
    }

    for (i, pair) in timepoints.windows(2).enumerate() {
        let step = pair[1] - pair[0];
        if step <= 0.0 {
            return Err(Error::InvalidInput(
                "timepoints must be strictly increasing".to_string(),
            ));
        }
        if ((step - interval) / interval).abs() > SPACING_TOLERANCE {
            return Err(Error::InvalidInput(format!(
                "timepoints are not evenly spaced: step {step} at index {} differs from {interval}",
                i + 1
            )));
        }
    }

    Ok(Some(interval))
}

/// One gene's expression values at ordered, evenly spaced timepoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    gene: String,
    timepoints: Vec<f64>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a validated series
    pub fn new(gene: impl Into<String>, timepoints: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if timepoints.len() != values.len() {
            return Err(Error::size_mismatch(timepoints.len(), values.len(), "series values"));
        }
        validate_timepoints(&timepoints)?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("series values"));
        }

        Ok(Self {
            gene: gene.into(),
            timepoints,
            values,
        })
    }

    /// Create a series sampled every `interval` time units starting at zero
    pub fn evenly_spaced(gene: impl Into<String>, interval: f64, values: Vec<f64>) -> Result<Self> {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "sampling interval must be positive, got {interval}"
            )));
        }
        let timepoints = (0..values.len()).map(|i| i as f64 * interval).collect();
        Self::new(gene, timepoints, values)
    }

    /// Gene identifier
    pub fn gene(&self) -> &str {
        &self.gene
    }

    /// Timepoint axis
    pub fn timepoints(&self) -> &[f64] {
        &self.timepoints
    }

    /// Expression values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Spacing between consecutive timepoints
    pub fn sampling_interval(&self) -> Option<f64> {
        if self.timepoints.len() < 2 {
            None
        } else {
            Some(self.timepoints[1] - self.timepoints[0])
        }
    }

    /// Same gene and axis with replaced values (used by resampling)
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.values.len() {
            return Err(Error::size_mismatch(self.values.len(), values.len(), "replacement values"));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("replacement values"));
        }
        Ok(Self {
            gene: self.gene.clone(),
            timepoints: self.timepoints.clone(),
            values,
        })
    }

    /// Whether two series share the same timepoint axis
    pub fn shares_axis(&self, other: &TimeSeries) -> bool {
        self.timepoints.len() == other.timepoints.len()
            && self
                .timepoints
                .iter()
                .zip(&other.timepoints)
                .all(|(a, b)| (a - b).abs() <= SPACING_TOLERANCE * a.abs().max(b.abs()).max(1.0))
    }
}

/// Gene × timepoint matrix sharing one timepoint axis
///
/// Rows are stored in insertion order; lookups by gene name go through an
/// index built at construction time.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    timepoints: Arc<Vec<f64>>,
    genes: Vec<String>,
    rows: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
}

impl ExpressionMatrix {
    /// Create a validated matrix.
    ///
    /// Fails on an empty gene set, duplicate gene identifiers, rows whose
    /// length differs from the axis, non-finite values or a malformed axis.
    pub fn new(timepoints: Vec<f64>, rows: Vec<(String, Vec<f64>)>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InvalidInput("expression matrix has no genes".to_string()));
        }
        if timepoints.is_empty() {
            return Err(Error::InvalidInput("expression matrix has no timepoints".to_string()));
        }
        validate_timepoints(&timepoints)?;

        let mut genes = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());

        for (gene, row) in rows {
            if row.len() != timepoints.len() {
                return Err(Error::size_mismatch(
                    timepoints.len(),
                    row.len(),
                    &format!("row for gene '{gene}'"),
                ));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(Error::non_finite(&format!("row for gene '{gene}'")));
            }
            if index.insert(gene.clone(), genes.len()).is_some() {
                return Err(Error::InvalidInput(format!("duplicate gene identifier '{gene}'")));
            }
            genes.push(gene);
            values.push(row);
        }

        Ok(Self {
            timepoints: Arc::new(timepoints),
            genes,
            rows: values,
            index,
        })
    }

    /// Build a matrix from series that must all share one axis
    pub fn from_series(series: Vec<TimeSeries>) -> Result<Self> {
        let first = series
            .first()
            .ok_or_else(|| Error::InvalidInput("expression matrix has no genes".to_string()))?;
        let timepoints = first.timepoints().to_vec();
        for s in &series[1..] {
            if !s.shares_axis(first) {
                return Err(Error::InvalidInput(format!(
                    "series for gene '{}' does not share the matrix timepoint axis",
                    s.gene()
                )));
            }
        }
        let rows = series
            .into_iter()
            .map(|s| (s.gene, s.values))
            .collect();
        Self::new(timepoints, rows)
    }

    pub fn timepoints(&self) -> &[f64] {
        &self.timepoints
    }

    /// Gene identifiers in row order
    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_timepoints(&self) -> usize {
        self.timepoints.len()
    }

    pub fn sampling_interval(&self) -> Option<f64> {
        if self.timepoints.len() < 2 {
            None
        } else {
            Some(self.timepoints[1] - self.timepoints[0])
        }
    }

    /// Row index of a gene
    pub fn position(&self, gene: &str) -> Option<usize> {
        self.index.get(gene).copied()
    }

    pub fn contains(&self, gene: &str) -> bool {
        self.index.contains_key(gene)
    }

    /// Raw values for the gene at row `idx`
    pub fn row(&self, idx: usize) -> &[f64] {
        &self.rows[idx]
    }

    /// Series for the gene at row `idx`
    pub fn series_at(&self, idx: usize) -> TimeSeries {
        TimeSeries {
            gene: self.genes[idx].clone(),
            timepoints: self.timepoints.as_ref().clone(),
            values: self.rows[idx].clone(),
        }
    }

    /// Series for a named gene
    pub fn series(&self, gene: &str) -> Result<TimeSeries> {
        self.position(gene)
            .map(|idx| self.series_at(idx))
            .ok_or_else(|| Error::InvalidInput(format!("unknown gene '{gene}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn test_series_validation() {
        assert!(TimeSeries::new("Per2", hours(4, 4.0), vec![1.0, 2.0, 3.0, 4.0]).is_ok());

        // length mismatch
        assert!(TimeSeries::new("Per2", hours(4, 4.0), vec![1.0, 2.0]).is_err());

        // missing value
        assert!(TimeSeries::new("Per2", hours(3, 4.0), vec![1.0, f64::NAN, 3.0]).is_err());

        // uneven spacing
        assert!(TimeSeries::new("Per2", vec![0.0, 4.0, 9.0], vec![1.0, 2.0, 3.0]).is_err());

        // decreasing
        assert!(TimeSeries::new("Per2", vec![8.0, 4.0, 0.0], vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_evenly_spaced_series() {
        let s = TimeSeries::evenly_spaced("Bmal1", 2.0, vec![0.5; 6]).unwrap();
        assert_eq!(s.timepoints(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(s.sampling_interval(), Some(2.0));
        assert_eq!(s.gene(), "Bmal1");
        assert!(TimeSeries::evenly_spaced("Bmal1", 0.0, vec![1.0]).is_err());
    }

    #[test]
    fn test_with_values_keeps_axis() {
        let s = TimeSeries::evenly_spaced("Cry1", 4.0, vec![1.0, 2.0, 3.0]).unwrap();
        let t = s.with_values(vec![3.0, 2.0, 1.0]).unwrap();
        assert_eq!(t.timepoints(), s.timepoints());
        assert_eq!(t.values(), &[3.0, 2.0, 1.0]);
        assert!(s.with_values(vec![1.0]).is_err());
    }

    #[test]
    fn test_matrix_construction() {
        let m = ExpressionMatrix::new(
            hours(3, 4.0),
            vec![
                ("Per2".to_string(), vec![1.0, 2.0, 3.0]),
                ("Wee1".to_string(), vec![3.0, 2.0, 1.0]),
            ],
        )
        .unwrap();

        assert_eq!(m.n_genes(), 2);
        assert_eq!(m.n_timepoints(), 3);
        assert_eq!(m.position("Wee1"), Some(1));
        assert_eq!(m.series("Per2").unwrap().values(), &[1.0, 2.0, 3.0]);
        assert!(m.series("Myc").is_err());
    }

    #[test]
    fn test_matrix_rejects_malformed_input() {
        assert!(ExpressionMatrix::new(hours(3, 4.0), vec![]).is_err());

        let dup = ExpressionMatrix::new(
            hours(2, 4.0),
            vec![
                ("Per2".to_string(), vec![1.0, 2.0]),
                ("Per2".to_string(), vec![1.0, 2.0]),
            ],
        );
        assert!(dup.is_err());

        let short_row =
            ExpressionMatrix::new(hours(3, 4.0), vec![("Per2".to_string(), vec![1.0, 2.0])]);
        assert!(short_row.is_err());

        let nan_row = ExpressionMatrix::new(
            hours(2, 4.0),
            vec![("Per2".to_string(), vec![1.0, f64::INFINITY])],
        );
        assert!(nan_row.is_err());
    }

    #[test]
    fn test_matrix_from_series_requires_shared_axis() {
        let a = TimeSeries::evenly_spaced("A", 4.0, vec![1.0, 2.0, 3.0]).unwrap();
        let b = TimeSeries::evenly_spaced("B", 2.0, vec![1.0, 2.0, 3.0]).unwrap();
        assert!(ExpressionMatrix::from_series(vec![a.clone(), b]).is_err());

        let c = TimeSeries::evenly_spaced("C", 4.0, vec![0.0, 0.0, 1.0]).unwrap();
        let m = ExpressionMatrix::from_series(vec![a, c]).unwrap();
        assert_eq!(m.genes(), &["A".to_string(), "C".to_string()]);
        assert_eq!(m.sampling_interval(), Some(4.0));
    }
}
