//! Analysis configuration
//!
//! A single [`AnalysisConfig`] drives every stage. It deserializes from the
//! request payload (JSON) with missing fields taking their defaults, and is
//! validated once before any per-pair work starts.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default oscillation period in time units (hours)
pub const DEFAULT_PERIOD: f64 = 24.0;
/// Default family-wise significance level
pub const DEFAULT_ALPHA: f64 = 0.05;
/// Default lower edge of the stability band
pub const DEFAULT_BAND_LOW: f64 = 0.518;
/// Default upper edge of the stability band
pub const DEFAULT_BAND_HIGH: f64 = 0.718;

/// Multiple-testing correction used across pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FdrMethod {
    /// Benjamini-Hochberg step-up procedure
    #[default]
    #[serde(rename = "BH")]
    BenjaminiHochberg,
}

/// Closed modulus interval used for stability-band membership
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityBand {
    pub low: f64,
    pub high: f64,
}

impl StabilityBand {
    /// Create a validated band
    pub fn new(low: f64, high: f64) -> Result<Self> {
        let band = Self { low, high };
        band.validate()?;
        Ok(band)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low < 0.0 || self.low >= self.high {
            return Err(Error::InvalidParameter(format!(
                "stability band must satisfy 0 <= low < high, got [{}, {}]",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// Inclusive range check
    pub fn contains(&self, modulus: f64) -> bool {
        modulus >= self.low && modulus <= self.high
    }
}

impl Default for StabilityBand {
    fn default() -> Self {
        Self {
            low: DEFAULT_BAND_LOW,
            high: DEFAULT_BAND_HIGH,
        }
    }
}

/// Configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Oscillation period in the same units as the timepoints
    pub period: f64,
    /// Significance threshold applied within pairs and as the FDR level
    pub alpha: f64,
    pub fdr_method: FdrMethod,
    pub stability_band: StabilityBand,
    pub bootstrap_iterations: usize,
    pub permutation_iterations: usize,
    pub time_shuffle_iterations: usize,
    pub gene_set_iterations: usize,
    /// Seed for all resampling; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Attempts per resampling draw before it is excluded
    pub max_attempts: usize,
    /// Exclusion rate above which a resampling test reports an unreliable null
    pub max_exclusion_rate: f64,
    /// Distinct clock genes needed for a target to count as a critical node
    pub critical_node_threshold: usize,
    /// Genes per batch in genome-wide screening
    pub batch_size: usize,
    /// Maximum lag for the Ljung-Box residual check
    pub ljung_box_lags: usize,
    /// Confidence level for coefficient and bootstrap intervals
    pub confidence_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            alpha: DEFAULT_ALPHA,
            fdr_method: FdrMethod::default(),
            stability_band: StabilityBand::default(),
            bootstrap_iterations: 400,
            permutation_iterations: 10_000,
            time_shuffle_iterations: 1_000,
            gene_set_iterations: 500,
            seed: None,
            max_attempts: 5,
            max_exclusion_rate: 0.2,
            critical_node_threshold: 4,
            batch_size: 256,
            ljung_box_lags: 10,
            confidence_level: 0.95,
        }
    }
}

impl AnalysisConfig {
    /// Set the oscillation period
    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    /// Set the significance level
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the stability band
    pub fn with_stability_band(mut self, band: StabilityBand) -> Self {
        self.stability_band = band;
        self
    }

    /// Set the random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_bootstrap_iterations(mut self, n: usize) -> Self {
        self.bootstrap_iterations = n;
        self
    }

    pub fn with_permutation_iterations(mut self, n: usize) -> Self {
        self.permutation_iterations = n;
        self
    }

    pub fn with_time_shuffle_iterations(mut self, n: usize) -> Self {
        self.time_shuffle_iterations = n;
        self
    }

    pub fn with_gene_set_iterations(mut self, n: usize) -> Self {
        self.gene_set_iterations = n;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_critical_node_threshold(mut self, threshold: usize) -> Self {
        self.critical_node_threshold = threshold;
        self
    }

    /// Check every field; called before any per-pair work
    pub fn validate(&self) -> Result<()> {
        if !(self.period.is_finite() && self.period > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "period must be positive, got {}",
                self.period
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "confidence level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(0.0..1.0).contains(&self.max_exclusion_rate) {
            return Err(Error::InvalidParameter(format!(
                "max exclusion rate must be in [0, 1), got {}",
                self.max_exclusion_rate
            )));
        }
        self.stability_band.validate()?;

        let counts = [
            ("bootstrap_iterations", self.bootstrap_iterations),
            ("permutation_iterations", self.permutation_iterations),
            ("time_shuffle_iterations", self.time_shuffle_iterations),
            ("gene_set_iterations", self.gene_set_iterations),
            ("max_attempts", self.max_attempts),
            ("batch_size", self.batch_size),
            ("ljung_box_lags", self.ljung_box_lags),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(Error::InvalidParameter(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.period, 24.0);
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.stability_band, StabilityBand::new(0.518, 0.718).unwrap());
        assert_eq!(config.critical_node_threshold, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_band_contains_is_inclusive() {
        let band = StabilityBand::default();
        assert!(band.contains(0.518));
        assert!(band.contains(0.718));
        assert!(band.contains(0.6));
        assert!(!band.contains(0.5179));
        assert!(!band.contains(0.7181));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AnalysisConfig::default().with_period(0.0).validate().is_err());
        assert!(AnalysisConfig::default().with_alpha(1.0).validate().is_err());
        assert!(AnalysisConfig::default().with_batch_size(0).validate().is_err());
        assert!(StabilityBand::new(0.8, 0.2).is_err());
        assert!(StabilityBand::new(f64::NAN, 0.2).is_err());
    }

    #[test]
    fn test_json_round_trip_with_partial_fields() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "period": 12.0, "alpha": 0.01, "fdr_method": "BH", "stability_band": { "low": 0.4, "high": 0.9 } }"#,
        )
        .unwrap();
        assert_eq!(config.period, 12.0);
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.stability_band.high, 0.9);
        // unspecified fields fall back to defaults
        assert_eq!(config.bootstrap_iterations, 400);

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(AnalysisConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_json_validation_applies() {
        assert!(AnalysisConfig::from_json_str(r#"{ "period": -1.0 }"#).is_err());
        assert!(AnalysisConfig::from_json_str("not json").is_err());
    }
}
