//! Runs a [`NullModel`] and summarizes its draws

use crate::traits::{NullModel, TestKind};
use gating_core::math::descriptive::{mean, percentile_rank, quantile_sorted, sample_std};
use gating_core::{AnalysisConfig, Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};

/// Settings for one resampling run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidatorConfig {
    pub iterations: usize,
    /// Base seed; draw `i` uses `seed + i`. Random when unset.
    pub seed: Option<u64>,
    pub max_attempts: usize,
    pub max_exclusion_rate: f64,
    pub alpha: f64,
    /// Coverage of the bootstrap percentile interval
    pub confidence_level: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            seed: None,
            max_attempts: 5,
            max_exclusion_rate: 0.2,
            alpha: 0.05,
            confidence_level: 0.95,
        }
    }
}

impl ValidatorConfig {
    /// Settings for `kind` taken from a run configuration
    pub fn for_test(config: &AnalysisConfig, kind: TestKind) -> Self {
        let iterations = match kind {
            TestKind::TimeShuffle => config.time_shuffle_iterations,
            TestKind::RandomGeneSet => config.gene_set_iterations,
            TestKind::BlockBootstrap => config.bootstrap_iterations,
            TestKind::Permutation => config.permutation_iterations,
        };
        Self {
            iterations,
            seed: config.seed,
            max_attempts: config.max_attempts,
            max_exclusion_rate: config.max_exclusion_rate,
            alpha: config.alpha,
            confidence_level: config.confidence_level,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidParameter("iterations must be positive".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidParameter("max_attempts must be positive".to_string()));
        }
        if !(0.0..1.0).contains(&self.max_exclusion_rate) {
            return Err(Error::InvalidParameter(format!(
                "max_exclusion_rate must be in [0, 1), got {}",
                self.max_exclusion_rate
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
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }
}

/// Summary of one resampling test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResamplingReport {
    pub kind: TestKind,
    pub observed: f64,
    pub null_mean: f64,
    pub null_sd: f64,
    /// Percent of draws below the observed statistic, ties counted half
    pub percentile_rank: f64,
    pub p_value: f64,
    pub z_score: f64,
    pub significant: bool,
    pub valid_draws: usize,
    pub excluded_draws: usize,
    /// Bootstrap percentile interval
    pub confidence_interval: Option<(f64, f64)>,
    /// Bootstrap estimate of P(statistic < 0)
    pub prob_negative: Option<f64>,
}

/// Two-sided empirical p-value of `reference` against `draws`
pub fn empirical_p_value(draws: &[f64], reference: f64) -> f64 {
    let n = draws.len() as f64;
    let at_or_below = draws.iter().filter(|&&d| d <= reference).count() as f64;
    let at_or_above = draws.iter().filter(|&&d| d >= reference).count() as f64;
    let lower = (1.0 + at_or_below) / (n + 1.0);
    let upper = (1.0 + at_or_above) / (n + 1.0);
    (2.0 * lower.min(upper)).min(1.0)
}

/// Drives a [`NullModel`] through its draws with retry and exclusion
#[derive(Debug, Clone, Copy)]
pub struct ResamplingValidator {
    config: ValidatorConfig,
}

impl ResamplingValidator {
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Compute the observed statistic, run every draw and summarize
    #[instrument(skip(self, model), fields(kind = %model.kind(), iterations = self.config.iterations))]
    pub fn run<M: NullModel>(&self, model: &M) -> Result<ResamplingReport> {
        let observed = model.observed()?;
        if !observed.is_finite() {
            return Err(Error::non_finite("observed statistic"));
        }

        let seed = self.config.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let max_attempts = self.config.max_attempts;
        let outcomes: Vec<Option<f64>> = (0..self.config.iterations)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
                for attempt in 1..=max_attempts {
                    match model.draw(&mut rng) {
                        Ok(value) if value.is_finite() => return Some(value),
                        Ok(value) => trace!(draw = i, attempt, value, "non-finite draw"),
                        Err(e) => trace!(draw = i, attempt, error = %e, "draw failed"),
                    }
                }
                None
            })
            .collect();

        let total = outcomes.len();
        let mut draws: Vec<f64> = outcomes.into_iter().flatten().collect();
        let excluded = total - draws.len();
        let exclusion_rate = excluded as f64 / total as f64;
        if draws.is_empty() || exclusion_rate > self.config.max_exclusion_rate {
            warn!(excluded, total, "too many resamples excluded");
            return Err(Error::UnreliableNull {
                excluded,
                total,
                max_rate: self.config.max_exclusion_rate,
            });
        }

        let kind = model.kind();
        let null_mean = mean(&draws);
        let null_sd = sample_std(&draws);
        let percentile = percentile_rank(&draws, observed);

        let report = if kind.is_bootstrap() {
            draws.sort_by(f64::total_cmp);
            let tail = (1.0 - self.config.confidence_level) / 2.0;
            let interval = (quantile_sorted(&draws, tail), quantile_sorted(&draws, 1.0 - tail));
            let negative = draws.iter().filter(|&&d| d < 0.0).count();
            let p_value = empirical_p_value(&draws, 0.0);
            ResamplingReport {
                kind,
                observed,
                null_mean,
                null_sd,
                percentile_rank: percentile,
                p_value,
                z_score: if null_sd > 0.0 { null_mean / null_sd } else { 0.0 },
                significant: p_value < self.config.alpha,
                valid_draws: draws.len(),
                excluded_draws: excluded,
                confidence_interval: Some(interval),
                prob_negative: Some(negative as f64 / draws.len() as f64),
            }
        } else {
            let p_value = empirical_p_value(&draws, observed);
            ResamplingReport {
                kind,
                observed,
                null_mean,
                null_sd,
                percentile_rank: percentile,
                p_value,
                z_score: if null_sd > 0.0 {
                    (observed - null_mean) / null_sd
                } else {
                    0.0
                },
                significant: p_value < self.config.alpha,
                valid_draws: draws.len(),
                excluded_draws: excluded,
                confidence_interval: None,
                prob_negative: None,
            }
        };

        debug!(
            observed,
            p = report.p_value,
            valid = report.valid_draws,
            excluded,
            "resampling complete"
        );
        Ok(report)
    }
}
