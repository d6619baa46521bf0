//! The four resampling schemes for the eigenvalue gap

use crate::gap::{eigenvalue_gap, genome_moduli, GeneSets};
use crate::traits::{NullModel, TestKind};
use gating_core::{Error, ExpressionMatrix, Result};
use gating_model::EigenvalueClassifier;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use tracing::debug;

/// Permutes each gene's values across timepoints, destroying temporal order
#[derive(Debug, Clone)]
pub struct TimeShuffleNull {
    sets: GeneSets,
    classifier: EigenvalueClassifier,
}

impl TimeShuffleNull {
    pub fn new(sets: GeneSets, classifier: EigenvalueClassifier) -> Self {
        Self { sets, classifier }
    }
}

impl NullModel for TimeShuffleNull {
    fn kind(&self) -> TestKind {
        TestKind::TimeShuffle
    }

    fn observed(&self) -> Result<f64> {
        self.sets.gap(&self.classifier)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let shuffle = |rows: &[Vec<f64>], rng: &mut R| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|row| {
                    let mut shuffled = row.clone();
                    shuffled.shuffle(rng);
                    shuffled
                })
                .collect()
        };
        let resampled = GeneSets {
            clock: shuffle(&self.sets.clock, rng),
            target: shuffle(&self.sets.target, rng),
            sampling_interval: self.sets.sampling_interval,
        };
        resampled.gap(&self.classifier)
    }
}

/// Draws disjoint random gene sets of the clock and target sizes.
///
/// Every gene's modulus is computed once up front; a draw that lands on a
/// gene whose fit failed fails as a whole.
#[derive(Debug, Clone)]
pub struct RandomGeneSetNull {
    moduli: Vec<Option<f64>>,
    clock_idx: Vec<usize>,
    target_idx: Vec<usize>,
}

impl RandomGeneSetNull {
    pub fn new(
        matrix: &ExpressionMatrix,
        clock_genes: &[String],
        target_genes: &[String],
        classifier: &EigenvalueClassifier,
    ) -> Result<Self> {
        // validates names, emptiness and overlap
        GeneSets::from_matrix(matrix, clock_genes, target_genes)?;
        let lookup = |genes: &[String]| -> Vec<usize> {
            genes.iter().filter_map(|g| matrix.position(g)).collect()
        };
        let clock_idx = lookup(clock_genes);
        let target_idx = lookup(target_genes);
        if clock_idx.len() + target_idx.len() > matrix.n_genes() {
            return Err(Error::InvalidInput(
                "gene sets are larger than the dataset".to_string(),
            ));
        }

        let moduli = genome_moduli(matrix, classifier);
        let failed = moduli.iter().filter(|m| m.is_none()).count();
        debug!(genes = moduli.len(), failed, "precomputed gene moduli");

        Ok(Self {
            moduli,
            clock_idx,
            target_idx,
        })
    }

    fn gap_of(&self, clock: &[usize], target: &[usize]) -> Result<f64> {
        let collect = |idx: &[usize]| -> Result<Vec<f64>> {
            idx.iter()
                .map(|&i| {
                    self.moduli[i].ok_or_else(|| {
                        Error::InvalidCoefficients(format!("gene at row {i} has no AR(2) fit"))
                    })
                })
                .collect()
        };
        eigenvalue_gap(&collect(clock)?, &collect(target)?)
    }
}

impl NullModel for RandomGeneSetNull {
    fn kind(&self) -> TestKind {
        TestKind::RandomGeneSet
    }

    fn observed(&self) -> Result<f64> {
        self.gap_of(&self.clock_idx, &self.target_idx)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let k = self.clock_idx.len();
        let drawn = index::sample(rng, self.moduli.len(), k + self.target_idx.len()).into_vec();
        self.gap_of(&drawn[..k], &drawn[k..])
    }
}

/// Moving-block bootstrap of each gene's series.
///
/// Blocks span about one period so within-cycle dependence survives the
/// resample.
#[derive(Debug, Clone)]
pub struct BlockBootstrap {
    sets: GeneSets,
    classifier: EigenvalueClassifier,
    block_length: usize,
}

impl BlockBootstrap {
    pub fn new(sets: GeneSets, classifier: EigenvalueClassifier, period: f64) -> Result<Self> {
        let interval = sets.sampling_interval.ok_or_else(|| {
            Error::InvalidInput("block bootstrap needs at least two timepoints".to_string())
        })?;
        let block_length = block_length(period, interval, sets.n_timepoints());
        Ok(Self {
            sets,
            classifier,
            block_length,
        })
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }
}

/// Samples per period, clamped to [2, n/2]
pub fn block_length(period: f64, interval: f64, n: usize) -> usize {
    let per_period = (period / interval).round();
    let upper = (n / 2).max(2);
    if per_period.is_finite() {
        (per_period as usize).clamp(2, upper)
    } else {
        upper
    }
}

/// Concatenate randomly started blocks of `block` values until `data.len()` is reached
pub fn moving_block_resample<R: Rng + ?Sized>(data: &[f64], block: usize, rng: &mut R) -> Vec<f64> {
    let n = data.len();
    let block = block.clamp(1, n.max(1));
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let start = rng.gen_range(0..=n - block);
        let take = block.min(n - out.len());
        out.extend_from_slice(&data[start..start + take]);
    }
    out
}

impl NullModel for BlockBootstrap {
    fn kind(&self) -> TestKind {
        TestKind::BlockBootstrap
    }

    fn observed(&self) -> Result<f64> {
        self.sets.gap(&self.classifier)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let resample = |rows: &[Vec<f64>], rng: &mut R| -> Vec<Vec<f64>> {
            rows.iter()
                .map(|row| moving_block_resample(row, self.block_length, rng))
                .collect()
        };
        let resampled = GeneSets {
            clock: resample(&self.sets.clock, rng),
            target: resample(&self.sets.target, rng),
            sampling_interval: self.sets.sampling_interval,
        };
        resampled.gap(&self.classifier)
    }
}

/// Label permutation over a precomputed genome-wide modulus vector
#[derive(Debug, Clone)]
pub struct PermutationTest {
    genome: Vec<f64>,
    clock: Vec<f64>,
    target: Vec<f64>,
}

impl PermutationTest {
    pub fn new(genome: Vec<f64>, clock: Vec<f64>, target: Vec<f64>) -> Result<Self> {
        if genome.iter().chain(&clock).chain(&target).any(|m| !m.is_finite()) {
            return Err(Error::non_finite("modulus vector"));
        }
        if clock.is_empty() || target.is_empty() {
            return Err(Error::InvalidInput(
                "permutation test needs non-empty clock and target sets".to_string(),
            ));
        }
        if clock.len() + target.len() > genome.len() {
            return Err(Error::InvalidInput(format!(
                "cannot draw {} + {} genes from {}",
                clock.len(),
                target.len(),
                genome.len()
            )));
        }
        Ok(Self {
            genome,
            clock,
            target,
        })
    }
}

impl NullModel for PermutationTest {
    fn kind(&self) -> TestKind {
        TestKind::Permutation
    }

    fn observed(&self) -> Result<f64> {
        eigenvalue_gap(&self.clock, &self.target)
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let k = self.clock.len();
        let drawn: Vec<f64> = index::sample(rng, self.genome.len(), k + self.target.len())
            .into_iter()
            .map(|i| self.genome[i])
            .collect();
        eigenvalue_gap(&drawn[..k], &drawn[k..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{ResamplingValidator, ValidatorConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn validator(iterations: usize) -> ResamplingValidator {
        ResamplingValidator::new(
            ValidatorConfig::default()
                .with_iterations(iterations)
                .with_seed(99),
        )
        .unwrap()
    }

    /// Deterministic pseudo-noise in [-0.5, 0.5)
    fn jitter(i: usize, salt: f64) -> f64 {
        ((i as f64 * 12.9898 + salt * 78.233).sin() * 43758.5453).fract() - 0.5
    }

    fn ar2_row(n: usize, phi1: f64, phi2: f64, salt: f64) -> Vec<f64> {
        let mut values = vec![jitter(0, salt), jitter(1, salt)];
        for t in 2..n {
            values.push(phi1 * values[t - 1] + phi2 * values[t - 2] + jitter(t, salt));
        }
        values
    }

    /// Clock genes with persistent dynamics, targets close to white noise
    fn matrix() -> ExpressionMatrix {
        let n = 48;
        let mut rows = Vec::new();
        for g in 0..4 {
            rows.push((format!("clock{g}"), ar2_row(n, 1.2, -0.7, g as f64)));
        }
        for g in 0..12 {
            rows.push((format!("gene{g}"), ar2_row(n, 0.1, 0.0, 10.0 + g as f64)));
        }
        ExpressionMatrix::new((0..n).map(|t| t as f64 * 2.0).collect(), rows).unwrap()
    }

    fn names(prefix: &str, range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_block_length() {
        assert_eq!(block_length(24.0, 2.0, 48), 12);
        assert_eq!(block_length(24.0, 2.0, 12), 6);
        assert_eq!(block_length(24.0, 24.0, 48), 2);
    }

    #[test]
    fn test_moving_block_resample_preserves_length_and_blocks() {
        let data: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let out = moving_block_resample(&data, 5, &mut rng);
        assert_eq!(out.len(), 20);
        for chunk in out.chunks(5) {
            for pair in chunk.windows(2) {
                assert_eq!(pair[1], pair[0] + 1.0);
            }
        }
    }

    #[test]
    fn test_time_shuffle_separates_structured_clock_genes() {
        let m = matrix();
        let sets = GeneSets::from_matrix(&m, &names("clock", 0..4), &names("gene", 0..4)).unwrap();
        let null = TimeShuffleNull::new(sets, EigenvalueClassifier::default());
        let observed = null.observed().unwrap();
        assert!(observed > 0.3);

        let report = validator(99).run(&null).unwrap();
        assert_eq!(report.kind, TestKind::TimeShuffle);
        assert!(report.significant);
        assert!(report.percentile_rank > 95.0);
    }

    #[test]
    fn test_random_gene_set_null() {
        let m = matrix();
        let null = RandomGeneSetNull::new(
            &m,
            &names("clock", 0..4),
            &names("gene", 0..4),
            &EigenvalueClassifier::default(),
        )
        .unwrap();
        let report = validator(199).run(&null).unwrap();
        assert_eq!(report.excluded_draws, 0);
        assert!(report.observed > report.null_mean);
    }

    #[test]
    fn test_unfittable_curated_gene_is_recoverable() {
        let mut rows = vec![("flat".to_string(), vec![2.0; 48])];
        rows.extend((0..6).map(|g| (format!("gene{g}"), ar2_row(48, 0.4, -0.2, g as f64))));
        let m = ExpressionMatrix::new((0..48).map(|t| t as f64 * 2.0).collect(), rows).unwrap();
        let null = RandomGeneSetNull::new(
            &m,
            &["flat".to_string()],
            &["gene0".to_string()],
            &EigenvalueClassifier::default(),
        )
        .unwrap();

        let err = null.observed().unwrap_err();
        assert!(matches!(err, Error::InvalidCoefficients(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_random_gene_set_rejects_oversized_sets() {
        let rows = vec![
            ("a".to_string(), ar2_row(12, 0.5, 0.0, 1.0)),
            ("b".to_string(), ar2_row(12, 0.5, 0.0, 2.0)),
        ];
        let m = ExpressionMatrix::new((0..12).map(|t| t as f64).collect(), rows).unwrap();
        let classifier = EigenvalueClassifier::default();
        assert!(RandomGeneSetNull::new(&m, &["a".to_string()], &["b".to_string()], &classifier).is_ok());
        assert!(RandomGeneSetNull::new(&m, &["a".to_string(), "b".to_string()], &["c".to_string()], &classifier).is_err());
    }

    #[test]
    fn test_block_bootstrap_interval_excludes_zero() {
        let m = matrix();
        let sets = GeneSets::from_matrix(&m, &names("clock", 0..4), &names("gene", 0..4)).unwrap();
        let bootstrap = BlockBootstrap::new(sets, EigenvalueClassifier::default(), 24.0).unwrap();
        assert_eq!(bootstrap.block_length(), 12);

        let report = validator(200).run(&bootstrap).unwrap();
        let (lo, hi) = report.confidence_interval.unwrap();
        assert!(lo <= hi);
        assert!(lo > 0.0);
        assert!(report.prob_negative.unwrap() < 0.05);
    }

    #[test]
    fn test_permutation_test() {
        let genome: Vec<f64> = (0..200).map(|i| 0.3 + 0.2 * jitter(i, 3.0)).collect();
        let clock = vec![0.9, 0.85, 0.95];
        let target = vec![0.3, 0.35, 0.25, 0.3];
        let test = PermutationTest::new(genome, clock, target).unwrap();
        let report = validator(999).run(&test).unwrap();
        assert!(report.significant);
        assert!(report.p_value <= 0.002 + 1e-12);

        assert!(PermutationTest::new(vec![0.1], vec![0.2], vec![0.3]).is_err());
        assert!(PermutationTest::new(vec![0.1, f64::NAN], vec![0.2], vec![0.3]).is_err());
    }
}
