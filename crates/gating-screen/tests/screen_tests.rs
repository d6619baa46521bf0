//! Integration tests for the genome-wide screen

use gating_core::{AnalysisConfig, Error, ExpressionMatrix};
use gating_correction::{Hypothesis, HypothesisBatch, UnitFit};
use gating_model::Ar2PhaseModel;
use gating_screen::*;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const INTERVAL: f64 = 2.0;
const PERIOD: f64 = 24.0;
const TIMEPOINTS: usize = 96;
const NOISE_GENES: usize = 9;

fn phase(t: usize) -> f64 {
    2.0 * PI * (t as f64 * INTERVAL) / PERIOD
}

/// Target whose lag coefficients swing with the clock phase
fn gated(rng: &mut ChaCha8Rng) -> Vec<f64> {
    let truth = [0.5, 0.3, 0.4, -0.3, -0.2, 0.2, 0.1];
    let noise = Normal::new(0.0, 0.05).unwrap();
    let mut values = vec![3.0, -1.0];
    for t in 2..TIMEPOINTS {
        let (c, s) = (phase(t).cos(), phase(t).sin());
        let (l1, l2) = (values[t - 1], values[t - 2]);
        values.push(
            truth[0]
                + truth[1] * l1
                + truth[2] * l1 * c
                + truth[3] * l1 * s
                + truth[4] * l2
                + truth[5] * l2 * c
                + truth[6] * l2 * s
                + noise.sample(rng),
        );
    }
    values
}

fn rhythmic(rng: &mut ChaCha8Rng, shift: f64) -> Vec<f64> {
    let noise = Normal::new(0.0, 0.1).unwrap();
    (0..TIMEPOINTS)
        .map(|t| 2.0 * (phase(t) + shift).cos() + noise.sample(rng))
        .collect()
}

fn white_noise(rng: &mut ChaCha8Rng) -> Vec<f64> {
    let noise = Normal::new(0.0, 1.0).unwrap();
    (0..TIMEPOINTS).map(|_| noise.sample(rng)).collect()
}

fn matrix(seed: u64) -> ExpressionMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rows = vec![
        ("Arntl".to_string(), rhythmic(&mut rng, 0.0)),
        ("Per2".to_string(), rhythmic(&mut rng, PI / 2.0)),
        ("Wee1".to_string(), gated(&mut rng)),
    ];
    for g in 0..NOISE_GENES {
        rows.push((format!("noise{g}"), white_noise(&mut rng)));
    }
    let timepoints = (0..TIMEPOINTS).map(|t| t as f64 * INTERVAL).collect();
    ExpressionMatrix::new(timepoints, rows).unwrap()
}

fn panel() -> Vec<String> {
    vec!["Arntl".to_string(), "Per2".to_string()]
}

fn config(batch_size: usize) -> AnalysisConfig {
    AnalysisConfig::default()
        .with_period(PERIOD)
        .with_batch_size(batch_size)
}

#[test]
fn test_every_gene_tested_against_every_clock_except_itself() {
    let m = matrix(1);
    let result = GenomeWideScreener::new(config(4))
        .unwrap()
        .screen(&m, &panel())
        .unwrap();

    let genes = m.n_genes();
    assert_eq!(result.genes_screened, genes);
    assert_eq!(result.tests_run() + result.failures.len(), genes * 2 - 2);
    assert!(result
        .ranked
        .iter()
        .all(|h| h.target_gene != h.clock_gene && h.unit == DEFAULT_SCREEN_UNIT));
}

#[test]
fn test_gated_target_ranks_first() {
    let result = GenomeWideScreener::new(config(5))
        .unwrap()
        .screen(&matrix(2), &panel())
        .unwrap();

    let top: Vec<_> = result.ranked.iter().take(2).collect();
    assert!(top.iter().all(|h| h.target_gene == "Wee1"));
    assert!(top.iter().all(|h| h.significant_after_fdr));
    assert!(result.hit_count() >= 2);
}

#[test]
fn test_ranking_is_by_q_then_p() {
    let result = GenomeWideScreener::new(config(3))
        .unwrap()
        .screen(&matrix(3), &panel())
        .unwrap();

    for pair in result.ranked.windows(2) {
        let a = (OrderedFloat(pair[0].q_value), OrderedFloat(pair[0].p_value));
        let b = (OrderedFloat(pair[1].q_value), OrderedFloat(pair[1].p_value));
        assert!(a <= b);
    }
    let hits: Vec<_> = result.hits().collect();
    assert!(hits.iter().all(|h| h.significant_after_fdr));
}

#[test]
fn test_q_values_do_not_depend_on_batch_size() {
    let m = matrix(4);
    let small = GenomeWideScreener::new(config(1)).unwrap().screen(&m, &panel()).unwrap();
    let large = GenomeWideScreener::new(config(1000)).unwrap().screen(&m, &panel()).unwrap();

    let key = |r: &ScreenResult| -> Vec<(String, String, f64, bool)> {
        r.ranked
            .iter()
            .map(|h| (h.target_gene.clone(), h.clock_gene.clone(), h.q_value, h.significant_after_fdr))
            .collect()
    };
    assert_eq!(key(&small), key(&large));
    assert_eq!(small.ranked, large.ranked);
    assert_eq!(small.eigenvalues.histogram, large.eigenvalues.histogram);
}

#[test]
fn test_streamed_screen_matches_fits_corrected_together() {
    let m = matrix(6);
    let config = config(2);
    let result = GenomeWideScreener::new(config.clone())
        .unwrap()
        .screen(&m, &panel())
        .unwrap();

    let model = Ar2PhaseModel::from_config(&config).unwrap();
    let mut fits = Vec::new();
    for target in m.genes() {
        for clock in panel().iter().filter(|c| *c != target) {
            let fit = model
                .fit(&m.series(target).unwrap(), &m.series(clock).unwrap())
                .unwrap();
            fits.push(UnitFit::new(DEFAULT_SCREEN_UNIT, fit));
        }
    }
    let batch = HypothesisBatch::from_fits(&fits, Vec::new(), &config).unwrap();

    let by_pair = |hypotheses: &[Hypothesis]| -> Vec<Hypothesis> {
        let mut sorted = hypotheses.to_vec();
        sorted.sort_by(|a, b| (&a.target_gene, &a.clock_gene).cmp(&(&b.target_gene, &b.clock_gene)));
        sorted
    };
    assert!(result.failures.is_empty());
    assert_eq!(by_pair(&result.ranked), by_pair(batch.hypotheses()));
}

#[test]
fn test_unknown_clock_gene_is_rejected_before_work() {
    let tracker = RunTracker::new();
    let err = GenomeWideScreener::new(config(4))
        .unwrap()
        .screen_with_observer(&matrix(5), &["Clock".to_string()], &tracker)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(tracker.state(), RunState::Idle);

    let err = GenomeWideScreener::new(config(4))
        .unwrap()
        .screen(&matrix(5), &[])
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(GenomeWideScreener::new(config(0)).is_err());
}

#[test]
fn test_cancelled_screen_fails_the_run() {
    let token = CancellationToken::new();
    let screener = GenomeWideScreener::new(config(2))
        .unwrap()
        .with_cancellation(token.clone());
    token.cancel();

    let tracker = RunTracker::new();
    let err = screener
        .screen_with_observer(&matrix(6), &panel(), &tracker)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(tracker.state(), RunState::Failed("cancelled".to_string()));
    assert_eq!(tracker.status().progress, 0);
}

/// Cancels the screen once a given number of genes is done
struct CancelAfter {
    token: CancellationToken,
    after: usize,
    batches: AtomicUsize,
    failed: Mutex<Option<String>>,
}

impl ScreenObserver for CancelAfter {
    fn on_batch_complete(&self, completed: usize, _total: usize) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if completed >= self.after {
            self.token.cancel();
        }
    }

    fn on_failed(&self, reason: &str) {
        *self.failed.lock().unwrap() = Some(reason.to_string());
    }
}

#[test]
fn test_cancellation_is_checked_between_batches() {
    let screener = GenomeWideScreener::new(config(3)).unwrap();
    let observer = CancelAfter {
        token: screener.cancellation_token(),
        after: 6,
        batches: AtomicUsize::new(0),
        failed: Mutex::new(None),
    };

    let err = screener
        .screen_with_observer(&matrix(7), &panel(), &observer)
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(observer.batches.load(Ordering::SeqCst), 2);
    assert_eq!(observer.failed.lock().unwrap().as_deref(), Some("cancelled"));
}

#[test]
fn test_tracker_completes_with_full_progress() {
    let tracker = RunTracker::new();
    let m = matrix(8);
    GenomeWideScreener::new(config(5))
        .unwrap()
        .screen_with_observer(&m, &panel(), &tracker)
        .unwrap();

    let status = tracker.status();
    assert_eq!(status.state, RunState::Completed);
    assert_eq!(status.progress, m.n_genes());
    assert_eq!(status.total, m.n_genes());
}

#[test]
fn test_eigenvalue_summary() {
    let m = matrix(9);
    let mut duplicated = panel();
    duplicated.push("Arntl".to_string());
    let result = GenomeWideScreener::new(config(4))
        .unwrap()
        .screen(&m, &duplicated)
        .unwrap();
    let summary = &result.eigenvalues;

    assert_eq!(summary.histogram.total() as usize, summary.moduli.len());
    assert_eq!(summary.moduli.len(), m.n_genes());
    assert_eq!(summary.clock_ranks.len(), 2);

    // clean oscillators sit near the unit circle, above the white-noise genes
    for rank in &summary.clock_ranks {
        let modulus = rank.modulus.unwrap();
        assert!(modulus > 0.8, "{} modulus {modulus}", rank.gene);
        assert!(rank.percentile_rank.unwrap() > 75.0);
    }
    let test = summary.clock_vs_genome.unwrap();
    assert_eq!((test.n_first, test.n_second), (2, m.n_genes() - 2));
    assert!(test.z_score > 0.0);
}

#[test]
fn test_short_series_fail_per_pair() {
    let timepoints: Vec<f64> = (0..6).map(|t| t as f64 * INTERVAL).collect();
    let rows = vec![
        ("Arntl".to_string(), vec![1.0, 0.5, -0.5, -1.0, -0.5, 0.5]),
        ("Wee1".to_string(), vec![0.2, 0.1, 0.4, 0.3, 0.2, 0.6]),
        ("Myc".to_string(), vec![1.0, 1.2, 0.9, 1.1, 1.3, 1.0]),
    ];
    let m = ExpressionMatrix::new(timepoints, rows).unwrap();
    let result = GenomeWideScreener::new(config(2))
        .unwrap()
        .screen(&m, &["Arntl".to_string()])
        .unwrap();

    assert!(result.ranked.is_empty());
    assert_eq!(result.failures.len(), 2);
    assert!(result.failures.iter().all(|f| f.kind == "insufficient_data"));
    assert!(result.eigenvalues.moduli.is_empty());
    assert!(result.eigenvalues.clock_vs_genome.is_none());
}
