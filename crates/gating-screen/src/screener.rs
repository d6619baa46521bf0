//! Genome-wide screen of every gene against a clock panel

use crate::histogram::EigenHistogram;
use crate::observer::{NullObserver, ScreenObserver};
use crate::tracker::CancellationToken;
use crate::wilcoxon::{rank_sum_test, RankSumTest};
use gating_core::math::descriptive::percentile_rank;
use gating_core::{AnalysisConfig, Error, ExpressionMatrix, Result, TimeSeries};
use gating_correction::{FailedPair, Hypothesis, HypothesisBatch};
use gating_model::{fit_ar2, Ar2PhaseModel, ClockRhythm, EigenvalueClassifier};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, debug_span, info, warn};
use uuid::Uuid;

/// Unit label given to hypotheses produced by a screen
pub const DEFAULT_SCREEN_UNIT: &str = "genome";

/// Where one clock gene's modulus sits in the genome-wide distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockGeneRank {
    pub gene: String,
    /// `None` when the gene's own AR(2) fit failed
    pub modulus: Option<f64>,
    /// Percent of genome-wide moduli below this one
    pub percentile_rank: Option<f64>,
    pub in_band: bool,
}

/// Genome-wide eigenvalue summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EigenvalueSummary {
    pub histogram: EigenHistogram,
    /// (gene, modulus) for every gene whose fit succeeded, in matrix order
    pub moduli: Vec<(String, f64)>,
    pub clock_ranks: Vec<ClockGeneRank>,
    /// Clock moduli against all other genes; `None` when either side is empty
    pub clock_vs_genome: Option<RankSumTest>,
}

/// Outcome of a genome-wide screen
#[derive(Debug, Clone, Serialize)]
pub struct ScreenResult {
    pub run_id: Uuid,
    pub genes_screened: usize,
    /// Every successful test, ranked by (q, p, target, clock)
    pub ranked: Vec<Hypothesis>,
    pub failures: Vec<FailedPair>,
    pub eigenvalues: EigenvalueSummary,
}

impl ScreenResult {
    /// Tests significant after FDR, in rank order
    pub fn hits(&self) -> impl Iterator<Item = &Hypothesis> {
        self.ranked.iter().filter(|h| h.significant_after_fdr)
    }

    pub fn hit_count(&self) -> usize {
        self.hits().count()
    }

    pub fn tests_run(&self) -> usize {
        self.ranked.len()
    }
}

/// Per-gene work product of one batch; fitted models are not kept
struct GeneOutcome {
    index: usize,
    modulus: Option<f64>,
    hypotheses: Vec<Hypothesis>,
    failures: Vec<FailedPair>,
}

/// A panel clock with its cosinor, computed once per screen
struct PanelClock {
    series: TimeSeries,
    rhythm: Option<ClockRhythm>,
}

/// Tests every gene in a matrix against a panel of clock genes
#[derive(Debug, Clone)]
pub struct GenomeWideScreener {
    config: AnalysisConfig,
    model: Ar2PhaseModel,
    classifier: EigenvalueClassifier,
    unit: String,
    cancellation: CancellationToken,
}

impl GenomeWideScreener {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model: Ar2PhaseModel::from_config(&config)?,
            classifier: EigenvalueClassifier::new(config.stability_band),
            config,
            unit: DEFAULT_SCREEN_UNIT.to_string(),
            cancellation: CancellationToken::new(),
        })
    }

    /// Label hypotheses with this unit name
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Share a cancellation token with the caller
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn screen(&self, matrix: &ExpressionMatrix, clock_panel: &[String]) -> Result<ScreenResult> {
        self.screen_with_observer(matrix, clock_panel, &NullObserver)
    }

    /// Run the screen, reporting progress after every gene batch
    pub fn screen_with_observer<O: ScreenObserver + ?Sized>(
        &self,
        matrix: &ExpressionMatrix,
        clock_panel: &[String],
        observer: &O,
    ) -> Result<ScreenResult> {
        let run_id = Uuid::new_v4();
        let span = debug_span!("screen", %run_id, genes = matrix.n_genes(), panel = clock_panel.len());
        let _guard = span.enter();

        let panel = self.resolve_panel(matrix, clock_panel)?;
        let clocks: Vec<PanelClock> = panel
            .iter()
            .map(|&idx| {
                let series = matrix.series_at(idx);
                let rhythm = self.model.clock_rhythm(&series);
                PanelClock { series, rhythm }
            })
            .collect();
        let total = matrix.n_genes();
        observer.on_start(total);

        let mut hypotheses = Vec::new();
        let mut failures = Vec::new();
        let mut histogram = EigenHistogram::default();
        let mut moduli: Vec<Option<f64>> = vec![None; total];
        let mut completed = 0;

        let indices: Vec<usize> = (0..total).collect();
        for batch in indices.chunks(self.config.batch_size) {
            if self.cancellation.is_cancelled() {
                warn!(completed, total, "screen cancelled");
                observer.on_failed("cancelled");
                return Err(Error::Cancelled);
            }

            let outcomes: Vec<GeneOutcome> = batch
                .par_iter()
                .map(|&idx| self.screen_gene(matrix, idx, &clocks))
                .collect();

            let mut partial = EigenHistogram::default();
            for outcome in outcomes {
                if let Some(m) = outcome.modulus {
                    partial.insert(m);
                }
                moduli[outcome.index] = outcome.modulus;
                hypotheses.extend(outcome.hypotheses);
                failures.extend(outcome.failures);
            }

            histogram.merge(&partial);
            completed += batch.len();
            observer.on_batch_complete(completed, total);
            debug!(completed, total, tests = hypotheses.len(), "batch complete");
        }

        // one FDR family over the whole screen
        let batch = match HypothesisBatch::from_hypotheses(hypotheses, failures, self.config.alpha) {
            Ok(batch) => batch,
            Err(e) => {
                observer.on_failed(&e.to_string());
                return Err(e);
            }
        };
        let (mut ranked, failures) = batch.into_parts();
        ranked.sort_by(|a, b| {
            (OrderedFloat(a.q_value), OrderedFloat(a.p_value), &a.target_gene, &a.clock_gene).cmp(&(
                OrderedFloat(b.q_value),
                OrderedFloat(b.p_value),
                &b.target_gene,
                &b.clock_gene,
            ))
        });

        let eigenvalues = self.summarize_eigenvalues(matrix, &panel, &moduli, histogram);
        let result = ScreenResult {
            run_id,
            genes_screened: total,
            ranked,
            failures,
            eigenvalues,
        };

        info!(
            tests = result.tests_run(),
            hits = result.hit_count(),
            failed = result.failures.len(),
            "screen complete"
        );
        observer.on_complete(result.hit_count());
        Ok(result)
    }

    /// Panel genes as matrix rows; unknown genes are fatal, duplicates collapse
    fn resolve_panel(&self, matrix: &ExpressionMatrix, clock_panel: &[String]) -> Result<Vec<usize>> {
        if clock_panel.is_empty() {
            return Err(Error::InvalidInput("clock panel is empty".to_string()));
        }
        let mut panel = Vec::with_capacity(clock_panel.len());
        for gene in clock_panel {
            let idx = matrix
                .position(gene)
                .ok_or_else(|| Error::InvalidInput(format!("clock gene '{gene}' not in matrix")))?;
            if !panel.contains(&idx) {
                panel.push(idx);
            }
        }
        Ok(panel)
    }

    fn screen_gene(&self, matrix: &ExpressionMatrix, idx: usize, clocks: &[PanelClock]) -> GeneOutcome {
        let target = matrix.series_at(idx);
        let modulus = fit_ar2(&target)
            .and_then(|fit| self.classifier.classify(fit.phi1, fit.phi2))
            .map(|roots| roots.modulus)
            .ok();

        let mut hypotheses = Vec::new();
        let mut failures = Vec::new();
        let others = clocks.iter().filter(|c| c.series.gene() != target.gene());
        for PanelClock { series: clock, rhythm } in others {
            let tested = self
                .model
                .fit_with_rhythm(&target, clock, *rhythm)
                .and_then(|model| {
                    Hypothesis::from_fit(&self.unit, &model, self.config.alpha, &self.classifier)
                });
            match tested {
                Ok(hypothesis) => hypotheses.push(hypothesis),
                Err(e) => {
                    if !e.is_recoverable() {
                        warn!(target = target.gene(), clock = clock.gene(), error = %e, "fit error");
                    }
                    failures.push(FailedPair::new(&self.unit, clock.gene(), target.gene(), &e));
                }
            }
        }

        GeneOutcome {
            index: idx,
            modulus,
            hypotheses,
            failures,
        }
    }

    fn summarize_eigenvalues(
        &self,
        matrix: &ExpressionMatrix,
        panel: &[usize],
        moduli: &[Option<f64>],
        histogram: EigenHistogram,
    ) -> EigenvalueSummary {
        let genome: Vec<f64> = moduli.iter().flatten().copied().collect();

        let clock_ranks = panel
            .iter()
            .map(|&idx| {
                let modulus = moduli[idx];
                ClockGeneRank {
                    gene: matrix.genes()[idx].clone(),
                    modulus,
                    percentile_rank: modulus.map(|m| percentile_rank(&genome, m)),
                    in_band: modulus.is_some_and(|m| self.config.stability_band.contains(m)),
                }
            })
            .collect();

        let (clock_moduli, other_moduli): (Vec<_>, Vec<_>) = moduli
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| m.map(|m| (panel.contains(&idx), m)))
            .partition(|(is_clock, _)| *is_clock);
        let clock_moduli: Vec<f64> = clock_moduli.into_iter().map(|(_, m)| m).collect();
        let other_moduli: Vec<f64> = other_moduli.into_iter().map(|(_, m)| m).collect();
        let clock_vs_genome = rank_sum_test(&clock_moduli, &other_moduli).ok();

        EigenvalueSummary {
            histogram,
            moduli: moduli
                .iter()
                .enumerate()
                .filter_map(|(idx, m)| m.map(|m| (matrix.genes()[idx].clone(), m)))
                .collect(),
            clock_ranks,
            clock_vs_genome,
        }
    }
}
