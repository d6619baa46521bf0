//! Request/response facade over the workspace crates

use gating_consensus::{
    aggregate, discovery_rates, gating_centrality, top_genes, ConsensusPair, ConsensusSummary,
    GatingCentrality, GeneRanking, GeneRole, UnitDiscoveryRate,
};
use gating_core::{AnalysisConfig, Error, ExpressionMatrix, Result};
use gating_correction::{FailedPair, Hypothesis, HypothesisBatch, UnitFit};
use gating_model::{Ar2PhaseModel, EigenvalueClassifier};
use gating_resampling::{
    genome_moduli, BlockBootstrap, GeneSets, PermutationTest, RandomGeneSetNull,
    ResamplingReport, ResamplingValidator, TestKind, TimeShuffleNull, ValidatorConfig,
};
use gating_screen::{
    compare_eigenperiods, gene_eigenperiods, EigenperiodComparison, GenomeWideScreener,
    ScreenObserver, ScreenResult,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Genes listed in each ranking of the executive summary
pub const TOP_GENES: usize = 10;

/// One replicate condition (tissue, subject) and its expression data
#[derive(Debug, Clone)]
pub struct AnalysisUnit {
    pub name: String,
    pub matrix: ExpressionMatrix,
}

/// A (target, clock) pair to test in every unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GenePair {
    pub target_gene: String,
    pub clock_gene: String,
}

impl GenePair {
    pub fn new(target_gene: impl Into<String>, clock_gene: impl Into<String>) -> Self {
        Self {
            target_gene: target_gene.into(),
            clock_gene: clock_gene.into(),
        }
    }
}

/// Eigenvalue-gap tests to run on one unit
#[derive(Debug, Clone)]
pub struct ResamplingRequest {
    pub unit: String,
    pub clock_genes: Vec<String>,
    pub target_genes: Vec<String>,
    pub tests: Vec<TestKind>,
}

impl ResamplingRequest {
    /// Request all four tests
    pub fn all(unit: impl Into<String>, clock_genes: Vec<String>, target_genes: Vec<String>) -> Self {
        Self {
            unit: unit.into(),
            clock_genes,
            target_genes,
            tests: vec![
                TestKind::TimeShuffle,
                TestKind::RandomGeneSet,
                TestKind::BlockBootstrap,
                TestKind::Permutation,
            ],
        }
    }
}

/// A labelled set of units, e.g. healthy tissues or tumour models
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGroup {
    pub label: String,
    pub units: Vec<String>,
}

impl UnitGroup {
    pub fn new<S: Into<String>>(label: impl Into<String>, units: impl IntoIterator<Item = S>) -> Self {
        Self {
            label: label.into(),
            units: units.into_iter().map(Into::into).collect(),
        }
    }
}

/// Everything one analysis needs besides the configuration
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub units: Vec<AnalysisUnit>,
    pub pairs: Vec<GenePair>,
    pub consensus: bool,
    pub centrality: bool,
    pub resampling: Vec<ResamplingRequest>,
    /// Compare gene eigenperiods pooled over each group
    pub eigenperiod_groups: Option<(UnitGroup, UnitGroup)>,
}

impl AnalysisRequest {
    pub fn new(pairs: Vec<GenePair>) -> Self {
        Self {
            pairs,
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, name: impl Into<String>, matrix: ExpressionMatrix) -> Self {
        self.units.push(AnalysisUnit {
            name: name.into(),
            matrix,
        });
        self
    }

    pub fn with_consensus(mut self) -> Self {
        self.consensus = true;
        self
    }

    pub fn with_centrality(mut self) -> Self {
        self.centrality = true;
        self
    }

    pub fn with_resampling(mut self, request: ResamplingRequest) -> Self {
        self.resampling.push(request);
        self
    }

    pub fn with_eigenperiod_comparison(mut self, first: UnitGroup, second: UnitGroup) -> Self {
        self.eigenperiod_groups = Some((first, second));
        self
    }

    fn unit(&self, name: &str) -> Option<&AnalysisUnit> {
        self.units.iter().find(|u| u.name == name)
    }
}

/// One requested resampling test; exactly one of `report` and `error` is set
#[derive(Debug, Clone, Serialize)]
pub struct ResamplingOutcome {
    pub unit: String,
    pub kind: TestKind,
    pub report: Option<ResamplingReport>,
    pub error: Option<String>,
}

/// Eigenperiod comparison between two unit groups; exactly one of
/// `comparison` and `error` is set
#[derive(Debug, Clone, Serialize)]
pub struct EigenperiodOutcome {
    pub first_group: String,
    pub second_group: String,
    pub comparison: Option<EigenperiodComparison>,
    pub error: Option<String>,
}

/// Headline counts for a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_units: usize,
    pub total_pairs_tested: usize,
    pub pairs_failed: usize,
    pub significant_bonferroni: usize,
    pub significant_fdr: usize,
    /// Only filled when consensus was requested
    pub high_confidence_pairs: Option<usize>,
    /// Only filled when centrality was requested
    pub critical_nodes: Option<usize>,
    /// One entry per unit with at least one tested pair
    pub unit_rates: Vec<UnitDiscoveryRate>,
    pub top_target_genes: Vec<GeneRanking>,
    pub top_clock_genes: Vec<GeneRanking>,
}

/// Result of [`PhaseGatingEngine::analyze`]
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub hypotheses: Vec<Hypothesis>,
    pub failures: Vec<FailedPair>,
    pub warnings: Vec<String>,
    pub summary: ExecutiveSummary,
    pub consensus: Option<Vec<ConsensusPair>>,
    pub consensus_summary: Option<ConsensusSummary>,
    pub centrality: Option<Vec<GatingCentrality>>,
    pub resampling: Vec<ResamplingOutcome>,
    pub eigenperiods: Option<EigenperiodOutcome>,
}

/// Runs pairwise analyses and genome-wide screens under one configuration
#[derive(Debug, Clone)]
pub struct PhaseGatingEngine {
    config: AnalysisConfig,
    model: Ar2PhaseModel,
    classifier: EigenvalueClassifier,
}

impl PhaseGatingEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model: Ar2PhaseModel::from_config(&config)?,
            classifier: EigenvalueClassifier::new(config.stability_band),
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fit every pair in every unit, correct once across the whole run and
    /// add the requested cross-unit summaries
    #[instrument(skip_all, fields(units = request.units.len(), pairs = request.pairs.len()))]
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutput> {
        self.validate_request(request)?;

        let jobs: Vec<(&AnalysisUnit, &GenePair)> = request
            .units
            .iter()
            .flat_map(|unit| request.pairs.iter().map(move |pair| (unit, pair)))
            .collect();

        let outcomes = jobs
            .par_iter()
            .map(|&(unit, pair)| self.fit_pair(unit, pair))
            .collect::<Result<Vec<_>>>()?;

        let mut fits = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(fit) => fits.push(fit),
                Err(failed) => failures.push(failed),
            }
        }
        debug!(fitted = fits.len(), failed = failures.len(), "pair fits done");

        let batch = HypothesisBatch::from_fits(&fits, failures, &self.config)?;
        let mut warnings = batch.warnings();
        let significant_bonferroni = batch.significant_count();
        let significant_fdr = batch.fdr_significant_count();
        let (hypotheses, failures) = batch.into_parts();

        let consensus = request.consensus.then(|| aggregate(&hypotheses));
        let consensus_summary = consensus.as_deref().map(ConsensusSummary::from_pairs);
        let centrality = if request.centrality {
            Some(gating_centrality(&hypotheses, self.config.critical_node_threshold)?)
        } else {
            None
        };

        let resampling = request
            .resampling
            .iter()
            .map(|r| self.run_resampling(request, r))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        warnings.extend(resampling.iter().filter_map(|o| {
            o.error
                .as_ref()
                .map(|e| format!("{} on {} not reported: {e}", o.kind, o.unit))
        }));

        let eigenperiods = request
            .eigenperiod_groups
            .as_ref()
            .map(|(first, second)| self.compare_groups(request, first, second))
            .transpose()?;
        warnings.extend(eigenperiods.iter().filter_map(|o| {
            o.error.as_ref().map(|e| {
                format!("eigenperiods of {} and {} not compared: {e}", o.first_group, o.second_group)
            })
        }));

        let summary = ExecutiveSummary {
            total_units: request.units.len(),
            total_pairs_tested: hypotheses.len(),
            pairs_failed: failures.len(),
            significant_bonferroni,
            significant_fdr,
            high_confidence_pairs: consensus_summary.as_ref().map(|s| s.high),
            critical_nodes: centrality
                .as_ref()
                .map(|c| c.iter().filter(|n| n.is_critical_node).count()),
            unit_rates: discovery_rates(&hypotheses),
            top_target_genes: top_genes(&hypotheses, GeneRole::Target, TOP_GENES),
            top_clock_genes: top_genes(&hypotheses, GeneRole::Clock, TOP_GENES),
        };
        info!(
            tested = summary.total_pairs_tested,
            failed = summary.pairs_failed,
            fdr = summary.significant_fdr,
            "analysis complete"
        );

        Ok(AnalysisOutput {
            hypotheses,
            failures,
            warnings,
            summary,
            consensus,
            consensus_summary,
            centrality,
            resampling,
            eigenperiods,
        })
    }

    /// Screen every gene of `matrix` against `clock_panel`
    pub fn screen(&self, matrix: &ExpressionMatrix, clock_panel: &[String]) -> Result<ScreenResult> {
        GenomeWideScreener::new(self.config.clone())?.screen(matrix, clock_panel)
    }

    /// [`Self::screen`] with progress reporting
    pub fn screen_with_observer<O: ScreenObserver + ?Sized>(
        &self,
        matrix: &ExpressionMatrix,
        clock_panel: &[String],
        observer: &O,
    ) -> Result<ScreenResult> {
        GenomeWideScreener::new(self.config.clone())?.screen_with_observer(matrix, clock_panel, observer)
    }

    /// Batch-level checks; nothing is fitted when any of these fail
    fn validate_request(&self, request: &AnalysisRequest) -> Result<()> {
        if request.units.is_empty() {
            return Err(Error::InvalidInput("request has no units".to_string()));
        }
        if request.pairs.is_empty()
            && request.resampling.is_empty()
            && request.eigenperiod_groups.is_none()
        {
            return Err(Error::InvalidInput("request has nothing to test".to_string()));
        }

        let mut names = HashSet::new();
        for unit in &request.units {
            if !names.insert(unit.name.as_str()) {
                return Err(Error::InvalidInput(format!("duplicate unit '{}'", unit.name)));
            }
        }

        for pair in &request.pairs {
            if pair.target_gene == pair.clock_gene {
                return Err(Error::InvalidInput(format!(
                    "gene '{}' cannot gate itself",
                    pair.target_gene
                )));
            }
            for unit in &request.units {
                for gene in [&pair.target_gene, &pair.clock_gene] {
                    if !unit.matrix.contains(gene) {
                        return Err(Error::InvalidInput(format!(
                            "gene '{gene}' not found in unit '{}'",
                            unit.name
                        )));
                    }
                }
            }
        }

        for r in &request.resampling {
            let unit = request
                .unit(&r.unit)
                .ok_or_else(|| Error::InvalidInput(format!("unknown unit '{}'", r.unit)))?;
            GeneSets::from_matrix(&unit.matrix, &r.clock_genes, &r.target_genes)?;
        }

        if let Some((first, second)) = &request.eigenperiod_groups {
            for group in [first, second] {
                if group.units.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "unit group '{}' is empty",
                        group.label
                    )));
                }
                if let Some(missing) = group.units.iter().find(|u| request.unit(u).is_none()) {
                    return Err(Error::InvalidInput(format!(
                        "unknown unit '{missing}' in group '{}'",
                        group.label
                    )));
                }
            }
            if let Some(shared) = first.units.iter().find(|u| second.units.contains(u)) {
                return Err(Error::InvalidInput(format!(
                    "unit '{shared}' is in both '{}' and '{}'",
                    first.label, second.label
                )));
            }
        }
        Ok(())
    }

    /// Recoverable fit errors come back as `Ok(Err(FailedPair))`
    fn fit_pair(
        &self,
        unit: &AnalysisUnit,
        pair: &GenePair,
    ) -> Result<std::result::Result<UnitFit, FailedPair>> {
        let target = unit.matrix.series(&pair.target_gene)?;
        let clock = unit.matrix.series(&pair.clock_gene)?;
        match self.model.fit(&target, &clock) {
            Ok(model) => Ok(Ok(UnitFit::new(unit.name.clone(), model))),
            Err(e) if e.is_recoverable() => Ok(Err(FailedPair::new(
                &unit.name,
                &pair.clock_gene,
                &pair.target_gene,
                &e,
            ))),
            Err(e) => Err(e),
        }
    }

    fn run_resampling(
        &self,
        request: &AnalysisRequest,
        r: &ResamplingRequest,
    ) -> Result<Vec<ResamplingOutcome>> {
        let unit = request
            .unit(&r.unit)
            .ok_or_else(|| Error::InvalidInput(format!("unknown unit '{}'", r.unit)))?;

        r.tests
            .iter()
            .map(|&kind| {
                let validator = ResamplingValidator::new(ValidatorConfig::for_test(&self.config, kind))?;
                let result = match kind {
                    TestKind::TimeShuffle => {
                        let sets = GeneSets::from_matrix(&unit.matrix, &r.clock_genes, &r.target_genes)?;
                        validator.run(&TimeShuffleNull::new(sets, self.classifier))
                    }
                    TestKind::RandomGeneSet => {
                        let null = RandomGeneSetNull::new(
                            &unit.matrix,
                            &r.clock_genes,
                            &r.target_genes,
                            &self.classifier,
                        )?;
                        validator.run(&null)
                    }
                    TestKind::BlockBootstrap => {
                        let sets = GeneSets::from_matrix(&unit.matrix, &r.clock_genes, &r.target_genes)?;
                        let null = BlockBootstrap::new(sets, self.classifier, self.config.period)?;
                        validator.run(&null)
                    }
                    TestKind::Permutation => self
                        .permutation_test(&unit.matrix, r)
                        .and_then(|null| validator.run(&null)),
                };

                match result {
                    Ok(report) => Ok(ResamplingOutcome {
                        unit: unit.name.clone(),
                        kind,
                        report: Some(report),
                        error: None,
                    }),
                    Err(e) if e.is_recoverable() => {
                        warn!(unit = %unit.name, %kind, error = %e, "resampling test not reported");
                        Ok(ResamplingOutcome {
                            unit: unit.name.clone(),
                            kind,
                            report: None,
                            error: Some(e.to_string()),
                        })
                    }
                    Err(e) => Err(e),
                }
            })
            .collect()
    }

    /// Pool every unit's gene eigenperiods per group and compare the groups
    fn compare_groups(
        &self,
        request: &AnalysisRequest,
        first: &UnitGroup,
        second: &UnitGroup,
    ) -> Result<EigenperiodOutcome> {
        let pooled = |group: &UnitGroup| -> Vec<f64> {
            group
                .units
                .iter()
                .filter_map(|name| request.unit(name))
                .flat_map(|unit| gene_eigenperiods(&unit.matrix, &self.classifier))
                .map(|(_, period)| period)
                .collect()
        };
        let (comparison, error) = match compare_eigenperiods(&pooled(first), &pooled(second)) {
            Ok(comparison) => {
                debug!(
                    first = comparison.first_mean,
                    second = comparison.second_mean,
                    p = comparison.p_value(),
                    "eigenperiod comparison"
                );
                (Some(comparison), None)
            }
            Err(e) if e.is_recoverable() => {
                warn!(first = %first.label, second = %second.label, error = %e, "eigenperiods not compared");
                (None, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };
        Ok(EigenperiodOutcome {
            first_group: first.label.clone(),
            second_group: second.label.clone(),
            comparison,
            error,
        })
    }

    fn permutation_test(&self, matrix: &ExpressionMatrix, r: &ResamplingRequest) -> Result<PermutationTest> {
        let moduli = genome_moduli(matrix, &self.classifier);
        let pick = |genes: &[String]| -> Result<Vec<f64>> {
            genes
                .iter()
                .map(|g| {
                    matrix
                        .position(g)
                        .and_then(|idx| moduli[idx])
                        .ok_or_else(|| {
                            Error::InvalidCoefficients(format!("no AR(2) modulus for gene '{g}'"))
                        })
                })
                .collect()
        };
        let clock = pick(&r.clock_genes)?;
        let target = pick(&r.target_genes)?;
        let genome = moduli.into_iter().flatten().collect();
        PermutationTest::new(genome, clock, target)
    }
}
