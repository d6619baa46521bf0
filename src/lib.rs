//! # Phase-Gating Inference
//!
//! Tests whether the phase of a circadian clock gene modulates the
//! autoregressive dynamics of a target gene. Each (clock, target) pair is fit
//! with an AR(2) model whose lag coefficients carry cosine and sine phase
//! interactions; the four interaction terms are tested jointly and the pair
//! p-value enters a Benjamini-Hochberg family over the whole run. Results
//! from replicate units (tissues, subjects) can be combined into confidence
//! tiers, and eigenvalue-gap statistics can be checked against four
//! resampling nulls. The run summary also carries per-unit discovery rates,
//! the most widely significant target and clock genes, and optionally an
//! eigenperiod comparison between two groups of units.
//!
//! The member crates can be used directly; [`PhaseGatingEngine`] ties them
//! together behind one request/response call.
//!
//! ```rust,no_run
//! use phase_gating::prelude::*;
//!
//! # fn run(liver: ExpressionMatrix, heart: ExpressionMatrix) -> phase_gating::Result<()> {
//! let engine = PhaseGatingEngine::new(AnalysisConfig::default().with_seed(7))?;
//! let request = AnalysisRequest::new(vec![GenePair::new("Wee1", "Arntl")])
//!     .with_unit("liver", liver)
//!     .with_unit("heart", heart)
//!     .with_consensus();
//! let output = engine.analyze(&request)?;
//! println!("{} of {} pairs significant after FDR",
//!     output.summary.significant_fdr, output.summary.total_pairs_tested);
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use engine::{
    AnalysisOutput, AnalysisRequest, AnalysisUnit, EigenperiodOutcome, ExecutiveSummary, GenePair,
    PhaseGatingEngine, ResamplingOutcome, ResamplingRequest, UnitGroup, TOP_GENES,
};

pub use gating_consensus as consensus;
pub use gating_correction as correction;
pub use gating_model as model;
pub use gating_resampling as resampling;
pub use gating_screen as screen;

pub use gating_core::{AnalysisConfig, Error, ExpressionMatrix, FdrMethod, Result, StabilityBand, TimeSeries};

/// Common imports for typical usage
pub mod prelude {
    pub use crate::engine::{
        AnalysisOutput, AnalysisRequest, ExecutiveSummary, GenePair, PhaseGatingEngine,
        ResamplingRequest, UnitGroup,
    };
    pub use gating_consensus::{ConfidenceTier, ConsensusPair, GatingCentrality, GeneRanking, GeneRole};
    pub use gating_core::{AnalysisConfig, Error, ExpressionMatrix, Result, StabilityBand, TimeSeries};
    pub use gating_correction::{FailedPair, Hypothesis};
    pub use gating_model::{Ar2PhaseModel, EffectSize, EigenvalueClassifier, EigenvalueResult, FittedModel};
    pub use gating_resampling::{ResamplingReport, TestKind};
    pub use gating_screen::{CancellationToken, GenomeWideScreener, RunTracker, ScreenResult};
}
