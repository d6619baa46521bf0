//! # Genome-Wide Screening
//!
//! Tests every gene in an expression matrix against a panel of clock genes.
//! Genes are processed in batches on the rayon pool; between batches the
//! screener checks its [`CancellationToken`] and reports progress to a
//! [`ScreenObserver`]. Benjamini-Hochberg runs once over all tests after the
//! last batch, so the q-values do not depend on the batch size.
//!
//! Alongside the hit list the screen keeps a streaming [`EigenHistogram`] of
//! every gene's univariate AR(2) modulus, ranks the clock genes within it and
//! compares them to the rest of the genome with a rank-sum test. The same
//! test compares eigenperiods between two groups of units.
//!
//! ```rust,no_run
//! use gating_core::{AnalysisConfig, ExpressionMatrix};
//! use gating_screen::{GenomeWideScreener, RunTracker};
//!
//! # fn run(matrix: &ExpressionMatrix) -> gating_core::Result<()> {
//! let screener = GenomeWideScreener::new(AnalysisConfig::default())?;
//! let tracker = RunTracker::new();
//! let panel = vec!["Arntl".to_string(), "Per2".to_string()];
//! let result = screener.screen_with_observer(matrix, &panel, &tracker)?;
//! for hit in result.hits().take(10) {
//!     println!("{} <- {}: q = {:.3}", hit.target_gene, hit.clock_gene, hit.q_value);
//! }
//! # Ok(())
//! # }
//! ```

pub mod eigenperiod;
pub mod histogram;
pub mod observer;
pub mod screener;
pub mod tracker;
pub mod wilcoxon;

pub use eigenperiod::{compare_eigenperiods, gene_eigenperiods, EigenperiodComparison};
pub use histogram::{EigenHistogram, HistogramBin, DEFAULT_BINS, DEFAULT_UPPER};
pub use observer::{NullObserver, ScreenObserver};
pub use screener::{
    ClockGeneRank, EigenvalueSummary, GenomeWideScreener, ScreenResult, DEFAULT_SCREEN_UNIT,
};
pub use tracker::{CancellationToken, RunState, RunStatus, RunTracker};
pub use wilcoxon::{rank_sum_test, RankSumTest};
