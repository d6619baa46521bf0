//! # Resampling Validation
//!
//! Empirical checks of the eigenvalue gap between a clock gene set and a
//! target gene set. Each scheme implements [`NullModel`]; the
//! [`ResamplingValidator`] runs the draws in parallel with one seeded ChaCha
//! stream per draw, retries failed draws and refuses to report when too many
//! had to be excluded.
//!
//! - [`TimeShuffleNull`]: permute values within each gene
//! - [`RandomGeneSetNull`]: random disjoint gene sets of the same sizes
//! - [`BlockBootstrap`]: moving blocks of about one period
//! - [`PermutationTest`]: relabel a precomputed genome-wide modulus vector

pub mod gap;
pub mod nulls;
pub mod traits;
pub mod validator;

pub use gap::{eigenvalue_gap, gene_modulus, genome_moduli, GeneSets};
pub use nulls::{
    block_length, moving_block_resample, BlockBootstrap, PermutationTest, RandomGeneSetNull,
    TimeShuffleNull,
};
pub use traits::{NullModel, TestKind};
pub use validator::{empirical_p_value, ResamplingReport, ResamplingValidator, ValidatorConfig};
