//! # Multiple-Comparison Correction
//!
//! Turns fitted phase models into [`Hypothesis`] records. Each pair's four
//! interaction-term p-values are Bonferroni-corrected into one pair p-value,
//! and Benjamini-Hochberg is applied once across the whole run.
//!
//! ```rust
//! use gating_correction::{correct_across_pairs, correct_within_pair};
//!
//! let pair_p = correct_within_pair([0.004, 0.3, 0.5, 0.8]).unwrap();
//! assert!((pair_p - 0.016).abs() < 1e-12);
//!
//! let q = correct_across_pairs(&[pair_p, 0.2, 0.04]).unwrap();
//! assert!(q.iter().zip([pair_p, 0.2, 0.04]).all(|(q, p)| *q >= p));
//! ```

pub mod correction;
pub mod hypothesis;

pub use correction::{
    bonferroni, correct_across_pairs, correct_within_pair, step_up_significance, PHASE_TERM_COUNT,
};
pub use hypothesis::{CoefficientInterval, FailedPair, Hypothesis, HypothesisBatch, UnitFit};
