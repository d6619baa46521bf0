//! # Phase-Interaction AR(2) Model
//!
//! Fits the fixed second-order autoregressive model with clock-phase
//! interaction terms to a (clock, target) pair and reports everything the
//! downstream stages need: per-term t tests, the joint F test of the
//! interaction block, Cohen's f², a residual whiteness check and the
//! characteristic roots of the marginal lag coefficients.
//!
//! ## Key Features
//!
//! - **SVD least squares**: conditioning is checked before any estimate is trusted
//! - **Perfect-fit handling**: exact fits produce finite, interpretable statistics
//! - **Eigenvalue classification**: stability triangle plus a configurable modulus band
//! - **Univariate AR(2)**: the building block for the resampling nulls

pub mod ar2;
pub mod diagnostics;
pub mod effect;
pub mod eigen;
pub mod ols;

pub use ar2::{
    fit_ar2, fit_ar2_values, Ar2PhaseModel, ClockRhythm, FittedModel, JointTest, PhaseTerm,
    TermStatistic, UnivariateFit, MIN_TIMEPOINTS, MIN_UNIVARIATE_TIMEPOINTS, TERM_NAMES,
};
pub use diagnostics::{ljung_box, LjungBox};
pub use effect::{cohen_f_squared, EffectSize, EffectSizeInterpretation};
pub use eigen::{in_stability_triangle, EigenvalueClassifier, EigenvalueResult};
pub use ols::{ols, OlsFit};
