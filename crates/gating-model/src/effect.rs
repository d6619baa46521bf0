//! Effect size for the phase-interaction block
//!
//! Cohen's f² measures the variance explained by the four phase terms
//! relative to what the full model leaves unexplained.

use serde::Serialize;
use std::fmt;

/// Interpretation of Cohen's f² following Cohen's conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSizeInterpretation {
    /// f² < 0.02
    Negligible,
    /// 0.02 ≤ f² < 0.15
    Small,
    /// 0.15 ≤ f² < 0.35
    Medium,
    /// f² ≥ 0.35
    Large,
}

impl EffectSizeInterpretation {
    pub const SMALL_THRESHOLD: f64 = 0.02;
    pub const MEDIUM_THRESHOLD: f64 = 0.15;
    pub const LARGE_THRESHOLD: f64 = 0.35;

    /// Interpret an f² value
    pub fn from_f_squared(f_squared: f64) -> Self {
        if f_squared.is_nan() || f_squared < Self::SMALL_THRESHOLD {
            Self::Negligible
        } else if f_squared < Self::MEDIUM_THRESHOLD {
            Self::Small
        } else if f_squared < Self::LARGE_THRESHOLD {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

impl fmt::Display for EffectSizeInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Negligible => "negligible",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        };
        write!(f, "{}", s)
    }
}

/// Cohen's f² with its interpretation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectSize {
    pub f_squared: f64,
    pub interpretation: EffectSizeInterpretation,
}

impl EffectSize {
    /// Effect of adding a block of predictors to a reduced model
    pub fn from_r_squared(r2_full: f64, r2_reduced: f64) -> Self {
        Self::new(cohen_f_squared(r2_full, r2_reduced))
    }

    pub fn new(f_squared: f64) -> Self {
        Self {
            f_squared,
            interpretation: EffectSizeInterpretation::from_f_squared(f_squared),
        }
    }

    /// Medium or large effects
    pub fn is_practically_significant(&self) -> bool {
        matches!(
            self.interpretation,
            EffectSizeInterpretation::Medium | EffectSizeInterpretation::Large
        )
    }
}

impl fmt::Display for EffectSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f² = {:.3} ({})", self.f_squared, self.interpretation)
    }
}

/// Cohen's f² = (R²_full − R²_reduced) / (1 − R²_full)
///
/// A non-positive R² change gives 0. A perfect full model with a positive
/// change gives +∞.
pub fn cohen_f_squared(r2_full: f64, r2_reduced: f64) -> f64 {
    let change = r2_full - r2_reduced;
    if !(change > 0.0) {
        return 0.0;
    }
    let unexplained = 1.0 - r2_full;
    if unexplained <= 0.0 {
        f64::INFINITY
    } else {
        change / unexplained
    }
}
