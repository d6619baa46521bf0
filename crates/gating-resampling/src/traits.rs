//! The contract shared by every resampling test

use gating_core::Result;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Which resampling scheme produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    TimeShuffle,
    RandomGeneSet,
    BlockBootstrap,
    Permutation,
}

impl TestKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TimeShuffle => "time-shuffle null",
            Self::RandomGeneSet => "random gene-set null",
            Self::BlockBootstrap => "block bootstrap",
            Self::Permutation => "permutation test",
        }
    }

    /// Bootstrap draws estimate the statistic's sampling distribution rather
    /// than a null distribution
    pub fn is_bootstrap(&self) -> bool {
        matches!(self, Self::BlockBootstrap)
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A statistic that can be computed on the real data and on resamples of it
pub trait NullModel: Sync {
    fn kind(&self) -> TestKind;

    /// Statistic on the unmodified data
    fn observed(&self) -> Result<f64>;

    /// Statistic on one fresh resample.
    ///
    /// An error marks this resample as failed; the validator retries with a
    /// new resample from the same stream.
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64>;
}
