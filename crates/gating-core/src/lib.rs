//! Core types for phase-gating analysis
//!
//! This crate holds what every stage of the engine shares: the error
//! taxonomy, the time-series containers, the run configuration and a few
//! statistical helpers.
//!
//! # Example
//!
//! ```rust
//! use gating_core::{AnalysisConfig, TimeSeries};
//!
//! let config = AnalysisConfig::default().with_period(24.0).with_seed(7);
//! config.validate().unwrap();
//!
//! let series = TimeSeries::evenly_spaced("Per2", 2.0, vec![1.0, 1.4, 1.1, 0.7]).unwrap();
//! assert_eq!(series.sampling_interval(), Some(2.0));
//! ```

pub mod config;
pub mod error;
pub mod math;
pub mod series;

// Re-export core types
pub use config::{AnalysisConfig, FdrMethod, StabilityBand};
pub use error::{Error, Result};
pub use series::{ExpressionMatrix, TimeSeries};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{AnalysisConfig, StabilityBand};
    pub use crate::error::Error;
    pub use crate::series::{ExpressionMatrix, TimeSeries};
    pub use crate::Result;
}
