//! Error types for phase-gating analysis
//!
//! Provides a unified error type for all gating crates. The first four
//! variants are local to a single gene pair or resampling test and never
//! abort a batch; everything else is a batch-level failure.

use thiserror::Error;

/// Core error type for phase-gating operations
#[derive(Error, Debug)]
pub enum Error {
    /// Series too short for the fixed model
    #[error("Insufficient data: expected at least {expected} timepoints, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Degenerate regression design (e.g. collinear phase terms)
    #[error("Singular design matrix: singular value ratio {ratio:.3e} below {tolerance:.1e}")]
    SingularDesign { ratio: f64, tolerance: f64 },

    /// NaN or infinite coefficients reached the eigenvalue classifier
    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),

    /// Too many resampling draws failed for the null distribution to be trusted
    #[error("Unreliable null distribution: {excluded} of {total} draws excluded (limit {pct:.0}%)", pct = .max_rate * 100.0)]
    UnreliableNull {
        excluded: usize,
        total: usize,
        max_rate: f64,
    },

    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Long-running batch was cancelled between batches
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error (for configuration files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this failure is confined to a single pair or test.
    ///
    /// Recoverable failures are recorded and reported as warnings; the
    /// surrounding batch carries on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData { .. }
                | Self::SingularDesign { .. }
                | Self::InvalidCoefficients(_)
                | Self::UnreliableNull { .. }
        )
    }

    /// Short machine-friendly label for summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::SingularDesign { .. } => "singular_design",
            Self::InvalidCoefficients(_) => "invalid_coefficients",
            Self::UnreliableNull { .. } => "unreliable_null",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::InvalidInput(_) => "invalid_input",
            Self::Computation(_) => "computation",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::InvalidInput(format!("{context} contains NaN or infinite values"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientData { expected: 11, actual: 6 };
        assert_eq!(
            err.to_string(),
            "Insufficient data: expected at least 11 timepoints, got 6"
        );

        let err = Error::InvalidCoefficients("phi1 is NaN".to_string());
        assert_eq!(err.to_string(), "Invalid coefficients: phi1 is NaN");

        let err = Error::UnreliableNull { excluded: 30, total: 100, max_rate: 0.2 };
        assert_eq!(
            err.to_string(),
            "Unreliable null distribution: 30 of 100 draws excluded (limit 20%)"
        );

        let err = Error::Cancelled;
        assert_eq!(err.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_recoverable_split() {
        assert!(Error::InsufficientData { expected: 11, actual: 3 }.is_recoverable());
        assert!(Error::SingularDesign { ratio: 0.0, tolerance: 1e-10 }.is_recoverable());
        assert!(Error::InvalidCoefficients(String::new()).is_recoverable());
        assert!(Error::UnreliableNull { excluded: 1, total: 2, max_rate: 0.2 }.is_recoverable());

        assert!(!Error::InvalidInput("empty gene set".to_string()).is_recoverable());
        assert!(!Error::Cancelled.is_recoverable());
    }

    #[test]
    fn test_error_helpers() {
        let err = Error::size_mismatch(24, 12, "clock series");
        assert_eq!(
            err.to_string(),
            "Invalid input: Size mismatch in clock series: expected 24, got 12"
        );
        assert_eq!(err.kind(), "invalid_input");

        let err = Error::non_finite("target series");
        assert!(err.to_string().contains("NaN or infinite"));
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: Error = anyhow::anyhow!("custom error message").into();
        match err {
            Error::Other(_) => assert!(err.to_string().contains("custom error message")),
            _ => panic!("Wrong error type"),
        }
    }
}
