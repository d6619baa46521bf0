//! Characteristic roots of the AR(2) recurrence
//!
//! For x(t) = φ₁x(t−1) + φ₂x(t−2) the roots of λ² − φ₁λ − φ₂ = 0 decide how
//! long a perturbation persists. Stability is decided by the AR(2) triangle
//! (φ₂ > −1, φ₂ < 1 − φ₁, φ₂ < 1 + φ₁); the modulus is used for magnitude and
//! band membership only.

use gating_core::{Error, Result, StabilityBand};
use serde::Serialize;
use std::f64::consts::PI;

/// Dominant characteristic root and its classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EigenvalueResult {
    pub phi1: f64,
    pub phi2: f64,
    /// Real part of the reported root
    pub real: f64,
    /// Imaginary part (non-negative member of a complex pair, zero otherwise)
    pub imaginary: f64,
    pub modulus: f64,
    pub is_complex: bool,
    pub is_stable: bool,
    pub in_band: bool,
}

impl EigenvalueResult {
    /// Oscillation period implied by a complex root, in time units.
    ///
    /// `None` for real roots.
    pub fn eigenperiod(&self, sampling_interval: f64) -> Option<f64> {
        if !self.is_complex {
            return None;
        }
        let angle = self.imaginary.atan2(self.real);
        if angle <= 0.0 {
            return None;
        }
        Some(2.0 * PI / angle * sampling_interval)
    }

    /// Steps for a perturbation to decay to half its size
    pub fn half_life(&self) -> Option<f64> {
        if self.is_stable && self.modulus > 0.0 && self.modulus < 1.0 {
            Some(0.5f64.ln() / self.modulus.ln())
        } else {
            None
        }
    }
}

/// Whether (φ₁, φ₂) lies strictly inside the AR(2) stationarity triangle
pub fn in_stability_triangle(phi1: f64, phi2: f64) -> bool {
    phi2 > -1.0 && phi2 < 1.0 - phi1 && phi2 < 1.0 + phi1
}

/// Classifies lag coefficient pairs against a stability band
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EigenvalueClassifier {
    band: StabilityBand,
}

impl EigenvalueClassifier {
    pub fn new(band: StabilityBand) -> Self {
        Self { band }
    }

    pub fn band(&self) -> StabilityBand {
        self.band
    }

    /// Classify the characteristic roots of (φ₁, φ₂)
    pub fn classify(&self, phi1: f64, phi2: f64) -> Result<EigenvalueResult> {
        if !phi1.is_finite() || !phi2.is_finite() {
            return Err(Error::InvalidCoefficients(format!(
                "lag coefficients must be finite, got phi1={phi1}, phi2={phi2}"
            )));
        }

        let discriminant = phi1 * phi1 + 4.0 * phi2;
        let (real, imaginary, modulus, is_complex) = if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            let a = (phi1 + root) / 2.0;
            let b = (phi1 - root) / 2.0;
            let dominant = if a.abs() >= b.abs() { a } else { b };
            (dominant, 0.0, dominant.abs(), false)
        } else {
            let imaginary = (-discriminant).sqrt() / 2.0;
            (phi1 / 2.0, imaginary, (-phi2).sqrt(), true)
        };

        Ok(EigenvalueResult {
            phi1,
            phi2,
            real,
            imaginary,
            modulus,
            is_complex,
            is_stable: in_stability_triangle(phi1, phi2),
            in_band: self.band.contains(modulus),
        })
    }
}
