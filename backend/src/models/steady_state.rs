//! Deterministic steady state of the full-depreciation growth model
//!
//! With log utility, Cobb-Douglas output `k^alpha` and full depreciation the
//! steady state has a closed form:
//!
//! ```text
//! k* = (alpha * beta)^(1 / (1 - alpha))
//! y* = (k*)^alpha
//! c* = y* - k*
//! ```

use crate::calibration::{CalibrationError, ModelParameters};
use serde::{Deserialize, Serialize};

/// Steady-state capital, output and consumption
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyState {
    pub capital: f64,
    pub output: f64,
    pub consumption: f64,
}

impl SteadyState {
    /// Closed form for already-validated parameters
    pub fn from_parameters(params: &ModelParameters) -> Self {
        let capital = (params.alpha * params.beta).powf(1.0 / (1.0 - params.alpha));
        let output = capital.powf(params.alpha);
        Self {
            capital,
            output,
            consumption: output - capital,
        }
    }

    /// Validate `alpha` and `beta`, then compute
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::SteadyState;
    ///
    /// let ss = SteadyState::compute(1.0 / 3.0, 0.95).unwrap();
    /// assert!((ss.consumption - (ss.output - ss.capital)).abs() < 1e-15);
    /// assert!(SteadyState::compute(0.0, 0.95).is_err());
    /// ```
    pub fn compute(alpha: f64, beta: f64) -> Result<Self, CalibrationError> {
        Ok(Self::from_parameters(&ModelParameters::new(alpha, beta)?))
    }
}
