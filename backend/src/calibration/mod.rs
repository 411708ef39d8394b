//! Calibration - model parameters and solver settings
//!
//! A [`Calibration`] carries every recognized option of a run: the two
//! structural parameters, the productivity process, the capital grid
//! construction and the solver settings. `Calibration::default()` is the
//! reference calibration; a JSON document may override any subset of fields.
//!
//! # Critical Invariants
//!
//! 1. alpha and beta lie strictly inside (0, 1)
//! 2. The transition matrix is P×P, entries in [0, 1], rows sum to 1
//!    within [`TRANSITION_ROW_TOLERANCE`]
//! 3. The capital grid is non-empty, strictly increasing and at most
//!    [`MAX_CAPITAL_GRID_POINTS`] long
//!
//! Every check runs before the engine allocates anything.

use crate::bellman::SearchStrategy;
use crate::models::grid::{CapitalGrid, ProductivityGrid, TransitionMatrix};
use crate::models::steady_state::SteadyState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Reference Constants
// ============================================================================

/// Elasticity of output with respect to capital
pub const REFERENCE_ALPHA: f64 = 1.0 / 3.0;

/// Discount factor
pub const REFERENCE_BETA: f64 = 0.95;

/// Productivity levels of the reference Markov chain
pub const REFERENCE_PRODUCTIVITY: [f64; 5] = [0.9792, 0.9896, 1.0000, 1.0106, 1.0212];

/// Reference transition matrix, row = today, column = tomorrow
pub const REFERENCE_TRANSITION: [[f64; 5]; 5] = [
    [0.9727, 0.0273, 0.0000, 0.0000, 0.0000],
    [0.0041, 0.9806, 0.0153, 0.0000, 0.0000],
    [0.0000, 0.0082, 0.9837, 0.0082, 0.0000],
    [0.0000, 0.0000, 0.0153, 0.9806, 0.0041],
    [0.0000, 0.0000, 0.0000, 0.0273, 0.9727],
];

/// Capital grid starts at this multiple of steady-state capital
pub const REFERENCE_CAPITAL_LOWER_FACTOR: f64 = 0.5;

/// Capital grid stops (exclusive) at this multiple of steady-state capital
pub const REFERENCE_CAPITAL_UPPER_FACTOR: f64 = 1.5;

/// Distance between neighbouring capital grid points
pub const REFERENCE_CAPITAL_STEP: f64 = 1e-5;

/// Sup-norm convergence tolerance
pub const REFERENCE_TOLERANCE: f64 = 1e-7;

/// Iteration cap before a run is declared non-convergent
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// A progress line is logged on iteration 1 and every this many iterations
pub const DEFAULT_REPORT_EVERY: usize = 10;

/// Allowed deviation of a transition row sum from 1
///
/// Calibrated chains are published to four decimals, so rows can miss 1 by a
/// unit in the last place (the reference middle row sums to 1.0001). Rows are
/// used as given, not renormalised.
pub const TRANSITION_ROW_TOLERANCE: f64 = 1e-3;

/// Largest capital grid a calibration may request
///
/// The engine holds several K×P buffers; at five productivity states this
/// caps them at a few hundred megabytes each.
pub const MAX_CAPITAL_GRID_POINTS: usize = 10_000_000;

/// Capital index of the diagnostic policy value printed after a run
pub const DIAGNOSTIC_CAPITAL_INDEX: usize = 999;

/// Productivity index of the diagnostic policy value printed after a run
pub const DIAGNOSTIC_PRODUCTIVITY_INDEX: usize = 2;

// ============================================================================
// Errors
// ============================================================================

/// Invalid calibration input
///
/// Every variant is fatal: the engine cannot be built from the input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("alpha must lie in (0, 1), got {0}")]
    AlphaOutOfRange(f64),

    #[error("beta must lie in (0, 1), got {0}")]
    BetaOutOfRange(f64),

    #[error("Productivity grid is empty")]
    EmptyProductivityGrid,

    #[error("Productivity level {index} must be finite and positive, got {value}")]
    InvalidProductivityLevel { index: usize, value: f64 },

    #[error("Transition matrix has {rows} rows, expected {expected}")]
    TransitionRowCount { rows: usize, expected: usize },

    #[error("Transition row {row} has {len} entries, expected {expected}")]
    TransitionRowLength { row: usize, len: usize, expected: usize },

    #[error("Transition probability at ({row}, {col}) must lie in [0, 1], got {value}")]
    InvalidTransitionProbability { row: usize, col: usize, value: f64 },

    #[error("Transition row {row} sums to {sum}, expected 1")]
    TransitionRowSum { row: usize, sum: f64 },

    #[error("Capital grid factors must satisfy 0 < lower < upper, got lower={lower}, upper={upper}")]
    InvalidCapitalBounds { lower: f64, upper: f64 },

    #[error("Capital grid step must be finite and positive, got {0}")]
    InvalidCapitalStep(f64),

    #[error("Capital grid is empty")]
    EmptyCapitalGrid,

    #[error("Capital grid would have {points} points, more than the limit of {limit}")]
    CapitalGridTooLarge { points: f64, limit: usize },

    #[error("Capital level {index} must be finite and non-negative, got {value}")]
    InvalidCapitalLevel { index: usize, value: f64 },

    #[error("Capital grid is not strictly increasing at index {index}")]
    NonIncreasingCapitalGrid { index: usize },

    #[error("Tolerance must be finite and positive, got {0}")]
    InvalidTolerance(f64),

    #[error("max_iterations must be positive")]
    ZeroMaxIterations,

    #[error("Invalid calibration document: {0}")]
    InvalidDocument(String),
}

// ============================================================================
// Model Parameters
// ============================================================================

/// Structural parameters of the growth model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Capital share in the production function `z * k^alpha`
    pub alpha: f64,

    /// Discount factor
    pub beta: f64,
}

impl ModelParameters {
    /// Validate and build
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::ModelParameters;
    ///
    /// assert!(ModelParameters::new(1.0 / 3.0, 0.95).is_ok());
    /// assert!(ModelParameters::new(1.0, 0.95).is_err());
    /// ```
    pub fn new(alpha: f64, beta: f64) -> Result<Self, CalibrationError> {
        // NaN fails both comparisons
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(CalibrationError::AlphaOutOfRange(alpha));
        }
        if !(beta > 0.0 && beta < 1.0) {
            return Err(CalibrationError::BetaOutOfRange(beta));
        }
        Ok(Self { alpha, beta })
    }

    /// Reference parameters (alpha = 1/3, beta = 0.95)
    pub fn reference() -> Self {
        Self {
            alpha: REFERENCE_ALPHA,
            beta: REFERENCE_BETA,
        }
    }
}

// ============================================================================
// Calibration
// ============================================================================

/// Complete run configuration
///
/// Missing JSON fields fall back to the reference values; unknown fields are
/// rejected.
///
/// # Example
///
/// ```rust
/// use rbc_vfi_core_rs::Calibration;
///
/// let calibration = Calibration::from_json_str(r#"{ "tolerance": 1e-6 }"#).unwrap();
/// assert_eq!(calibration.tolerance, 1e-6);
/// assert_eq!(calibration.beta, 0.95);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Calibration {
    /// Elasticity of output with respect to capital
    pub alpha: f64,

    /// Discount factor
    pub beta: f64,

    /// Productivity levels, one per Markov state
    pub productivity_grid: Vec<f64>,

    /// Row-stochastic transition matrix over the productivity states
    pub transition_matrix: Vec<Vec<f64>>,

    /// Grid lower bound as a multiple of steady-state capital
    pub capital_grid_lower_factor: f64,

    /// Grid upper bound (exclusive) as a multiple of steady-state capital
    pub capital_grid_upper_factor: f64,

    /// Capital grid spacing
    pub capital_grid_step: f64,

    /// Sup-norm convergence tolerance
    pub tolerance: f64,

    /// Outer iterations allowed before reporting non-convergence
    pub max_iterations: usize,

    /// Inner search over next-period capital
    pub search: SearchStrategy,

    /// Progress cadence in iterations (0 = only iteration 1)
    pub report_every: usize,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            alpha: REFERENCE_ALPHA,
            beta: REFERENCE_BETA,
            productivity_grid: REFERENCE_PRODUCTIVITY.to_vec(),
            transition_matrix: REFERENCE_TRANSITION.iter().map(|row| row.to_vec()).collect(),
            capital_grid_lower_factor: REFERENCE_CAPITAL_LOWER_FACTOR,
            capital_grid_upper_factor: REFERENCE_CAPITAL_UPPER_FACTOR,
            capital_grid_step: REFERENCE_CAPITAL_STEP,
            tolerance: REFERENCE_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            search: SearchStrategy::default(),
            report_every: DEFAULT_REPORT_EVERY,
        }
    }
}

impl Calibration {
    /// Parse a JSON calibration document
    pub fn from_json_str(json: &str) -> Result<Self, CalibrationError> {
        serde_json::from_str(json).map_err(|e| CalibrationError::InvalidDocument(e.to_string()))
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, CalibrationError> {
        serde_json::to_string_pretty(self).map_err(|e| CalibrationError::InvalidDocument(e.to_string()))
    }

    /// Run every check without building anything large
    ///
    /// The capital grid is only sized here, not allocated; a grid longer than
    /// [`MAX_CAPITAL_GRID_POINTS`] is rejected.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let params = self.model_parameters()?;
        let productivity = self.productivity_grid()?;
        TransitionMatrix::new(&self.transition_matrix, productivity.len())?;
        capital_grid_len(
            SteadyState::from_parameters(&params).capital,
            self.capital_grid_lower_factor,
            self.capital_grid_upper_factor,
            self.capital_grid_step,
        )?;
        validate_solver_settings(self.tolerance, self.max_iterations)?;
        Ok(())
    }

    pub fn model_parameters(&self) -> Result<ModelParameters, CalibrationError> {
        ModelParameters::new(self.alpha, self.beta)
    }

    pub fn productivity_grid(&self) -> Result<ProductivityGrid, CalibrationError> {
        ProductivityGrid::new(self.productivity_grid.clone())
    }

    pub fn transition_matrix(&self) -> Result<TransitionMatrix, CalibrationError> {
        TransitionMatrix::new(&self.transition_matrix, self.productivity_grid.len())
    }

    pub fn steady_state(&self) -> Result<SteadyState, CalibrationError> {
        Ok(SteadyState::from_parameters(&self.model_parameters()?))
    }

    /// Evenly spaced grid around steady-state capital
    pub fn capital_grid(&self) -> Result<CapitalGrid, CalibrationError> {
        let steady_state = self.steady_state()?;
        CapitalGrid::around_steady_state(
            steady_state.capital,
            self.capital_grid_lower_factor,
            self.capital_grid_upper_factor,
            self.capital_grid_step,
        )
    }
}

fn validate_capital_bounds(
    lower_factor: f64,
    upper_factor: f64,
    step: f64,
) -> Result<(), CalibrationError> {
    if !(lower_factor > 0.0 && lower_factor < upper_factor && upper_factor.is_finite()) {
        return Err(CalibrationError::InvalidCapitalBounds {
            lower: lower_factor,
            upper: upper_factor,
        });
    }
    if !(step > 0.0 && step.is_finite()) {
        return Err(CalibrationError::InvalidCapitalStep(step));
    }
    Ok(())
}

/// Number of points of the grid `[lower_factor * k*, upper_factor * k*)` with spacing `step`
///
/// Checks the bounds and the step first, then rejects empty grids and grids
/// longer than [`MAX_CAPITAL_GRID_POINTS`].
pub(crate) fn capital_grid_len(
    steady_state_capital: f64,
    lower_factor: f64,
    upper_factor: f64,
    step: f64,
) -> Result<usize, CalibrationError> {
    validate_capital_bounds(lower_factor, upper_factor, step)?;
    let lower = lower_factor * steady_state_capital;
    let upper = upper_factor * steady_state_capital;
    let points = ((upper - lower) / step).ceil();
    if !(points >= 1.0) {
        return Err(CalibrationError::EmptyCapitalGrid);
    }
    if !(points <= MAX_CAPITAL_GRID_POINTS as f64) {
        return Err(CalibrationError::CapitalGridTooLarge {
            points,
            limit: MAX_CAPITAL_GRID_POINTS,
        });
    }
    Ok(points as usize)
}

pub(crate) fn validate_solver_settings(
    tolerance: f64,
    max_iterations: usize,
) -> Result<(), CalibrationError> {
    if !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(CalibrationError::InvalidTolerance(tolerance));
    }
    if max_iterations == 0 {
        return Err(CalibrationError::ZeroMaxIterations);
    }
    Ok(())
}
