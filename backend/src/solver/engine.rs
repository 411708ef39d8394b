//! Value Iteration Engine
//!
//! Drives the Bellman operator to its fixed point:
//!
//! ```text
//! Until sup |V_new - V| < tolerance:
//! 1. E = V * T^T                         (expected continuation value)
//! 2. For each productivity state p:
//!      cursor = 0
//!      for each capital state k, ascending:
//!        scan next-period capital j upward from cursor,
//!        stop at the first non-improving candidate,
//!        V_new[k, p] = best value, policy[k, p] = best j, cursor = best j
//! 3. sup_diff = max |V_new - V|
//! 4. V <- V_new (buffer swap), iteration += 1
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rbc_vfi_core_rs::{Calibration, ValueIterationEngine};
//!
//! let mut engine = ValueIterationEngine::new(&Calibration::default()).unwrap();
//!
//! // Drive it step by step, or call `run()`
//! while !engine.is_converged() {
//!     let report = engine.step().unwrap();
//!     println!("Iteration {}: sup diff {}", report.iteration, report.max_difference);
//! }
//! let solution = engine.solution();
//! println!("Policy at (999, 2): {:?}", solution.policy_at(999, 2));
//! ```

use crate::bellman::{expected_values_into, BellmanKernel, InfeasibleState, SearchStrategy};
use crate::calibration::{
    validate_solver_settings, Calibration, CalibrationError, ModelParameters,
    DEFAULT_MAX_ITERATIONS, DEFAULT_REPORT_EVERY, REFERENCE_TOLERANCE,
};
use crate::core::progress::IterationClock;
use crate::models::grid::{CapitalGrid, ProductivityGrid, TransitionMatrix};
use crate::models::matrix::StateMatrix;
use crate::models::steady_state::SteadyState;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// ============================================================================
// Configuration Types
// ============================================================================

/// Solver settings independent of the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Stop once the sup-norm change falls below this
    pub tolerance: f64,

    /// Outer iterations allowed before `run()` gives up
    pub max_iterations: usize,

    /// Inner search over next-period capital
    pub search: SearchStrategy,

    /// Progress cadence (iteration 1 always reports)
    pub report_every: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: REFERENCE_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            search: SearchStrategy::Monotone,
            report_every: DEFAULT_REPORT_EVERY,
        }
    }
}

impl From<&Calibration> for SolverOptions {
    fn from(calibration: &Calibration) -> Self {
        Self {
            tolerance: calibration.tolerance,
            max_iterations: calibration.max_iterations,
            search: calibration.search,
            report_every: calibration.report_every,
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverState {
    /// Sup-norm change still at or above tolerance
    Running,

    /// Sup-norm change fell below tolerance; further steps are no-ops
    Converged,
}

/// Outcome of one outer iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IterationReport {
    /// Outer iterations completed
    pub iteration: usize,

    /// Sup-norm change produced by the latest iteration
    pub max_difference: f64,

    /// Lifecycle after the iteration
    pub state: SolverState,
}

/// Final (or last) iterate of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    /// V[k, p]
    pub value_function: StateMatrix,

    /// Optimal next-period capital level per state
    pub policy_function: StateMatrix,

    /// Capital-grid index behind each policy level, column-major like the matrices
    pub policy_indices: Vec<usize>,

    /// Outer iterations performed
    pub iterations: usize,

    /// Sup-norm change of the last iteration
    pub max_difference: f64,

    /// Whether the change fell below tolerance
    pub converged: bool,
}

impl Solution {
    pub fn capital_len(&self) -> usize {
        self.value_function.capital_len()
    }

    pub fn productivity_len(&self) -> usize {
        self.value_function.productivity_len()
    }

    pub fn value_at(&self, capital_index: usize, productivity_index: usize) -> Option<f64> {
        self.value_function.try_get(capital_index, productivity_index)
    }

    /// Next-period capital chosen in state `(k, p)`
    pub fn policy_at(&self, capital_index: usize, productivity_index: usize) -> Option<f64> {
        self.policy_function.try_get(capital_index, productivity_index)
    }

    pub fn policy_index_at(&self, capital_index: usize, productivity_index: usize) -> Option<usize> {
        if capital_index >= self.capital_len() || productivity_index >= self.productivity_len() {
            return None;
        }
        Some(self.policy_indices[productivity_index * self.capital_len() + capital_index])
    }

    /// Whether the policy is non-decreasing in capital for every productivity state
    pub fn is_policy_monotone(&self) -> bool {
        let capital_len = self.capital_len().max(1);
        self.policy_indices
            .chunks(capital_len)
            .all(|column| column.windows(2).all(|pair| pair[0] <= pair[1]))
    }
}

/// One application of the Bellman operator to an arbitrary value function
#[derive(Debug, Clone, PartialEq)]
pub struct BellmanUpdate {
    /// T(V)
    pub value_function: StateMatrix,

    /// Maximising capital-grid indices, column-major
    pub policy_indices: Vec<usize>,
}

/// Solver error types
#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    /// Calibration rejected before anything was allocated
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] CalibrationError),

    /// No candidate left positive consumption; the capital grid sits too
    /// high relative to output
    #[error(
        "Non-positive consumption at capital index {capital_index}, productivity index \
         {productivity_index}: output {output} does not exceed next-period capital {lowest_candidate}"
    )]
    NonPositiveConsumption {
        capital_index: usize,
        productivity_index: usize,
        output: f64,
        lowest_candidate: f64,
    },

    /// Iteration cap reached with the sup-norm change still at or above tolerance
    #[error("Value iteration did not converge within {iterations} iterations (sup diff {max_difference})")]
    ConvergenceFailure {
        iterations: usize,
        max_difference: f64,
        last: Box<Solution>,
    },

    /// Value function passed in does not match the engine's grids
    #[error("Value function has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

// ============================================================================
// Bellman Operator
// ============================================================================

/// Everything the operator reads; immutable once built
#[derive(Debug, Clone)]
struct BellmanOperator {
    beta: f64,
    transition: TransitionMatrix,
    capital: CapitalGrid,
    /// y[k, p] = z[p] * K[k]^alpha
    output: StateMatrix,
    search: SearchStrategy,
}

impl BellmanOperator {
    /// Write T(value) into `next` and the maximisers into `policy`
    ///
    /// `expected` is scratch space, overwritten with `value * T^T`. `value`
    /// is never written.
    fn apply_into(
        &self,
        value: &StateMatrix,
        expected: &mut StateMatrix,
        next: &mut StateMatrix,
        policy: &mut [usize],
    ) -> Result<(), SolverError> {
        expected_values_into(value, &self.transition, expected);
        let expected = &*expected;
        let capital_len = self.capital.len();

        #[cfg(not(feature = "parallel"))]
        for (p, (values, choices)) in next
            .columns_mut()
            .zip(policy.chunks_mut(capital_len))
            .enumerate()
        {
            self.sweep(p, expected, values, choices)?;
        }

        // Columns are disjoint; the cursor dependency is within a column only
        #[cfg(feature = "parallel")]
        next.as_mut_slice()
            .par_chunks_mut(capital_len)
            .zip(policy.par_chunks_mut(capital_len))
            .enumerate()
            .try_for_each(|(p, (values, choices))| self.sweep(p, expected, values, choices))?;

        Ok(())
    }

    fn sweep(
        &self,
        productivity_index: usize,
        expected: &StateMatrix,
        values: &mut [f64],
        choices: &mut [usize],
    ) -> Result<(), SolverError> {
        let kernel = BellmanKernel::new(
            self.beta,
            self.capital.levels(),
            expected.column(productivity_index),
        );
        kernel
            .sweep_column(self.output.column(productivity_index), self.search, values, choices)
            .map_err(|e: InfeasibleState| SolverError::NonPositiveConsumption {
                capital_index: e.capital_index,
                productivity_index,
                output: e.output,
                lowest_candidate: e.lowest_candidate,
            })
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Owns the grids, the output table and the double-buffered value function
///
/// # Buffers
///
/// `value` is only read during an iteration; the new iterate is written into
/// `next_value` and the two are swapped afterwards, as are the policy
/// buffers. A failed iteration therefore leaves the published iterate intact.
/// `expected` is reused across iterations.
pub struct ValueIterationEngine {
    params: ModelParameters,
    productivity: ProductivityGrid,
    operator: BellmanOperator,
    options: SolverOptions,

    /// Present when built from a calibration
    steady_state: Option<SteadyState>,

    /// Current iterate V
    value: StateMatrix,

    /// Buffer receiving T(V)
    next_value: StateMatrix,

    /// Scratch for V * T^T
    expected: StateMatrix,

    /// Maximising capital indices of the latest iteration, column-major
    policy_index: Vec<usize>,

    /// Buffer receiving the maximisers of T(V)
    next_policy_index: Vec<usize>,

    clock: IterationClock,
    max_difference: f64,
    state: SolverState,
}

impl ValueIterationEngine {
    /// Build an engine from a calibration
    ///
    /// Validates every parameter, computes the steady state, builds the
    /// capital grid around it and precomputes the output table.
    ///
    /// # Returns
    ///
    /// * `Ok(ValueIterationEngine)` - ready to `step()` or `run()`
    /// * `Err(SolverError::InvalidParameter)` - calibration rejected
    ///
    /// # Example
    ///
    /// ```rust
    /// use rbc_vfi_core_rs::{Calibration, ValueIterationEngine};
    ///
    /// let calibration = Calibration {
    ///     capital_grid_step: 1e-3,
    ///     ..Calibration::default()
    /// };
    /// let engine = ValueIterationEngine::new(&calibration).unwrap();
    /// assert_eq!(engine.capital_grid().len(), 179);
    /// assert_eq!(engine.iteration(), 0);
    /// ```
    pub fn new(calibration: &Calibration) -> Result<Self, SolverError> {
        calibration.validate()?;

        let params = calibration.model_parameters()?;
        let steady_state = SteadyState::from_parameters(&params);
        info!(
            output = steady_state.output,
            capital = steady_state.capital,
            consumption = steady_state.consumption,
            "steady state"
        );

        let capital = CapitalGrid::around_steady_state(
            steady_state.capital,
            calibration.capital_grid_lower_factor,
            calibration.capital_grid_upper_factor,
            calibration.capital_grid_step,
        )?;

        let mut engine = Self::from_parts(
            params,
            calibration.productivity_grid()?,
            calibration.transition_matrix()?,
            capital,
            SolverOptions::from(calibration),
        )?;
        engine.steady_state = Some(steady_state);
        Ok(engine)
    }

    /// Build an engine from explicit grids
    ///
    /// The value function starts at zero and the state at `Running`.
    pub fn from_parts(
        params: ModelParameters,
        productivity: ProductivityGrid,
        transition: TransitionMatrix,
        capital: CapitalGrid,
        options: SolverOptions,
    ) -> Result<Self, SolverError> {
        let params = ModelParameters::new(params.alpha, params.beta)?;
        if transition.size() != productivity.len() {
            return Err(CalibrationError::TransitionRowCount {
                rows: transition.size(),
                expected: productivity.len(),
            }
            .into());
        }
        validate_solver_settings(options.tolerance, options.max_iterations)?;

        let capital_len = capital.len();
        let productivity_len = productivity.len();

        let output = StateMatrix::from_fn(capital_len, productivity_len, |k, p| {
            productivity.level(p) * capital.level(k).powf(params.alpha)
        });

        debug!(
            capital_points = capital_len,
            productivity_states = productivity_len,
            search = ?options.search,
            "engine initialized"
        );

        Ok(Self {
            params,
            productivity,
            operator: BellmanOperator {
                beta: params.beta,
                transition,
                capital,
                output,
                search: options.search,
            },
            options,
            steady_state: None,
            value: StateMatrix::zeros(capital_len, productivity_len),
            next_value: StateMatrix::zeros(capital_len, productivity_len),
            expected: StateMatrix::zeros(capital_len, productivity_len),
            policy_index: vec![0; capital_len * productivity_len],
            next_policy_index: vec![0; capital_len * productivity_len],
            clock: IterationClock::new(options.report_every),
            max_difference: f64::INFINITY,
            state: SolverState::Running,
        })
    }

    /// Perform one outer iteration
    ///
    /// Once converged this is a no-op returning the final report.
    ///
    /// # Errors
    ///
    /// `SolverError::NonPositiveConsumption` when some state has no feasible
    /// next-period capital; the current iterate is left untouched.
    pub fn step(&mut self) -> Result<IterationReport, SolverError> {
        if self.state == SolverState::Converged {
            return Ok(self.report());
        }

        self.operator.apply_into(
            &self.value,
            &mut self.expected,
            &mut self.next_value,
            &mut self.next_policy_index,
        )?;

        let max_difference = self.next_value.max_abs_diff(&self.value);
        std::mem::swap(&mut self.value, &mut self.next_value);
        std::mem::swap(&mut self.policy_index, &mut self.next_policy_index);
        self.next_value.fill(0.0);

        self.max_difference = max_difference;
        self.clock.advance();
        let iteration = self.clock.iteration();

        if self.clock.is_report_due() {
            info!(iteration, sup_diff = max_difference, "value iteration progress");
        } else {
            debug!(iteration, sup_diff = max_difference, "value iteration progress");
        }

        if max_difference < self.options.tolerance {
            self.state = SolverState::Converged;
            info!(
                iteration,
                sup_diff = max_difference,
                elapsed_secs = self.clock.elapsed().as_secs_f64(),
                "value iteration converged"
            );
        }

        Ok(self.report())
    }

    /// Iterate until convergence or the iteration cap
    ///
    /// # Errors
    ///
    /// * `SolverError::NonPositiveConsumption` - see [`step`](Self::step)
    /// * `SolverError::ConvergenceFailure` - cap reached; carries the last iterate
    pub fn run(&mut self) -> Result<Solution, SolverError> {
        while self.state == SolverState::Running {
            if self.clock.iteration() >= self.options.max_iterations {
                warn!(
                    iterations = self.clock.iteration(),
                    sup_diff = self.max_difference,
                    tolerance = self.options.tolerance,
                    "iteration cap reached before convergence"
                );
                return Err(SolverError::ConvergenceFailure {
                    iterations: self.clock.iteration(),
                    max_difference: self.max_difference,
                    last: Box::new(self.solution()),
                });
            }
            self.step()?;
        }
        Ok(self.solution())
    }

    /// Iterate until convergence or the iteration cap, keeping the last iterate either way
    ///
    /// Same loop as [`run`](Self::run), but reaching the cap is not an error:
    /// the returned [`Solution`] has `converged == false` and carries the
    /// final sup diff.
    ///
    /// # Errors
    ///
    /// `SolverError::NonPositiveConsumption` - see [`step`](Self::step)
    pub fn run_until_cap(&mut self) -> Result<Solution, SolverError> {
        match self.run() {
            Err(SolverError::ConvergenceFailure { last, .. }) => Ok(*last),
            other => other,
        }
    }

    /// Apply the Bellman operator once to `value` without touching engine state
    ///
    /// # Errors
    ///
    /// * `SolverError::ShapeMismatch` - `value` is not K×P
    /// * `SolverError::NonPositiveConsumption` - as in [`step`](Self::step)
    pub fn apply_bellman(&self, value: &StateMatrix) -> Result<BellmanUpdate, SolverError> {
        let shape = self.value.shape();
        if value.shape() != shape {
            return Err(SolverError::ShapeMismatch {
                expected: shape,
                actual: value.shape(),
            });
        }
        let mut expected = StateMatrix::zeros(shape.0, shape.1);
        let mut next = StateMatrix::zeros(shape.0, shape.1);
        let mut policy_indices = vec![0; shape.0 * shape.1];
        self.operator
            .apply_into(value, &mut expected, &mut next, &mut policy_indices)?;
        Ok(BellmanUpdate {
            value_function: next,
            policy_indices,
        })
    }

    /// Snapshot of the current iterate
    pub fn solution(&self) -> Solution {
        let capital = &self.operator.capital;
        let capital_len = capital.len();
        let policy_function = StateMatrix::from_fn(capital_len, self.productivity.len(), |k, p| {
            capital.level(self.policy_index[p * capital_len + k])
        });
        Solution {
            value_function: self.value.clone(),
            policy_function,
            policy_indices: self.policy_index.clone(),
            iterations: self.clock.iteration(),
            max_difference: self.max_difference,
            converged: self.is_converged(),
        }
    }

    fn report(&self) -> IterationReport {
        IterationReport {
            iteration: self.clock.iteration(),
            max_difference: self.max_difference,
            state: self.state,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn iteration(&self) -> usize {
        self.clock.iteration()
    }

    /// Sup-norm change of the latest iteration (infinite before the first)
    pub fn max_difference(&self) -> f64 {
        self.max_difference
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn is_converged(&self) -> bool {
        self.state == SolverState::Converged
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn parameters(&self) -> ModelParameters {
        self.params
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn steady_state(&self) -> Option<SteadyState> {
        self.steady_state
    }

    pub fn productivity_grid(&self) -> &ProductivityGrid {
        &self.productivity
    }

    pub fn transition_matrix(&self) -> &TransitionMatrix {
        &self.operator.transition
    }

    pub fn capital_grid(&self) -> &CapitalGrid {
        &self.operator.capital
    }

    pub fn output_table(&self) -> &StateMatrix {
        &self.operator.output
    }

    pub fn value_function(&self) -> &StateMatrix {
        &self.value
    }
}
