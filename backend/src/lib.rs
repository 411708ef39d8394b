//! RBC Value Function Iteration - Rust Engine
//!
//! Solves the stochastic growth model with full depreciation by iterating the
//! Bellman operator on a discretised (capital × productivity) state space.
//!
//! # Architecture
//!
//! - **calibration**: Parameters, solver settings, reference constants
//! - **models**: Grids, dense state matrices, steady state
//! - **bellman**: Expected continuation value and the inner search
//! - **solver**: Outer iteration loop, convergence, results
//! - **core**: Iteration clock and progress cadence
//!
//! # Critical Invariants
//!
//! 1. The policy is non-decreasing in capital for each productivity state,
//!    which is what lets the inner search resume from the previous optimum
//! 2. The logarithm is never taken of non-positive consumption
//! 3. The value function being read is never the one being written

// Module declarations
pub mod bellman;
pub mod calibration;
pub mod core;
pub mod models;
pub mod solver;

// Re-exports for convenience
pub use bellman::{BellmanKernel, ScanResult, SearchStrategy};
pub use calibration::{Calibration, CalibrationError, ModelParameters};
pub use crate::core::progress::IterationClock;
pub use models::{CapitalGrid, ProductivityGrid, StateMatrix, SteadyState, TransitionMatrix};
pub use solver::{
    BellmanUpdate, IterationReport, Solution, SolverError, SolverOptions, SolverState,
    ValueIterationEngine,
};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn rbc_vfi_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::solver::PyValueIterationEngine>()?;
    m.add_function(wrap_pyfunction!(ffi::solver::solve, m)?)?;
    Ok(())
}
