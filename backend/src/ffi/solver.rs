//! PyO3 wrapper for ValueIterationEngine
//!
//! This module provides the Python interface to the Rust solver.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{parse_calibration, report_to_py, solution_to_py, solver_error_to_py};
use crate::solver::ValueIterationEngine as RustEngine;

/// Python wrapper for the Rust value iteration engine
///
/// # Example (from Python)
///
/// ```python
/// from rbc_vfi_core_rs import ValueIterationEngine
///
/// engine = ValueIterationEngine({"capital_grid_step": 1e-4})
/// while not engine.converged:
///     report = engine.step()
/// print(engine.solution()["policy_function"][999][2])
/// ```
#[pyclass(name = "ValueIterationEngine")]
pub struct PyValueIterationEngine {
    inner: RustEngine,
}

#[pymethods]
impl PyValueIterationEngine {
    /// Create an engine from an optional calibration dict
    ///
    /// # Errors
    ///
    /// Raises ValueError on unknown keys or invalid parameters.
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let calibration = parse_calibration(config)?;
        let inner = RustEngine::new(&calibration).map_err(solver_error_to_py)?;
        Ok(PyValueIterationEngine { inner })
    }

    /// Run one outer iteration; returns `{iteration, max_difference, converged}`
    fn step(&mut self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let report = self.inner.step().map_err(solver_error_to_py)?;
        report_to_py(py, &report)
    }

    /// Iterate to convergence with the GIL released
    ///
    /// At the iteration cap the last iterate is returned with
    /// `converged = False`.
    fn run(&mut self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let inner = &mut self.inner;
        let solution = py
            .allow_threads(|| inner.run_until_cap())
            .map_err(solver_error_to_py)?;
        solution_to_py(py, &solution)
    }

    /// Snapshot of the current iterate
    fn solution(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        solution_to_py(py, &self.inner.solution())
    }

    #[getter]
    fn iteration(&self) -> usize {
        self.inner.iteration()
    }

    #[getter]
    fn max_difference(&self) -> f64 {
        self.inner.max_difference()
    }

    #[getter]
    fn converged(&self) -> bool {
        self.inner.is_converged()
    }

    fn capital_grid(&self) -> Vec<f64> {
        self.inner.capital_grid().levels().to_vec()
    }
}

/// Solve a calibration in one call
///
/// Equivalent to `ValueIterationEngine(config).run()`; check `converged` in
/// the result.
#[pyfunction]
#[pyo3(signature = (config=None))]
pub fn solve(py: Python<'_>, config: Option<&Bound<'_, PyDict>>) -> PyResult<Py<PyDict>> {
    let calibration = parse_calibration(config)?;
    let solution = py
        .allow_threads(|| {
            RustEngine::new(&calibration).and_then(|mut engine| engine.run_until_cap())
        })
        .map_err(solver_error_to_py)?;
    solution_to_py(py, &solution)
}
