//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, lists).

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::bellman::SearchStrategy;
use crate::calibration::Calibration;
use crate::solver::{IterationReport, Solution, SolverError, SolverState};

/// Keys accepted in a calibration dict
const CALIBRATION_KEYS: &[&str] = &[
    "alpha",
    "beta",
    "productivity_grid",
    "transition_matrix",
    "capital_grid_lower_factor",
    "capital_grid_upper_factor",
    "capital_grid_step",
    "tolerance",
    "max_iterations",
    "search",
    "report_every",
];

// ========================================================================
// PyDict Extraction Helpers
// ========================================================================

/// Extract an optional field from a Python dict.
///
/// # Errors
/// Returns error only if type conversion fails (not if field is missing)
fn extract_optional<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<T>>
where
    for<'py> T: FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) => Ok(Some(value.extract()?)),
        None => Ok(None),
    }
}

/// Extract a field, falling back to `default` when missing.
fn extract_with_default<T>(dict: &Bound<'_, PyDict>, key: &str, default: T) -> PyResult<T>
where
    for<'py> T: FromPyObject<'py>,
{
    Ok(extract_optional(dict, key)?.unwrap_or(default))
}

fn parse_search(name: &str) -> PyResult<SearchStrategy> {
    match name {
        "monotone" => Ok(SearchStrategy::Monotone),
        "full_scan" => Ok(SearchStrategy::FullScan),
        other => Err(PyValueError::new_err(format!(
            "Unknown search strategy '{}' (expected 'monotone' or 'full_scan')",
            other
        ))),
    }
}

// ========================================================================
// Python → Rust
// ========================================================================

/// Build a calibration from an optional dict; missing keys keep reference values
pub fn parse_calibration(config: Option<&Bound<'_, PyDict>>) -> PyResult<Calibration> {
    let defaults = Calibration::default();
    let Some(dict) = config else {
        return Ok(defaults);
    };

    for key in dict.keys() {
        let name: String = key.extract()?;
        if !CALIBRATION_KEYS.contains(&name.as_str()) {
            return Err(PyValueError::new_err(format!(
                "Unknown calibration field '{}'",
                name
            )));
        }
    }

    let search = match extract_optional::<String>(dict, "search")? {
        Some(name) => parse_search(&name)?,
        None => defaults.search,
    };

    Ok(Calibration {
        alpha: extract_with_default(dict, "alpha", defaults.alpha)?,
        beta: extract_with_default(dict, "beta", defaults.beta)?,
        productivity_grid: extract_with_default(
            dict,
            "productivity_grid",
            defaults.productivity_grid,
        )?,
        transition_matrix: extract_with_default(
            dict,
            "transition_matrix",
            defaults.transition_matrix,
        )?,
        capital_grid_lower_factor: extract_with_default(
            dict,
            "capital_grid_lower_factor",
            defaults.capital_grid_lower_factor,
        )?,
        capital_grid_upper_factor: extract_with_default(
            dict,
            "capital_grid_upper_factor",
            defaults.capital_grid_upper_factor,
        )?,
        capital_grid_step: extract_with_default(dict, "capital_grid_step", defaults.capital_grid_step)?,
        tolerance: extract_with_default(dict, "tolerance", defaults.tolerance)?,
        max_iterations: extract_with_default(dict, "max_iterations", defaults.max_iterations)?,
        search,
        report_every: extract_with_default(dict, "report_every", defaults.report_every)?,
    })
}

// ========================================================================
// Rust → Python
// ========================================================================

/// Convert solver errors into Python exceptions
///
/// Parameter problems are the caller's fault (`ValueError`); everything else
/// is a `RuntimeError`.
pub fn solver_error_to_py(err: SolverError) -> PyErr {
    match err {
        SolverError::InvalidParameter(_) | SolverError::ShapeMismatch { .. } => {
            PyValueError::new_err(err.to_string())
        }
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Solution as a dict of nested lists (`value_function[k][p]`)
pub fn solution_to_py(py: Python<'_>, solution: &Solution) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("value_function", solution.value_function.to_rows())?;
    dict.set_item("policy_function", solution.policy_function.to_rows())?;
    dict.set_item("iterations", solution.iterations)?;
    dict.set_item("max_difference", solution.max_difference)?;
    dict.set_item("converged", solution.converged)?;
    Ok(dict.unbind())
}

pub fn report_to_py(py: Python<'_>, report: &IterationReport) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("iteration", report.iteration)?;
    dict.set_item("max_difference", report.max_difference)?;
    dict.set_item("converged", report.state == SolverState::Converged)?;
    Ok(dict.unbind())
}
