//! Value Iteration Engine Tests
//!
//! Runs the reference model on a coarse capital grid (step 1e-3, 179 points)
//! so the whole solve stays fast while still exercising five productivity
//! states.

use rbc_vfi_core_rs::{
    Calibration, SearchStrategy, SolverError, SolverState, StateMatrix, ValueIterationEngine,
};

/// Reference calibration on a coarse grid
fn coarse_calibration() -> Calibration {
    Calibration {
        capital_grid_step: 1e-3,
        ..Calibration::default()
    }
}

fn coarse_engine() -> ValueIterationEngine {
    ValueIterationEngine::new(&coarse_calibration()).unwrap()
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_coarse_grid_converges() {
    let mut engine = coarse_engine();
    assert_eq!(engine.capital_grid().len(), 179);

    let solution = engine.run().unwrap();

    assert!(solution.converged);
    assert_eq!(solution.iterations, 257);
    assert!(solution.max_difference < 1e-7);
    assert!((solution.max_difference - 9.716035065387985e-08).abs() < 1e-12);
    assert_eq!(engine.state(), SolverState::Converged);
}

#[test]
fn test_sup_diff_shrinks_geometrically() {
    let mut engine = coarse_engine();
    let first = engine.step().unwrap().max_difference;
    let mut previous = first;
    for _ in 0..20 {
        let report = engine.step().unwrap();
        // Contraction with modulus beta
        assert!(report.max_difference <= 0.95 * previous + 1e-12);
        previous = report.max_difference;
    }
    assert!(previous < first);
}

#[test]
fn test_known_policy_point() {
    let solution = coarse_engine().run().unwrap();
    assert_eq!(solution.policy_index_at(100, 2), Some(93));
    let level = solution.policy_at(100, 2).unwrap();
    assert!((level - 0.1820991436962635).abs() < 1e-12);
}

// ============================================================================
// Policy Shape
// ============================================================================

#[test]
fn test_policy_monotone_in_capital() {
    let solution = coarse_engine().run().unwrap();
    assert!(solution.is_policy_monotone());

    // Also checked directly on the levels
    for p in 0..solution.productivity_len() {
        for k in 1..solution.capital_len() {
            assert!(solution.policy_at(k, p).unwrap() >= solution.policy_at(k - 1, p).unwrap());
        }
    }
}

#[test]
fn test_higher_productivity_saves_more() {
    let solution = coarse_engine().run().unwrap();
    for k in 0..solution.capital_len() {
        assert!(solution.policy_index_at(k, 4).unwrap() >= solution.policy_index_at(k, 0).unwrap());
    }
}

#[test]
fn test_value_increasing_in_capital() {
    let solution = coarse_engine().run().unwrap();
    for p in 0..solution.productivity_len() {
        let column = solution.value_function.column(p);
        assert!(column.windows(2).all(|w| w[0] < w[1]));
    }
}

// ============================================================================
// Fixed Point
// ============================================================================

#[test]
fn test_converged_value_is_fixed_point() {
    let mut engine = coarse_engine();
    let solution = engine.run().unwrap();

    let update = engine.apply_bellman(&solution.value_function).unwrap();
    let drift = update.value_function.max_abs_diff(&solution.value_function);

    assert!(drift < engine.options().tolerance);
    assert_eq!(update.policy_indices, solution.policy_indices);
}

#[test]
fn test_apply_bellman_leaves_engine_untouched() {
    let engine = coarse_engine();
    let (k, p) = engine.value_function().shape();
    engine.apply_bellman(&StateMatrix::zeros(k, p)).unwrap();
    assert_eq!(engine.iteration(), 0);
    assert_eq!(engine.state(), SolverState::Running);
}

// ============================================================================
// Driving Modes
// ============================================================================

#[test]
fn test_step_wise_matches_run() {
    let mut stepped = coarse_engine();
    let mut reports = Vec::new();
    while !stepped.is_converged() {
        reports.push(stepped.step().unwrap());
    }

    let run = coarse_engine().run().unwrap();

    assert_eq!(reports.len(), run.iterations);
    assert_eq!(reports.last().unwrap().state, SolverState::Converged);
    assert!(reports[..reports.len() - 1]
        .iter()
        .all(|r| r.state == SolverState::Running));
    assert_eq!(stepped.solution(), run);
}

#[test]
fn test_full_scan_matches_monotone() {
    let full = ValueIterationEngine::new(&Calibration {
        search: SearchStrategy::FullScan,
        ..coarse_calibration()
    })
    .unwrap()
    .run()
    .unwrap();
    let monotone = coarse_engine().run().unwrap();

    assert_eq!(full.iterations, monotone.iterations);
    assert_eq!(full.policy_indices, monotone.policy_indices);
    assert_eq!(full.value_function, monotone.value_function);
}

#[test]
fn test_iteration_cap_returns_last_iterate() {
    let mut engine = ValueIterationEngine::new(&Calibration {
        max_iterations: 10,
        ..coarse_calibration()
    })
    .unwrap();

    match engine.run() {
        Err(SolverError::ConvergenceFailure {
            iterations, last, ..
        }) => {
            assert_eq!(iterations, 10);
            assert!(!last.converged);
            assert_eq!(last.value_function, *engine.value_function());
        }
        other => panic!("expected ConvergenceFailure, got {:?}", other),
    }
}
