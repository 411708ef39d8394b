//! Consumption Guard Tests
//!
//! Candidates leaving non-positive consumption are never evaluated; a state
//! with no feasible candidate at all is reported as an error.

use rbc_vfi_core_rs::{
    Calibration, CapitalGrid, ModelParameters, ProductivityGrid, SolverError, SolverOptions,
    TransitionMatrix, ValueIterationEngine,
};

#[test]
fn test_grid_above_output_reports_non_positive_consumption() {
    // Capital between 10x and 12x steady state exceeds output everywhere
    let calibration = Calibration {
        capital_grid_lower_factor: 10.0,
        capital_grid_upper_factor: 12.0,
        capital_grid_step: 1e-3,
        ..Calibration::default()
    };
    let mut engine = ValueIterationEngine::new(&calibration).unwrap();

    match engine.step() {
        Err(SolverError::NonPositiveConsumption {
            capital_index,
            productivity_index,
            output,
            lowest_candidate,
        }) => {
            assert_eq!(capital_index, 0);
            assert_eq!(productivity_index, 0);
            assert!(output <= lowest_candidate);
        }
        other => panic!("expected NonPositiveConsumption, got {:?}", other),
    }

    // The failed step leaves the iterate untouched
    assert_eq!(engine.iteration(), 0);
    assert!(engine.value_function().as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn test_partially_feasible_grid_stays_finite() {
    // y = k^0.5: from k = 0.5 and k = 1.0 only the lowest candidate is feasible
    let mut engine = ValueIterationEngine::from_parts(
        ModelParameters::new(0.5, 0.9).unwrap(),
        ProductivityGrid::new(vec![1.0]).unwrap(),
        TransitionMatrix::new(&[vec![1.0]], 1).unwrap(),
        CapitalGrid::from_levels(vec![0.5, 1.0, 1.5]).unwrap(),
        SolverOptions::default(),
    )
    .unwrap();

    let solution = engine.run().unwrap();
    assert!(solution.converged);
    assert!(solution
        .value_function
        .as_slice()
        .iter()
        .all(|v| v.is_finite()));
    assert_eq!(solution.policy_index_at(0, 0), Some(0));
    assert_eq!(solution.policy_index_at(1, 0), Some(0));
    assert!(solution.is_policy_monotone());
}

#[test]
fn test_every_chosen_consumption_positive() {
    let calibration = Calibration {
        capital_grid_step: 1e-3,
        ..Calibration::default()
    };
    let mut engine = ValueIterationEngine::new(&calibration).unwrap();
    let solution = engine.run().unwrap();
    let output = engine.output_table();

    for p in 0..solution.productivity_len() {
        for k in 0..solution.capital_len() {
            let next = solution.policy_at(k, p).unwrap();
            assert!(output.get(k, p) - next > 0.0, "consumption at ({}, {})", k, p);
        }
    }
}
