//! Search Strategy Equivalence Tests
//!
//! On a concave problem the monotone early-exit scan must land on exactly
//! the same value function and policy as the exhaustive scan, iteration by
//! iteration.

use rbc_vfi_core_rs::{
    CapitalGrid, ModelParameters, ProductivityGrid, SearchStrategy, SolverOptions,
    TransitionMatrix, ValueIterationEngine,
};

/// Five capital points, two productivity states
fn small_engine(search: SearchStrategy) -> ValueIterationEngine {
    ValueIterationEngine::from_parts(
        ModelParameters::new(0.3, 0.9).unwrap(),
        ProductivityGrid::new(vec![0.95, 1.05]).unwrap(),
        TransitionMatrix::new(&[vec![0.8, 0.2], vec![0.2, 0.8]], 2).unwrap(),
        CapitalGrid::from_levels(vec![0.10, 0.125, 0.15, 0.175, 0.2]).unwrap(),
        SolverOptions {
            search,
            ..SolverOptions::default()
        },
    )
    .unwrap()
}

#[test]
fn test_converged_solutions_identical() {
    let monotone = small_engine(SearchStrategy::Monotone).run().unwrap();
    let full = small_engine(SearchStrategy::FullScan).run().unwrap();

    assert_eq!(monotone.iterations, full.iterations);
    assert_eq!(monotone.value_function, full.value_function);
    assert_eq!(monotone.policy_indices, full.policy_indices);
}

#[test]
fn test_known_policy_and_iteration_count() {
    let solution = small_engine(SearchStrategy::Monotone).run().unwrap();

    assert!(solution.converged);
    assert_eq!(solution.iterations, 132);

    let expected = [[1, 2, 2, 2, 2], [2, 2, 3, 3, 3]];
    for (p, column) in expected.iter().enumerate() {
        for (k, &index) in column.iter().enumerate() {
            assert_eq!(
                solution.policy_index_at(k, p),
                Some(index),
                "policy index at (k={}, p={})",
                k,
                p
            );
        }
    }
    assert!(solution.is_policy_monotone());
}

#[test]
fn test_strategies_agree_every_iteration() {
    let mut monotone = small_engine(SearchStrategy::Monotone);
    let mut full = small_engine(SearchStrategy::FullScan);

    while !monotone.is_converged() {
        let a = monotone.step().unwrap();
        let b = full.step().unwrap();
        assert_eq!(a, b);
        assert_eq!(monotone.value_function(), full.value_function());
        assert_eq!(
            monotone.solution().policy_indices,
            full.solution().policy_indices,
            "policies diverged at iteration {}",
            a.iteration
        );
    }
    assert!(full.is_converged());
}

#[test]
fn test_policy_levels_read_from_capital_grid() {
    let solution = small_engine(SearchStrategy::Monotone).run().unwrap();
    assert_eq!(solution.policy_at(0, 0), Some(0.125));
    assert_eq!(solution.policy_at(4, 1), Some(0.175));
    assert_eq!(solution.policy_at(5, 0), None);
}
