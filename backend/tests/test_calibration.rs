//! Calibration Tests
//!
//! Transition matrix validity, JSON documents and the setup errors the
//! engine surfaces before allocating anything.

use rbc_vfi_core_rs::calibration::{
    REFERENCE_PRODUCTIVITY, REFERENCE_TRANSITION, TRANSITION_ROW_TOLERANCE,
};
use rbc_vfi_core_rs::{
    Calibration, CalibrationError, SearchStrategy, SolverError, TransitionMatrix,
    ValueIterationEngine,
};

/// Helper to build the reference matrix as nested vectors
fn reference_rows() -> Vec<Vec<f64>> {
    REFERENCE_TRANSITION.iter().map(|row| row.to_vec()).collect()
}

/// Helper to build an engine and return only its error
fn setup_error(calibration: Calibration) -> SolverError {
    match ValueIterationEngine::new(&calibration) {
        Ok(_) => panic!("expected calibration to be rejected"),
        Err(e) => e,
    }
}

// ============================================================================
// Transition Matrix
// ============================================================================

#[test]
fn test_reference_rows_sum_to_one_within_tolerance() {
    let matrix = TransitionMatrix::new(&reference_rows(), REFERENCE_PRODUCTIVITY.len()).unwrap();
    let sums = matrix.row_sums();
    for (row, sum) in sums.iter().enumerate() {
        assert!(
            (sum - 1.0).abs() <= TRANSITION_ROW_TOLERANCE,
            "row {} sums to {}",
            row,
            sum
        );
    }
    // Four-decimal data: the middle row overshoots by one unit in the last place
    assert!((sums[2] - 1.0001).abs() < 1e-12);
    assert!((sums[0] - 1.0).abs() < 1e-12);
}

#[test]
fn test_default_calibration_builds_engine() {
    let calibration = Calibration::default();
    assert_eq!(calibration.validate(), Ok(()));

    let engine = ValueIterationEngine::new(&calibration).unwrap();
    assert_eq!(engine.capital_grid().len(), 17_820);
    assert_eq!(engine.transition_matrix().size(), 5);
}

#[test]
fn test_row_outside_tolerance_rejected() {
    let mut rows = reference_rows();
    rows[2][2] = 0.9857;
    let calibration = Calibration {
        transition_matrix: rows,
        ..Calibration::default()
    };
    assert!(matches!(
        setup_error(calibration),
        SolverError::InvalidParameter(CalibrationError::TransitionRowSum { row: 2, .. })
    ));
}

#[test]
fn test_reference_entries_within_unit_interval() {
    for row in REFERENCE_TRANSITION.iter() {
        for &p in row.iter() {
            assert!((0.0..=1.0).contains(&p));
        }
    }
}

#[test]
fn test_transition_dimension_must_match_productivity_grid() {
    let calibration = Calibration {
        productivity_grid: vec![0.98, 1.0, 1.02],
        ..Calibration::default()
    };
    assert_eq!(
        setup_error(calibration),
        SolverError::InvalidParameter(CalibrationError::TransitionRowCount {
            rows: 5,
            expected: 3
        })
    );
}

#[test]
fn test_negative_transition_entry_rejected() {
    let mut rows = reference_rows();
    rows[1] = vec![-0.0041, 0.9888, 0.0153, 0.0, 0.0];
    let calibration = Calibration {
        transition_matrix: rows,
        ..Calibration::default()
    };
    assert!(matches!(
        setup_error(calibration),
        SolverError::InvalidParameter(CalibrationError::InvalidTransitionProbability {
            row: 1,
            col: 0,
            ..
        })
    ));
}

#[test]
fn test_row_not_summing_to_one_rejected() {
    let mut rows = reference_rows();
    rows[3][3] = 0.9;
    let calibration = Calibration {
        transition_matrix: rows,
        ..Calibration::default()
    };
    assert!(matches!(
        setup_error(calibration),
        SolverError::InvalidParameter(CalibrationError::TransitionRowSum { row: 3, .. })
    ));
}

// ============================================================================
// JSON Documents
// ============================================================================

#[test]
fn test_partial_document_keeps_reference_values() {
    let calibration = Calibration::from_json_str(
        r#"{ "capital_grid_step": 0.001, "search": "full_scan", "max_iterations": 500 }"#,
    )
    .unwrap();

    assert_eq!(calibration.capital_grid_step, 0.001);
    assert_eq!(calibration.search, SearchStrategy::FullScan);
    assert_eq!(calibration.max_iterations, 500);
    assert_eq!(calibration.alpha, Calibration::default().alpha);
    assert_eq!(calibration.transition_matrix, reference_rows());
}

#[test]
fn test_document_round_trip() {
    let original = Calibration {
        tolerance: 1e-6,
        report_every: 25,
        ..Calibration::default()
    };
    let json = original.to_json_string().unwrap();
    assert_eq!(Calibration::from_json_str(&json).unwrap(), original);
}

#[test]
fn test_malformed_document_rejected() {
    let err = Calibration::from_json_str(r#"{ "alpha": "a third" }"#).unwrap_err();
    assert!(matches!(err, CalibrationError::InvalidDocument(_)));
}

#[test]
fn test_invalid_tolerance_rejected() {
    let calibration = Calibration {
        tolerance: -1.0,
        ..Calibration::default()
    };
    assert_eq!(
        setup_error(calibration),
        SolverError::InvalidParameter(CalibrationError::InvalidTolerance(-1.0))
    );
}
