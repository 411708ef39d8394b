//! Conditional expectation of the continuation value
//!
//! `E[k, p] = sum_q V[k, q] * T[p, q]`, i.e. `E = V * T^T`: the value of
//! entering next period with capital `k` when today's productivity is `p`.

use crate::models::grid::TransitionMatrix;
use crate::models::matrix::StateMatrix;

/// Fill `expected` with `value * transition^T`
///
/// `expected` must already have the shape of `value`; it is overwritten.
/// Terms are accumulated in ascending `q` starting from zero.
pub fn expected_values_into(
    value: &StateMatrix,
    transition: &TransitionMatrix,
    expected: &mut StateMatrix,
) {
    debug_assert_eq!(value.shape(), expected.shape());
    debug_assert_eq!(value.productivity_len(), transition.size());

    for p in 0..transition.size() {
        let target = expected.column_mut(p);
        target.fill(0.0);
        for (q, &probability) in transition.row(p).iter().enumerate() {
            for (acc, &v) in target.iter_mut().zip(value.column(q)) {
                *acc += probability * v;
            }
        }
    }
}

/// Allocating variant of [`expected_values_into`]
pub fn expected_values(value: &StateMatrix, transition: &TransitionMatrix) -> StateMatrix {
    let mut expected = StateMatrix::zeros(value.capital_len(), value.productivity_len());
    expected_values_into(value, transition, &mut expected);
    expected
}
