//! Inner search over next-period capital
//!
//! For a state `(k, p)` the Bellman operator maximises
//!
//! ```text
//! (1 - beta) * ln(y[k, p] - K[j]) + beta * E[j, p]
//! ```
//!
//! over candidate next-period capital indices `j`.
//!
//! # Monotone early exit
//!
//! With a value function concave in next-period capital the objective is
//! single-peaked in `j`, and the optimal `j` is non-decreasing in `k`. The
//! monotone scan therefore starts from the previous state's optimum and stops
//! at the first candidate that does not improve on the best so far. A
//! non-concave variant must use [`SearchStrategy::FullScan`] instead.
//!
//! # Feasibility
//!
//! Consumption `y[k, p] - K[j]` falls as `j` rises on a strictly increasing
//! grid, so once a candidate leaves non-positive consumption every later one
//! does too. Both scans stop there without taking the logarithm.

use serde::{Deserialize, Serialize};

/// How the best next-period capital is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Scan upward from the previous optimum, stop at the first non-improvement
    #[default]
    Monotone,

    /// Evaluate every feasible candidate and take the first maximiser
    FullScan,
}

/// Best candidate found by a scan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    /// Index into the capital grid
    pub index: usize,

    /// Bellman objective at that index
    pub value: f64,
}

/// No candidate left positive consumption for a capital state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InfeasibleState {
    /// Current capital index
    pub capital_index: usize,

    /// Output available in that state
    pub output: f64,

    /// Smallest next-period capital the scan could reach
    pub lowest_candidate: f64,
}

/// Bellman objective for one productivity state
///
/// Borrows the capital grid and the matching column of the expected value
/// function; nothing is copied per candidate.
#[derive(Debug, Clone, Copy)]
pub struct BellmanKernel<'a> {
    /// Discount factor
    pub beta: f64,

    /// Capital grid levels, strictly increasing
    pub capital: &'a [f64],

    /// Expected value column `E[., p]`
    pub expected: &'a [f64],
}

impl<'a> BellmanKernel<'a> {
    pub fn new(beta: f64, capital: &'a [f64], expected: &'a [f64]) -> Self {
        debug_assert_eq!(capital.len(), expected.len());
        Self {
            beta,
            capital,
            expected,
        }
    }

    /// Objective at candidate `j`, `None` when consumption is not positive
    #[inline]
    pub fn candidate(&self, output: f64, j: usize) -> Option<f64> {
        let consumption = output - self.capital[j];
        if consumption <= 0.0 {
            return None;
        }
        Some((1.0 - self.beta) * consumption.ln() + self.beta * self.expected[j])
    }

    /// Ascending scan from `lower_bound`, stopping at the first non-improving candidate
    ///
    /// Returns the best index and value seen, or `None` if the candidate at
    /// `lower_bound` is already infeasible (or `lower_bound` is past the grid).
    ///
    /// Only equivalent to a full argmax when the objective is single-peaked
    /// in `j` from `lower_bound` on.
    pub fn scan_monotone(&self, output: f64, lower_bound: usize) -> Option<ScanResult> {
        let mut best: Option<ScanResult> = None;
        for j in lower_bound..self.capital.len() {
            let Some(value) = self.candidate(output, j) else {
                break;
            };
            match best {
                Some(b) if value <= b.value => break,
                _ => best = Some(ScanResult { index: j, value }),
            }
        }
        best
    }

    /// Argmax over every feasible candidate; ties go to the lowest index
    pub fn scan_full(&self, output: f64) -> Option<ScanResult> {
        let mut best: Option<ScanResult> = None;
        for j in 0..self.capital.len() {
            let Some(value) = self.candidate(output, j) else {
                break;
            };
            if best.map_or(true, |b| value > b.value) {
                best = Some(ScanResult { index: j, value });
            }
        }
        best
    }

    /// Solve every capital state of one productivity column
    ///
    /// Capital states are visited in ascending order. Under
    /// [`SearchStrategy::Monotone`] each scan starts at the optimum of the
    /// previous state, beginning from index 0.
    ///
    /// # Arguments
    ///
    /// * `output` - output column `y[., p]`
    /// * `strategy` - inner search
    /// * `values` - receives the maximised objective per capital state
    /// * `policy` - receives the optimal next-period capital index per state
    pub fn sweep_column(
        &self,
        output: &[f64],
        strategy: SearchStrategy,
        values: &mut [f64],
        policy: &mut [usize],
    ) -> Result<(), InfeasibleState> {
        debug_assert_eq!(output.len(), values.len());
        debug_assert_eq!(output.len(), policy.len());

        let mut cursor = 0;
        for (k, &y) in output.iter().enumerate() {
            let found = match strategy {
                SearchStrategy::Monotone => self.scan_monotone(y, cursor),
                SearchStrategy::FullScan => self.scan_full(y),
            };
            let best = found.ok_or(InfeasibleState {
                capital_index: k,
                output: y,
                lowest_candidate: self.capital[cursor],
            })?;
            cursor = best.index;
            values[k] = best.value;
            policy[k] = best.index;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BETA: f64 = 0.9;

    #[test]
    fn test_candidate_guards_non_positive_consumption() {
        let capital = [0.5, 1.0, 1.5];
        let expected = [0.0; 3];
        let kernel = BellmanKernel::new(BETA, &capital, &expected);
        assert!(kernel.candidate(1.0, 0).is_some());
        assert_eq!(kernel.candidate(1.0, 1), None);
        assert_eq!(kernel.candidate(1.0, 2), None);
    }

    #[test]
    fn test_monotone_stops_at_first_non_improvement() {
        // Single-peaked at j = 2 once the log term is small next to E
        let capital = [0.0, 0.01, 0.02, 0.03, 0.04];
        let expected = [0.0, 1.0, 2.0, 1.0, 5.0];
        let kernel = BellmanKernel::new(BETA, &capital, &expected);

        let monotone = kernel.scan_monotone(10.0, 0).unwrap();
        assert_eq!(monotone.index, 2);

        // The full scan sees past the dip
        let full = kernel.scan_full(10.0).unwrap();
        assert_eq!(full.index, 4);
    }

    #[test]
    fn test_monotone_respects_lower_bound() {
        let capital = [0.0, 0.01, 0.02, 0.03];
        let expected = [3.0, 2.0, 1.0, 0.0];
        let kernel = BellmanKernel::new(BETA, &capital, &expected);
        assert_eq!(kernel.scan_monotone(10.0, 0).unwrap().index, 0);
        assert_eq!(kernel.scan_monotone(10.0, 2).unwrap().index, 2);
        assert_eq!(kernel.scan_monotone(10.0, 4), None);
    }

    #[test]
    fn test_scan_infeasible_at_cursor() {
        let capital = [1.0, 2.0];
        let expected = [0.0, 0.0];
        let kernel = BellmanKernel::new(BETA, &capital, &expected);
        assert_eq!(kernel.scan_monotone(0.5, 0), None);
        assert_eq!(kernel.scan_full(0.5), None);
    }

    #[test]
    fn test_sweep_reports_infeasible_state() {
        let capital = [1.0, 2.0];
        let expected = [0.0, 0.0];
        let kernel = BellmanKernel::new(BETA, &capital, &expected);
        let mut values = [0.0; 2];
        let mut policy = [0usize; 2];
        let err = kernel
            .sweep_column(&[0.8, 1.2], SearchStrategy::Monotone, &mut values, &mut policy)
            .unwrap_err();
        assert_eq!(
            err,
            InfeasibleState {
                capital_index: 0,
                output: 0.8,
                lowest_candidate: 1.0
            }
        );
    }

    #[test]
    fn test_strategy_default_is_monotone() {
        assert_eq!(SearchStrategy::default(), SearchStrategy::Monotone);
    }
}
