//! State-space grids
//!
//! - [`ProductivityGrid`]: the P levels of the productivity Markov chain
//! - [`TransitionMatrix`]: P×P row-stochastic matrix over those levels
//! - [`CapitalGrid`]: the K strictly increasing capital levels
//!
//! All three are validated on construction and immutable afterwards.

use crate::calibration::{capital_grid_len, CalibrationError, TRANSITION_ROW_TOLERANCE};
use serde::Serialize;

// ============================================================================
// Productivity
// ============================================================================

/// Ordered productivity levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityGrid {
    levels: Vec<f64>,
}

impl ProductivityGrid {
    /// Validate and wrap the levels
    ///
    /// Levels must be finite and positive; order is whatever the transition
    /// matrix assumes.
    pub fn new(levels: Vec<f64>) -> Result<Self, CalibrationError> {
        if levels.is_empty() {
            return Err(CalibrationError::EmptyProductivityGrid);
        }
        if let Some((index, &value)) = levels
            .iter()
            .enumerate()
            .find(|(_, z)| !(z.is_finite() && **z > 0.0))
        {
            return Err(CalibrationError::InvalidProductivityLevel { index, value });
        }
        Ok(Self { levels })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    #[inline]
    pub fn level(&self, productivity_index: usize) -> f64 {
        self.levels[productivity_index]
    }
}

// ============================================================================
// Transition Matrix
// ============================================================================

/// Row-stochastic Markov transition matrix
///
/// `probability(i, j)` is the probability of moving from productivity state
/// `i` today to state `j` tomorrow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionMatrix {
    size: usize,
    /// Row-major, `size * size` entries
    probabilities: Vec<f64>,
}

impl TransitionMatrix {
    /// Validate `rows` against a productivity grid with `expected_size` states
    ///
    /// # Errors
    ///
    /// - wrong number of rows or a row of the wrong length
    /// - an entry outside [0, 1] (or non-finite)
    /// - a row whose sum differs from 1 by more than [`TRANSITION_ROW_TOLERANCE`]
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::TransitionMatrix;
    ///
    /// let rows = vec![vec![0.9, 0.1], vec![0.2, 0.8]];
    /// let matrix = TransitionMatrix::new(&rows, 2).unwrap();
    /// assert_eq!(matrix.probability(1, 0), 0.2);
    ///
    /// assert!(TransitionMatrix::new(&rows, 3).is_err());
    /// ```
    pub fn new(rows: &[Vec<f64>], expected_size: usize) -> Result<Self, CalibrationError> {
        if rows.len() != expected_size {
            return Err(CalibrationError::TransitionRowCount {
                rows: rows.len(),
                expected: expected_size,
            });
        }

        let mut probabilities = Vec::with_capacity(expected_size * expected_size);
        for (row, entries) in rows.iter().enumerate() {
            if entries.len() != expected_size {
                return Err(CalibrationError::TransitionRowLength {
                    row,
                    len: entries.len(),
                    expected: expected_size,
                });
            }
            for (col, &value) in entries.iter().enumerate() {
                if !(0.0..=1.0).contains(&value) {
                    return Err(CalibrationError::InvalidTransitionProbability { row, col, value });
                }
            }
            let sum: f64 = entries.iter().sum();
            if (sum - 1.0).abs() > TRANSITION_ROW_TOLERANCE {
                return Err(CalibrationError::TransitionRowSum { row, sum });
            }
            probabilities.extend_from_slice(entries);
        }

        Ok(Self {
            size: expected_size,
            probabilities,
        })
    }

    /// Number of productivity states
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn probability(&self, from: usize, to: usize) -> f64 {
        self.probabilities[from * self.size + to]
    }

    /// Conditional distribution of tomorrow's state given `from`
    #[inline]
    pub fn row(&self, from: usize) -> &[f64] {
        &self.probabilities[from * self.size..(from + 1) * self.size]
    }

    /// Sum of each row, in row order
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.size).map(|i| self.row(i).iter().sum()).collect()
    }
}

// ============================================================================
// Capital Grid
// ============================================================================

/// Strictly increasing capital levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapitalGrid {
    levels: Vec<f64>,
}

impl CapitalGrid {
    /// Evenly spaced grid `[lower_factor * k*, upper_factor * k*)` with spacing `step`
    ///
    /// The grid has `ceil((hi - lo) / step)` points, point `i` sitting at
    /// `lo + i * step`, so the upper end is excluded. Grids longer than
    /// [`MAX_CAPITAL_GRID_POINTS`](crate::calibration::MAX_CAPITAL_GRID_POINTS)
    /// are rejected before anything is allocated.
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::CapitalGrid;
    ///
    /// let grid = CapitalGrid::around_steady_state(1.0, 0.5, 1.5, 0.25).unwrap();
    /// assert_eq!(grid.levels(), &[0.5, 0.75, 1.0, 1.25]);
    /// ```
    pub fn around_steady_state(
        steady_state_capital: f64,
        lower_factor: f64,
        upper_factor: f64,
        step: f64,
    ) -> Result<Self, CalibrationError> {
        let len = capital_grid_len(steady_state_capital, lower_factor, upper_factor, step)?;
        let lower = lower_factor * steady_state_capital;
        let levels = (0..len).map(|i| lower + i as f64 * step).collect();
        Self::from_levels(levels)
    }

    /// Wrap explicit levels
    ///
    /// Levels must be finite, non-negative and strictly increasing.
    pub fn from_levels(levels: Vec<f64>) -> Result<Self, CalibrationError> {
        if levels.is_empty() {
            return Err(CalibrationError::EmptyCapitalGrid);
        }
        for (index, &value) in levels.iter().enumerate() {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CalibrationError::InvalidCapitalLevel { index, value });
            }
            if index > 0 && value <= levels[index - 1] {
                return Err(CalibrationError::NonIncreasingCapitalGrid { index });
            }
        }
        Ok(Self { levels })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    #[inline]
    pub fn level(&self, capital_index: usize) -> f64 {
        self.levels[capital_index]
    }

    pub fn first(&self) -> f64 {
        self.levels[0]
    }

    pub fn last(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }
}
