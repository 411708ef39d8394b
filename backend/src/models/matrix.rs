//! Dense state-space matrices
//!
//! Every table the solver works with (output, value function, expected value
//! function, policy function) is a K×P matrix indexed by
//! `(capital_index, productivity_index)`.
//!
//! # Layout
//!
//! Storage is column-major: all K capital entries of one productivity state
//! are contiguous. A productivity sweep therefore reads and writes a single
//! slice, and the sweeps of different productivity states own disjoint
//! slices of the output buffers.

use serde::{Deserialize, Serialize};

/// K×P matrix of `f64`, column-major by productivity state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMatrix {
    /// Number of capital grid points (rows)
    capital_len: usize,

    /// Number of productivity states (columns)
    productivity_len: usize,

    /// `data[p * capital_len + k]`
    data: Vec<f64>,
}

impl StateMatrix {
    /// Create a zero-filled matrix
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::StateMatrix;
    ///
    /// let m = StateMatrix::zeros(3, 2);
    /// assert_eq!(m.get(2, 1), 0.0);
    /// ```
    pub fn zeros(capital_len: usize, productivity_len: usize) -> Self {
        Self {
            capital_len,
            productivity_len,
            data: vec![0.0; capital_len * productivity_len],
        }
    }

    /// Build a matrix by evaluating `f(k, p)` at every cell
    pub fn from_fn<F>(capital_len: usize, productivity_len: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(capital_len * productivity_len);
        for p in 0..productivity_len {
            for k in 0..capital_len {
                data.push(f(k, p));
            }
        }
        Self {
            capital_len,
            productivity_len,
            data,
        }
    }

    /// Build a matrix from row-major rows (`rows[k][p]`)
    ///
    /// Returns `None` when the rows are ragged.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let productivity_len = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != productivity_len) {
            return None;
        }
        Some(Self::from_fn(rows.len(), productivity_len, |k, p| rows[k][p]))
    }

    pub fn capital_len(&self) -> usize {
        self.capital_len
    }

    pub fn productivity_len(&self) -> usize {
        self.productivity_len
    }

    /// Shape as `(K, P)`
    pub fn shape(&self) -> (usize, usize) {
        (self.capital_len, self.productivity_len)
    }

    #[inline]
    fn offset(&self, capital_index: usize, productivity_index: usize) -> usize {
        debug_assert!(capital_index < self.capital_len);
        debug_assert!(productivity_index < self.productivity_len);
        productivity_index * self.capital_len + capital_index
    }

    /// Read one cell
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[inline]
    pub fn get(&self, capital_index: usize, productivity_index: usize) -> f64 {
        self.data[self.offset(capital_index, productivity_index)]
    }

    /// Read one cell, `None` when out of range
    pub fn try_get(&self, capital_index: usize, productivity_index: usize) -> Option<f64> {
        if capital_index < self.capital_len && productivity_index < self.productivity_len {
            Some(self.get(capital_index, productivity_index))
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, capital_index: usize, productivity_index: usize, value: f64) {
        let offset = self.offset(capital_index, productivity_index);
        self.data[offset] = value;
    }

    /// All capital entries of one productivity state
    #[inline]
    pub fn column(&self, productivity_index: usize) -> &[f64] {
        let start = productivity_index * self.capital_len;
        &self.data[start..start + self.capital_len]
    }

    #[inline]
    pub fn column_mut(&mut self, productivity_index: usize) -> &mut [f64] {
        let start = productivity_index * self.capital_len;
        &mut self.data[start..start + self.capital_len]
    }

    /// Mutable columns in productivity order
    pub fn columns_mut(&mut self) -> std::slice::ChunksMut<'_, f64> {
        self.data.chunks_mut(self.capital_len.max(1))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Overwrite every cell with `value`
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Sup-norm distance `max |self - other|` over all cells
    ///
    /// Both matrices must have the same shape.
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::StateMatrix;
    ///
    /// let a = StateMatrix::from_fn(2, 2, |k, p| (k + p) as f64);
    /// let b = StateMatrix::zeros(2, 2);
    /// assert_eq!(a.max_abs_diff(&b), 2.0);
    /// ```
    pub fn max_abs_diff(&self, other: &StateMatrix) -> f64 {
        debug_assert_eq!(self.shape(), other.shape());
        self.data
            .iter()
            .zip(&other.data)
            .fold(0.0_f64, |acc, (a, b)| acc.max((a - b).abs()))
    }

    /// Row-major copy (`rows[k][p]`), the orientation callers usually print
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.capital_len)
            .map(|k| (0..self.productivity_len).map(|p| self.get(k, p)).collect())
            .collect()
    }
}
