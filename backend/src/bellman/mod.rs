//! Bellman operator building blocks
//!
//! One application of the operator is:
//!
//! 1. [`expectation`]: expected continuation value `E = V * T^T`
//! 2. [`search`]: per productivity column, the inner search over
//!    next-period capital for every capital state
//!
//! The solver engine sequences the two and owns all buffers.

pub mod expectation;
pub mod search;

pub use expectation::{expected_values, expected_values_into};
pub use search::{BellmanKernel, InfeasibleState, ScanResult, SearchStrategy};
