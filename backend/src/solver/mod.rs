//! Solver - value function iteration loop
//!
//! See `engine.rs` for the full implementation.

pub mod engine;

pub use engine::{
    BellmanUpdate, IterationReport, Solution, SolverError, SolverOptions, SolverState,
    ValueIterationEngine,
};
