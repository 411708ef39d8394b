//! Domain types of the state space
//!
//! - **grid**: productivity levels, transition matrix, capital levels
//! - **matrix**: dense K×P tables (output, value, policy)
//! - **steady_state**: closed-form deterministic steady state

pub mod grid;
pub mod matrix;
pub mod steady_state;

pub use grid::{CapitalGrid, ProductivityGrid, TransitionMatrix};
pub use matrix::StateMatrix;
pub use steady_state::SteadyState;
