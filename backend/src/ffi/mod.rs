//! FFI (Foreign Function Interface) module
//!
//! PyO3 bindings exposing the value iteration engine to Python.
//!
//! # Design Principles
//!
//! 1. **Minimal boundary**: a config dict in, plain lists and numbers out
//! 2. **Validate inputs**: unknown keys and bad values raise `ValueError`
//! 3. **No references**: Python gets copies, never views into Rust buffers

pub mod solver;
pub mod types;
