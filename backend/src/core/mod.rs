//! Run bookkeeping shared by the solver

pub mod progress;

pub use progress::IterationClock;
