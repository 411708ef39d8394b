//! Iteration bookkeeping for the outer value-iteration loop
//!
//! The solver advances in discrete outer iterations. This module counts them,
//! decides which iterations emit a progress line and measures wall-clock time
//! since the first iteration started.

use std::time::{Duration, Instant};

/// Counts outer iterations and paces progress reporting
///
/// # Example
/// ```
/// use rbc_vfi_core_rs::IterationClock;
///
/// let mut clock = IterationClock::new(10);
/// assert_eq!(clock.iteration(), 0);
///
/// clock.advance();
/// assert_eq!(clock.iteration(), 1);
/// assert!(clock.is_report_due());
/// ```
#[derive(Debug, Clone)]
pub struct IterationClock {
    /// Outer iterations completed
    iteration: usize,
    /// Report every this many iterations (0 = only the first)
    report_every: usize,
    /// Wall-clock start
    started: Instant,
}

impl IterationClock {
    /// Create a clock at iteration 0
    ///
    /// # Arguments
    /// * `report_every` - progress cadence; iteration 1 always reports
    pub fn new(report_every: usize) -> Self {
        Self {
            iteration: 0,
            report_every,
            started: Instant::now(),
        }
    }

    /// Record one completed outer iteration
    pub fn advance(&mut self) {
        self.iteration += 1;
    }

    /// Outer iterations completed so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Whether the iteration just completed should be reported
    ///
    /// # Example
    /// ```
    /// use rbc_vfi_core_rs::IterationClock;
    ///
    /// let mut clock = IterationClock::new(10);
    /// let due: Vec<usize> = (0..25)
    ///     .filter_map(|_| {
    ///         clock.advance();
    ///         clock.is_report_due().then(|| clock.iteration())
    ///     })
    ///     .collect();
    /// assert_eq!(due, vec![1, 10, 20]);
    /// ```
    pub fn is_report_due(&self) -> bool {
        match self.iteration {
            0 => false,
            1 => true,
            n => self.report_every > 0 && n % self.report_every == 0,
        }
    }

    /// Wall-clock time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn report_every(&self) -> usize {
        self.report_every
    }
}
