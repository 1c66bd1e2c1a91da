//! Busy-wait delay
//!
//! Burns a fixed number of loop iterations. How long that takes depends on the
//! core clock and on code generation, so the delay is only approximately
//! periodic and no wall-clock duration is promised. Use [`crate::timers`] when
//! the period matters.
//!
//! # Example
//!
//! ``` no_run
//! use stm32f0xx_blinky::delay::{BusyWait, Nop};
//!
//! let mut delay = BusyWait::new(Nop);
//! loop {
//!     delay.delay();
//! }
//! ```

use crate::config::BUSY_WAIT_ITERATIONS;

/// One iteration of a delay loop
pub trait Spin {
    fn spin(&mut self);
}

/// Executes a single `nop`, which also keeps the loop from being optimized out
pub struct Nop;

impl Spin for Nop {
    #[inline(always)]
    fn spin(&mut self) {
        cortex_m::asm::nop();
    }
}

/// Counted empty loop as a delay provider
pub struct BusyWait<S> {
    iterations: u32,
    spin: S,
}

impl<S: Spin> BusyWait<S> {
    /// Delay of `BUSY_WAIT_ITERATIONS` iterations
    pub fn new(spin: S) -> Self {
        Self::with_iterations(BUSY_WAIT_ITERATIONS, spin)
    }

    pub fn with_iterations(iterations: u32, spin: S) -> Self {
        BusyWait { iterations, spin }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Blocks for one delay period
    pub fn delay(&mut self) {
        for _ in 0..self.iterations {
            self.spin.spin();
        }
    }

    pub fn spinner(&self) -> &S {
        &self.spin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SpinCounter;

    #[test]
    fn default_delay_spins_the_configured_iterations() {
        let mut delay = BusyWait::new(SpinCounter::new());
        assert_eq!(delay.iterations(), BUSY_WAIT_ITERATIONS);

        delay.delay();
        assert_eq!(delay.spinner().spins(), 120_000);
        delay.delay();
        assert_eq!(delay.spinner().spins(), 240_000);
    }

    #[test]
    fn zero_iterations_returns_immediately() {
        let mut delay = BusyWait::with_iterations(0, SpinCounter::new());

        delay.delay();
        assert_eq!(delay.spinner().spins(), 0);
    }
}
