//! Timing and wiring constants shared by both demos
//!
//! All counter values are derived from the assumed timer input clock instead of
//! being written out, so changing `CLOCK` or `PRESCALE` moves every period with
//! it.

use crate::gpio::Level;
use crate::time::{Hertz, Milliseconds, Ticks};
use crate::timers::Prescaler;

/// Timer input clock the counts below are computed for
pub const CLOCK: Hertz = Hertz(3_000_000);

/// Prescaler the blink timer runs with
pub const PRESCALE: Prescaler = Prescaler::Div1;

/// Counter load value that makes a timer fed by `clock` through `prescaler`
/// expire after `period`
pub const fn count(clock: Hertz, period: Milliseconds, prescaler: Prescaler) -> Ticks {
    let ticks = clock.0 as u64 / prescaler.divisor() as u64 * period.0 as u64 / 1_000;
    Ticks(ticks as u32)
}

pub const ONE_SEC_COUNT: Ticks = count(CLOCK, Milliseconds(1_000), PRESCALE);
pub const HALF_SEC_COUNT: Ticks = count(CLOCK, Milliseconds(500), PRESCALE);
pub const TWO_SEC_COUNT: Ticks = count(CLOCK, Milliseconds(2_000), PRESCALE);

/// Iterations of the empty loop between two LED2 toggles in the busy-wait demo
pub const BUSY_WAIT_ITERATIONS: u32 = 120_000;

/// A pressed button shorts its pin to ground
pub const PRESSED: Level = Level::Low;
