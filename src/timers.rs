//! 32-bit countdown timer
//!
//! [`Timer32`] wraps the register contract [`TimerRegExt`] with the usual
//! init / set count / start / get value operations. [`OneShotTimer`] builds a
//! periodic tick on top of it without using hardware auto-reload: the timer is
//! started in one-shot mode, halts at zero, and is reloaded and restarted by
//! whoever polls it.
//!
//! # Example
//!
//! ``` no_run
//! use stm32f0xx_blinky::config::HALF_SEC_COUNT;
//! use stm32f0xx_blinky::sim::SimTimer;
//! use stm32f0xx_blinky::timers::{OneShotTimer, Timer32, TimerConfig};
//! use embedded_hal::timer::CountDown;
//!
//! let tim = SimTimer::new();
//! let mut timer = OneShotTimer::new(Timer32::init_module(&tim, TimerConfig::default()));
//! timer.start(HALF_SEC_COUNT);
//! loop {
//!     if timer.wait().is_ok() {
//!         // half a second has passed
//!     }
//! }
//! ```

use embedded_hal::timer::{CountDown, Periodic};
use void::Void;

use crate::time::Ticks;

/// Clock divider in front of the counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    Div1,
    Div16,
    Div256,
}

impl Prescaler {
    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div16 => 16,
            Prescaler::Div256 => 256,
        }
    }
}

/// Counter width
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    Bits16,
    Bits32,
}

impl Width {
    /// Largest count the counter can hold
    pub const fn max(self) -> u32 {
        match self {
            Width::Bits16 => 0xFFFF,
            Width::Bits32 => 0xFFFF_FFFF,
        }
    }
}

/// What a running, non one-shot counter does after reaching zero
///
/// A one-shot start ignores the mode and always halts at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Reload the last loaded count
    Periodic,
    /// Wrap around to the largest count of the configured width
    FreeRunning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    pub prescaler: Prescaler,
    pub width: Width,
    pub mode: Mode,
}

impl Default for TimerConfig {
    fn default() -> Self {
        TimerConfig {
            prescaler: crate::config::PRESCALE,
            width: Width::Bits32,
            mode: Mode::Periodic,
        }
    }
}

/// Register level access to one countdown timer
pub trait TimerRegExt {
    /// Stops the counter and selects the clock divider
    fn configure(&self, prescaler: Prescaler);
    /// Loads the counter with `count`; `reload` is what a non one-shot
    /// counter restarts from after reaching zero
    fn load(&self, count: u32, reload: u32);
    fn start(&self, one_shot: bool);
    fn stop(&self);
    /// Current count; a one-shot counter that ran down reads zero
    fn value(&self) -> u32;
    fn is_running(&self) -> bool;
}

impl<T: TimerRegExt + ?Sized> TimerRegExt for &T {
    fn configure(&self, prescaler: Prescaler) {
        (**self).configure(prescaler)
    }

    fn load(&self, count: u32, reload: u32) {
        (**self).load(count, reload)
    }

    fn start(&self, one_shot: bool) {
        (**self).start(one_shot)
    }

    fn stop(&self) {
        (**self).stop()
    }

    fn value(&self) -> u32 {
        (**self).value()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }
}

/// Hardware countdown timer
pub struct Timer32<TIM> {
    tim: TIM,
    config: TimerConfig,
}

impl<TIM: TimerRegExt> Timer32<TIM> {
    /// Stops the timer and applies `config`; the count is left untouched
    pub fn init_module(tim: TIM, config: TimerConfig) -> Self {
        tim.stop();
        tim.configure(config.prescaler);
        Timer32 { tim, config }
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    /// Loads the counter, truncated to the configured width
    pub fn set_count(&mut self, count: Ticks) {
        let count = count.0 & self.config.width.max();
        let reload = match self.config.mode {
            Mode::Periodic => count,
            Mode::FreeRunning => self.config.width.max(),
        };
        self.tim.load(count, reload);
    }

    pub fn start_timer(&mut self, one_shot: bool) {
        self.tim.start(one_shot);
    }

    pub fn get_value(&self) -> Ticks {
        Ticks(self.tim.value())
    }

    pub fn is_running(&self) -> bool {
        self.tim.is_running()
    }
}

/// State of a one-shot countdown
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickState {
    /// Count above zero, counting down
    Running,
    /// Count at zero, timer halted until restarted
    Expired,
}

/// Periodic tick from a one-shot timer that is rearmed on every expiry
pub struct OneShotTimer<TIM> {
    timer: Timer32<TIM>,
    period: Ticks,
}

impl<TIM: TimerRegExt> OneShotTimer<TIM> {
    /// Wraps `timer` without starting it; call `start` before `wait`
    pub fn new(timer: Timer32<TIM>) -> Self {
        OneShotTimer {
            timer,
            period: Ticks(0),
        }
    }

    pub fn state(&self) -> TickState {
        if self.timer.get_value() == Ticks(0) {
            TickState::Expired
        } else {
            TickState::Running
        }
    }

    /// Count reloaded on every expiry
    pub fn period(&self) -> Ticks {
        self.period
    }

    pub fn timer(&self) -> &Timer32<TIM> {
        &self.timer
    }

    fn rearm(&mut self) {
        self.timer.set_count(self.period);
        self.timer.start_timer(true);
    }
}

impl<TIM: TimerRegExt> CountDown for OneShotTimer<TIM> {
    type Time = Ticks;

    fn start<T>(&mut self, count: T)
    where
        T: Into<Ticks>,
    {
        self.period = count.into();
        self.rearm();
    }

    /// Completes once per expiry. Only an exact zero counts as expiry; a poll
    /// that misses it leaves the timer expired for the next poll to find.
    fn wait(&mut self) -> nb::Result<(), Void> {
        match self.state() {
            TickState::Running => Err(nb::Error::WouldBlock),
            TickState::Expired => {
                self.rearm();
                Ok(())
            }
        }
    }
}

impl<TIM: TimerRegExt> Periodic for OneShotTimer<TIM> {}

#[cfg(feature = "device-selected")]
pub use self::device::tim2;

#[cfg(feature = "device-selected")]
mod device {
    use super::{Prescaler, TimerRegExt};
    use crate::pac::TIM2;
    use crate::rcc::Rcc;

    impl TimerRegExt for TIM2 {
        fn configure(&self, prescaler: Prescaler) {
            // pause and count down
            self.cr1.modify(|_, w| w.cen().clear_bit().dir().set_bit());
            let psc = (prescaler.divisor() - 1) as u16;
            self.psc.write(|w| w.psc().bits(psc));
            // latch the prescaler, then drop the update flag this raises
            self.egr.write(|w| w.ug().set_bit());
            self.sr.modify(|_, w| w.uif().clear_bit());
        }

        fn load(&self, count: u32, reload: u32) {
            self.arr.write(|w| unsafe { w.bits(reload) });
            self.cnt.write(|w| unsafe { w.bits(count) });
            self.sr.modify(|_, w| w.uif().clear_bit());
        }

        fn start(&self, one_shot: bool) {
            self.sr.modify(|_, w| w.uif().clear_bit());
            self.cr1
                .modify(|_, w| w.dir().set_bit().opm().bit(one_shot).cen().set_bit());
        }

        fn stop(&self) {
            self.cr1.modify(|_, w| w.cen().clear_bit());
        }

        fn value(&self) -> u32 {
            // In one-pulse mode the underflow reloads CNT from ARR and clears
            // CEN, so a halted counter with a pending update has run down.
            if self.cr1.read().cen().bit_is_clear() && self.sr.read().uif().bit_is_set() {
                0
            } else {
                self.cnt.read().bits()
            }
        }

        fn is_running(&self) -> bool {
            self.cr1.read().cen().bit_is_set()
        }
    }

    /// Enables and resets TIM2, handing it back for
    /// [`Timer32::init_module`](super::Timer32::init_module)
    pub fn tim2(tim: TIM2, rcc: &mut Rcc) -> TIM2 {
        // enable and reset peripheral to a clean slate state
        rcc.regs.apb1enr.modify(|_, w| w.tim2en().set_bit());
        rcc.regs.apb1rstr.modify(|_, w| w.tim2rst().set_bit());
        rcc.regs.apb1rstr.modify(|_, w| w.tim2rst().clear_bit());

        tim
    }
}
