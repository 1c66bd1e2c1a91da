//! Holding the watchdog
//!
//! Both demos stop the watchdog before anything else and never feed it. There
//! is nothing to configure: holding is unconditional and holding twice is the
//! same as holding once.
//!
//! **Attention**:
//!
//! On the STM32F0 neither watchdog can be stopped once it runs. Holding gates
//! the WWDG clock, which freezes its counter, and freezes both watchdogs while
//! the core is halted by a debugger. An IWDG started through the option bytes
//! keeps running.
use embedded_hal::watchdog;

/// Register level access to the watchdog
pub trait WatchdogRegExt {
    fn hold(&self);
    fn is_held(&self) -> bool;
}

impl<W: WatchdogRegExt + ?Sized> WatchdogRegExt for &W {
    fn hold(&self) {
        (**self).hold()
    }

    fn is_held(&self) -> bool {
        (**self).is_held()
    }
}

/// Watchdog instance
pub struct Watchdog<WDG> {
    wdg: WDG,
}

impl<WDG: WatchdogRegExt> Watchdog<WDG> {
    pub fn new(wdg: WDG) -> Self {
        Self { wdg }
    }

    /// Stops the watchdog from resetting the device
    pub fn hold(&mut self) {
        self.wdg.hold();
    }

    pub fn is_held(&self) -> bool {
        self.wdg.is_held()
    }
}

impl<WDG: WatchdogRegExt> watchdog::WatchdogDisable for Watchdog<WDG> {
    fn disable(&mut self) {
        self.wdg.hold();
    }
}

#[cfg(feature = "device-selected")]
mod device {
    use super::WatchdogRegExt;
    use crate::pac::{DBGMCU, RCC, WWDG};

    impl WatchdogRegExt for WWDG {
        fn hold(&self) {
            // NOTE(unsafe) only touches the WWDG enable and the debug freeze bits
            let rcc = unsafe { &*RCC::ptr() };
            let dbgmcu = unsafe { &*DBGMCU::ptr() };

            rcc.apb1enr.modify(|_, w| w.wwdgen().clear_bit());
            dbgmcu
                .apb1_fz
                .modify(|_, w| w.dbg_iwdg_stop().set_bit().dbg_wwdg_stop().set_bit());
        }

        fn is_held(&self) -> bool {
            // NOTE(unsafe) atomic read with no side effects
            let rcc = unsafe { &*RCC::ptr() };
            rcc.apb1enr.read().wwdgen().bit_is_clear()
        }
    }
}
