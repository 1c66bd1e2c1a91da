//! Clock configuration
//!
//! Only the internal 8 MHz oscillator is supported, either directly or through
//! the PLL fed with HSI/2. The timer demo uses this to bring the timer clock
//! down to the 3 MHz the counts in [`crate::config`] assume:
//!
//! ``` ignore
//! let rcc = p.RCC
//!     .configure()
//!     .sysclk(12.mhz())
//!     .hclk(3.mhz())
//!     .pclk(3.mhz())
//!     .freeze(&mut p.FLASH);
//! ```

use crate::time::Hertz;

const HSI: u32 = 8_000_000; // Hz

/// Frozen clock frequencies
///
/// The existence of this value indicates that the clock configuration can no longer be changed
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    hclk: Hertz,
    pclk: Hertz,
    sysclk: Hertz,
}

impl Clocks {
    /// Returns the frequency of the AHB
    pub fn hclk(&self) -> Hertz {
        self.hclk
    }

    /// Returns the frequency of the APB, which also clocks the timers
    pub fn pclk(&self) -> Hertz {
        self.pclk
    }

    /// Returns the system (core) frequency
    pub fn sysclk(&self) -> Hertz {
        self.sysclk
    }
}

/// Register values realizing a set of requested frequencies
#[cfg_attr(not(feature = "device-selected"), allow(dead_code))]
#[derive(Clone, Copy, Debug, PartialEq)]
struct ClockPlan {
    pllmul_bits: Option<u8>,
    hpre_bits: u8,
    ppre_bits: u8,
    clocks: Clocks,
}

/// Picks the closest achievable frequencies not above the requested ones
#[cfg_attr(not(feature = "device-selected"), allow(dead_code))]
fn plan(sysclk: Option<u32>, hclk: Option<u32>, pclk: Option<u32>) -> ClockPlan {
    let pllmul = (4 * sysclk.unwrap_or(HSI) + HSI) / HSI / 2;
    let pllmul = core::cmp::min(core::cmp::max(pllmul, 2), 16);
    let sysclk = pllmul * HSI / 2;

    let pllmul_bits = if pllmul == 2 {
        None
    } else {
        Some(pllmul as u8 - 2)
    };

    let hpre_bits = hclk
        .map(|hclk| match sysclk / hclk {
            0 => unreachable!(),
            1 => 0b0111,
            2 => 0b1000,
            3..=5 => 0b1001,
            6..=11 => 0b1010,
            12..=39 => 0b1011,
            40..=95 => 0b1100,
            96..=191 => 0b1101,
            192..=383 => 0b1110,
            _ => 0b1111,
        })
        .unwrap_or(0b0111);

    let hclk = sysclk / (1 << (hpre_bits - 0b0111));

    let ppre_bits = pclk
        .map(|pclk| match hclk / pclk {
            0 => unreachable!(),
            1 => 0b011,
            2 => 0b100,
            3..=5 => 0b101,
            6..=11 => 0b110,
            _ => 0b111,
        })
        .unwrap_or(0b011);

    let ppre: u8 = 1 << (ppre_bits - 0b011);
    let pclk = hclk / cast::u32(ppre);

    ClockPlan {
        pllmul_bits,
        hpre_bits,
        ppre_bits,
        clocks: Clocks {
            hclk: Hertz(hclk),
            pclk: Hertz(pclk),
            sysclk: Hertz(sysclk),
        },
    }
}

#[cfg(feature = "device-selected")]
pub use self::device::{Rcc, RccExt, CFGR};

#[cfg(feature = "device-selected")]
mod device {
    use super::{plan, Clocks};
    use crate::pac::{FLASH, RCC};
    use crate::time::Hertz;

    /// Extension trait that sets up the `RCC` peripheral
    pub trait RccExt {
        /// Starts a clock configuration that runs from the internal oscillator
        fn configure(self) -> CFGR;
    }

    impl RccExt for RCC {
        fn configure(self) -> CFGR {
            CFGR {
                hclk: None,
                pclk: None,
                sysclk: None,
                rcc: self,
            }
        }
    }

    /// Constrained RCC peripheral
    pub struct Rcc {
        pub clocks: Clocks,
        pub(crate) regs: RCC,
    }

    pub struct CFGR {
        hclk: Option<u32>,
        pclk: Option<u32>,
        sysclk: Option<u32>,
        rcc: RCC,
    }

    impl CFGR {
        pub fn hclk<F>(mut self, freq: F) -> Self
        where
            F: Into<Hertz>,
        {
            self.hclk = Some(freq.into().0);
            self
        }

        pub fn pclk<F>(mut self, freq: F) -> Self
        where
            F: Into<Hertz>,
        {
            self.pclk = Some(freq.into().0);
            self
        }

        pub fn sysclk<F>(mut self, freq: F) -> Self
        where
            F: Into<Hertz>,
        {
            self.sysclk = Some(freq.into().0);
            self
        }

        pub fn freeze(self, flash: &mut FLASH) -> Rcc {
            let plan = plan(self.sysclk, self.hclk, self.pclk);
            let rcc = &self.rcc;

            // adjust flash wait states
            let latency = if plan.clocks.sysclk().0 <= 24_000_000 {
                0b000
            } else {
                0b001
            };
            flash.acr.write(|w| unsafe { w.latency().bits(latency) });

            if let Some(pllmul_bits) = plan.pllmul_bits {
                // If PLL is current source, switch to HSI
                if rcc.cfgr.read().sws().is_pll() {
                    rcc.cfgr.modify(|_, w| w.sw().hsi());
                    while !rcc.cfgr.read().sws().is_hsi() {}
                }

                rcc.cr.modify(|_, w| w.pllon().off());
                while rcc.cr.read().pllrdy().bit_is_set() {}

                // PLLSRC 0 selects HSI/2
                rcc.cfgr
                    .modify(|_, w| unsafe { w.pllsrc().bits(0).pllmul().bits(pllmul_bits) });

                rcc.cr.modify(|_, w| w.pllon().on());
                while rcc.cr.read().pllrdy().bit_is_clear() {}

                rcc.cfgr.modify(|_, w| unsafe {
                    w.ppre()
                        .bits(plan.ppre_bits)
                        .hpre()
                        .bits(plan.hpre_bits)
                        .sw()
                        .pll()
                });
            } else {
                rcc.cfgr.modify(|_, w| unsafe {
                    w.ppre()
                        .bits(plan.ppre_bits)
                        .hpre()
                        .bits(plan.hpre_bits)
                        .sw()
                        .hsi()
                });
            }

            Rcc {
                clocks: plan.clocks,
                regs: self.rcc,
            }
        }
    }
}
