#![cfg_attr(not(test), no_std)]

pub use stm32f0;

#[cfg(feature = "device-selected")]
pub use stm32f0::stm32f0x2 as pac;

#[cfg(not(feature = "device-selected"))]
pub mod pac {}

pub mod blinky;
pub mod board;
pub mod config;
pub mod delay;
pub mod gpio;
pub mod prelude;
pub mod rcc;
pub mod sim;
pub mod time;
pub mod timers;
pub mod watchdog;
