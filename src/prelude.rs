pub use embedded_hal::prelude::*;

pub use crate::gpio::GpioBank as _stm32f0xx_blinky_gpio_GpioBank;
#[cfg(feature = "device-selected")]
pub use crate::rcc::RccExt as _stm32f0xx_blinky_rcc_RccExt;
pub use crate::time::U32Ext as _stm32f0xx_blinky_time_U32Ext;
