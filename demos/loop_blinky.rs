#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_halt as _;

use stm32f0xx_blinky as hal;

use crate::hal::blinky::LoopBlinky;
use crate::hal::board::Board;
use crate::hal::delay::{BusyWait, Nop};
use crate::hal::gpio::Gpio;
use crate::hal::pac;
use crate::hal::prelude::*;
use crate::hal::watchdog::Watchdog;

use cortex_m_rt::entry;

#[entry]
fn main() -> ! {
    if let Some(p) = pac::Peripherals::take() {
        let mut flash = p.FLASH;
        let mut rcc = p.RCC.configure().freeze(&mut flash);

        let gpio = Gpio::new(p.GPIOA, p.GPIOB, p.GPIOC, p.GPIOF, &mut rcc);
        let mut watchdog = Watchdog::new(p.WWDG);
        let board = Board::init(&gpio, &mut watchdog);

        defmt::println!("loop blinky, sysclk {}", rcc.clocks.sysclk());

        LoopBlinky::new(board, BusyWait::new(Nop)).run();
    }

    loop {
        continue;
    }
}
