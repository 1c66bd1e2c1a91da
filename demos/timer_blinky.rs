#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_halt as _;

use stm32f0xx_blinky as hal;

use crate::hal::blinky::TimerBlinky;
use crate::hal::board::Board;
use crate::hal::gpio::Gpio;
use crate::hal::pac;
use crate::hal::prelude::*;
use crate::hal::timers;
use crate::hal::watchdog::Watchdog;

use cortex_m_rt::entry;

#[entry]
fn main() -> ! {
    if let Some(p) = pac::Peripherals::take() {
        let mut flash = p.FLASH;
        // Timer counts assume a 3 MHz timer clock
        let mut rcc = p
            .RCC
            .configure()
            .sysclk(12.mhz())
            .hclk(3.mhz())
            .pclk(3.mhz())
            .freeze(&mut flash);

        let gpio = Gpio::new(p.GPIOA, p.GPIOB, p.GPIOC, p.GPIOF, &mut rcc);
        let mut watchdog = Watchdog::new(p.WWDG);
        let board = Board::init(&gpio, &mut watchdog);
        let tim2 = timers::tim2(p.TIM2, &mut rcc);

        defmt::println!("timer blinky, timer clock {}", rcc.clocks.pclk());

        let mut blinky = TimerBlinky::init(board, tim2);
        loop {
            if blinky.step() {
                defmt::println!("tick {}", blinky.ticks());
            }
        }
    }

    loop {
        continue;
    }
}
