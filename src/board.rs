//! Board wiring and the LED / button primitives
//!
//! The pin assignment follows the NUCLEO-F072RB: LED1 is the green user LED
//! LD2 on PA5, the button is the blue user button B1 on PC13, which connects
//! the pin to ground when pressed. LED2 is an external LED on PA6 (Arduino
//! header D12), driven active-high through a series resistor.

use core::convert::Infallible;

use embedded_hal::digital::v2::{InputPin, OutputPin, ToggleableOutputPin};

use crate::config::PRESSED;
use crate::gpio::{GpioBank, Input, Level, Output, Pin, PinId, PortId, PullUp, PushPull};
use crate::watchdog::{Watchdog, WatchdogRegExt};

pub const LED1: PinId = PinId::new(PortId::A, 5);
pub const LED2: PinId = PinId::new(PortId::A, 6);
pub const BUTTON1: PinId = PinId::new(PortId::C, 13);

pub type Led<'a> = Pin<'a, Output<PushPull>>;
pub type Button<'a> = Pin<'a, Input<PullUp>>;

/// The two LEDs and the button of the board
pub struct Board<L1, L2, B> {
    led1: L1,
    led2: L2,
    button1: B,
}

impl<'a> Board<Led<'a>, Led<'a>, Button<'a>> {
    /// Holds the watchdog, then configures the LEDs as push pull outputs and
    /// the button as a pulled up input
    ///
    /// Running it again on the same ports rewrites the same configuration.
    pub fn init<G, W>(gpio: &'a G, watchdog: &mut Watchdog<W>) -> Self
    where
        G: GpioBank,
        W: WatchdogRegExt,
    {
        watchdog.hold();

        let led1 = gpio.pin(LED1).into_push_pull_output();
        let led2 = gpio.pin(LED2).into_push_pull_output();
        let button1 = gpio.pin(BUTTON1).into_pull_up_input();

        Board::new(led1, led2, button1)
    }
}

impl<L1, L2, B> Board<L1, L2, B>
where
    L1: OutputPin,
    L2: OutputPin + ToggleableOutputPin,
    B: InputPin<Error = Infallible>,
{
    /// Board from pins that are already configured
    pub fn new(led1: L1, led2: L2, button1: B) -> Self {
        Board {
            led1,
            led2,
            button1,
        }
    }

    pub fn turn_on_led1(&mut self) {
        self.led1.set_high().ok();
    }

    pub fn turn_off_led1(&mut self) {
        self.led1.set_low().ok();
    }

    pub fn turn_on_led2(&mut self) {
        self.led2.set_high().ok();
    }

    pub fn turn_off_led2(&mut self) {
        self.led2.set_low().ok();
    }

    pub fn toggle_led2(&mut self) {
        self.led2.toggle().ok();
    }

    /// Level the button pin reads right now
    pub fn button1_status(&self) -> Level {
        match self.button1.is_high() {
            Ok(high) => Level::from(high),
            Err(never) => match never {},
        }
    }

    pub fn button1_pressed(&self) -> bool {
        self.button1_status() == PRESSED
    }
}
