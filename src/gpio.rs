//! General Purpose Input / Output
//!
//! Pins are addressed by `(port, pin)` and bound to the registers of their port
//! through [`GpioRegExt`]. On the device those are the STM32F0 port register
//! blocks; on the host they are the simulated ports in [`crate::sim`].

use core::convert::Infallible;
use core::marker::PhantomData;
use core::ops::Not;

use embedded_hal::digital::v2::{toggleable, InputPin, OutputPin, StatefulOutputPin};

/// GPIO port present on every STM32F0x2 package
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortId {
    A,
    B,
    C,
    F,
}

impl PortId {
    pub(crate) fn index(self) -> usize {
        match self {
            PortId::A => 0,
            PortId::B => 1,
            PortId::C => 2,
            PortId::F => 3,
        }
    }
}

/// A pin, identified by its port and its bit position within the port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinId {
    pub port: PortId,
    pub pin: u8,
}

impl PinId {
    pub const fn new(port: PortId, pin: u8) -> Self {
        assert!(pin < 16);
        PinId { port, pin }
    }
}

/// Logic level of a pin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Pin direction, as encoded in MODER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input = 0b00,
    Output = 0b01,
    Alternate = 0b10,
    Analog = 0b11,
}

/// Internal pull resistor, as encoded in PUPDR
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None = 0b00,
    Up = 0b01,
    Down = 0b10,
}

/// Output driver, as encoded in OTYPER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    PushPull = 0,
    OpenDrain = 1,
}

/// Register level access to one GPIO port
///
/// All methods take `&self`: like memory mapped registers, implementors change
/// state through a shared reference.
pub trait GpioRegExt {
    fn is_low(&self, pos: u8) -> bool;
    fn is_set_low(&self, pos: u8) -> bool;
    fn set_high(&self, pos: u8);
    fn set_low(&self, pos: u8);
    fn set_mode(&self, pos: u8, mode: PinMode);
    fn set_pull(&self, pos: u8, pull: Pull);
    fn set_output_type(&self, pos: u8, otype: OutputType);
}

/// A set of GPIO ports pins can be taken from
pub trait GpioBank {
    /// Registers of `port`
    fn port(&self, port: PortId) -> &dyn GpioRegExt;

    /// Unconfigured pin `id`, bound to the registers of its port
    fn pin(&self, id: PinId) -> Pin<'_, Unconfigured> {
        Pin::new(self.port(id.port), id.pin)
    }
}

/// Pin not yet configured by this crate (type state)
pub struct Unconfigured;

/// Input mode (type state)
pub struct Input<MODE> {
    _mode: PhantomData<MODE>,
}

/// Pulled up input (type state)
pub struct PullUp;

/// Output mode (type state)
pub struct Output<MODE> {
    _mode: PhantomData<MODE>,
}

/// Push pull output (type state)
pub struct PushPull;

/// A pin bound to the registers of its port
pub struct Pin<'a, MODE> {
    i: u8,
    port: &'a dyn GpioRegExt,
    _mode: PhantomData<MODE>,
}

impl<'a> Pin<'a, Unconfigured> {
    pub fn new(port: &'a dyn GpioRegExt, i: u8) -> Self {
        assert!(i < 16);
        Pin {
            i,
            port,
            _mode: PhantomData,
        }
    }
}

impl<'a, MODE> Pin<'a, MODE> {
    fn into_mode<NEW>(self) -> Pin<'a, NEW> {
        Pin {
            i: self.i,
            port: self.port,
            _mode: PhantomData,
        }
    }

    /// Configures the pin to operate as a pulled up input pin
    pub fn into_pull_up_input(self) -> Pin<'a, Input<PullUp>> {
        self.port.set_pull(self.i, Pull::Up);
        self.port.set_mode(self.i, PinMode::Input);
        self.into_mode()
    }

    /// Configures the pin to operate as a push pull output pin
    pub fn into_push_pull_output(self) -> Pin<'a, Output<PushPull>> {
        self.port.set_pull(self.i, Pull::None);
        self.port.set_output_type(self.i, OutputType::PushPull);
        self.port.set_mode(self.i, PinMode::Output);
        self.into_mode()
    }
}

impl<'a, MODE> Pin<'a, Input<MODE>> {
    /// Level currently present on the pin
    pub fn level(&self) -> Level {
        Level::from(!self.port.is_low(self.i))
    }
}

impl<'a, MODE> StatefulOutputPin for Pin<'a, Output<MODE>> {
    #[inline(always)]
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        self.is_set_low().map(|v| !v)
    }

    #[inline(always)]
    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(self.port.is_set_low(self.i))
    }
}

impl<'a, MODE> OutputPin for Pin<'a, Output<MODE>> {
    type Error = Infallible;

    #[inline(always)]
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.port.set_high(self.i);
        Ok(())
    }

    #[inline(always)]
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.port.set_low(self.i);
        Ok(())
    }
}

impl<'a, MODE> toggleable::Default for Pin<'a, Output<MODE>> {}

impl<'a, MODE> InputPin for Pin<'a, Input<MODE>> {
    type Error = Infallible;

    #[inline(always)]
    fn is_high(&self) -> Result<bool, Self::Error> {
        self.is_low().map(|v| !v)
    }

    #[inline(always)]
    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.port.is_low(self.i))
    }
}

#[cfg(feature = "device-selected")]
pub use self::device::Gpio;

#[cfg(feature = "device-selected")]
mod device {
    use super::{GpioBank, GpioRegExt, OutputType, PinMode, PortId, Pull};
    use crate::pac::{GPIOA, GPIOB, GPIOC, GPIOF};
    use crate::rcc::Rcc;

    macro_rules! gpio_trait {
        ($gpiox:ident) => {
            impl GpioRegExt for crate::pac::$gpiox::RegisterBlock {
                fn is_low(&self, pos: u8) -> bool {
                    // NOTE(unsafe) atomic read with no side effects
                    self.idr.read().bits() & (1 << pos) == 0
                }

                fn is_set_low(&self, pos: u8) -> bool {
                    // NOTE(unsafe) atomic read with no side effects
                    self.odr.read().bits() & (1 << pos) == 0
                }

                fn set_high(&self, pos: u8) {
                    // NOTE(unsafe) atomic write to a stateless register
                    unsafe { self.bsrr.write(|w| w.bits(1 << pos)) }
                }

                fn set_low(&self, pos: u8) {
                    // NOTE(unsafe) atomic write to a stateless register
                    unsafe { self.bsrr.write(|w| w.bits(1 << (pos + 16))) }
                }

                fn set_mode(&self, pos: u8, mode: PinMode) {
                    let offset = 2 * pos;
                    unsafe {
                        self.moder.modify(|r, w| {
                            w.bits((r.bits() & !(0b11 << offset)) | ((mode as u32) << offset))
                        });
                    }
                }

                fn set_pull(&self, pos: u8, pull: Pull) {
                    let offset = 2 * pos;
                    unsafe {
                        self.pupdr.modify(|r, w| {
                            w.bits((r.bits() & !(0b11 << offset)) | ((pull as u32) << offset))
                        });
                    }
                }

                fn set_output_type(&self, pos: u8, otype: OutputType) {
                    unsafe {
                        self.otyper.modify(|r, w| {
                            w.bits((r.bits() & !(0b1 << pos)) | ((otype as u32) << pos))
                        });
                    }
                }
            }
        };
    }

    gpio_trait!(gpioa);
    gpio_trait!(gpiof);

    /// The GPIO ports of the device, clocked and ready to hand out pins
    pub struct Gpio {
        gpioa: GPIOA,
        gpiob: GPIOB,
        gpioc: GPIOC,
        gpiof: GPIOF,
    }

    impl Gpio {
        pub fn new(gpioa: GPIOA, gpiob: GPIOB, gpioc: GPIOC, gpiof: GPIOF, rcc: &mut Rcc) -> Self {
            rcc.regs.ahbenr.modify(|_, w| {
                w.iopaen()
                    .set_bit()
                    .iopben()
                    .set_bit()
                    .iopcen()
                    .set_bit()
                    .iopfen()
                    .set_bit()
            });

            Gpio {
                gpioa,
                gpiob,
                gpioc,
                gpiof,
            }
        }
    }

    impl GpioBank for Gpio {
        fn port(&self, port: PortId) -> &dyn GpioRegExt {
            match port {
                PortId::A => &*self.gpioa,
                PortId::B => &*self.gpiob,
                PortId::C => &*self.gpioc,
                PortId::F => &*self.gpiof,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimGpio;
    use embedded_hal::digital::v2::ToggleableOutputPin;

    #[test]
    fn push_pull_output_configures_port_registers() {
        let gpio = SimGpio::new();
        let mut led = gpio.pin(PinId::new(PortId::A, 5)).into_push_pull_output();

        let port = gpio.sim_port(PortId::A);
        assert_eq!(port.mode(5), PinMode::Output);
        assert_eq!(port.pull(5), Pull::None);
        assert_eq!(port.output_type(5), OutputType::PushPull);

        led.set_high().ok();
        assert_eq!(port.output(5), Level::High);
        assert_eq!(led.is_set_high(), Ok(true));
        led.set_low().ok();
        assert_eq!(port.output(5), Level::Low);
    }

    #[test]
    fn conversions_overwrite_whatever_the_port_held() {
        let gpio = SimGpio::new();
        let port = gpio.sim_port(PortId::A);
        port.set_pull(6, Pull::Down);
        port.set_output_type(6, OutputType::OpenDrain);
        port.set_mode(6, PinMode::Analog);
        port.set_mode(7, PinMode::Output);

        let _led = gpio.pin(PinId::new(PortId::A, 6)).into_push_pull_output();
        assert_eq!(port.mode(6), PinMode::Output);
        assert_eq!(port.pull(6), Pull::None);
        assert_eq!(port.output_type(6), OutputType::PushPull);

        let _button = gpio.pin(PinId::new(PortId::A, 7)).into_pull_up_input();
        assert_eq!(port.mode(7), PinMode::Input);
        assert_eq!(port.pull(7), Pull::Up);
        assert_eq!(port.mode(6), PinMode::Output);
    }

    #[test]
    fn toggle_flips_the_output_latch() {
        let gpio = SimGpio::new();
        let mut led = gpio.pin(PinId::new(PortId::B, 3)).into_push_pull_output();

        led.toggle().ok();
        assert_eq!(gpio.sim_port(PortId::B).output(3), Level::High);
        led.toggle().ok();
        assert_eq!(gpio.sim_port(PortId::B).output(3), Level::Low);
        assert_eq!(gpio.sim_port(PortId::B).edges(3), 2);
    }

    #[test]
    fn pull_up_input_reads_high_until_grounded() {
        let gpio = SimGpio::new();
        let button = gpio.pin(PinId::new(PortId::C, 13)).into_pull_up_input();

        assert_eq!(button.level(), Level::High);
        gpio.sim_port(PortId::C).drive(13, Level::Low);
        assert_eq!(button.level(), Level::Low);
        assert_eq!(button.is_low(), Ok(true));
        gpio.sim_port(PortId::C).release(13);
        assert_eq!(button.level(), Level::High);
    }

    #[test]
    fn pins_on_the_same_port_do_not_interfere() {
        let gpio = SimGpio::new();
        let mut led1 = gpio.pin(PinId::new(PortId::A, 5)).into_push_pull_output();
        let led2 = gpio.pin(PinId::new(PortId::A, 6)).into_push_pull_output();

        led1.set_high().ok();
        assert_eq!(led2.is_set_low(), Ok(true));
        assert_eq!(gpio.sim_port(PortId::A).mode(7), PinMode::Input);
    }

    #[test]
    fn level_negation() {
        assert_eq!(!Level::Low, Level::High);
        assert_eq!(!Level::High, Level::Low);
        assert_eq!(Level::from(true), Level::High);
    }
}
