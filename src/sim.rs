//! Simulated registers
//!
//! Stand-ins for the GPIO ports, the countdown timer, the watchdog and the
//! delay loop, so the demos' control loops can run on the host. Registers
//! live in `Cell`s and change through shared references, the same way memory
//! mapped registers do. Time only passes when a test calls
//! [`SimTimer::advance`].

use core::cell::Cell;

use crate::delay::Spin;
use crate::gpio::{GpioBank, GpioRegExt, Level, OutputType, PinMode, PortId, Pull};
use crate::timers::{Prescaler, TimerRegExt};
use crate::watchdog::WatchdogRegExt;

/// Configuration registers of a port, for comparing before and after
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortConfig {
    pub moder: u32,
    pub pupdr: u32,
    pub otyper: u32,
}

/// One simulated GPIO port
#[derive(Default)]
pub struct SimPort {
    moder: Cell<u32>,
    pupdr: Cell<u32>,
    otyper: Cell<u32>,
    odr: Cell<u32>,
    // pins held at a level from outside the chip, and those levels
    driven: Cell<u32>,
    external: Cell<u32>,
    edges: [Cell<u32>; 16],
}

fn field(reg: u32, pos: u8, width: u8) -> u32 {
    (reg >> (pos * width)) & ((1 << width) - 1)
}

fn with_field(reg: u32, pos: u8, width: u8, value: u32) -> u32 {
    let offset = pos * width;
    let mask = ((1 << width) - 1) << offset;
    (reg & !mask) | ((value << offset) & mask)
}

impl SimPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, pos: u8) -> PinMode {
        match field(self.moder.get(), pos, 2) {
            0b00 => PinMode::Input,
            0b01 => PinMode::Output,
            0b10 => PinMode::Alternate,
            _ => PinMode::Analog,
        }
    }

    pub fn pull(&self, pos: u8) -> Pull {
        match field(self.pupdr.get(), pos, 2) {
            0b01 => Pull::Up,
            0b10 => Pull::Down,
            _ => Pull::None,
        }
    }

    pub fn output_type(&self, pos: u8) -> OutputType {
        if field(self.otyper.get(), pos, 1) == 0 {
            OutputType::PushPull
        } else {
            OutputType::OpenDrain
        }
    }

    pub fn config(&self) -> PortConfig {
        PortConfig {
            moder: self.moder.get(),
            pupdr: self.pupdr.get(),
            otyper: self.otyper.get(),
        }
    }

    /// Level in the output latch
    pub fn output(&self, pos: u8) -> Level {
        Level::from(field(self.odr.get(), pos, 1) != 0)
    }

    /// Number of times the output latch of `pos` changed
    pub fn edges(&self, pos: u8) -> u32 {
        self.edges[pos as usize].get()
    }

    /// Holds the pin at `level` from outside, like a pressed button
    pub fn drive(&self, pos: u8, level: Level) {
        self.driven.set(with_field(self.driven.get(), pos, 1, 1));
        self.external
            .set(with_field(self.external.get(), pos, 1, (level == Level::High) as u32));
    }

    /// Stops driving the pin; it falls back to its pull resistor
    pub fn release(&self, pos: u8) {
        self.driven.set(with_field(self.driven.get(), pos, 1, 0));
    }

    fn write_output(&self, pos: u8, high: bool) {
        let old = self.odr.get();
        let new = with_field(old, pos, 1, high as u32);
        if new != old {
            let edges = &self.edges[pos as usize];
            edges.set(edges.get() + 1);
        }
        self.odr.set(new);
    }
}

impl GpioRegExt for SimPort {
    fn is_low(&self, pos: u8) -> bool {
        if field(self.driven.get(), pos, 1) != 0 {
            return field(self.external.get(), pos, 1) == 0;
        }
        match (self.mode(pos), self.pull(pos)) {
            (PinMode::Output, _) => self.is_set_low(pos),
            (_, Pull::Up) => false,
            // floating and pulled down inputs read low
            _ => true,
        }
    }

    fn is_set_low(&self, pos: u8) -> bool {
        field(self.odr.get(), pos, 1) == 0
    }

    fn set_high(&self, pos: u8) {
        self.write_output(pos, true);
    }

    fn set_low(&self, pos: u8) {
        self.write_output(pos, false);
    }

    fn set_mode(&self, pos: u8, mode: PinMode) {
        self.moder.set(with_field(self.moder.get(), pos, 2, mode as u32));
    }

    fn set_pull(&self, pos: u8, pull: Pull) {
        self.pupdr.set(with_field(self.pupdr.get(), pos, 2, pull as u32));
    }

    fn set_output_type(&self, pos: u8, otype: OutputType) {
        self.otyper.set(with_field(self.otyper.get(), pos, 1, otype as u32));
    }
}

/// All simulated GPIO ports
#[derive(Default)]
pub struct SimGpio {
    ports: [SimPort; 4],
}

impl SimGpio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sim_port(&self, port: PortId) -> &SimPort {
        &self.ports[port.index()]
    }
}

impl GpioBank for SimGpio {
    fn port(&self, port: PortId) -> &dyn GpioRegExt {
        self.sim_port(port)
    }
}

/// Simulated countdown timer
///
/// Counts down by one per input clock cycle divided by the prescaler. A
/// one-shot counter halts at zero. Otherwise the counter sits at zero for one
/// step and then restarts from the reload value.
#[derive(Default)]
pub struct SimTimer {
    prescaler: Cell<Option<Prescaler>>,
    count: Cell<u32>,
    reload: Cell<u32>,
    running: Cell<bool>,
    one_shot: Cell<bool>,
    residue: Cell<u32>,
    loads: Cell<u32>,
    last_load: Cell<Option<u32>>,
    one_shot_starts: Cell<u32>,
}

impl SimTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prescaler selected by the last `configure`, `None` before that
    pub fn prescaler(&self) -> Option<Prescaler> {
        self.prescaler.get()
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot.get()
    }

    /// Number of times the count register was written
    pub fn loads(&self) -> u32 {
        self.loads.get()
    }

    /// Last value written to the count register
    pub fn last_load(&self) -> Option<u32> {
        self.last_load.get()
    }

    /// Number of one-shot starts
    pub fn one_shot_starts(&self) -> u32 {
        self.one_shot_starts.get()
    }

    /// Lets `cycles` input clock cycles pass
    pub fn advance(&self, cycles: u32) {
        if !self.running.get() {
            return;
        }

        let divisor = self.prescaler.get().unwrap_or(Prescaler::Div1).divisor() as u64;
        let total = self.residue.get() as u64 + cycles as u64;
        self.residue.set((total % divisor) as u32);
        let mut steps = total / divisor;

        let count = self.count.get() as u64;
        if self.one_shot.get() {
            if steps >= count {
                self.count.set(0);
                self.running.set(false);
            } else {
                self.count.set((count - steps) as u32);
            }
        } else if steps <= count {
            self.count.set((count - steps) as u32);
        } else {
            let reload = self.reload.get() as u64;
            steps -= count + 1;
            steps %= reload + 1;
            self.count.set((reload - steps) as u32);
        }
    }
}

impl TimerRegExt for SimTimer {
    fn configure(&self, prescaler: Prescaler) {
        self.running.set(false);
        self.prescaler.set(Some(prescaler));
        self.residue.set(0);
    }

    fn load(&self, count: u32, reload: u32) {
        self.count.set(count);
        self.reload.set(reload);
        self.loads.set(self.loads.get() + 1);
        self.last_load.set(Some(count));
    }

    fn start(&self, one_shot: bool) {
        self.one_shot.set(one_shot);
        self.residue.set(0);
        if one_shot {
            self.one_shot_starts.set(self.one_shot_starts.get() + 1);
            self.running.set(self.count.get() != 0);
        } else {
            self.running.set(true);
        }
    }

    fn stop(&self) {
        self.running.set(false);
    }

    fn value(&self) -> u32 {
        self.count.get()
    }

    fn is_running(&self) -> bool {
        self.running.get()
    }
}

/// Simulated watchdog, running until held
#[derive(Default)]
pub struct SimWatchdog {
    held: Cell<bool>,
    holds: Cell<u32>,
}

impl SimWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self) -> u32 {
        self.holds.get()
    }
}

impl WatchdogRegExt for SimWatchdog {
    fn hold(&self) {
        self.held.set(true);
        self.holds.set(self.holds.get() + 1);
    }

    fn is_held(&self) -> bool {
        self.held.get()
    }
}

/// Delay loop iteration that only counts itself
#[derive(Default)]
pub struct SpinCounter {
    spins: u64,
}

impl SpinCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spins(&self) -> u64 {
        self.spins
    }
}

impl Spin for SpinCounter {
    fn spin(&mut self) {
        self.spins += 1;
    }
}
