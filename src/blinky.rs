//! The two blink loops
//!
//! Both loops copy the button onto LED1 and toggle LED2 periodically. They
//! differ only in what paces LED2: [`LoopBlinky`] burns a counted loop,
//! [`TimerBlinky`] polls a one-shot countdown timer. Neither uses interrupts
//! and neither ever returns.

use core::convert::Infallible;

use embedded_hal::digital::v2::{InputPin, OutputPin, ToggleableOutputPin};
use embedded_hal::timer::CountDown;

use crate::board::Board;
use crate::config::HALF_SEC_COUNT;
use crate::delay::{BusyWait, Spin};
use crate::timers::{OneShotTimer, Timer32, TimerConfig, TimerRegExt};

/// LED1 on while the button is pressed, off otherwise
///
/// Samples the button once, without debouncing.
pub fn mirror_button<L1, L2, B>(board: &mut Board<L1, L2, B>)
where
    L1: OutputPin,
    L2: OutputPin + ToggleableOutputPin,
    B: InputPin<Error = Infallible>,
{
    if board.button1_pressed() {
        board.turn_on_led1();
    } else {
        board.turn_off_led1();
    }
}

/// LED2 paced by a busy-wait
pub struct LoopBlinky<L1, L2, B, S> {
    board: Board<L1, L2, B>,
    delay: BusyWait<S>,
}

impl<L1, L2, B, S> LoopBlinky<L1, L2, B, S>
where
    L1: OutputPin,
    L2: OutputPin + ToggleableOutputPin,
    B: InputPin<Error = Infallible>,
    S: Spin,
{
    pub fn new(board: Board<L1, L2, B>, delay: BusyWait<S>) -> Self {
        LoopBlinky { board, delay }
    }

    /// One pass of the main loop
    pub fn step(&mut self) {
        mirror_button(&mut self.board);
        self.delay.delay();
        self.board.toggle_led2();
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    pub fn board(&self) -> &Board<L1, L2, B> {
        &self.board
    }

    pub fn delay(&self) -> &BusyWait<S> {
        &self.delay
    }
}

/// LED2 paced by a one-shot timer, toggled every `HALF_SEC_COUNT` ticks
pub struct TimerBlinky<L1, L2, B, TIM> {
    board: Board<L1, L2, B>,
    timer: OneShotTimer<TIM>,
    ticks: u32,
}

impl<L1, L2, B, TIM> TimerBlinky<L1, L2, B, TIM>
where
    L1: OutputPin,
    L2: OutputPin + ToggleableOutputPin,
    B: InputPin<Error = Infallible>,
    TIM: TimerRegExt,
{
    /// Configures `tim` for prescale 1, 32 bit, periodic mode, then loads
    /// `HALF_SEC_COUNT` and starts it in one-shot mode
    pub fn init(board: Board<L1, L2, B>, tim: TIM) -> Self {
        let mut timer = OneShotTimer::new(Timer32::init_module(tim, TimerConfig::default()));
        timer.start(HALF_SEC_COUNT);
        TimerBlinky {
            board,
            timer,
            ticks: 0,
        }
    }

    /// One pass of the main loop, returns whether LED2 was toggled
    pub fn step(&mut self) -> bool {
        mirror_button(&mut self.board);
        match self.timer.wait() {
            Ok(()) => {
                self.board.toggle_led2();
                self.ticks = self.ticks.wrapping_add(1);
                true
            }
            Err(_) => false,
        }
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Number of expiries seen so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn board(&self) -> &Board<L1, L2, B> {
        &self.board
    }

    pub fn timer(&self) -> &OneShotTimer<TIM> {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BUTTON1, LED1, LED2};
    use crate::gpio::Level;
    use crate::sim::{SimGpio, SimTimer, SimWatchdog, SpinCounter};
    use crate::time::Ticks;
    use crate::timers::{Mode, Prescaler, Width};
    use crate::watchdog::{Watchdog, WatchdogRegExt};
    use proptest::prelude::*;

    const PERIOD: u32 = 1_500_000;

    fn press(gpio: &SimGpio, pressed: bool) {
        let port = gpio.sim_port(BUTTON1.port);
        if pressed {
            port.drive(BUTTON1.pin, Level::Low);
        } else {
            port.release(BUTTON1.pin);
        }
    }

    fn led(gpio: &SimGpio, id: crate::gpio::PinId) -> Level {
        gpio.sim_port(id.port).output(id.pin)
    }

    fn led2_toggles(gpio: &SimGpio) -> u32 {
        gpio.sim_port(LED2.port).edges(LED2.pin)
    }

    #[test]
    fn led1_follows_button_for_five_polls_then_goes_off() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = LoopBlinky::new(board, BusyWait::with_iterations(10, SpinCounter::new()));

        press(&gpio, true);
        for _ in 0..5 {
            blinky.step();
            assert_eq!(led(&gpio, LED1), Level::High);
        }
        press(&gpio, false);
        for _ in 0..3 {
            blinky.step();
            assert_eq!(led(&gpio, LED1), Level::Low);
        }
    }

    #[test]
    fn busy_wait_toggles_once_per_delay_whatever_the_button() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = LoopBlinky::new(board, BusyWait::new(SpinCounter::new()));

        for i in 1..=6u32 {
            press(&gpio, i % 3 == 0);
            blinky.step();
            assert_eq!(blinky.board().button1_pressed(), i % 3 == 0);
            assert_eq!(blinky.delay().spinner().spins(), u64::from(i) * 120_000);
            assert_eq!(led2_toggles(&gpio), i);
        }
        assert_eq!(led(&gpio, LED2), Level::Low);
    }

    #[test]
    fn timer_blinky_starts_a_half_second_one_shot() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let blinky = TimerBlinky::init(board, &tim);

        assert!(wdg.is_held());
        assert_eq!(tim.last_load(), Some(PERIOD));
        assert!(tim.is_one_shot());
        assert!(tim.is_running());
        assert_eq!(blinky.timer().period(), Ticks(PERIOD));
    }

    #[test]
    fn led2_toggles_once_per_zero_crossing() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = TimerBlinky::init(board, &tim);

        for crossing in 1..=7u32 {
            // polls while counting do nothing
            tim.advance(PERIOD / 2);
            assert!(!blinky.step());
            assert!(!blinky.step());

            tim.advance(PERIOD - PERIOD / 2);
            assert!(blinky.step());
            assert!(!blinky.step());
            assert_eq!(led2_toggles(&gpio), crossing);
            assert_eq!(blinky.ticks(), crossing);
        }
    }

    #[test]
    fn every_observed_zero_reloads_the_full_period() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = TimerBlinky::init(board, &tim);

        for n in 1..=4u32 {
            tim.advance(PERIOD + 1_000);
            assert!(!tim.is_running());
            assert!(blinky.step());

            assert_eq!(tim.loads(), n + 1);
            assert_eq!(tim.last_load(), Some(PERIOD));
            assert_eq!(tim.one_shot_starts(), n + 1);
            assert!(tim.is_running());
        }
    }

    #[test]
    fn zero_seen_late_still_toggles_once() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = TimerBlinky::init(board, &tim);

        // three periods pass without a poll; the halted timer reports a single expiry
        tim.advance(3 * PERIOD);
        assert!(blinky.step());
        assert!(!blinky.step());
        assert_eq!(led2_toggles(&gpio), 1);
    }

    #[test]
    fn timer_blinky_mirrors_button_while_waiting() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();
        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = TimerBlinky::init(board, &tim);

        press(&gpio, true);
        blinky.step();
        assert_eq!(led(&gpio, LED1), Level::High);
        assert!(blinky.board().button1_pressed());
        press(&gpio, false);
        blinky.step();
        assert_eq!(led(&gpio, LED1), Level::Low);
        assert_eq!(led2_toggles(&gpio), 0);
    }

    #[test]
    fn init_overrides_a_previous_timer_configuration() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();
        let config = TimerConfig {
            prescaler: Prescaler::Div16,
            width: Width::Bits16,
            mode: Mode::FreeRunning,
        };
        Timer32::init_module(&tim, config);
        assert_eq!(tim.prescaler(), Some(Prescaler::Div16));

        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let mut blinky = TimerBlinky::init(board, &tim);

        assert_eq!(tim.prescaler(), Some(Prescaler::Div1));
        assert_eq!(tim.last_load(), Some(PERIOD));
        assert_eq!(blinky.timer().timer().config(), TimerConfig::default());

        tim.advance(PERIOD - 1);
        assert!(!blinky.step());
        tim.advance(1);
        assert!(blinky.step());
    }

    #[test]
    fn initializing_twice_changes_nothing() {
        let gpio = SimGpio::new();
        let wdg = SimWatchdog::new();
        let tim = SimTimer::new();

        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let first = TimerBlinky::init(board, &tim);
        let ports = [
            gpio.sim_port(LED1.port).config(),
            gpio.sim_port(BUTTON1.port).config(),
        ];
        let timer_state = (
            tim.prescaler(),
            tim.last_load(),
            tim.value(),
            tim.is_one_shot(),
            tim.is_running(),
        );
        assert_eq!(timer_state, (Some(Prescaler::Div1), Some(PERIOD), PERIOD, true, true));

        let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
        let second = TimerBlinky::init(board, &tim);

        assert_eq!(gpio.sim_port(LED1.port).config(), ports[0]);
        assert_eq!(gpio.sim_port(BUTTON1.port).config(), ports[1]);
        assert_eq!(
            (
                tim.prescaler(),
                tim.last_load(),
                tim.value(),
                tim.is_one_shot(),
                tim.is_running(),
            ),
            timer_state
        );
        assert_eq!(second.timer().timer().config(), first.timer().timer().config());
        assert_eq!(second.timer().period(), Ticks(PERIOD));
        assert_eq!(tim.loads(), 2);
        assert_eq!(tim.one_shot_starts(), 2);
        assert_eq!(wdg.holds(), 2);
        assert!(wdg.is_held());
    }

    proptest! {
        #[test]
        fn led1_is_on_exactly_when_pressed(presses in proptest::collection::vec(any::<bool>(), 0..64)) {
            let gpio = SimGpio::new();
            let wdg = SimWatchdog::new();
            let tim = SimTimer::new();
            let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
            let mut blinky = TimerBlinky::init(board, &tim);

            for pressed in presses {
                press(&gpio, pressed);
                tim.advance(PERIOD / 3);
                blinky.step();
                prop_assert_eq!(led(&gpio, LED1), Level::from(pressed));
            }
        }

        #[test]
        fn loop_blinky_led1_is_on_exactly_when_pressed(presses in proptest::collection::vec(any::<bool>(), 0..64)) {
            let gpio = SimGpio::new();
            let wdg = SimWatchdog::new();
            let board = Board::init(&gpio, &mut Watchdog::new(&wdg));
            let mut blinky = LoopBlinky::new(board, BusyWait::with_iterations(3, SpinCounter::new()));

            for (i, pressed) in presses.iter().enumerate() {
                press(&gpio, *pressed);
                blinky.step();
                prop_assert_eq!(led(&gpio, LED1), Level::from(*pressed));
                prop_assert_eq!(led2_toggles(&gpio) as usize, i + 1);
            }
        }
    }
}
