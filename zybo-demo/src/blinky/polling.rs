//! Polling blinky.
//!
//! No interrupts are involved. The counter is reloaded with its maximum value at the start of
//! each blink cycle and the main loop reads it until one period worth of ticks has elapsed.
use log::{debug, info};
use zybo_hal::{
    SetupError,
    axi_gpio::{GpioOutput, GpioRegisters},
    board::Board,
    config::DeviceTable,
    init::SelfTest,
    priv_tim::{PrivateTimer, TimerRegisters, polling_threshold},
};

use super::{BlinkConfig, LedPattern, init_leds, init_timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Counter is above the threshold.
    Waiting,
    /// Threshold was crossed, LEDs are toggled on the next step.
    Toggling,
}

pub struct PollingBlinker<T, G> {
    timer: PrivateTimer<T>,
    leds: GpioOutput<G>,
    pattern: LedPattern,
    threshold: u64,
    state: PollState,
    toggles: u32,
}

impl<T: TimerRegisters, G: GpioRegisters> PollingBlinker<T, G> {
    /// Initialize the LED port and the timer and start the first blink cycle.
    pub fn init<B>(
        board: &mut B,
        table: &DeviceTable,
        config: &BlinkConfig,
    ) -> Result<Self, SetupError>
    where
        B: Board<Timer = T, Gpio = G>,
    {
        let leds = init_leds(board, table, config)?;
        let (mut timer, load) = init_timer(board, table, config, SelfTest::Skip)?;
        timer.enable_auto_reload();
        let threshold = polling_threshold(load);
        debug!("polling threshold {threshold} for load value {load}");
        let mut blinker = Self {
            timer,
            leds,
            pattern: config.initial_pattern,
            threshold,
            state: PollState::Waiting,
            toggles: 0,
        };
        blinker.timer.start();
        blinker.restart();
        info!("private timer polling started");
        Ok(blinker)
    }

    #[inline]
    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    #[inline]
    pub fn state(&self) -> PollState {
        self.state
    }

    #[inline]
    pub fn pattern(&self) -> LedPattern {
        self.pattern
    }

    /// Number of LED toggles so far.
    #[inline]
    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    /// Reload the counter with its maximum value.
    fn restart(&mut self) {
        self.timer.load(u32::MAX);
        self.state = PollState::Waiting;
    }

    /// Perform one iteration of the main loop. Returns the new pattern when the LEDs were
    /// toggled.
    pub fn step(&mut self) -> Option<LedPattern> {
        match self.state {
            PollState::Waiting => {
                if (self.timer.counter() as u64) < self.threshold {
                    self.state = PollState::Toggling;
                }
                None
            }
            PollState::Toggling => {
                self.pattern.toggle();
                self.leds.set(self.pattern.raw());
                self.toggles = self.toggles.wrapping_add(1);
                self.restart();
                Some(self.pattern)
            }
        }
    }

    pub fn run(mut self) -> ! {
        loop {
            self.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zybo_hal::{
        DeviceKind,
        axi_gpio::GpioChannel,
        config::{DeviceId, ZYBO_Z7},
        sim::SimPeripherals,
    };

    use crate::blinky::INITIAL_PATTERN;

    #[test]
    fn initial_state() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let blinker =
            PollingBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        assert_eq!(blinker.threshold(), 4_211_592_297);
        assert_eq!(blinker.state(), PollState::Waiting);
        assert_eq!(sim.timer.counter_reg(), u32::MAX);
        let ctrl = sim.timer.control_reg();
        assert!(ctrl.enable());
        assert!(!ctrl.interrupt_enable());
        assert_eq!(ctrl.prescaler(), 3);
        assert_eq!(sim.gpio.output(GpioChannel::Ch1), INITIAL_PATTERN.raw());
        // No interrupt controller involvement.
        assert!(!sim.gic.distributor_enabled());
    }

    #[test]
    fn one_toggle_per_threshold_crossing() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let mut blinker =
            PollingBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        // Counter values read: 0xFFFF_FFFF - n * 20_000_000. The sixth read is below the
        // threshold.
        sim.timer.set_ticks_per_read(20_000_000);
        for _ in 0..5 {
            assert_eq!(blinker.step(), None);
            assert_eq!(blinker.state(), PollState::Waiting);
        }
        assert_eq!(blinker.step(), None);
        assert_eq!(blinker.state(), PollState::Toggling);
        assert_eq!(blinker.step(), Some(INITIAL_PATTERN.toggled()));
        assert_eq!(blinker.state(), PollState::Waiting);
        assert_eq!(sim.gpio.output(GpioChannel::Ch1), 0xFFFF_FFF6);
        assert_eq!(sim.timer.counter_reg(), u32::MAX);

        let mut toggles = 0;
        for _ in 0..70 {
            if blinker.step().is_some() {
                toggles += 1;
            }
        }
        // Seven steps per blink cycle.
        assert_eq!(toggles, 10);
        assert_eq!(blinker.toggles(), 11);
        assert_eq!(sim.gpio.output(GpioChannel::Ch1), 0xFFFF_FFF6);
    }

    #[test]
    fn stopped_counter_never_toggles() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let mut blinker =
            PollingBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        for _ in 0..100 {
            assert_eq!(blinker.step(), None);
        }
        assert_eq!(sim.timer.counter_reads(), 100);
        assert_eq!(blinker.toggles(), 0);
    }

    #[test]
    fn unknown_gpio_is_reported() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let config = BlinkConfig {
            gpio_id: DeviceId(4),
            ..Default::default()
        };
        assert_eq!(
            PollingBlinker::init(&mut board, &ZYBO_Z7, &config).err(),
            Some(SetupError::ConfigNotFound {
                kind: DeviceKind::Gpio,
                id: DeviceId(4)
            })
        );
    }

    #[test]
    fn period_too_long_for_counter() {
        use fugit::ExtU32;

        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let config = BlinkConfig {
            period: 60_000.millis(),
            prescaler: 0,
            ..Default::default()
        };
        assert_eq!(
            PollingBlinker::init(&mut board, &ZYBO_Z7, &config).err(),
            Some(SetupError::InitializationFailed(DeviceKind::PrivateTimer))
        );
    }
}
