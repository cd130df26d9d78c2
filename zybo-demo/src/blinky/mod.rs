//! # Private timer blinky
//!
//! Both variants blink the user LEDs with the same period. The polling variant waits for the
//! counter in the main loop, the interrupt variant toggles from the timer interrupt handler.
use fugit::ExtU32;
use zybo_hal::{
    DeviceKind, SetupError,
    axi_gpio::{AxiGpio, GpioChannel, GpioOutput},
    board::Board,
    config::{self, DeviceId, DeviceTable},
    init::{SelfTest, initialize},
    priv_tim::{PrivateTimer, load_value_for_period},
    time::Milliseconds,
};

pub mod interrupt;
pub mod polling;

/// LEDs `X00X`.
pub const INITIAL_PATTERN: LedPattern = LedPattern(0x9);

/// Bit mask written to the LED channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPattern(pub u32);

impl LedPattern {
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn toggled(&self) -> Self {
        Self(!self.0)
    }

    #[inline]
    pub fn toggle(&mut self) {
        *self = self.toggled();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlinkConfig {
    pub timer_id: DeviceId,
    pub gpio_id: DeviceId,
    pub gic_id: DeviceId,
    pub period: Milliseconds,
    pub prescaler: u8,
    pub initial_pattern: LedPattern,
    pub led_channel: GpioChannel,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            timer_id: config::PRIVATE_TIMER_0,
            gpio_id: config::LED_GPIO_0,
            gic_id: config::GIC_0,
            period: 1000.millis(),
            prescaler: 3,
            initial_pattern: INITIAL_PATTERN,
            led_channel: GpioChannel::Ch1,
        }
    }
}

/// Initialize the LED port: all pins of the channel are outputs showing the initial pattern.
pub(crate) fn init_leds<B: Board>(
    board: &mut B,
    table: &DeviceTable,
    config: &BlinkConfig,
) -> Result<GpioOutput<B::Gpio>, SetupError> {
    let gpio: AxiGpio<B::Gpio> =
        initialize(table, config.gpio_id, SelfTest::Skip, |cfg| board.axi_gpio(cfg))?;
    gpio.into_output(config.led_channel, config.initial_pattern.raw())
        .map_err(|e| {
            log::warn!("LED port setup failed: {e}");
            SetupError::InitializationFailed(DeviceKind::Gpio)
        })
}

/// Initialize the timer and compute the load value for one blink period.
pub(crate) fn init_timer<B: Board>(
    board: &mut B,
    table: &DeviceTable,
    config: &BlinkConfig,
    self_test: SelfTest,
) -> Result<(PrivateTimer<B::Timer>, u32), SetupError> {
    let mut timer: PrivateTimer<B::Timer> =
        initialize(table, config.timer_id, self_test, |cfg| board.private_timer(cfg))?;
    let load = load_value_for_period(timer.clock(), config.prescaler, config.period).map_err(
        |e| {
            log::warn!("blink period of {} ms: {e}", config.period.to_millis());
            SetupError::InitializationFailed(DeviceKind::PrivateTimer)
        },
    )?;
    timer.set_prescaler(config.prescaler);
    Ok((timer, load))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zybo_hal::{config::ZYBO_Z7, sim::SimPeripherals};

    #[test]
    fn toggle_complements_all_bits() {
        let mut pattern = INITIAL_PATTERN;
        pattern.toggle();
        assert_eq!(pattern, LedPattern(0xFFFF_FFF6));
        pattern.toggle();
        assert_eq!(pattern, INITIAL_PATTERN);
    }

    #[test]
    fn default_config() {
        let cfg = BlinkConfig::default();
        assert_eq!(cfg.period.to_millis(), 1000);
        assert_eq!(cfg.prescaler, 3);
        assert_eq!(cfg.initial_pattern.raw(), 0x9);
        assert_eq!(cfg.led_channel, GpioChannel::Ch1);
    }

    #[test]
    fn led_port_on_missing_channel_is_rejected() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let config = BlinkConfig {
            led_channel: GpioChannel::Ch2,
            ..Default::default()
        };
        assert_eq!(
            init_leds(&mut board, &ZYBO_Z7, &config).err(),
            Some(SetupError::InitializationFailed(DeviceKind::Gpio))
        );
        assert_eq!(sim.gpio.writes(), 0);
        assert_eq!(sim.gpio.tri_state(GpioChannel::Ch2), 0xFFFF_FFFF);
    }

    #[test]
    fn led_port_shows_initial_pattern() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let mut leds = init_leds(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        assert_eq!(leds.get(), INITIAL_PATTERN.raw());
        leds.set(INITIAL_PATTERN.toggled().raw());
        assert_eq!(sim.gpio.output(GpioChannel::Ch1), 0xFFFF_FFF6);
        assert_eq!(sim.gpio.writes(), 2);
    }
}
