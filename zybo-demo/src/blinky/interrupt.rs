//! Interrupt driven blinky.
//!
//! The timer runs in auto-reload mode and raises its interrupt once per period. The handler
//! clears the timer event and writes the complemented LED pattern. The main loop has nothing to
//! do.
use core::cell::RefCell;

use critical_section::Mutex;
use log::{debug, info};
use zybo_hal::{
    SetupError,
    axi_gpio::{GpioOutput, GpioRegisters},
    board::Board,
    config::{DeviceId, DeviceTable},
    gic::IrqId,
    init::SelfTest,
    irq::{InterruptBridge, InterruptSource, Processor, setup_interrupt_system},
    priv_tim::{PrivateTimer, TimerRegisters},
};

use super::{BlinkConfig, LedPattern, init_leds, init_timer};

struct BlinkState<T, G> {
    timer: PrivateTimer<T>,
    leds: GpioOutput<G>,
    pattern: LedPattern,
    ticks: u32,
}

/// Timer interrupt source toggling the LEDs.
pub struct TimerBlinker<T, G> {
    state: Mutex<RefCell<BlinkState<T, G>>>,
    irq: IrqId,
    gic_id: DeviceId,
}

impl<T: TimerRegisters + Send, G: GpioRegisters + Send> TimerBlinker<T, G> {
    /// Initialize and self-test the timer, initialize the LED port and program the period. The
    /// timer is not started yet.
    pub fn init<B>(
        board: &mut B,
        table: &DeviceTable,
        config: &BlinkConfig,
    ) -> Result<Self, SetupError>
    where
        B: Board<Timer = T, Gpio = G>,
    {
        let leds = init_leds(board, table, config)?;
        let (mut timer, load) = init_timer(board, table, config, SelfTest::Run)?;
        timer.enable_auto_reload();
        timer.load(load);
        debug!("private timer load value {load}, prescaler {}", config.prescaler);
        Ok(Self {
            irq: timer.config().irq,
            state: Mutex::new(RefCell::new(BlinkState {
                timer,
                leds,
                pattern: config.initial_pattern,
                ticks: 0,
            })),
            gic_id: config.gic_id,
        })
    }

    /// Bind the blinker to the timer interrupt and start the timer.
    pub fn arm<'a, B, P>(
        &'a self,
        board: &mut B,
        table: &DeviceTable,
        cpu: &mut P,
    ) -> Result<(), SetupError>
    where
        B: Board,
        P: Processor<InterruptBridge<'a, B::Gic>>,
    {
        setup_interrupt_system(
            table,
            self.gic_id,
            |cfg| board.gic(cfg),
            &[(self.irq, self as &dyn InterruptSource)],
            cpu,
        )?;
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.timer.enable_interrupt();
            state.timer.start();
        });
        info!("private timer interrupt configured");
        Ok(())
    }

    #[inline]
    pub fn irq(&self) -> IrqId {
        self.irq
    }

    pub fn pattern(&self) -> LedPattern {
        critical_section::with(|cs| self.state.borrow_ref(cs).pattern)
    }

    /// Number of handled timer interrupts.
    pub fn ticks(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).ticks)
    }
}

impl<T: TimerRegisters + Send, G: GpioRegisters + Send> InterruptSource for TimerBlinker<T, G> {
    fn handle(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let state = &mut *state;
            state.timer.clear_interrupt();
            state.pattern.toggle();
            state.ticks = state.ticks.wrapping_add(1);
            state.leds.set(state.pattern.raw());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zybo_hal::{
        DeviceKind,
        axi_gpio::GpioChannel,
        config::ZYBO_Z7,
        irq::IrqHandler,
        sim::{SimCpu, SimPeripherals},
    };

    use crate::blinky::INITIAL_PATTERN;

    fn fire_timer(sim: &SimPeripherals, cpu: &mut SimCpu<impl IrqHandler>) {
        sim.timer.expire();
        sim.gic.raise(IrqId::PRIVATE_TIMER.raw());
        assert!(cpu.fire());
    }

    #[test]
    fn setup_programs_timer_and_leds() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let blinker = TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        assert_eq!(sim.gpio.tri_state(GpioChannel::Ch1), 0);
        assert_eq!(sim.gpio.output(GpioChannel::Ch1), 0x9);
        assert_eq!(sim.timer.load_reg(), 83_374_999);
        assert!(!sim.timer.control_reg().enable());

        let mut cpu = SimCpu::new();
        blinker.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        let ctrl = sim.timer.control_reg();
        assert!(ctrl.enable());
        assert!(ctrl.auto_reload());
        assert!(ctrl.interrupt_enable());
        assert_eq!(ctrl.prescaler(), 3);
        assert!(sim.gic.is_enabled(IrqId::PRIVATE_TIMER));
        assert!(cpu.irq_enabled());
    }

    #[test]
    fn pattern_parity_after_ticks() {
        for ticks in 0..7u32 {
            let sim = SimPeripherals::new();
            let mut board = sim.board();
            let blinker =
                TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
            let mut cpu = SimCpu::new();
            blinker.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
            for _ in 0..ticks {
                fire_timer(&sim, &mut cpu);
            }
            let expected = if ticks % 2 == 1 {
                INITIAL_PATTERN.raw() ^ 0xFFFF_FFFF
            } else {
                INITIAL_PATTERN.raw()
            };
            assert_eq!(sim.gpio.output(GpioChannel::Ch1), expected);
            assert_eq!(blinker.pattern().raw(), expected);
            assert_eq!(blinker.ticks(), ticks);
            assert_eq!(sim.gic.eoi_count(), ticks);
        }
    }

    #[test]
    fn handler_clears_timer_event() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let blinker = TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        let mut cpu = SimCpu::new();
        blinker.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        fire_timer(&sim, &mut cpu);
        assert!(!sim.timer.event_pending());
    }

    #[test]
    fn unknown_timer_enables_nothing() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let config = BlinkConfig {
            timer_id: DeviceId(9),
            ..Default::default()
        };
        let result = TimerBlinker::init(&mut board, &ZYBO_Z7, &config);
        assert_eq!(
            result.err(),
            Some(SetupError::ConfigNotFound {
                kind: DeviceKind::PrivateTimer,
                id: DeviceId(9)
            })
        );
        assert!(!sim.timer.control_reg().enable());
        assert!(!sim.gic.distributor_enabled());
    }

    #[test]
    fn timer_self_test_failure_aborts_setup() {
        let sim = SimPeripherals::new();
        sim.timer.break_load_register();
        let mut board = sim.board();
        let result = TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default());
        assert_eq!(
            result.err(),
            Some(SetupError::SelfTestFailed(DeviceKind::PrivateTimer))
        );
    }

    #[test]
    fn unknown_interrupt_controller_leaves_timer_stopped() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let config = BlinkConfig {
            gic_id: DeviceId(2),
            ..Default::default()
        };
        let blinker = TimerBlinker::init(&mut board, &ZYBO_Z7, &config).unwrap();
        let mut cpu = SimCpu::new();
        assert_eq!(
            blinker.arm(&mut board, &ZYBO_Z7, &mut cpu),
            Err(SetupError::ConfigNotFound {
                kind: DeviceKind::InterruptController,
                id: DeviceId(2)
            })
        );
        assert!(!sim.timer.control_reg().enable());
        assert!(!cpu.irq_enabled());
    }

    #[test]
    fn second_blinker_on_same_board_is_rejected() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let blinker = TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()).unwrap();
        let second = TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default());
        assert_eq!(second.err(), Some(SetupError::InUse(DeviceKind::Gpio)));
        // The first blinker still owns its port.
        let mut cpu = SimCpu::new();
        blinker.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        fire_timer(&sim, &mut cpu);
        assert_eq!(sim.gpio.output(GpioChannel::Ch1), 0xFFFF_FFF6);
    }
}
