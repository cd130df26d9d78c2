//! # CPU private timer module
//!
//! 32-bit down counter of the Cortex-A9 core. The [PrivateTimer] driver covers both ways the demos
//! use the timer: free-running with the counter polled by software, or auto-reloading with the
//! expiry interrupt ([IrqId::PRIVATE_TIMER](crate::gic::IrqId::PRIVATE_TIMER)) enabled.
use zybo_pac::priv_tim::{Control, InterruptStatus, MmioRegisters, Registers};

use crate::{
    config::{DeviceId, DeviceTable, PrivateTimerConfig},
    init::{Device, DeviceKind, SetupError},
    time::{Hertz, Milliseconds},
};

/// Value written to the load register by the self-test.
pub const SELF_TEST_PATTERN: u32 = 0xA5A5_A5A5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("period is shorter than one timer tick")]
    ZeroTicks,
    #[error("period does not fit into the 32-bit counter")]
    TooManyTicks,
}

/// Load value for which the timer expires after `period`.
///
/// The counter decrements once every `prescaler + 1` cycles of `clock` and the interrupt fires
/// when it reaches zero, so the load value is one less than the number of ticks per period.
pub fn load_value_for_period(
    clock: Hertz,
    prescaler: u8,
    period: Milliseconds,
) -> Result<u32, PeriodError> {
    let ticks = (clock.raw() as u64 * period.to_millis() as u64) / 1000 / (prescaler as u64 + 1);
    if ticks == 0 {
        return Err(PeriodError::ZeroTicks);
    }
    u32::try_from(ticks - 1).map_err(|_| PeriodError::TooManyTicks)
}

/// Counter value at which a timer loaded with `u32::MAX` has run for `load_value + 1` ticks.
#[inline]
pub const fn polling_threshold(load_value: u32) -> u64 {
    (1 << 32) - load_value as u64
}

/// Register access required by the [PrivateTimer] driver.
pub trait TimerRegisters {
    /// Write the load register. This also updates the counter register.
    fn set_load(&mut self, value: u32);
    fn counter(&mut self) -> u32;
    fn control(&mut self) -> Control;
    fn set_control(&mut self, control: Control);
    fn event_flag(&mut self) -> bool;
    fn clear_event_flag(&mut self);
}

impl TimerRegisters for MmioRegisters<'_> {
    #[inline]
    fn set_load(&mut self, value: u32) {
        self.write_load(value);
    }

    #[inline]
    fn counter(&mut self) -> u32 {
        self.read_counter()
    }

    #[inline]
    fn control(&mut self) -> Control {
        self.read_control()
    }

    #[inline]
    fn set_control(&mut self, control: Control) {
        self.write_control(control);
    }

    #[inline]
    fn event_flag(&mut self) -> bool {
        self.read_interrupt_status().event_flag()
    }

    #[inline]
    fn clear_event_flag(&mut self) {
        self.write_interrupt_status(InterruptStatus::builder().with_event_flag(true).build());
    }
}

/// Create the MMIO block of the private timer for the given configuration.
///
/// # Safety
///
/// See [Registers::new_mmio_fixed].
#[inline]
pub const unsafe fn mmio_for(config: &PrivateTimerConfig) -> MmioRegisters<'static> {
    unsafe { Registers::new_mmio_at(config.base_addr) }
}

/// High-level CPU private timer driver.
pub struct PrivateTimer<R> {
    regs: R,
    config: &'static PrivateTimerConfig,
}

impl<R: TimerRegisters> PrivateTimer<R> {
    #[inline]
    pub fn config(&self) -> &'static PrivateTimerConfig {
        self.config
    }

    #[inline]
    pub fn clock(&self) -> Hertz {
        self.config.clock
    }

    /// Write load value which is also set by the hardware when the timer reaches zero and
    /// auto reload is enabled.
    #[inline]
    pub fn load(&mut self, value: u32) {
        self.regs.set_load(value);
    }

    #[inline]
    pub fn counter(&mut self) -> u32 {
        self.regs.counter()
    }

    #[inline]
    pub fn set_prescaler(&mut self, prescaler: u8) {
        self.modify_control(|mut ctrl| {
            ctrl.set_prescaler(prescaler);
            ctrl
        });
    }

    #[inline]
    pub fn enable_auto_reload(&mut self) {
        self.modify_control(|mut ctrl| {
            ctrl.set_auto_reload(true);
            ctrl
        });
    }

    #[inline]
    pub fn enable_interrupt(&mut self) {
        self.modify_control(|mut ctrl| {
            ctrl.set_interrupt_enable(true);
            ctrl
        });
    }

    #[inline]
    pub fn start(&mut self) {
        self.modify_control(|mut ctrl| {
            ctrl.set_enable(true);
            ctrl
        });
    }

    #[inline]
    pub fn stop(&mut self) {
        self.modify_control(|mut ctrl| {
            ctrl.set_enable(false);
            ctrl
        });
    }

    #[inline]
    pub fn is_started(&mut self) -> bool {
        self.regs.control().enable()
    }

    /// The counter reached zero since the event flag was last cleared.
    #[inline]
    pub fn is_expired(&mut self) -> bool {
        self.regs.event_flag()
    }

    /// Clear the event flag. The interrupt line stays asserted until this is done.
    #[inline]
    pub fn clear_interrupt(&mut self) {
        self.regs.clear_event_flag();
    }

    fn modify_control(&mut self, f: impl FnOnce(Control) -> Control) {
        let ctrl = self.regs.control();
        self.regs.set_control(f(ctrl));
    }
}

impl<R: TimerRegisters> Device for PrivateTimer<R> {
    type Config = PrivateTimerConfig;
    type Regs = R;

    const KIND: DeviceKind = DeviceKind::PrivateTimer;

    fn lookup(table: &DeviceTable, id: DeviceId) -> Option<&'static PrivateTimerConfig> {
        table.private_timer(id)
    }

    fn cfg_initialize(
        config: &'static PrivateTimerConfig,
        mut regs: R,
    ) -> Result<Self, SetupError> {
        // Put the timer into a known state: stopped, no interrupt, pending event cleared.
        regs.set_control(Control::new_with_raw_value(0));
        regs.clear_event_flag();
        Ok(Self { regs, config })
    }

    /// Stop the timer, write a pattern to the load register and read it back through the counter
    /// register. The counter is cleared afterwards.
    fn self_test(&mut self) -> Result<(), SetupError> {
        self.stop();
        self.regs.set_load(SELF_TEST_PATTERN);
        let counter = self.regs.counter();
        self.regs.set_load(0);
        if counter != SELF_TEST_PATTERN {
            log::warn!(
                "private timer self-test: read back {:#010x}, expected {:#010x}",
                counter,
                SELF_TEST_PATTERN
            );
            return Err(SetupError::SelfTestFailed(Self::KIND));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{PRIVATE_TIMER_0, ZYBO_Z7, ZYBO_Z7_PERIPH_CLOCK},
        init::{SelfTest, initialize},
        sim::SimTimer,
    };
    use fugit::ExtU32;

    #[test]
    fn one_second_load_value() {
        let load = load_value_for_period(ZYBO_Z7_PERIPH_CLOCK, 3, 1000.millis()).unwrap();
        assert_eq!(load, 83_374_999);
        assert_eq!(polling_threshold(load), 4_211_592_297);
    }

    #[test]
    fn period_errors() {
        assert_eq!(
            load_value_for_period(Hertz::from_raw(1000), 0, 0.millis()),
            Err(PeriodError::ZeroTicks)
        );
        assert_eq!(
            load_value_for_period(ZYBO_Z7_PERIPH_CLOCK, 0, 20_000.millis()),
            Err(PeriodError::TooManyTicks)
        );
        // 20 s fit with a prescaler of 3.
        assert!(load_value_for_period(ZYBO_Z7_PERIPH_CLOCK, 3, 20_000.millis()).is_ok());
    }

    #[test]
    fn init_with_self_test() {
        let sim = SimTimer::new();
        let mut timer: PrivateTimer<&SimTimer> =
            initialize(&ZYBO_Z7, PRIVATE_TIMER_0, SelfTest::Run, |_| Some(&sim)).unwrap();
        assert_eq!(timer.counter(), 0);
        assert!(!timer.is_started());
        timer.set_prescaler(3);
        timer.enable_auto_reload();
        timer.enable_interrupt();
        timer.start();
        let ctrl = sim.control_reg();
        assert_eq!(ctrl.prescaler(), 3);
        assert!(ctrl.auto_reload());
        assert!(ctrl.interrupt_enable());
        assert!(ctrl.enable());
    }

    #[test]
    fn broken_load_register_fails_self_test() {
        let sim = SimTimer::new();
        sim.break_load_register();
        let result: Result<PrivateTimer<&SimTimer>, _> =
            initialize(&ZYBO_Z7, PRIVATE_TIMER_0, SelfTest::Run, |_| Some(&sim));
        assert_eq!(
            result.err(),
            Some(SetupError::SelfTestFailed(DeviceKind::PrivateTimer))
        );
        // Skipping the self-test hides the fault.
        let result: Result<PrivateTimer<&SimTimer>, _> =
            initialize(&ZYBO_Z7, PRIVATE_TIMER_0, SelfTest::Skip, |_| Some(&sim));
        assert!(result.is_ok());
    }

    #[test]
    fn event_flag_is_write_one_to_clear() {
        let sim = SimTimer::new();
        let mut timer: PrivateTimer<&SimTimer> =
            initialize(&ZYBO_Z7, PRIVATE_TIMER_0, SelfTest::Skip, |_| Some(&sim)).unwrap();
        sim.expire();
        assert!(timer.is_expired());
        timer.clear_interrupt();
        assert!(!timer.is_expired());
    }
}
