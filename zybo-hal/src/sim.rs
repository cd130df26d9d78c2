//! # Simulated register blocks
//!
//! Register-level models of the four peripherals for host tests. All state is kept in atomics so
//! a shared reference can act as the register-access object of a driver while the test keeps
//! another reference to inspect the hardware state or to inject events. The register-access
//! traits are therefore implemented for `&SimTimer`, `&SimGpio`, `&SimXAdc` and `&SimGic`.
//!
//! The models only cover the behaviour the drivers rely on:
//!
//! - [SimTimer]: writing the load register also sets the counter. While enabled, every counter
//!   read advances time by a configurable number of ticks. Reaching zero sets the event flag and
//!   reloads the counter when auto reload is enabled.
//! - [SimXAdc]: the interrupt status register is write-1-to-clear, a software reset clears all
//!   registers.
//! - [SimGic]: a single pending interrupt slot. Reading the acknowledge register returns the
//!   pending ID or the spurious ID 1023.
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use zybo_pac::{
    gic::{
        DistributorControl, InterfaceControl, InterruptSignalRegister, PriorityRegister,
        TypeRegister,
    },
    priv_tim::Control,
    xadc::{DrpRegister, InterruptBits},
};

use crate::{
    axi_gpio::{GpioChannel, GpioRegisters},
    board::{Board, Claims},
    config::{AxiGpioConfig, GicConfig, PrivateTimerConfig, XAdcConfig},
    gic::{GicRegisters, IrqId, SPURIOUS_INTERRUPT_ID, signal_for},
    irq::{IrqHandler, Processor},
    priv_tim::TimerRegisters,
    xadc::{Channel, XAdcRegisters},
};

/// Type register value of the Cortex-A9 MPCore of the Zynq7000: 2 CPUs, 96 interrupt lines.
pub const MPCORE_TYPE_REGISTER: u32 = 0x0000_FC22;

pub struct SimTimer {
    load: AtomicU32,
    counter: AtomicU32,
    control: AtomicU32,
    event: AtomicBool,
    step: AtomicU32,
    counter_reads: AtomicU32,
    load_broken: AtomicBool,
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl SimTimer {
    pub const fn new() -> Self {
        Self {
            load: AtomicU32::new(0),
            counter: AtomicU32::new(0),
            control: AtomicU32::new(0),
            event: AtomicBool::new(false),
            step: AtomicU32::new(0),
            counter_reads: AtomicU32::new(0),
            load_broken: AtomicBool::new(false),
        }
    }

    /// Ticks which elapse between two counter reads of a running timer.
    pub fn set_ticks_per_read(&self, ticks: u32) {
        self.step.store(ticks, Ordering::Relaxed);
    }

    /// Disconnect the load register from the counter.
    pub fn break_load_register(&self) {
        self.load_broken.store(true, Ordering::Relaxed);
    }

    /// Let the counter reach zero.
    pub fn expire(&self) {
        self.event.store(true, Ordering::Relaxed);
        self.counter.store(self.reload_value(), Ordering::Relaxed);
    }

    pub fn control_reg(&self) -> Control {
        Control::new_with_raw_value(self.control.load(Ordering::Relaxed))
    }

    pub fn load_reg(&self) -> u32 {
        self.load.load(Ordering::Relaxed)
    }

    pub fn counter_reg(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn event_pending(&self) -> bool {
        self.event.load(Ordering::Relaxed)
    }

    pub fn counter_reads(&self) -> u32 {
        self.counter_reads.load(Ordering::Relaxed)
    }

    fn reload_value(&self) -> u32 {
        if self.control_reg().auto_reload() {
            self.load.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    fn advance(&self) {
        let step = self.step.load(Ordering::Relaxed);
        if !self.control_reg().enable() || step == 0 {
            return;
        }
        let counter = self.counter.load(Ordering::Relaxed);
        match counter.checked_sub(step) {
            Some(next) if next > 0 => self.counter.store(next, Ordering::Relaxed),
            _ => self.expire(),
        }
    }
}

impl TimerRegisters for &SimTimer {
    fn set_load(&mut self, value: u32) {
        self.load.store(value, Ordering::Relaxed);
        if !self.load_broken.load(Ordering::Relaxed) {
            self.counter.store(value, Ordering::Relaxed);
        }
    }

    fn counter(&mut self) -> u32 {
        self.counter_reads.fetch_add(1, Ordering::Relaxed);
        let value = self.counter.load(Ordering::Relaxed);
        self.advance();
        value
    }

    fn control(&mut self) -> Control {
        self.control_reg()
    }

    fn set_control(&mut self, control: Control) {
        self.control.store(control.raw_value(), Ordering::Relaxed);
    }

    fn event_flag(&mut self) -> bool {
        self.event_pending()
    }

    fn clear_event_flag(&mut self) {
        self.event.store(false, Ordering::Relaxed);
    }
}

pub struct SimGpio {
    data: [AtomicU32; 2],
    tri: [AtomicU32; 2],
    writes: AtomicU32,
}

impl Default for SimGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl SimGpio {
    /// All pins are inputs after reset.
    pub const fn new() -> Self {
        Self {
            data: [AtomicU32::new(0), AtomicU32::new(0)],
            tri: [AtomicU32::new(0xFFFF_FFFF), AtomicU32::new(0xFFFF_FFFF)],
            writes: AtomicU32::new(0),
        }
    }

    pub fn output(&self, channel: GpioChannel) -> u32 {
        self.data[Self::idx(channel)].load(Ordering::Relaxed)
    }

    pub fn tri_state(&self, channel: GpioChannel) -> u32 {
        self.tri[Self::idx(channel)].load(Ordering::Relaxed)
    }

    /// Number of data register writes.
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    const fn idx(channel: GpioChannel) -> usize {
        match channel {
            GpioChannel::Ch1 => 0,
            GpioChannel::Ch2 => 1,
        }
    }
}

impl GpioRegisters for &SimGpio {
    fn data(&mut self, channel: GpioChannel) -> u32 {
        self.output(channel)
    }

    fn set_data(&mut self, channel: GpioChannel, value: u32) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data[SimGpio::idx(channel)].store(value, Ordering::Relaxed);
    }

    fn direction(&mut self, channel: GpioChannel) -> u32 {
        self.tri_state(channel)
    }

    fn set_direction(&mut self, channel: GpioChannel, value: u32) {
        self.tri[SimGpio::idx(channel)].store(value, Ordering::Relaxed);
    }
}

pub struct SimXAdc {
    gier: AtomicBool,
    ipisr: AtomicU32,
    ipier: AtomicU32,
    drp: [AtomicU16; 0x80],
    drp_broken: AtomicBool,
    resets: AtomicU32,
    status_clears: AtomicU32,
}

impl Default for SimXAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimXAdc {
    pub const fn new() -> Self {
        Self {
            gier: AtomicBool::new(false),
            ipisr: AtomicU32::new(0),
            ipier: AtomicU32::new(0),
            drp: [const { AtomicU16::new(0) }; 0x80],
            drp_broken: AtomicBool::new(false),
            resets: AtomicU32::new(0),
            status_clears: AtomicU32::new(0),
        }
    }

    /// Latch interrupt status bits, as the hardware does on the corresponding events.
    pub fn raise(&self, bits: u32) {
        self.ipisr.fetch_or(bits & InterruptBits::ALL_MASK, Ordering::Relaxed);
    }

    pub fn status(&self) -> u32 {
        self.ipisr.load(Ordering::Relaxed)
    }

    /// Number of writes to the interrupt status register.
    pub fn status_clears(&self) -> u32 {
        self.status_clears.load(Ordering::Relaxed)
    }

    pub fn enabled_interrupts(&self) -> u32 {
        self.ipier.load(Ordering::Relaxed)
    }

    pub fn global_interrupt_enabled(&self) -> bool {
        self.gier.load(Ordering::Relaxed)
    }

    /// Store a conversion result in the data register of `channel`.
    pub fn set_sample(&self, channel: Channel, raw: u16) {
        self.drp[channel.data_register().index()].store(raw, Ordering::Relaxed);
    }

    pub fn drp(&self, reg: DrpRegister) -> u16 {
        self.drp[reg.index()].load(Ordering::Relaxed)
    }

    /// DRP writes get lost and reads return zero.
    pub fn break_drp(&self) {
        self.drp_broken.store(true, Ordering::Relaxed);
    }

    pub fn resets(&self) -> u32 {
        self.resets.load(Ordering::Relaxed)
    }
}

impl XAdcRegisters for &SimXAdc {
    fn software_reset(&mut self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        self.gier.store(false, Ordering::Relaxed);
        self.ipisr.store(0, Ordering::Relaxed);
        self.ipier.store(0, Ordering::Relaxed);
        for reg in &self.drp {
            reg.store(0, Ordering::Relaxed);
        }
    }

    fn global_interrupt_enable(&mut self) -> bool {
        self.global_interrupt_enabled()
    }

    fn set_global_interrupt_enable(&mut self, enable: bool) {
        self.gier.store(enable, Ordering::Relaxed);
    }

    fn interrupt_status(&mut self) -> InterruptBits {
        InterruptBits::new_with_raw_value(self.status())
    }

    fn clear_interrupt_status(&mut self, bits: InterruptBits) {
        self.status_clears.fetch_add(1, Ordering::Relaxed);
        self.ipisr.fetch_and(!bits.raw_value(), Ordering::Relaxed);
    }

    fn interrupt_enable(&mut self) -> InterruptBits {
        InterruptBits::new_with_raw_value(self.enabled_interrupts())
    }

    fn set_interrupt_enable(&mut self, bits: InterruptBits) {
        self.ipier.store(bits.raw_value(), Ordering::Relaxed);
    }

    fn read_drp(&mut self, reg: DrpRegister) -> u16 {
        if self.drp_broken.load(Ordering::Relaxed) {
            return 0;
        }
        self.drp(reg)
    }

    fn write_drp(&mut self, reg: DrpRegister, value: u16) {
        if self.drp_broken.load(Ordering::Relaxed) {
            return;
        }
        self.drp[reg.index()].store(value, Ordering::Relaxed);
    }
}

pub struct SimGic {
    type_reg: u32,
    dcr: AtomicU32,
    icr: AtomicU32,
    pmr: AtomicU32,
    icfr: [AtomicU32; 4],
    ipr: AtomicU32,
    iptr: AtomicU32,
    enabled: [AtomicU32; 3],
    pending: AtomicU16,
    eoi_count: AtomicU32,
    last_eoi: AtomicU16,
}

impl Default for SimGic {
    fn default() -> Self {
        Self::new()
    }
}

impl SimGic {
    pub const fn new() -> Self {
        Self::with_type_register(MPCORE_TYPE_REGISTER)
    }

    /// Controller whose distributor does not report the expected layout.
    pub const fn not_ready() -> Self {
        Self::with_type_register(0)
    }

    const fn with_type_register(type_reg: u32) -> Self {
        Self {
            type_reg,
            dcr: AtomicU32::new(0),
            icr: AtomicU32::new(0),
            pmr: AtomicU32::new(0),
            icfr: [const { AtomicU32::new(0) }; 4],
            ipr: AtomicU32::new(0),
            iptr: AtomicU32::new(0),
            enabled: [const { AtomicU32::new(0) }; 3],
            pending: AtomicU16::new(SPURIOUS_INTERRUPT_ID),
            eoi_count: AtomicU32::new(0),
            last_eoi: AtomicU16::new(SPURIOUS_INTERRUPT_ID),
        }
    }

    /// Make `raw_id` the highest pending interrupt.
    pub fn raise(&self, raw_id: u16) {
        self.pending.store(raw_id, Ordering::Relaxed);
    }

    pub fn is_enabled(&self, id: IrqId) -> bool {
        let raw = id.raw() as usize;
        self.enabled[raw / 32].load(Ordering::Relaxed) & (1 << (raw % 32)) != 0
    }

    pub fn distributor_enabled(&self) -> bool {
        DistributorControl::new_with_raw_value(self.dcr.load(Ordering::Relaxed)).enable_secure()
    }

    pub fn cpu_interface_enabled(&self) -> bool {
        InterfaceControl::new_with_raw_value(self.icr.load(Ordering::Relaxed)).enable_secure()
    }

    pub fn priority_mask(&self) -> u8 {
        PriorityRegister::new_with_raw_value(self.pmr.load(Ordering::Relaxed)).priority()
    }

    pub fn spi_config(&self) -> [u32; 4] {
        core::array::from_fn(|idx| self.icfr[idx].load(Ordering::Relaxed))
    }

    pub fn spi_targets(&self) -> u32 {
        self.iptr.load(Ordering::Relaxed)
    }

    pub fn eoi_count(&self) -> u32 {
        self.eoi_count.load(Ordering::Relaxed)
    }

    pub fn last_eoi(&self) -> Option<u16> {
        if self.eoi_count() == 0 {
            return None;
        }
        Some(self.last_eoi.load(Ordering::Relaxed))
    }
}

impl GicRegisters for &SimGic {
    fn distributor_type(&mut self) -> TypeRegister {
        TypeRegister::new_with_raw_value(self.type_reg)
    }

    fn set_distributor_control(&mut self, dcr: DistributorControl) {
        self.dcr.store(dcr.raw_value(), Ordering::Relaxed);
    }

    fn set_interface_control(&mut self, icr: InterfaceControl) {
        self.icr.store(icr.raw_value(), Ordering::Relaxed);
    }

    fn set_priority_mask(&mut self, pmr: PriorityRegister) {
        self.pmr.store(pmr.raw_value(), Ordering::Relaxed);
    }

    fn write_spi_config(&mut self, config: [u32; 4]) {
        for (reg, value) in self.icfr.iter().zip(config) {
            reg.store(value, Ordering::Relaxed);
        }
    }

    fn write_spi_priorities(&mut self, value: u32) {
        self.ipr.store(value, Ordering::Relaxed);
    }

    fn write_spi_targets(&mut self, value: u32) {
        self.iptr.store(value, Ordering::Relaxed);
    }

    fn disable_all(&mut self) {
        for reg in &self.enabled {
            reg.store(0, Ordering::Relaxed);
        }
    }

    fn set_enable(&mut self, id: IrqId) {
        let raw = id.raw() as usize;
        self.enabled[raw / 32].fetch_or(1 << (raw % 32), Ordering::Relaxed);
    }

    fn acknowledge(&mut self) -> InterruptSignalRegister {
        signal_for(self.pending.swap(SPURIOUS_INTERRUPT_ID, Ordering::Relaxed))
    }

    fn end_of_interrupt(&mut self, eoir: InterruptSignalRegister) {
        self.eoi_count.fetch_add(1, Ordering::Relaxed);
        self.last_eoi.store(eoir.ack_int_id().value(), Ordering::Relaxed);
    }
}

/// Processor model which stores the registered IRQ handler.
pub struct SimCpu<H> {
    handler: Option<H>,
    irq_enabled: bool,
}

impl<H> Default for SimCpu<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> SimCpu<H> {
    pub const fn new() -> Self {
        Self {
            handler: None,
            irq_enabled: false,
        }
    }

    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }
}

impl<H: IrqHandler> SimCpu<H> {
    /// Take the IRQ exception. Returns false if IRQs are masked or no handler is installed.
    pub fn fire(&mut self) -> bool {
        if !self.irq_enabled {
            return false;
        }
        match self.handler.as_mut() {
            Some(handler) => {
                handler.on_irq();
                true
            }
            None => false,
        }
    }
}

impl<H> Processor<H> for SimCpu<H> {
    fn register_irq_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    fn enable_irq(&mut self) {
        self.irq_enabled = true;
    }
}

/// Simulated instances of all peripherals of one board.
#[derive(Default)]
pub struct SimPeripherals {
    pub timer: SimTimer,
    pub gpio: SimGpio,
    pub xadc: SimXAdc,
    pub gic: SimGic,
}

impl SimPeripherals {
    pub const fn new() -> Self {
        Self {
            timer: SimTimer::new(),
            gpio: SimGpio::new(),
            xadc: SimXAdc::new(),
            gic: SimGic::new(),
        }
    }

    pub fn board(&self) -> SimBoard<'_> {
        SimBoard {
            sim: self,
            claims: Claims::new(),
        }
    }
}

/// [Board] handing out the simulated register blocks. Like the real board, each configured block
/// is handed out once.
pub struct SimBoard<'a> {
    sim: &'a SimPeripherals,
    claims: Claims,
}

impl<'a> Board for SimBoard<'a> {
    type Timer = &'a SimTimer;
    type Gpio = &'a SimGpio;
    type XAdc = &'a SimXAdc;
    type Gic = &'a SimGic;

    fn private_timer(&mut self, config: &PrivateTimerConfig) -> Option<Self::Timer> {
        self.claims.claim(config.base_addr).then_some(&self.sim.timer)
    }

    fn axi_gpio(&mut self, config: &AxiGpioConfig) -> Option<Self::Gpio> {
        self.claims.claim(config.base_addr).then_some(&self.sim.gpio)
    }

    fn xadc(&mut self, config: &XAdcConfig) -> Option<Self::XAdc> {
        self.claims.claim(config.base_addr).then_some(&self.sim.xadc)
    }

    fn gic(&mut self, config: &GicConfig) -> Option<Self::Gic> {
        self.claims.claim(config.dist_base_addr).then_some(&self.sim.gic)
    }
}
