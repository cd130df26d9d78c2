//! # Generic Interrupt Controller (GIC) module
//!
//! The [Gic] driver programs the fixed Zynq7000 configuration during initialization and provides
//! the per-source enable API plus the acknowledge/end-of-interrupt pair used by the dispatcher
//! of the [crate::irq::InterruptBridge].
#[cfg(any(test, feature = "sim"))]
use arbitrary_int::u10;
use zybo_pac::gic::{
    CpuInterface, Distributor, DistributorControl, InterfaceControl, InterruptSignalRegister,
    MmioCpuInterface, MmioDistributor, PriorityRegister, TypeRegister,
};

use crate::{
    config::{DeviceId, DeviceTable, GicConfig},
    init::{Device, DeviceKind, SetupError},
};

pub const SPURIOUS_INTERRUPT_ID: u16 = 1023;

/// These fixed values must be programmed according to the Zynq7000 TRM p.236.
/// Configures #32 to #47.
pub const ICFR_2_FIXED_VALUE: u32 = 0b01010101010111010101010001011111;
/// These fixed values must be programmed according to the Zynq7000 TRM p.236.
/// This configures `PL[2:0]` to high-level sensitivity.
/// Configures #48 to #63.
pub const ICFR_3_FIXED_VALUE: u32 = 0b01010101010101011101010101010101;
/// These fixed values must be programmed according to the Zynq7000 TRM p.236.
/// This configures `PL[7:3]` to high-level sensitivity.
/// Configures #64 to #79.
pub const ICFR_4_FIXED_VALUE: u32 = 0b01110101010101010101010101010101;
/// These fixed values must be programmed according to the Zynq7000 TRM p.236.
/// This configures `PL[15:8]` to high-level sensitivity.
/// Configures #80 to #95.
pub const ICFR_5_FIXED_VALUE: u32 = 0b00000011010101010101010101010101;

pub const SPI_FIXED_CONFIG: [u32; 4] = [
    ICFR_2_FIXED_VALUE,
    ICFR_3_FIXED_VALUE,
    ICFR_4_FIXED_VALUE,
    ICFR_5_FIXED_VALUE,
];

/// Helper value to target all interrupts which can be targetted to CPU 0
pub const TARGETS_ALL_CPU_0_IPTR_VAL: u32 = 0x01010101;

/// Priority 0xA0 for every interrupt of a priority register word.
pub const DEFAULT_PRIORITIES_IPR_VAL: u32 = 0xA0A0_A0A0;

/// Private Peripheral Interrupt (PPI) which are private to the CPU.
#[derive(Debug, Eq, PartialEq, Clone, Copy, num_enum::TryFromPrimitive)]
#[repr(u8)]
pub enum PpiInterrupt {
    GlobalTimer = 27,
    // Interrupt signal from the PL. CPU0: `IRQF2P[18]` and CPU1: `IRQF2P[19]`
    NFiq = 28,
    CpuPrivateTimer = 29,
    /// AWDT0 and AWDT1 for each CPU.
    Awdt = 30,
    // Interrupt signal from the PL. CPU0: `IRQF2P[16]` and CPU1: `IRQF2P[17]`
    NIrq = 31,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid interrupt ID {0}, range is [0, 95]")]
pub struct InvalidIrqId(pub u16);

/// Validated interrupt ID of the distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IrqId(u16);

impl IrqId {
    pub const PRIVATE_TIMER: Self = Self(PpiInterrupt::CpuPrivateTimer as u16);

    pub const fn new(raw: u16) -> Result<Self, InvalidIrqId> {
        if raw as usize >= TypeRegister::NUM_OF_INTERRUPTS {
            return Err(InvalidIrqId(raw));
        }
        Ok(Self(raw))
    }

    /// Interrupt ID of the PL to PS interrupt line `IRQ_F2P[index]`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is larger than 15. In a constant context this is a compile error.
    pub const fn pl_irq(index: u8) -> Self {
        match index {
            0..=7 => Self(61 + index as u16),
            8..=15 => Self(84 + (index as u16 - 8)),
            _ => panic!("PL interrupt index out of range"),
        }
    }

    #[inline]
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// Bit position and word index inside the set/clear-enable registers.
    #[inline]
    const fn enable_bit(&self) -> (usize, u32) {
        ((self.0 / 32) as usize, 1 << (self.0 % 32))
    }

    pub fn interrupt(&self) -> Interrupt {
        Interrupt::from_raw(self.0)
    }
}

impl core::fmt::Display for IrqId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "IRQ {}", self.0)
    }
}

impl TryFrom<u16> for IrqId {
    type Error = InvalidIrqId;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

/// Interrupt ID wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Sgi(u8),
    Ppi(PpiInterrupt),
    /// PL to PS interrupt `IRQ_F2P[n]`.
    Pl(u8),
    /// Shared peripheral interrupt of a PS peripheral.
    Spi(u16),
    /// Detects an invalid interrupt ID.
    Invalid(u16),
    /// Spurious interrupt (ID# 1023).
    Spurious,
}

impl Interrupt {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0..=15 => Interrupt::Sgi(raw as u8),
            27..=31 => match PpiInterrupt::try_from(raw as u8) {
                Ok(ppi) => Interrupt::Ppi(ppi),
                Err(_) => Interrupt::Invalid(raw),
            },
            61..=68 => Interrupt::Pl((raw - 61) as u8),
            84..=91 => Interrupt::Pl((raw - 84 + 8) as u8),
            32..=95 => Interrupt::Spi(raw),
            SPURIOUS_INTERRUPT_ID => Interrupt::Spurious,
            _ => Interrupt::Invalid(raw),
        }
    }
}

#[derive(Debug)]
pub struct InterruptInfo {
    raw_reg: InterruptSignalRegister,
    interrupt: Interrupt,
}

impl InterruptInfo {
    pub fn raw_reg(&self) -> InterruptSignalRegister {
        self.raw_reg
    }

    pub fn raw_id(&self) -> u16 {
        self.raw_reg.ack_int_id().value()
    }

    /// Validated ID, [None] for spurious or invalid interrupts.
    pub fn irq_id(&self) -> Option<IrqId> {
        IrqId::new(self.raw_id()).ok()
    }

    pub fn interrupt(&self) -> Interrupt {
        self.interrupt
    }
}

/// Register access required by the [Gic] driver.
pub trait GicRegisters {
    fn distributor_type(&mut self) -> TypeRegister;
    fn set_distributor_control(&mut self, dcr: DistributorControl);
    fn set_interface_control(&mut self, icr: InterfaceControl);
    fn set_priority_mask(&mut self, pmr: PriorityRegister);
    /// Write the configuration words of the shared peripheral interrupts (`ICFR2` to `ICFR5`).
    fn write_spi_config(&mut self, config: [u32; 4]);
    /// Write the same value to all priority words of the shared peripheral interrupts.
    fn write_spi_priorities(&mut self, value: u32);
    /// Write the same value to all target words of the shared peripheral interrupts.
    fn write_spi_targets(&mut self, value: u32);
    fn disable_all(&mut self);
    fn set_enable(&mut self, id: IrqId);
    /// Read the acknowledge register, which marks the highest pending interrupt active.
    fn acknowledge(&mut self) -> InterruptSignalRegister;
    fn end_of_interrupt(&mut self, eoir: InterruptSignalRegister);
}

/// CPU interface and distributor of the MPCore.
pub struct MmioGic<'a> {
    pub gicc: MmioCpuInterface<'a>,
    pub gicd: MmioDistributor<'a>,
}

impl MmioGic<'static> {
    /// Create the register blocks at the addresses of the given configuration.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    pub const unsafe fn new(config: &GicConfig) -> Self {
        Self {
            gicc: unsafe { CpuInterface::new_mmio_at(config.cpu_base_addr) },
            gicd: unsafe { Distributor::new_mmio_at(config.dist_base_addr) },
        }
    }
}

const SPI_WORDS_8_BIT: core::ops::Range<usize> = 8..0x18;

impl GicRegisters for MmioGic<'_> {
    #[inline]
    fn distributor_type(&mut self) -> TypeRegister {
        self.gicd.read_ictr()
    }

    #[inline]
    fn set_distributor_control(&mut self, dcr: DistributorControl) {
        self.gicd.write_dcr(dcr);
    }

    #[inline]
    fn set_interface_control(&mut self, icr: InterfaceControl) {
        self.gicc.write_icr(icr);
    }

    #[inline]
    fn set_priority_mask(&mut self, pmr: PriorityRegister) {
        self.gicc.write_pmr(pmr);
    }

    fn write_spi_config(&mut self, config: [u32; 4]) {
        for (offset, value) in config.into_iter().enumerate() {
            // Safety: indices 2 to 5 of the 6 configuration words.
            unsafe { self.gicd.write_icfr_unchecked(2 + offset, value) };
        }
    }

    fn write_spi_priorities(&mut self, value: u32) {
        for idx in SPI_WORDS_8_BIT {
            // Safety: index smaller than 0x18.
            unsafe { self.gicd.write_ipr_unchecked(idx, value) };
        }
    }

    fn write_spi_targets(&mut self, value: u32) {
        for idx in SPI_WORDS_8_BIT {
            // Safety: index smaller than 0x18.
            unsafe { self.gicd.write_iptr_unchecked(idx, value) };
        }
    }

    fn disable_all(&mut self) {
        for idx in 0..3 {
            // Safety: 3 clear-enable words.
            unsafe { self.gicd.write_icer_unchecked(idx, 0xFFFF_FFFF) };
        }
    }

    #[inline]
    fn set_enable(&mut self, id: IrqId) {
        let (idx, mask) = id.enable_bit();
        // Safety: a valid interrupt ID is smaller than 96.
        unsafe { self.gicd.write_iser_unchecked(idx, mask) };
    }

    #[inline]
    fn acknowledge(&mut self) -> InterruptSignalRegister {
        self.gicc.read_iar()
    }

    #[inline]
    fn end_of_interrupt(&mut self, eoir: InterruptSignalRegister) {
        self.gicc.write_eoir(eoir);
    }
}

/// Higher-level GIC driver.
///
/// [Device::cfg_initialize] checks that the distributor reports the Cortex-A9 MPCore layout and
/// then performs the complete controller setup:
///
/// 1. All interrupts are disabled.
/// 2. The fixed sensitivity values of the shared peripheral interrupts are programmed. All PL
///    interrupts are configured to high-level sensitivity.
/// 3. All shared peripheral interrupts get the default priority and are routed to CPU 0.
/// 4. The priority mask is set to 0xff so no interrupt is masked.
/// 5. CPU interface and distributor are enabled for secure and non-secure interrupts.
///
/// Individual sources are enabled afterwards with [Self::enable_interrupt].
pub struct Gic<R> {
    regs: R,
    config: &'static GicConfig,
}

impl<R: GicRegisters> Gic<R> {
    #[inline]
    pub fn config(&self) -> &'static GicConfig {
        self.config
    }

    #[inline]
    pub fn enable_interrupt(&mut self, id: IrqId) {
        self.regs.set_enable(id);
    }

    /// Acknowledges an interrupt by reading the IAR register and returning the interrupt context
    /// information structure.
    ///
    /// This should be called at the start of an interrupt handler.
    pub fn acknowledge_interrupt(&mut self) -> InterruptInfo {
        let iar = self.regs.acknowledge();
        InterruptInfo {
            interrupt: Interrupt::from_raw(iar.ack_int_id().value()),
            raw_reg: iar,
        }
    }

    /// Acknowledges the end of an interrupt by writing the EOIR register of the GICC.
    ///
    /// This should be called at the end of an interrupt handler.
    pub fn end_of_interrupt(&mut self, irq_info: InterruptInfo) {
        self.regs.end_of_interrupt(irq_info.raw_reg())
    }

    fn layout_matches(ictr: TypeRegister) -> bool {
        ictr.it_lines_number().value() == TypeRegister::IT_LINES_NUMBER
            && ictr.cpu_number().value() == TypeRegister::CPU_NUMBER_BITS
    }
}

impl<R: GicRegisters> Device for Gic<R> {
    type Config = GicConfig;
    type Regs = R;

    const KIND: DeviceKind = DeviceKind::InterruptController;

    fn lookup(table: &DeviceTable, id: DeviceId) -> Option<&'static GicConfig> {
        table.gic(id)
    }

    fn cfg_initialize(config: &'static GicConfig, mut regs: R) -> Result<Self, SetupError> {
        let ictr = regs.distributor_type();
        if !Self::layout_matches(ictr) {
            log::warn!("GIC not ready, unexpected type register {:#x}", ictr.raw_value());
            return Err(SetupError::InitializationFailed(Self::KIND));
        }
        regs.set_distributor_control(DistributorControl::new_with_raw_value(0));
        regs.disable_all();
        regs.write_spi_config(SPI_FIXED_CONFIG);
        regs.write_spi_priorities(DEFAULT_PRIORITIES_IPR_VAL);
        regs.write_spi_targets(TARGETS_ALL_CPU_0_IPTR_VAL);
        regs.set_priority_mask(PriorityRegister::new_with_raw_value(0xff));
        regs.set_interface_control(
            InterfaceControl::builder()
                .with_sbpr(false)
                .with_fiq_en(false)
                .with_ack_ctrl(false)
                .with_enable_non_secure(true)
                .with_enable_secure(true)
                .build(),
        );
        regs.set_distributor_control(
            DistributorControl::builder()
                .with_enable_non_secure(true)
                .with_enable_secure(true)
                .build(),
        );
        Ok(Self { regs, config })
    }
}

/// Acknowledge register value as read by CPU 0 for the given interrupt.
#[cfg(any(test, feature = "sim"))]
pub(crate) fn signal_for(raw_id: u16) -> InterruptSignalRegister {
    InterruptSignalRegister::builder()
        .with_cpu_id(arbitrary_int::u3::new(0))
        .with_ack_int_id(u10::new(raw_id))
        .build()
}
