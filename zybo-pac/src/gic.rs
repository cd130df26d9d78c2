//! # GIC (Generic Interrupt Controller) register module.
//!
//! ARM GICv1 distributor and CPU interface as implemented by the Cortex-A9 MPCore.
pub use crate::mpcore::{GICC_BASE_ADDR, GICD_BASE_ADDR};
use arbitrary_int::{u3, u5, u10};
use static_assertions::const_assert_eq;

/// Distributor Control Register
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct DistributorControl {
    #[bit(1, rw)]
    enable_non_secure: bool,
    #[bit(0, rw)]
    enable_secure: bool,
}

/// Interrupt Controller Type Register. Only returns fixed constants.
#[bitbybit::bitfield(u32, debug)]
pub struct TypeRegister {
    #[bits(11..=15, r)]
    lspi: u5,
    #[bit(10, r)]
    security_extension: bool,
    #[bits(5..=7, r)]
    cpu_number: u3,
    #[bits(0..=4, r)]
    it_lines_number: u5,
}

impl TypeRegister {
    /// Encoding: 0b001 means that the Cortex-A9 MPCore has 2 processors.
    pub const CPU_NUMBER_BITS: u8 = 0b001;
    /// The distributor provides 96 interrupts.
    pub const IT_LINES_NUMBER: u8 = 0x2;

    pub const NUM_OF_INTERRUPTS: usize = 96;
}

/// GIC distributor registers.
#[derive(derive_mmio::Mmio)]
#[repr(C, align(8))]
pub struct Distributor {
    dcr: DistributorControl,
    #[mmio(PureRead)]
    ictr: TypeRegister,
    #[mmio(PureRead)]
    iidr: u32,
    _reserved_0: [u32; 0x1D],
    /// Interrupt security registers
    isr: [u32; 3],
    _reserved_1: [u32; 0x1D],
    /// Interrupt Set-Enable Registers
    iser: [u32; 3],
    _reserved_2: [u32; 0x1D],
    /// Interrupt Clear-Enable Registers
    icer: [u32; 3],
    _reserved_3: [u32; 0x1D],
    /// Interrupt Set-Pending Registers
    ispr: [u32; 3],
    _reserved_4: [u32; 0x1D],
    /// Interrupt Clear-Pending Registers
    icpr: [u32; 3],
    _reserved_5: [u32; 0x1D],
    /// Active Bit Registers
    abr: [u32; 3],
    _reserved_6: [u32; 0x3D],
    /// Interrupt Priority Registers, one byte per interrupt.
    ipr: [u32; 0x18],
    _reserved_7: [u32; 0xE8],
    /// Interrupt Processor Targets Registers, one byte per interrupt. The first eight words
    /// (SGIs and PPIs) are read-only.
    iptr: [u32; 0x18],
    _reserved_8: [u32; 0xE8],
    /// Interrupt Configuration Registers, two bits per interrupt.
    icfr: [u32; 6],
    _reserved_9: [u32; 0x3A],
    #[mmio(PureRead)]
    ppi_status: u32,
    spi_status: [u32; 2],
    _reserved_10: [u32; 0x7D],
    /// Software Generated Interrupt Register.
    #[mmio(Write)]
    sgir: u32,
    _reserved_11: [u32; 0x33],
    /// Peripheral and component identification registers.
    id: [u32; 12],
}

const_assert_eq!(core::mem::size_of::<Distributor>(), 0x1000);


impl Distributor {
    /// Create a new GIC distributor MMIO instance at the fixed address of the processing
    /// system.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    #[inline]
    pub const unsafe fn new_mmio_fixed() -> MmioDistributor<'static> {
        unsafe { Self::new_mmio_at(GICD_BASE_ADDR) }
    }
}

/// CPU interface control register.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct InterfaceControl {
    #[bit(4, rw)]
    sbpr: bool,
    #[bit(3, rw)]
    fiq_en: bool,
    #[bit(2, rw)]
    ack_ctrl: bool,
    #[bit(1, rw)]
    enable_non_secure: bool,
    #[bit(0, rw)]
    enable_secure: bool,
}

/// Priority Mask Register
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct PriorityRegister {
    #[bits(0..=7, rw)]
    priority: u8,
}

/// Interrupt acknowledge and end of interrupt register layout.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct InterruptSignalRegister {
    #[bits(10..=12, rw)]
    cpu_id: u3,
    #[bits(0..=9, rw)]
    ack_int_id: u10,
}

/// GIC CPU interface registers.
#[derive(derive_mmio::Mmio)]
#[repr(C, align(8))]
pub struct CpuInterface {
    /// CPU Interface Control Register.
    icr: InterfaceControl,
    /// Interrupt Priority Mask Register.
    pmr: PriorityRegister,
    /// Binary Point Register.
    bpr: u32,
    /// Interrupt Acknowledge Register. Reading it acknowledges the highest pending interrupt.
    iar: InterruptSignalRegister,
    /// End of Interrupt Register.
    #[mmio(Write)]
    eoir: InterruptSignalRegister,
    /// Running Priority Register.
    #[mmio(PureRead)]
    rpr: PriorityRegister,
    /// Highest Pending Interrupt Register.
    #[mmio(PureRead)]
    hpir: InterruptSignalRegister,
    /// Aliased Binary Point Register
    abpr: u32,
    _reserved_0: [u32; 0x37],
    /// CPU Interface Identification Register.
    #[mmio(PureRead)]
    iidr: u32,
}

const_assert_eq!(core::mem::size_of::<CpuInterface>(), 0x100);


impl CpuInterface {
    /// Create a new GIC CPU interface MMIO instance at the fixed address of the processing
    /// system.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    #[inline]
    pub const unsafe fn new_mmio_fixed() -> MmioCpuInterface<'static> {
        unsafe { Self::new_mmio_at(GICC_BASE_ADDR) }
    }
}
