//! # CPU private timer register module.
//!
//! 32-bit down counter clocked by `PERIPHCLK` (CPU 3x2x clock) divided by `prescaler + 1`.
//! Writing the load register also updates the counter register.
pub use crate::mpcore::CPU_PRIV_TIM_BASE_ADDR;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Control {
    #[bits(8..=15, rw)]
    prescaler: u8,
    #[bit(2, rw)]
    interrupt_enable: bool,
    #[bit(1, rw)]
    auto_reload: bool,
    #[bit(0, rw)]
    enable: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct InterruptStatus {
    /// Set when the counter reaches zero. Cleared by writing a one.
    #[bit(0, rw)]
    event_flag: bool,
}

/// CPU private timer registers.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Registers {
    load: u32,
    counter: u32,
    control: Control,
    #[mmio(PureRead, Write)]
    interrupt_status: InterruptStatus,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Registers>(), 0x10);


impl Registers {
    /// Create a new CPU private timer MMIO instance at the fixed base address.
    ///
    /// # Safety
    ///
    /// This API can be used to potentially create a driver to the same peripheral structure
    /// from multiple threads. The user must ensure that concurrent accesses are safe and do not
    /// interfere with each other.
    ///
    /// The timer is banked per CPU core, so the instance always refers to the timer of the core
    /// performing the access.
    #[inline]
    pub const unsafe fn new_mmio_fixed() -> MmioRegisters<'static> {
        unsafe { Registers::new_mmio_at(CPU_PRIV_TIM_BASE_ADDR) }
    }
}
