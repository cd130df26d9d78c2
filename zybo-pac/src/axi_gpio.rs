//! # AXI GPIO register module.
//!
//! Register map of the AXI GPIO v2 IP core. A set bit in a tri-state register configures the
//! corresponding pin as an input.

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct GlobalInterruptEnable {
    #[bit(31, rw)]
    enable: bool,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct ChannelInterrupts {
    #[bit(1, rw)]
    channel_2: bool,
    #[bit(0, rw)]
    channel_1: bool,
}

/// AXI GPIO registers.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Registers {
    /// Channel 1 data
    data_1: u32,
    /// Channel 1 tri-state control
    tri_1: u32,
    /// Channel 2 data
    data_2: u32,
    /// Channel 2 tri-state control
    tri_2: u32,
    _reserved_0: [u32; 0x43],
    gier: GlobalInterruptEnable,
    /// Interrupt status, toggle on write.
    #[mmio(PureRead, Write)]
    ip_isr: ChannelInterrupts,
    _reserved_1: u32,
    ip_ier: ChannelInterrupts,
}

static_assertions::const_assert_eq!(core::mem::size_of::<Registers>(), 0x12C);

