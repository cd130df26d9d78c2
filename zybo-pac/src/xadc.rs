//! # AXI XADC wizard register module.
//!
//! The XADC hard macro is reached through the AXI interface of the XADC wizard IP. The lower
//! part of the register map belongs to the AXI wrapper (reset, status and interrupt
//! registers), the upper part maps the 128 16-bit Dynamic Reconfiguration Port (DRP) registers
//! of the hard macro to 32-bit words starting at offset 0x200.
use arbitrary_int::{u4, u5};

/// Magic value which resets the core when written to the software reset register.
pub const SOFTWARE_RESET_KEY: u32 = 0x0000_000A;

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct GlobalInterruptEnable {
    #[bit(31, rw)]
    enable: bool,
}

/// Layout shared by the interrupt status (write-1-to-clear) and interrupt enable registers.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
#[derive(PartialEq, Eq)]
pub struct InterruptBits {
    /// VCCBRAM sensor alarm.
    #[bit(10, rw)]
    vbram: bool,
    #[bit(9, rw)]
    temp_deactive: bool,
    #[bit(8, rw)]
    ot_deactive: bool,
    #[bit(7, rw)]
    jtag_locked: bool,
    #[bit(6, rw)]
    jtag_modified: bool,
    /// End of conversion.
    #[bit(5, rw)]
    eoc: bool,
    /// End of sequence.
    #[bit(4, rw)]
    eos: bool,
    #[bit(3, rw)]
    vccaux: bool,
    #[bit(2, rw)]
    vccint: bool,
    #[bit(1, rw)]
    temp: bool,
    /// Over temperature alarm.
    #[bit(0, rw)]
    ot: bool,
}

impl InterruptBits {
    pub const EOC_MASK: u32 = 1 << 5;
    pub const ALL_MASK: u32 = 0x7FF;
}

#[bitbybit::bitenum(u4, exhaustive = false)]
#[derive(Debug, PartialEq, Eq)]
pub enum SequencerMode {
    /// Default safe mode, also required while reconfiguring the sequencer.
    Safe = 0b0000,
    OnePass = 0b0001,
    Continuous = 0b0010,
    SingleChannel = 0b0011,
    SimultaneousSampling = 0b0100,
    IndependentAdc = 0b1000,
}

/// Configuration register 0.
#[bitbybit::bitfield(u16, default = 0x0, debug)]
pub struct Config0 {
    #[bit(15, rw)]
    calibration_averaging_disabled: bool,
    #[bits(12..=13, rw)]
    averaging: arbitrary_int::u2,
    #[bit(11, rw)]
    external_mux: bool,
    #[bit(10, rw)]
    bipolar: bool,
    /// Event driven sampling instead of continuous sampling.
    #[bit(9, rw)]
    event_mode: bool,
    /// Increases the settling time to 10 ADCCLK cycles.
    #[bit(8, rw)]
    increased_acquisition: bool,
    /// Channel used in single channel mode.
    #[bits(0..=4, rw)]
    channel: u5,
}

/// Configuration register 1.
///
/// The alarm bits are disable bits: a set bit switches the alarm off.
#[bitbybit::bitfield(u16, default = 0x0, debug)]
pub struct Config1 {
    #[bits(12..=15, rw)]
    sequencer: Option<SequencerMode>,
    /// Alarm 3 to alarm 6.
    #[bits(8..=11, rw)]
    alarm_disable_upper: u4,
    /// Supply sensor gain/offset, supply sensor offset, ADC gain/offset and ADC offset
    /// calibration enables.
    #[bits(4..=7, rw)]
    calibration: u4,
    /// Alarm 0 to alarm 2 in bits 1 to 3, over temperature alarm in bit 0.
    #[bits(0..=3, rw)]
    alarm_disable_lower: u4,
}

/// Address of a DRP register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrpRegister(u8);

impl DrpRegister {
    pub const CONFIG_0: Self = Self(0x40);
    pub const CONFIG_1: Self = Self(0x41);
    pub const VCCAUX_UPPER_ALARM: Self = Self(0x52);

    /// Data register holding the last conversion result of the given channel.
    #[inline]
    pub const fn data(channel: u5) -> Self {
        Self(channel.value())
    }

    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// AXI XADC wizard register access.
#[derive(derive_mmio::Mmio)]
#[repr(C)]
pub struct Registers {
    /// Software reset register.
    #[mmio(Write)]
    srr: u32,
    /// Status register.
    #[mmio(PureRead)]
    sr: u32,
    /// Alarm output status register.
    #[mmio(PureRead)]
    aosr: u32,
    /// Conversion start register.
    #[mmio(Write)]
    convstr: u32,
    /// Hard macro reset register.
    #[mmio(Write)]
    sysmon_rr: u32,
    _reserved_0: [u32; 0x12],
    gier: GlobalInterruptEnable,
    /// Interrupt status register, write-1-to-clear.
    #[mmio(PureRead, Write)]
    ipisr: InterruptBits,
    _reserved_1: u32,
    ipier: InterruptBits,
    _reserved_2: [u32; 0x65],
    /// DRP registers, only the lower 16 bits of each word are used.
    drp: [u32; 0x80],
}

static_assertions::const_assert_eq!(core::mem::size_of::<Registers>(), 0x400);

