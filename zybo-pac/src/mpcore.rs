//! # Cortex-A9 MPCore private memory region.
pub const MPCORE_BASE_ADDR: usize = 0xF8F0_0000;

pub const GICC_BASE_ADDR: usize = MPCORE_BASE_ADDR + 0x0000_0100;
pub const CPU_PRIV_TIM_BASE_ADDR: usize = MPCORE_BASE_ADDR + 0x0000_0600;
pub const GICD_BASE_ADDR: usize = MPCORE_BASE_ADDR + 0x0000_1000;
