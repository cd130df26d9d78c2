//! # Register providers
//!
//! A [Board] hands out the register-access object of a peripheral for its configuration entry.
//! Each register block is handed out at most once, so two drivers can not alias the same
//! peripheral. [MmioBoard] creates the memory-mapped register blocks of the real hardware. The
//! simulation harness provides [SimBoard](crate::sim::SimBoard) for host tests.
use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;
use zybo_pac::{axi_gpio, priv_tim, xadc};

use crate::{
    axi_gpio::GpioRegisters,
    config::{AxiGpioConfig, GicConfig, PrivateTimerConfig, XAdcConfig},
    gic::{GicRegisters, MmioGic},
    priv_tim::TimerRegisters,
    xadc::XAdcRegisters,
};

/// Maximum number of register blocks one board hands out.
pub const MAX_BLOCKS: usize = 8;

static TAKEN: AtomicBool = AtomicBool::new(false);

/// Each method returns [None] when the register block of the configuration entry was already
/// handed out.
pub trait Board {
    type Timer: TimerRegisters;
    type Gpio: GpioRegisters;
    type XAdc: XAdcRegisters;
    type Gic: GicRegisters;

    fn private_timer(&mut self, config: &PrivateTimerConfig) -> Option<Self::Timer>;
    fn axi_gpio(&mut self, config: &AxiGpioConfig) -> Option<Self::Gpio>;
    fn xadc(&mut self, config: &XAdcConfig) -> Option<Self::XAdc>;
    fn gic(&mut self, config: &GicConfig) -> Option<Self::Gic>;
}

/// Base addresses of the register blocks handed out so far.
#[derive(Debug, Default)]
pub struct Claims(Vec<usize, MAX_BLOCKS>);

impl Claims {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns false if the block at `base_addr` was claimed before or the claim list is full.
    pub fn claim(&mut self, base_addr: usize) -> bool {
        if self.0.contains(&base_addr) {
            return false;
        }
        self.0.push(base_addr).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Memory-mapped registers at the addresses of the configuration entries.
pub struct MmioBoard {
    claims: Claims,
}

impl MmioBoard {
    /// Take the board singleton. Returns [None] when it was already taken.
    pub fn take() -> Option<Self> {
        if TAKEN.swap(true, Ordering::Relaxed) {
            return None;
        }
        // Safety: we are the only owner.
        Some(unsafe { Self::steal() })
    }

    /// Create the board without the ownership check.
    ///
    /// # Safety
    ///
    /// Every stolen board hands out the register blocks again, so this allows creating an
    /// arbitrary amount of drivers for the same peripheral. The caller must also ensure that the
    /// device table describes the loaded bitstream: the PL peripherals are only present when the
    /// FPGA was configured.
    pub unsafe fn steal() -> Self {
        Self {
            claims: Claims::new(),
        }
    }
}

impl Board for MmioBoard {
    type Timer = priv_tim::MmioRegisters<'static>;
    type Gpio = axi_gpio::MmioRegisters<'static>;
    type XAdc = xadc::MmioRegisters<'static>;
    type Gic = MmioGic<'static>;

    fn private_timer(&mut self, config: &PrivateTimerConfig) -> Option<Self::Timer> {
        if !self.claims.claim(config.base_addr) {
            return None;
        }
        // Safety: the block was not handed out before.
        Some(unsafe { crate::priv_tim::mmio_for(config) })
    }

    fn axi_gpio(&mut self, config: &AxiGpioConfig) -> Option<Self::Gpio> {
        if !self.claims.claim(config.base_addr) {
            return None;
        }
        // Safety: the block was not handed out before.
        Some(unsafe { crate::axi_gpio::mmio_for(config) })
    }

    fn xadc(&mut self, config: &XAdcConfig) -> Option<Self::XAdc> {
        if !self.claims.claim(config.base_addr) {
            return None;
        }
        // Safety: the block was not handed out before.
        Some(unsafe { crate::xadc::mmio_for(config) })
    }

    fn gic(&mut self, config: &GicConfig) -> Option<Self::Gic> {
        // The distributor is claimed by its address, the CPU interface comes with it.
        if !self.claims.claim(config.dist_base_addr) {
            return None;
        }
        // Safety: the block was not handed out before.
        Some(unsafe { MmioGic::new(config) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GIC_0, LED_GPIO_0, PRIVATE_TIMER_0, XADC_0, ZYBO_Z7};

    #[test]
    fn claim_once() {
        let mut claims = Claims::new();
        assert!(claims.is_empty());
        assert!(claims.claim(0xF8F0_0600));
        assert!(!claims.claim(0xF8F0_0600));
        assert!(claims.claim(0x4120_0000));
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn full_claim_list_rejects() {
        let mut claims = Claims::new();
        for i in 0..MAX_BLOCKS {
            assert!(claims.claim(i * 0x1000));
        }
        assert!(!claims.claim(0xFFFF_0000));
    }

    // Only handle creation, no register is accessed.
    #[test]
    fn mmio_board_hands_out_each_block_once() {
        let mut board = unsafe { MmioBoard::steal() };
        let timer = ZYBO_Z7.private_timer(PRIVATE_TIMER_0).unwrap();
        let gpio = ZYBO_Z7.gpio(LED_GPIO_0).unwrap();
        let adc = ZYBO_Z7.xadc(XADC_0).unwrap();
        let gic = ZYBO_Z7.gic(GIC_0).unwrap();
        assert!(board.private_timer(timer).is_some());
        assert!(board.axi_gpio(gpio).is_some());
        assert!(board.xadc(adc).is_some());
        assert!(board.gic(gic).is_some());
        assert!(board.private_timer(timer).is_none());
        assert!(board.axi_gpio(gpio).is_none());
        assert!(board.xadc(adc).is_none());
        assert!(board.gic(gic).is_none());
    }

    #[test]
    fn board_singleton() {
        assert!(MmioBoard::take().is_some());
        assert!(MmioBoard::take().is_none());
    }
}
