//! # Build-time hardware description
//!
//! The [DeviceTable] lists every peripheral instance of a hardware design together with its
//! base address and interrupt line. [ZYBO_Z7] describes the reference design the demos were
//! written for: the MPCore peripherals of the PS plus an AXI GPIO block driving the four user
//! LEDs and an AXI XADC wizard, both attached to `M_AXI_GP0`.
use core::fmt;

use crate::{gic::IrqId, time::Hertz};

/// Identifier of one peripheral instance inside a [DeviceTable].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u16);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateTimerConfig {
    pub device_id: DeviceId,
    pub base_addr: usize,
    pub irq: IrqId,
    /// Timer input clock (`PERIPHCLK`), half of the CPU clock.
    pub clock: Hertz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxiGpioConfig {
    pub device_id: DeviceId,
    pub base_addr: usize,
    pub dual_channel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XAdcConfig {
    pub device_id: DeviceId,
    pub base_addr: usize,
    pub irq: IrqId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GicConfig {
    pub device_id: DeviceId,
    pub cpu_base_addr: usize,
    pub dist_base_addr: usize,
}

/// Static configuration of all peripherals of one hardware design.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTable {
    pub private_timers: &'static [PrivateTimerConfig],
    pub gpios: &'static [AxiGpioConfig],
    pub xadcs: &'static [XAdcConfig],
    pub gics: &'static [GicConfig],
}

impl DeviceTable {
    pub const EMPTY: Self = Self {
        private_timers: &[],
        gpios: &[],
        xadcs: &[],
        gics: &[],
    };

    pub fn private_timer(&self, id: DeviceId) -> Option<&'static PrivateTimerConfig> {
        self.private_timers.iter().find(|cfg| cfg.device_id == id)
    }

    pub fn gpio(&self, id: DeviceId) -> Option<&'static AxiGpioConfig> {
        self.gpios.iter().find(|cfg| cfg.device_id == id)
    }

    pub fn xadc(&self, id: DeviceId) -> Option<&'static XAdcConfig> {
        self.xadcs.iter().find(|cfg| cfg.device_id == id)
    }

    pub fn gic(&self, id: DeviceId) -> Option<&'static GicConfig> {
        self.gics.iter().find(|cfg| cfg.device_id == id)
    }
}

pub const PRIVATE_TIMER_0: DeviceId = DeviceId(0);
pub const LED_GPIO_0: DeviceId = DeviceId(0);
pub const XADC_0: DeviceId = DeviceId(0);
pub const GIC_0: DeviceId = DeviceId(0);

/// `PERIPHCLK` for a 667 MHz CPU clock.
pub const ZYBO_Z7_PERIPH_CLOCK: Hertz = Hertz::from_raw(333_500_000);

pub const AXI_GPIO_0_BASE_ADDR: usize = 0x4120_0000;
pub const AXI_XADC_0_BASE_ADDR: usize = 0x43C0_0000;

/// XADC wizard `ip2intc_irpt` is wired to `IRQ_F2P[0]`.
pub const XADC_0_PL_IRQ: u8 = 0;

pub const ZYBO_Z7: DeviceTable = DeviceTable {
    private_timers: &[PrivateTimerConfig {
        device_id: PRIVATE_TIMER_0,
        base_addr: zybo_pac::mpcore::CPU_PRIV_TIM_BASE_ADDR,
        irq: IrqId::PRIVATE_TIMER,
        clock: ZYBO_Z7_PERIPH_CLOCK,
    }],
    gpios: &[AxiGpioConfig {
        device_id: LED_GPIO_0,
        base_addr: AXI_GPIO_0_BASE_ADDR,
        dual_channel: false,
    }],
    xadcs: &[XAdcConfig {
        device_id: XADC_0,
        base_addr: AXI_XADC_0_BASE_ADDR,
        irq: IrqId::pl_irq(XADC_0_PL_IRQ),
    }],
    gics: &[GicConfig {
        device_id: GIC_0,
        cpu_base_addr: zybo_pac::mpcore::GICC_BASE_ADDR,
        dist_base_addr: zybo_pac::mpcore::GICD_BASE_ADDR,
    }],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zybo_table_lookup() {
        let timer = ZYBO_Z7.private_timer(PRIVATE_TIMER_0).unwrap();
        assert_eq!(timer.base_addr, 0xF8F0_0600);
        assert_eq!(timer.irq.raw(), 29);
        let xadc = ZYBO_Z7.xadc(XADC_0).unwrap();
        assert_eq!(xadc.irq.raw(), 61);
        assert_eq!(ZYBO_Z7.gic(GIC_0).unwrap().dist_base_addr, 0xF8F0_1000);
    }

    #[test]
    fn unknown_id_has_no_config() {
        assert!(ZYBO_Z7.gpio(DeviceId(7)).is_none());
        assert!(DeviceTable::EMPTY.private_timer(PRIVATE_TIMER_0).is_none());
    }
}
