//! # AXI GPIO module
//!
//! Driver for the AXI GPIO IP core. The demos only use it as an output port for the user LEDs.
use zybo_pac::axi_gpio::{MmioRegisters, Registers};

use crate::{
    config::{AxiGpioConfig, DeviceId, DeviceTable},
    init::{Device, DeviceKind, SetupError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioChannel {
    Ch1 = 1,
    Ch2 = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("GPIO channel {0:?} is not present in this core")]
pub struct ChannelNotPresent(pub GpioChannel);

/// Register access required by the [AxiGpio] driver.
pub trait GpioRegisters {
    fn data(&mut self, channel: GpioChannel) -> u32;
    fn set_data(&mut self, channel: GpioChannel, value: u32);
    /// Tri-state register. A set bit configures the pin as an input.
    fn direction(&mut self, channel: GpioChannel) -> u32;
    fn set_direction(&mut self, channel: GpioChannel, value: u32);
}

impl GpioRegisters for MmioRegisters<'_> {
    fn data(&mut self, channel: GpioChannel) -> u32 {
        match channel {
            GpioChannel::Ch1 => self.read_data_1(),
            GpioChannel::Ch2 => self.read_data_2(),
        }
    }

    fn set_data(&mut self, channel: GpioChannel, value: u32) {
        match channel {
            GpioChannel::Ch1 => self.write_data_1(value),
            GpioChannel::Ch2 => self.write_data_2(value),
        }
    }

    fn direction(&mut self, channel: GpioChannel) -> u32 {
        match channel {
            GpioChannel::Ch1 => self.read_tri_1(),
            GpioChannel::Ch2 => self.read_tri_2(),
        }
    }

    fn set_direction(&mut self, channel: GpioChannel, value: u32) {
        match channel {
            GpioChannel::Ch1 => self.write_tri_1(value),
            GpioChannel::Ch2 => self.write_tri_2(value),
        }
    }
}

/// Create the MMIO block of an AXI GPIO core for the given configuration.
///
/// # Safety
///
/// The configuration must describe an AXI GPIO core which is present in the loaded bitstream.
/// The user must also ensure that concurrent accesses to the same core do not interfere with
/// each other.
#[inline]
pub const unsafe fn mmio_for(config: &AxiGpioConfig) -> MmioRegisters<'static> {
    unsafe { Registers::new_mmio_at(config.base_addr) }
}

pub struct AxiGpio<R> {
    regs: R,
    config: &'static AxiGpioConfig,
}

impl<R: GpioRegisters> AxiGpio<R> {
    #[inline]
    pub fn config(&self) -> &'static AxiGpioConfig {
        self.config
    }

    fn check_channel(&self, channel: GpioChannel) -> Result<(), ChannelNotPresent> {
        if channel == GpioChannel::Ch2 && !self.config.dual_channel {
            return Err(ChannelNotPresent(channel));
        }
        Ok(())
    }

    /// Set the direction of all pins of a channel. A set bit configures the pin as an input.
    pub fn set_data_direction(
        &mut self,
        channel: GpioChannel,
        direction_mask: u32,
    ) -> Result<(), ChannelNotPresent> {
        self.check_channel(channel)?;
        self.regs.set_direction(channel, direction_mask);
        Ok(())
    }

    /// Configure all pins of a channel as outputs.
    #[inline]
    pub fn configure_outputs(&mut self, channel: GpioChannel) -> Result<(), ChannelNotPresent> {
        self.set_data_direction(channel, 0)
    }

    pub fn write(&mut self, channel: GpioChannel, value: u32) -> Result<(), ChannelNotPresent> {
        self.check_channel(channel)?;
        self.regs.set_data(channel, value);
        Ok(())
    }

    pub fn read(&mut self, channel: GpioChannel) -> Result<u32, ChannelNotPresent> {
        self.check_channel(channel)?;
        Ok(self.regs.data(channel))
    }

    /// Configure all pins of a channel as outputs driving `initial` and convert the driver into
    /// an output port for that channel.
    pub fn into_output(
        mut self,
        channel: GpioChannel,
        initial: u32,
    ) -> Result<GpioOutput<R>, ChannelNotPresent> {
        self.configure_outputs(channel)?;
        self.regs.set_data(channel, initial);
        Ok(GpioOutput {
            regs: self.regs,
            channel,
        })
    }
}

/// Output port on a channel which is present in the core.
pub struct GpioOutput<R> {
    regs: R,
    channel: GpioChannel,
}

impl<R: GpioRegisters> GpioOutput<R> {
    #[inline]
    pub fn channel(&self) -> GpioChannel {
        self.channel
    }

    #[inline]
    pub fn set(&mut self, value: u32) {
        self.regs.set_data(self.channel, value);
    }

    #[inline]
    pub fn get(&mut self) -> u32 {
        self.regs.data(self.channel)
    }
}

impl<R: GpioRegisters> Device for AxiGpio<R> {
    type Config = AxiGpioConfig;
    type Regs = R;

    const KIND: DeviceKind = DeviceKind::Gpio;

    fn lookup(table: &DeviceTable, id: DeviceId) -> Option<&'static AxiGpioConfig> {
        table.gpio(id)
    }

    fn cfg_initialize(config: &'static AxiGpioConfig, regs: R) -> Result<Self, SetupError> {
        Ok(Self { regs, config })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{LED_GPIO_0, ZYBO_Z7},
        init::{SelfTest, initialize},
        sim::SimGpio,
    };

    #[test]
    fn led_channel_output() {
        let sim = SimGpio::new();
        let mut gpio: AxiGpio<&SimGpio> =
            initialize(&ZYBO_Z7, LED_GPIO_0, SelfTest::Run, |_| Some(&sim)).unwrap();
        assert_eq!(sim.tri_state(GpioChannel::Ch1), 0xFFFF_FFFF);
        gpio.configure_outputs(GpioChannel::Ch1).unwrap();
        assert_eq!(sim.tri_state(GpioChannel::Ch1), 0);
        gpio.write(GpioChannel::Ch1, 0x9).unwrap();
        assert_eq!(sim.output(GpioChannel::Ch1), 0x9);
        assert_eq!(gpio.read(GpioChannel::Ch1), Ok(0x9));
    }

    #[test]
    fn single_channel_core_rejects_second_channel() {
        let sim = SimGpio::new();
        let mut gpio: AxiGpio<&SimGpio> =
            initialize(&ZYBO_Z7, LED_GPIO_0, SelfTest::Skip, |_| Some(&sim)).unwrap();
        assert_eq!(
            gpio.write(GpioChannel::Ch2, 1),
            Err(ChannelNotPresent(GpioChannel::Ch2))
        );
        assert_eq!(sim.output(GpioChannel::Ch2), 0);
    }

    #[test]
    fn output_port_drives_checked_channel() {
        let sim = SimGpio::new();
        let gpio: AxiGpio<&SimGpio> =
            initialize(&ZYBO_Z7, LED_GPIO_0, SelfTest::Skip, |_| Some(&sim)).unwrap();
        let mut leds = gpio.into_output(GpioChannel::Ch1, 0x9).unwrap();
        assert_eq!(leds.channel(), GpioChannel::Ch1);
        assert_eq!(sim.tri_state(GpioChannel::Ch1), 0);
        assert_eq!(leds.get(), 0x9);
        leds.set(0xFFFF_FFF6);
        assert_eq!(sim.output(GpioChannel::Ch1), 0xFFFF_FFF6);
    }

    #[test]
    fn output_port_needs_present_channel() {
        let sim = SimGpio::new();
        let gpio: AxiGpio<&SimGpio> =
            initialize(&ZYBO_Z7, LED_GPIO_0, SelfTest::Skip, |_| Some(&sim)).unwrap();
        assert_eq!(
            gpio.into_output(GpioChannel::Ch2, 0x9).err(),
            Some(ChannelNotPresent(GpioChannel::Ch2))
        );
        assert_eq!(sim.tri_state(GpioChannel::Ch2), 0xFFFF_FFFF);
        assert_eq!(sim.output(GpioChannel::Ch2), 0);
    }
}
