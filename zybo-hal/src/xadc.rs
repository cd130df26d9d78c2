//! # AXI XADC wizard module
//!
//! Driver for the XADC hard macro behind the AXI XADC wizard. It covers the subset the sampling
//! demo needs: sequencer mode, single channel parameters, alarm and calibration enables,
//! the end-of-conversion interrupt and reading conversion results.
use arbitrary_int::{u4, u5};
use zybo_pac::xadc::{
    Config0, Config1, DrpRegister, GlobalInterruptEnable, InterruptBits, MmioRegisters,
    Registers, SOFTWARE_RESET_KEY, SequencerMode,
};

use crate::{
    config::{DeviceId, DeviceTable, XAdcConfig},
    init::{Device, DeviceKind, SetupError},
};

/// Value written to the VCCAUX upper alarm threshold by the self-test.
pub const SELF_TEST_DATA: u16 = 0x55B0;

/// Calibration enables for ADC offset, ADC offset and gain, supply sensor offset and supply
/// sensor offset and gain.
pub const CALIBRATION_ALL: u4 = u4::new(0b1111);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid XADC channel {0}, range is [0, 31]")]
pub struct InvalidChannel(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sequencer is not in single channel mode")]
pub struct NotSingleChannelMode;

/// Analog input channel of the XADC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel(u5);

impl Channel {
    pub const fn new(raw: u8) -> Result<Self, InvalidChannel> {
        if raw > 31 {
            return Err(InvalidChannel(raw));
        }
        Ok(Self(u5::new(raw)))
    }

    /// Auxiliary channel `VAUXP[index]/VAUXN[index]`, which is channel `16 + index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is larger than 15. In a constant context this is a compile error.
    pub const fn aux(index: u8) -> Self {
        if index > 15 {
            panic!("auxiliary channel index out of range");
        }
        Self(u5::new(16 + index))
    }

    #[inline]
    pub const fn raw(&self) -> u8 {
        self.0.value()
    }

    #[inline]
    pub const fn data_register(&self) -> DrpRegister {
        DrpRegister::data(self.0)
    }
}

/// Conversion result as stored in a DRP data register.
///
/// The 12-bit code of the converter is MSB justified in the 16-bit register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample(pub u16);

impl RawSample {
    #[inline]
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// 12-bit converter output.
    #[inline]
    pub const fn code(&self) -> u16 {
        self.0 >> 4
    }

    /// Input voltage of a unipolar auxiliary or dedicated analog input. Full scale is 1 V.
    #[inline]
    pub fn unipolar_volts(&self) -> f32 {
        self.0 as f32 / 65536.0
    }
}

/// Single channel acquisition parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleChannelParams {
    pub channel: Channel,
    /// Settling time of 10 instead of 4 ADCCLK cycles.
    pub increased_acquisition: bool,
    /// Sample on `CONVST` events instead of continuously.
    pub event_mode: bool,
    pub bipolar: bool,
}

/// Register access required by the [XAdc] driver.
pub trait XAdcRegisters {
    fn software_reset(&mut self);
    fn global_interrupt_enable(&mut self) -> bool;
    fn set_global_interrupt_enable(&mut self, enable: bool);
    fn interrupt_status(&mut self) -> InterruptBits;
    /// Clear the given status bits. The register is write-1-to-clear.
    fn clear_interrupt_status(&mut self, bits: InterruptBits);
    fn interrupt_enable(&mut self) -> InterruptBits;
    fn set_interrupt_enable(&mut self, bits: InterruptBits);
    fn read_drp(&mut self, reg: DrpRegister) -> u16;
    fn write_drp(&mut self, reg: DrpRegister, value: u16);
}

impl XAdcRegisters for MmioRegisters<'_> {
    #[inline]
    fn software_reset(&mut self) {
        self.write_srr(SOFTWARE_RESET_KEY);
    }

    #[inline]
    fn global_interrupt_enable(&mut self) -> bool {
        self.read_gier().enable()
    }

    #[inline]
    fn set_global_interrupt_enable(&mut self, enable: bool) {
        self.write_gier(GlobalInterruptEnable::builder().with_enable(enable).build());
    }

    #[inline]
    fn interrupt_status(&mut self) -> InterruptBits {
        self.read_ipisr()
    }

    #[inline]
    fn clear_interrupt_status(&mut self, bits: InterruptBits) {
        self.write_ipisr(bits);
    }

    #[inline]
    fn interrupt_enable(&mut self) -> InterruptBits {
        self.read_ipier()
    }

    #[inline]
    fn set_interrupt_enable(&mut self, bits: InterruptBits) {
        self.write_ipier(bits);
    }

    #[inline]
    fn read_drp(&mut self, reg: DrpRegister) -> u16 {
        // Safety: all DRP register addresses are smaller than 0x80.
        unsafe { self.read_drp_unchecked(reg.index()) as u16 }
    }

    #[inline]
    fn write_drp(&mut self, reg: DrpRegister, value: u16) {
        // Safety: all DRP register addresses are smaller than 0x80.
        unsafe { self.write_drp_unchecked(reg.index(), value as u32) };
    }
}

/// Create the MMIO block of an AXI XADC wizard for the given configuration.
///
/// # Safety
///
/// The configuration must describe an XADC wizard which is present in the loaded bitstream.
/// The user must also ensure that concurrent accesses to the same core do not interfere with
/// each other.
#[inline]
pub const unsafe fn mmio_for(config: &XAdcConfig) -> MmioRegisters<'static> {
    unsafe { Registers::new_mmio_at(config.base_addr) }
}

pub struct XAdc<R> {
    regs: R,
    config: &'static XAdcConfig,
}

impl<R: XAdcRegisters> XAdc<R> {
    #[inline]
    pub fn config(&self) -> &'static XAdcConfig {
        self.config
    }

    /// Reset the XADC core, including the AXI interface registers.
    #[inline]
    pub fn reset(&mut self) {
        self.regs.software_reset();
    }

    #[inline]
    fn config_1(&mut self) -> Config1 {
        Config1::new_with_raw_value(self.regs.read_drp(DrpRegister::CONFIG_1))
    }

    fn modify_config_1(&mut self, f: impl FnOnce(Config1) -> Config1) {
        let cfg = self.config_1();
        self.regs.write_drp(DrpRegister::CONFIG_1, f(cfg).raw_value());
    }

    /// Switch the channel sequencer mode. The safe mode should be selected before changing
    /// other sequencer settings.
    pub fn set_sequencer_mode(&mut self, mode: SequencerMode) {
        self.modify_config_1(|mut cfg| {
            cfg.set_sequencer(mode);
            cfg
        });
    }

    /// Current sequencer mode, the raw value for reserved encodings.
    #[inline]
    pub fn sequencer_mode(&mut self) -> Result<SequencerMode, u4> {
        self.config_1().sequencer().map_err(u4::new)
    }

    /// Configure the channel and the acquisition settings of the single channel mode.
    ///
    /// The sequencer must already be in [SequencerMode::SingleChannel].
    pub fn set_single_channel_params(
        &mut self,
        params: SingleChannelParams,
    ) -> Result<(), NotSingleChannelMode> {
        if self.sequencer_mode() != Ok(SequencerMode::SingleChannel) {
            return Err(NotSingleChannelMode);
        }
        let cfg = Config0::new_with_raw_value(self.regs.read_drp(DrpRegister::CONFIG_0))
            .with_channel(params.channel.0)
            .with_increased_acquisition(params.increased_acquisition)
            .with_event_mode(params.event_mode)
            .with_bipolar(params.bipolar);
        self.regs.write_drp(DrpRegister::CONFIG_0, cfg.raw_value());
        Ok(())
    }

    /// Enable alarms. Bit 0 is the over-temperature alarm, bits 1 to 7 are alarms 0 to 6.
    /// A cleared bit disables the alarm.
    pub fn set_alarm_enables(&mut self, enables: u8) {
        let disables = !enables;
        self.modify_config_1(|mut cfg| {
            cfg.set_alarm_disable_lower(u4::new(disables & 0x0F));
            cfg.set_alarm_disable_upper(u4::new(disables >> 4));
            cfg
        });
    }

    /// Alarm enables in the layout used by [Self::set_alarm_enables].
    pub fn alarm_enables(&mut self) -> u8 {
        let cfg = self.config_1();
        !((cfg.alarm_disable_upper().value() << 4) | cfg.alarm_disable_lower().value())
    }

    pub fn set_calibration_enables(&mut self, enables: u4) {
        self.modify_config_1(|mut cfg| {
            cfg.set_calibration(enables);
            cfg
        });
    }

    #[inline]
    pub fn calibration_enables(&mut self) -> u4 {
        self.config_1().calibration()
    }

    /// Enable the given interrupt sources in addition to the already enabled ones.
    pub fn enable_interrupts(&mut self, bits: InterruptBits) {
        let enabled = self.regs.interrupt_enable();
        self.regs.set_interrupt_enable(InterruptBits::new_with_raw_value(
            enabled.raw_value() | bits.raw_value(),
        ));
    }

    #[inline]
    pub fn interrupts_enabled(&mut self) -> InterruptBits {
        self.regs.interrupt_enable()
    }

    #[inline]
    pub fn enable_global_interrupt(&mut self) {
        self.regs.set_global_interrupt_enable(true);
    }

    #[inline]
    pub fn global_interrupt_enabled(&mut self) -> bool {
        self.regs.global_interrupt_enable()
    }

    #[inline]
    pub fn interrupt_status(&mut self) -> InterruptBits {
        self.regs.interrupt_status()
    }

    #[inline]
    pub fn clear_interrupts(&mut self, bits: InterruptBits) {
        self.regs.clear_interrupt_status(bits);
    }

    /// Last conversion result of the given channel.
    #[inline]
    pub fn adc_data(&mut self, channel: Channel) -> RawSample {
        RawSample(self.regs.read_drp(channel.data_register()))
    }
}

impl<R: XAdcRegisters> Device for XAdc<R> {
    type Config = XAdcConfig;
    type Regs = R;

    const KIND: DeviceKind = DeviceKind::XAdc;

    fn lookup(table: &DeviceTable, id: DeviceId) -> Option<&'static XAdcConfig> {
        table.xadc(id)
    }

    fn cfg_initialize(config: &'static XAdcConfig, mut regs: R) -> Result<Self, SetupError> {
        regs.set_global_interrupt_enable(false);
        Ok(Self { regs, config })
    }

    /// Reset the core, then write a test value to an alarm threshold register and read it back.
    /// The core is reset again afterwards.
    fn self_test(&mut self) -> Result<(), SetupError> {
        self.reset();
        self.regs.write_drp(DrpRegister::VCCAUX_UPPER_ALARM, SELF_TEST_DATA);
        let read_back = self.regs.read_drp(DrpRegister::VCCAUX_UPPER_ALARM);
        self.reset();
        if read_back != SELF_TEST_DATA {
            log::warn!(
                "XADC self-test: read back {:#06x}, expected {:#06x}",
                read_back,
                SELF_TEST_DATA
            );
            return Err(SetupError::SelfTestFailed(Self::KIND));
        }
        Ok(())
    }
}
