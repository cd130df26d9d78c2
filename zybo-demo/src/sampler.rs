//! # Interrupt driven XADC sampling
//!
//! The XADC converts one auxiliary channel continuously. The end-of-conversion interrupt handler
//! only sets the [EventFlag], the main loop picks up the flag and reads the conversion result.
use core::cell::RefCell;

use critical_section::Mutex;
use log::{debug, info, warn};
use zybo_hal::{
    DeviceKind, SetupError,
    board::Board,
    config::{self, DeviceId, DeviceTable},
    gic::IrqId,
    init::{SelfTest, initialize},
    irq::{InterruptBridge, InterruptSource, Processor, setup_interrupt_system},
    pac::xadc::{InterruptBits, SequencerMode},
    xadc::{CALIBRATION_ALL, Channel, RawSample, SingleChannelParams, XAdc, XAdcRegisters},
};

use crate::flag::EventFlag;

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub xadc_id: DeviceId,
    pub gic_id: DeviceId,
    pub channel: Channel,
    pub increased_acquisition: bool,
    pub event_mode: bool,
    pub bipolar: bool,
}

impl Default for SamplerConfig {
    /// Auxiliary channel 14, continuous unipolar sampling with the longer settling time.
    fn default() -> Self {
        Self {
            xadc_id: config::XADC_0,
            gic_id: config::GIC_0,
            channel: Channel::aux(14),
            increased_acquisition: true,
            event_mode: false,
            bipolar: false,
        }
    }
}

/// One conversion result picked up by the main loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub channel: Channel,
    pub raw: RawSample,
}

impl Sample {
    #[inline]
    pub fn volts(&self) -> f32 {
        self.raw.unipolar_volts()
    }
}

pub struct AdcSampler<R> {
    adc: Mutex<RefCell<XAdc<R>>>,
    flag: EventFlag,
    channel: Channel,
    irq: IrqId,
    gic_id: DeviceId,
}

impl<R: XAdcRegisters + Send> AdcSampler<R> {
    /// Initialize and self-test the XADC and configure single channel sampling. No interrupt is
    /// enabled yet.
    pub fn init<B>(
        board: &mut B,
        table: &DeviceTable,
        config: &SamplerConfig,
    ) -> Result<Self, SetupError>
    where
        B: Board<XAdc = R>,
    {
        let mut adc: XAdc<R> =
            initialize(table, config.xadc_id, SelfTest::Run, |cfg| board.xadc(cfg))?;
        adc.set_sequencer_mode(SequencerMode::Safe);
        adc.set_sequencer_mode(SequencerMode::SingleChannel);
        adc.set_single_channel_params(SingleChannelParams {
            channel: config.channel,
            increased_acquisition: config.increased_acquisition,
            event_mode: config.event_mode,
            bipolar: config.bipolar,
        })
        .map_err(|e| {
            warn!("XADC channel setup failed: {e}");
            SetupError::InitializationFailed(DeviceKind::XAdc)
        })?;
        adc.set_alarm_enables(0);
        adc.set_calibration_enables(CALIBRATION_ALL);
        debug!(
            "XADC IPIER {:#010x}, IPISR {:#010x}, GIER {}",
            adc.interrupts_enabled().raw_value(),
            adc.interrupt_status().raw_value(),
            adc.global_interrupt_enabled()
        );
        Ok(Self {
            irq: adc.config().irq,
            adc: Mutex::new(RefCell::new(adc)),
            flag: EventFlag::new(),
            channel: config.channel,
            gic_id: config.gic_id,
        })
    }

    /// Bind the sampler to the XADC interrupt, then enable the end-of-conversion interrupt.
    pub fn arm<'a, B, P>(
        &'a self,
        board: &mut B,
        table: &DeviceTable,
        cpu: &mut P,
    ) -> Result<(), SetupError>
    where
        B: Board,
        P: Processor<InterruptBridge<'a, B::Gic>>,
    {
        setup_interrupt_system(
            table,
            self.gic_id,
            |cfg| board.gic(cfg),
            &[(self.irq, self as &dyn InterruptSource)],
            cpu,
        )?;
        critical_section::with(|cs| {
            let mut adc = self.adc.borrow_ref_mut(cs);
            adc.enable_interrupts(InterruptBits::new_with_raw_value(InterruptBits::EOC_MASK));
            adc.enable_global_interrupt();
        });
        info!("XADC interrupt configured, sampling channel {}", self.channel.raw());
        Ok(())
    }

    #[inline]
    pub fn irq(&self) -> IrqId {
        self.irq
    }

    #[inline]
    pub fn flag(&self) -> &EventFlag {
        &self.flag
    }

    /// Consume a pending end-of-conversion event and read the conversion result.
    pub fn poll(&self) -> Option<Sample> {
        if !self.flag.take() {
            return None;
        }
        let raw =
            critical_section::with(|cs| self.adc.borrow_ref_mut(cs).adc_data(self.channel));
        Some(Sample {
            channel: self.channel,
            raw,
        })
    }
}

impl<R: XAdcRegisters + Send> InterruptSource for AdcSampler<R> {
    /// Acknowledge all reported events. Only the end of conversion is forwarded to the main loop.
    fn handle(&self) {
        let status = critical_section::with(|cs| {
            let mut adc = self.adc.borrow_ref_mut(cs);
            let status = adc.interrupt_status();
            adc.clear_interrupts(status);
            status
        });
        if status.eoc() {
            self.flag.set();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use zybo_hal::{
        config::ZYBO_Z7,
        irq::IrqHandler,
        pac::xadc::DrpRegister,
        sim::{SimCpu, SimPeripherals, SimXAdc},
        xadc::SELF_TEST_DATA,
    };

    const AUX14: Channel = Channel::aux(14);

    fn raise(sim: &SimPeripherals, cpu: &mut SimCpu<impl IrqHandler>, bits: u32) {
        sim.xadc.raise(bits);
        sim.gic.raise(IrqId::pl_irq(config::XADC_0_PL_IRQ).raw());
        assert!(cpu.fire());
    }

    fn config_1(sim: &SimXAdc) -> u16 {
        sim.drp(DrpRegister::CONFIG_1)
    }

    #[test]
    fn configuration_sequence() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let sampler =
            AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()).unwrap();
        assert_eq!(AUX14.raw(), 30);
        // Self-test resets twice, the threshold register is cleared again.
        assert_eq!(sim.xadc.resets(), 2);
        assert_ne!(sim.xadc.drp(DrpRegister::VCCAUX_UPPER_ALARM), SELF_TEST_DATA);
        // Single channel mode, all calibrations, all alarms disabled.
        assert_eq!(config_1(&sim.xadc), 0x3FFF);
        // Channel 30, increased acquisition, continuous, unipolar.
        assert_eq!(sim.xadc.drp(DrpRegister::CONFIG_0), 0x011E);
        assert!(!sim.xadc.global_interrupt_enabled());
        assert_eq!(sim.xadc.enabled_interrupts(), 0);
        assert_eq!(sampler.irq().raw(), 61);

        let mut cpu = SimCpu::new();
        sampler.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        assert_eq!(sim.xadc.enabled_interrupts(), InterruptBits::EOC_MASK);
        assert!(sim.xadc.global_interrupt_enabled());
        assert!(sim.gic.is_enabled(IrqId::pl_irq(0)));
        assert!(cpu.irq_enabled());
    }

    #[test]
    fn end_of_conversion_sets_flag_once() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let sampler =
            AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()).unwrap();
        let mut cpu = SimCpu::new();
        sampler.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        assert_eq!(sampler.poll(), None);

        // EOC together with end of sequence and an alarm.
        raise(&sim, &mut cpu, InterruptBits::EOC_MASK | 0b1_0001);
        assert!(sampler.flag().is_set());
        assert_eq!(sim.xadc.status(), 0);
        sim.xadc.set_sample(AUX14, 0x8000);
        assert_eq!(
            sampler.poll(),
            Some(Sample {
                channel: AUX14,
                raw: RawSample(0x8000)
            })
        );
        assert_eq!(sampler.poll(), None);
    }

    #[test]
    fn events_between_polls_are_merged() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let sampler =
            AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()).unwrap();
        let mut cpu = SimCpu::new();
        sampler.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        raise(&sim, &mut cpu, InterruptBits::EOC_MASK);
        raise(&sim, &mut cpu, InterruptBits::EOC_MASK);
        assert!(sampler.poll().is_some());
        assert!(sampler.poll().is_none());
        assert_eq!(sim.gic.eoi_count(), 2);
    }

    #[test]
    fn other_events_are_cleared_without_flag() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let sampler =
            AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()).unwrap();
        let mut cpu = SimCpu::new();
        sampler.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        let clears = sim.xadc.status_clears();
        raise(&sim, &mut cpu, 0b100_0001_0000);
        assert!(!sampler.flag().is_set());
        assert_eq!(sim.xadc.status(), 0);
        assert_eq!(sim.xadc.status_clears(), clears + 1);
        assert_eq!(sampler.poll(), None);
    }

    #[test]
    fn sample_to_volts() {
        let sample = Sample {
            channel: AUX14,
            raw: RawSample(0x4000),
        };
        assert_relative_eq!(sample.volts(), 0.25);
        assert_eq!(sample.raw.code(), 0x400);
    }

    #[test]
    fn broken_drp_fails_self_test() {
        let sim = SimPeripherals::new();
        sim.xadc.break_drp();
        let mut board = sim.board();
        assert_eq!(
            AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()).err(),
            Some(SetupError::SelfTestFailed(DeviceKind::XAdc))
        );
        assert!(!sim.gic.distributor_enabled());
    }

    #[test]
    fn unknown_xadc_enables_nothing() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let config = SamplerConfig {
            xadc_id: DeviceId(5),
            ..Default::default()
        };
        assert_eq!(
            AdcSampler::init(&mut board, &ZYBO_Z7, &config).err(),
            Some(SetupError::ConfigNotFound {
                kind: DeviceKind::XAdc,
                id: DeviceId(5)
            })
        );
        assert_eq!(sim.xadc.resets(), 0);
        assert!(!sim.xadc.global_interrupt_enabled());
        assert!(!sim.gic.distributor_enabled());
    }

    #[test]
    fn interrupt_controller_is_set_up_once_per_board() {
        let sim = SimPeripherals::new();
        let mut board = sim.board();
        let sampler =
            AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()).unwrap();
        let mut cpu = SimCpu::new();
        sampler.arm(&mut board, &ZYBO_Z7, &mut cpu).unwrap();
        let mut other_cpu = SimCpu::new();
        assert_eq!(
            sampler.arm(&mut board, &ZYBO_Z7, &mut other_cpu),
            Err(SetupError::InUse(DeviceKind::InterruptController))
        );
        assert!(!other_cpu.irq_enabled());
        assert!(!other_cpu.has_handler());
    }
}
