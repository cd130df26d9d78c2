//! # Interrupt bridge
//!
//! Connects interrupt sources to their handlers. The bridge owns the [Gic] driver and a small
//! binding table from [IrqId] to [InterruptSource]. Its [InterruptBridge::dispatch] method is
//! the body of the processor IRQ exception handler: acknowledge at the controller, call the bound
//! source, signal end of interrupt.
//!
//! The complete setup is performed by [setup_interrupt_system]:
//!
//! 1. Look up the configuration of the interrupt controller.
//! 2. Initialize the controller.
//! 3. Connect each interrupt ID to its source.
//! 4. Enable each source at the controller.
//! 5. Register the bridge as the IRQ exception handler of the [Processor].
//! 6. Enable IRQ exceptions at the processor.
//!
//! Every step fails fast. Nothing is retried.
use heapless::LinearMap;
use log::debug;

use crate::{
    config::{DeviceId, DeviceTable, GicConfig},
    gic::{Gic, GicRegisters, Interrupt, IrqId},
    init::{SelfTest, SetupError, initialize},
};

/// Maximum number of sources which can be bound to one [InterruptBridge].
pub const MAX_BINDINGS: usize = 4;

/// Handler of one interrupt source.
///
/// [Self::handle] runs in interrupt context. It must be short and must not block.
pub trait InterruptSource: Sync {
    fn handle(&self);
}

/// Handler registered for the processor IRQ exception.
pub trait IrqHandler {
    fn on_irq(&mut self);
}

/// Processor level interrupt control.
pub trait Processor<H> {
    /// Install `handler` as the IRQ exception handler.
    fn register_irq_handler(&mut self, handler: H);

    /// Unmask IRQ exceptions.
    fn enable_irq(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("interrupt controller is not initialized")]
    ControllerNotReady,
    #[error("interrupt ID {0} can not be bound")]
    InvalidId(u16),
    #[error("{0} is already bound")]
    AlreadyBound(IrqId),
    #[error("{0} has no bound handler")]
    NotConnected(IrqId),
    #[error("binding table is full")]
    TableFull,
}

/// Result of one [InterruptBridge::dispatch] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled(IrqId),
    /// The interrupt was acknowledged and completed, but no source is bound to it.
    Unhandled(u16),
    Spurious,
    NotReady,
}

pub struct InterruptBridge<'a, R> {
    gic: Option<Gic<R>>,
    bindings: LinearMap<IrqId, &'a dyn InterruptSource, MAX_BINDINGS>,
    unhandled: u32,
}

impl<R: GicRegisters> Default for InterruptBridge<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R: GicRegisters> InterruptBridge<'a, R> {
    pub const fn new() -> Self {
        Self {
            gic: None,
            bindings: LinearMap::new(),
            unhandled: 0,
        }
    }

    /// Look up and initialize the interrupt controller.
    pub fn initialize(
        &mut self,
        table: &DeviceTable,
        id: DeviceId,
        open: impl FnOnce(&'static GicConfig) -> Option<R>,
    ) -> Result<(), SetupError> {
        let gic = initialize::<Gic<R>>(table, id, SelfTest::Skip, open)?;
        self.gic = Some(gic);
        Ok(())
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.gic.is_some()
    }

    /// Bind `source` to the interrupt `id`.
    pub fn connect(
        &mut self,
        id: IrqId,
        source: &'a dyn InterruptSource,
    ) -> Result<(), BindError> {
        if self.gic.is_none() {
            return Err(BindError::ControllerNotReady);
        }
        if let Interrupt::Invalid(raw) = id.interrupt() {
            return Err(BindError::InvalidId(raw));
        }
        if self.bindings.contains_key(&id) {
            return Err(BindError::AlreadyBound(id));
        }
        self.bindings
            .insert(id, source)
            .map_err(|_| BindError::TableFull)?;
        debug!("{} connected", id);
        Ok(())
    }

    /// Enable a connected source at the controller.
    pub fn enable(&mut self, id: IrqId) -> Result<(), BindError> {
        let gic = self.gic.as_mut().ok_or(BindError::ControllerNotReady)?;
        if !self.bindings.contains_key(&id) {
            return Err(BindError::NotConnected(id));
        }
        gic.enable_interrupt(id);
        debug!("{} enabled", id);
        Ok(())
    }

    #[inline]
    pub fn is_bound(&self, id: IrqId) -> bool {
        self.bindings.contains_key(&id)
    }

    /// Number of acknowledged interrupts without a bound source.
    #[inline]
    pub fn unhandled_count(&self) -> u32 {
        self.unhandled
    }

    /// Handle the highest pending interrupt.
    ///
    /// Spurious interrupts are not completed at the controller. Every other acknowledged
    /// interrupt is, whether a source is bound to it or not.
    pub fn dispatch(&mut self) -> Dispatch {
        let Some(gic) = self.gic.as_mut() else {
            return Dispatch::NotReady;
        };
        let irq_info = gic.acknowledge_interrupt();
        if irq_info.interrupt() == Interrupt::Spurious {
            return Dispatch::Spurious;
        }
        let bound = irq_info
            .irq_id()
            .and_then(|id| self.bindings.get(&id).map(|source| (id, *source)));
        let result = match bound {
            Some((id, source)) => {
                source.handle();
                Dispatch::Handled(id)
            }
            None => {
                self.unhandled = self.unhandled.wrapping_add(1);
                Dispatch::Unhandled(irq_info.raw_id())
            }
        };
        gic.end_of_interrupt(irq_info);
        result
    }
}

impl<R: GicRegisters> IrqHandler for InterruptBridge<'_, R> {
    #[inline]
    fn on_irq(&mut self) {
        self.dispatch();
    }
}

/// Set up the interrupt controller, bind all `sources` and hook the bridge into the processor
/// IRQ exception.
///
/// The processor only receives the bridge once all controller steps succeeded, and IRQs are
/// only unmasked after that.
pub fn setup_interrupt_system<'a, R, P>(
    table: &DeviceTable,
    gic_id: DeviceId,
    open: impl FnOnce(&'static GicConfig) -> Option<R>,
    sources: &[(IrqId, &'a dyn InterruptSource)],
    cpu: &mut P,
) -> Result<(), SetupError>
where
    R: GicRegisters,
    P: Processor<InterruptBridge<'a, R>>,
{
    let mut bridge = InterruptBridge::new();
    bridge.initialize(table, gic_id, open)?;
    for &(id, source) in sources {
        bridge.connect(id, source)?;
        bridge.enable(id)?;
    }
    cpu.register_irq_handler(bridge);
    cpu.enable_irq();
    debug!("IRQ exceptions enabled");
    Ok(())
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::{
        DeviceKind,
        config::{GIC_0, ZYBO_Z7},
        sim::{SimCpu, SimGic},
    };

    struct CountingSource(AtomicU32);

    impl CountingSource {
        const fn new() -> Self {
            Self(AtomicU32::new(0))
        }

        fn count(&self) -> u32 {
            self.0.load(Ordering::Relaxed)
        }
    }

    impl InterruptSource for CountingSource {
        fn handle(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn ready_bridge<'a>(sim: &SimGic) -> InterruptBridge<'a, &SimGic> {
        let mut bridge = InterruptBridge::new();
        bridge.initialize(&ZYBO_Z7, GIC_0, |_| Some(sim)).unwrap();
        bridge
    }

    #[test]
    fn controller_initialization() {
        let sim = SimGic::new();
        let bridge = ready_bridge(&sim);
        assert!(bridge.is_ready());
        assert!(sim.distributor_enabled());
        assert!(sim.cpu_interface_enabled());
        assert_eq!(sim.priority_mask(), 0xff);
        assert_eq!(sim.spi_config(), crate::gic::SPI_FIXED_CONFIG);
        assert_eq!(sim.spi_targets(), crate::gic::TARGETS_ALL_CPU_0_IPTR_VAL);
    }

    #[test]
    fn controller_not_ready() {
        let sim = SimGic::not_ready();
        let mut bridge = InterruptBridge::new();
        assert_eq!(
            bridge.initialize(&ZYBO_Z7, GIC_0, |_| Some(&sim)),
            Err(SetupError::InitializationFailed(DeviceKind::InterruptController))
        );
        assert!(!bridge.is_ready());
        assert!(!sim.distributor_enabled());
    }

    #[test]
    fn connect_before_initialize_fails() {
        let source = CountingSource::new();
        let mut bridge: InterruptBridge<'_, &SimGic> = InterruptBridge::new();
        assert_eq!(
            bridge.connect(IrqId::PRIVATE_TIMER, &source),
            Err(BindError::ControllerNotReady)
        );
        assert_eq!(
            bridge.enable(IrqId::PRIVATE_TIMER),
            Err(BindError::ControllerNotReady)
        );
        assert!(!bridge.is_bound(IrqId::PRIVATE_TIMER));
        assert_eq!(bridge.dispatch(), Dispatch::NotReady);
    }

    #[test]
    fn binding_errors() {
        let sim = SimGic::new();
        let sources = [
            CountingSource::new(),
            CountingSource::new(),
            CountingSource::new(),
            CountingSource::new(),
            CountingSource::new(),
        ];
        let mut bridge = ready_bridge(&sim);
        bridge.connect(IrqId::PRIVATE_TIMER, &sources[0]).unwrap();
        assert_eq!(
            bridge.connect(IrqId::PRIVATE_TIMER, &sources[1]),
            Err(BindError::AlreadyBound(IrqId::PRIVATE_TIMER))
        );
        // IDs 16 to 26 are not implemented by the distributor.
        assert_eq!(
            bridge.connect(IrqId::new(20).unwrap(), &sources[1]),
            Err(BindError::InvalidId(20))
        );
        assert_eq!(
            bridge.enable(IrqId::pl_irq(1)),
            Err(BindError::NotConnected(IrqId::pl_irq(1)))
        );
        assert!(!sim.is_enabled(IrqId::pl_irq(1)));
        for (idx, source) in sources[1..4].iter().enumerate() {
            bridge.connect(IrqId::pl_irq(idx as u8), source).unwrap();
        }
        assert_eq!(
            bridge.connect(IrqId::pl_irq(5), &sources[4]),
            Err(BindError::TableFull)
        );
    }

    #[test]
    fn dispatch_to_bound_source() {
        let sim = SimGic::new();
        let source = CountingSource::new();
        let mut bridge = ready_bridge(&sim);
        bridge.connect(IrqId::PRIVATE_TIMER, &source).unwrap();
        bridge.enable(IrqId::PRIVATE_TIMER).unwrap();
        assert!(sim.is_enabled(IrqId::PRIVATE_TIMER));

        sim.raise(IrqId::PRIVATE_TIMER.raw());
        assert_eq!(bridge.dispatch(), Dispatch::Handled(IrqId::PRIVATE_TIMER));
        assert_eq!(source.count(), 1);
        assert_eq!(sim.eoi_count(), 1);
        assert_eq!(sim.last_eoi(), Some(IrqId::PRIVATE_TIMER.raw()));
    }

    #[test]
    fn spurious_interrupt_is_not_completed() {
        let sim = SimGic::new();
        let mut bridge = ready_bridge(&sim);
        assert_eq!(bridge.dispatch(), Dispatch::Spurious);
        assert_eq!(sim.eoi_count(), 0);
        assert_eq!(bridge.unhandled_count(), 0);
    }

    #[test]
    fn unbound_interrupt_is_completed_and_reported() {
        let sim = SimGic::new();
        let mut bridge = ready_bridge(&sim);
        sim.raise(61);
        assert_eq!(bridge.dispatch(), Dispatch::Unhandled(61));
        assert_eq!(sim.eoi_count(), 1);
        assert_eq!(sim.last_eoi(), Some(61));
        assert_eq!(bridge.unhandled_count(), 1);
    }

    #[test]
    fn full_setup_hooks_processor() {
        let sim = SimGic::new();
        let source = CountingSource::new();
        let mut cpu = SimCpu::new();
        setup_interrupt_system(
            &ZYBO_Z7,
            GIC_0,
            |_| Some(&sim),
            &[(IrqId::pl_irq(0), &source as &dyn InterruptSource)],
            &mut cpu,
        )
        .unwrap();
        assert!(cpu.irq_enabled());
        assert!(sim.is_enabled(IrqId::pl_irq(0)));

        sim.raise(61);
        assert!(cpu.fire());
        assert_eq!(source.count(), 1);
        assert_eq!(sim.eoi_count(), 1);
    }

    #[test]
    fn unknown_controller_leaves_processor_untouched() {
        let sim = SimGic::new();
        let source = CountingSource::new();
        let mut cpu = SimCpu::new();
        let result = setup_interrupt_system(
            &ZYBO_Z7,
            DeviceId(3),
            |_| Some(&sim),
            &[(IrqId::PRIVATE_TIMER, &source as &dyn InterruptSource)],
            &mut cpu,
        );
        assert_eq!(
            result,
            Err(SetupError::ConfigNotFound {
                kind: DeviceKind::InterruptController,
                id: DeviceId(3)
            })
        );
        assert!(!cpu.irq_enabled());
        assert!(!cpu.has_handler());
        assert!(!sim.is_enabled(IrqId::PRIVATE_TIMER));
    }
}
