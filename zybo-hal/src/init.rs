//! # Device initializer
//!
//! Every driver of this crate implements [Device]. [initialize] performs the common sequence:
//! look up the configuration entry of a [DeviceId], create the driver on top of the register
//! block for that entry and optionally run the driver self-test. Each step maps to one
//! [SetupError] variant so callers can report exactly which step failed.
use core::fmt;

use log::{debug, warn};

use crate::{
    config::{DeviceId, DeviceTable},
    irq::BindError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    PrivateTimer,
    Gpio,
    XAdc,
    InterruptController,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::PrivateTimer => "private timer",
            DeviceKind::Gpio => "AXI GPIO",
            DeviceKind::XAdc => "XADC",
            DeviceKind::InterruptController => "interrupt controller",
        };
        f.write_str(name)
    }
}

/// Setup failures. None of them are retried: the hardware description is fixed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("no configuration for {kind} {id}")]
    ConfigNotFound { kind: DeviceKind, id: DeviceId },
    #[error("{0} initialization failed")]
    InitializationFailed(DeviceKind),
    #[error("{0} self-test failed")]
    SelfTestFailed(DeviceKind),
    #[error("{0} register block is already in use")]
    InUse(DeviceKind),
    #[error("interrupt binding failed: {0}")]
    InterruptBinding(#[from] BindError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTest {
    Run,
    Skip,
}

/// Driver which can be created from an entry of the [DeviceTable].
pub trait Device: Sized {
    type Config: 'static;
    type Regs;

    const KIND: DeviceKind;

    fn lookup(table: &DeviceTable, id: DeviceId) -> Option<&'static Self::Config>;

    /// Create the driver for the given configuration entry.
    fn cfg_initialize(config: &'static Self::Config, regs: Self::Regs) -> Result<Self, SetupError>;

    /// Built-in sanity check of the hardware. Drivers without a self-test always pass.
    fn self_test(&mut self) -> Result<(), SetupError> {
        Ok(())
    }
}

/// Look up, initialize and optionally self-test a device.
///
/// `open` maps the configuration entry to the register block of the device, or returns [None]
/// when the block was already handed out. On the target, this is usually an MMIO block at the
/// configured base address, see [crate::board::Board].
pub fn initialize<D: Device>(
    table: &DeviceTable,
    id: DeviceId,
    self_test: SelfTest,
    open: impl FnOnce(&'static D::Config) -> Option<D::Regs>,
) -> Result<D, SetupError> {
    let config = D::lookup(table, id).ok_or_else(|| {
        warn!("{} {}: no configuration found", D::KIND, id);
        SetupError::ConfigNotFound { kind: D::KIND, id }
    })?;
    let regs = open(config).ok_or_else(|| {
        warn!("{} {}: register block already in use", D::KIND, id);
        SetupError::InUse(D::KIND)
    })?;
    let mut device = D::cfg_initialize(config, regs)?;
    if self_test == SelfTest::Run {
        device.self_test()?;
    }
    debug!("{} {} initialized", D::KIND, id);
    Ok(device)
}
