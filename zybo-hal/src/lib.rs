//! # HAL for the Zybo Z7 interrupt demos
//!
//! Thin drivers for the four peripherals the demos use, plus the two pieces of plumbing every
//! demo shares:
//!
//! - the [Device Initializer](init) which resolves a [DeviceId](config::DeviceId) against the
//!   board's [DeviceTable](config::DeviceTable), initializes the driver and optionally runs its
//!   self-test;
//! - the [Interrupt Bridge](irq) which binds interrupt sources to handlers at the
//!   [GIC](gic) and hooks the controller dispatch into the processor IRQ exception.
//!
//! All drivers access their registers through small traits ([priv_tim::TimerRegisters],
//! [axi_gpio::GpioRegisters], [xadc::XAdcRegisters], [gic::GicRegisters]). The traits are
//! implemented for the MMIO blocks of [zybo_pac] and, with the `sim` feature, for the simulated
//! register blocks of the [sim] module.
#![no_std]

pub mod axi_gpio;
pub mod board;
pub mod config;
pub mod gic;
pub mod init;
pub mod irq;
pub mod priv_tim;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod time;
pub mod xadc;

pub use init::{DeviceKind, SetupError};
pub use zybo_pac as pac;
