//! # Register access for the Zybo Z7 interrupt demos
//!
//! This crate covers two groups of peripherals:
//!
//! - Cortex-A9 MPCore peripherals with fixed addresses: the [CPU private timer](priv_tim) and
//!   the [generic interrupt controller](gic).
//! - AXI IP cores instantiated in the programmable logic: [AXI GPIO](axi_gpio) and the
//!   [AXI XADC wizard](xadc). Their base addresses depend on the bitstream, so these blocks
//!   only provide [derive_mmio] constructors for an explicit address.
#![no_std]

pub mod axi_gpio;
pub mod gic;
pub mod mpcore;
pub mod priv_tim;
pub mod xadc;
