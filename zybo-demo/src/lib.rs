//! # Zybo Z7 interrupt demos
//!
//! Target independent logic of the demo applications:
//!
//! - [blinky::polling]: LEDs toggled after the private timer counter crossed a threshold which is
//!   polled by the main loop.
//! - [blinky::interrupt]: LEDs toggled by the private timer interrupt handler.
//! - [sampler]: auxiliary XADC channel read whenever the end-of-conversion interrupt has set the
//!   [EventFlag](flag::EventFlag).
//!
//! All setup routines take a [Board](zybo_hal::board::Board) and a
//! [DeviceTable](zybo_hal::config::DeviceTable), so the complete flow runs against the simulated
//! peripherals of [zybo_hal::sim] in the tests of this crate.
#![no_std]

pub mod blinky;
pub mod flag;
pub mod sampler;
