//! # Time units
//!
//! The drivers only deal with timer input clocks and blink periods. Both are 32-bit [fugit]
//! quantities, so the `fugit` extension traits work on them.

/// Peripheral input clock.
pub type Hertz = fugit::HertzU32;

/// Timer period.
pub type Milliseconds = fugit::MillisDurationU32;
