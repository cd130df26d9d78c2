//! LED blinky with the CPU private timer counter polled by the main loop.
#![no_std]
#![no_main]

use aarch32_cpu::asm::nop;
use core::panic::PanicInfo;
use log::{error, info};
use zybo_demo::blinky::{BlinkConfig, polling::PollingBlinker};
use zybo_hal::{board::MmioBoard, config::ZYBO_Z7};
use zynq7000_rt as _;

const INIT_STRING: &str = "-- Zybo Z7 private timer polling example --\n\r";

#[zynq7000_rt::entry]
fn main() -> ! {
    zybo_apps::init(INIT_STRING, log::LevelFilter::Debug);
    let mut board = MmioBoard::take().unwrap();
    let blinker = match PollingBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()) {
        Ok(blinker) => blinker,
        Err(e) => zybo_apps::halt_on_error("private timer polling setup", e),
    };
    info!("private timer polling example running");
    blinker.run()
}

#[zynq7000_rt::irq]
fn irq_handler() {}

#[zynq7000_rt::exception(DataAbort)]
fn data_abort_handler(_faulting_addr: usize) -> ! {
    loop {
        nop();
    }
}

#[zynq7000_rt::exception(Undefined)]
fn undefined_handler(_faulting_addr: usize) -> ! {
    loop {
        nop();
    }
}

#[zynq7000_rt::exception(PrefetchAbort)]
fn prefetch_handler(_faulting_addr: usize) -> ! {
    loop {
        nop();
    }
}

/// Panic handler
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    error!("Panic: {info:?}");
    loop {}
}
