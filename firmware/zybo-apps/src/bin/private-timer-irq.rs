//! LED blinky driven by the CPU private timer interrupt.
#![no_std]
#![no_main]

use aarch32_cpu::asm::nop;
use core::panic::PanicInfo;
use log::{error, info};
use static_cell::StaticCell;
use zybo_demo::blinky::{BlinkConfig, interrupt::TimerBlinker};
use zybo_hal::{
    board::{Board, MmioBoard},
    config::ZYBO_Z7,
};
use zybo_apps::ArmCore;
use zynq7000_rt as _;

const INIT_STRING: &str = "-- Zybo Z7 private timer interrupt example --\n\r";

type Blinker = TimerBlinker<<MmioBoard as Board>::Timer, <MmioBoard as Board>::Gpio>;

static BLINKER: StaticCell<Blinker> = StaticCell::new();

#[zynq7000_rt::entry]
fn main() -> ! {
    zybo_apps::init(INIT_STRING, log::LevelFilter::Debug);
    let mut board = MmioBoard::take().unwrap();
    let mut cpu = ArmCore::take().unwrap();
    let blinker = match TimerBlinker::init(&mut board, &ZYBO_Z7, &BlinkConfig::default()) {
        Ok(blinker) => BLINKER.init(blinker),
        Err(e) => zybo_apps::halt_on_error("private timer setup", e),
    };
    let blinker: &'static Blinker = blinker;
    if let Err(e) = blinker.arm(&mut board, &ZYBO_Z7, &mut cpu) {
        zybo_apps::halt_on_error("private timer interrupt setup", e);
    }
    info!("private timer interrupt example running");
    // All work happens in the interrupt handler.
    loop {
        nop();
    }
}

#[zynq7000_rt::irq]
fn irq_handler() {
    zybo_apps::on_irq();
}

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
