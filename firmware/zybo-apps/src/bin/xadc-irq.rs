//! Interrupt driven XADC sampling of auxiliary channel 14.
#![no_std]
#![no_main]

use aarch32_cpu::asm::nop;
use core::panic::PanicInfo;
use log::{error, info};
use static_cell::StaticCell;
use zybo_demo::sampler::{AdcSampler, SamplerConfig};
use zybo_hal::{
    board::{Board, MmioBoard},
    config::ZYBO_Z7,
};
use zybo_apps::ArmCore;
use zynq7000_rt as _;

const INIT_STRING: &str = "-- Zybo Z7 XADC interrupt example --\n\r";

type Sampler = AdcSampler<<MmioBoard as Board>::XAdc>;

static SAMPLER: StaticCell<Sampler> = StaticCell::new();

#[zynq7000_rt::entry]
fn main() -> ! {
    zybo_apps::init(INIT_STRING, log::LevelFilter::Debug);
    let mut board = MmioBoard::take().unwrap();
    let mut cpu = ArmCore::take().unwrap();
    let sampler = match AdcSampler::init(&mut board, &ZYBO_Z7, &SamplerConfig::default()) {
        Ok(sampler) => SAMPLER.init(sampler),
        Err(e) => zybo_apps::halt_on_error("XADC setup", e),
    };
    let sampler: &'static Sampler = sampler;
    if let Err(e) = sampler.arm(&mut board, &ZYBO_Z7, &mut cpu) {
        zybo_apps::halt_on_error("XADC interrupt setup", e);
    }
    loop {
        if let Some(sample) = sampler.poll() {
            info!(
                "channel {} raw data {:#06x} ({:.3} V)",
                sample.channel.raw(),
                sample.raw.raw(),
                sample.volts()
            );
        }
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
