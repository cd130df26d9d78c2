//! Board support shared by the Zybo Z7 demo applications.
#![no_std]

use core::{
    cell::RefCell,
    sync::atomic::{AtomicBool, Ordering},
};

use critical_section::Mutex;
use embedded_io::Write as _;
use zybo_hal::{
    gic::MmioGic,
    irq::{InterruptBridge, IrqHandler, Processor},
};
use zynq7000_hal::{LevelShifterConfig, clocks::Clocks, gpio, time::Hertz, uart};

// Define the clock frequency as a constant.
pub const PS_CLOCK_FREQUENCY: Hertz = Hertz::from_raw(33_333_333);

pub type Bridge = InterruptBridge<'static, MmioGic<'static>>;

/// The only state the IRQ exception handler reads.
static IRQ_BRIDGE: Mutex<RefCell<Option<Bridge>>> = Mutex::new(RefCell::new(None));

/// Perform the runtime defaults, then route log messages to UART1 at 115200 baud.
///
/// The interrupt controller is left alone, it is configured by the interrupt bridge.
pub fn init(banner: &str, level: log::LevelFilter) {
    let periphs = zynq7000_hal::init(zynq7000_hal::Config {
        init_l2_cache: true,
        level_shifter_config: Some(LevelShifterConfig::EnableAll),
        interrupt_config: None,
    })
    .unwrap();
    // Clock was already initialized by PS7 Init TCL script or FSBL, we just read it.
    let clocks = Clocks::new_from_regs(PS_CLOCK_FREQUENCY).unwrap();
    let gpio_pins = gpio::GpioPins::new(periphs.gpio);

    let uart_clk_config = uart::ClockConfig::new_autocalc_with_error(clocks.io_clocks(), 115200)
        .unwrap()
        .0;
    let mut uart = uart::Uart::new_with_mio_for_uart_1(
        periphs.uart_1,
        uart::Config::new_with_clk_config(uart_clk_config),
        (gpio_pins.mio.mio48, gpio_pins.mio.mio49),
    )
    .unwrap();
    uart.write_all(banner.as_bytes()).unwrap();
    // Safety: We are not multi-threaded yet.
    unsafe { zynq7000_hal::log::uart_blocking::init_unsafe_single_core(uart, level, false) };
}

/// Cortex-A9 core 0.
pub struct ArmCore {
    _private: (),
}

impl ArmCore {
    /// Returns [None] when called a second time.
    pub fn take() -> Option<Self> {
        static TAKEN: AtomicBool = AtomicBool::new(false);
        if TAKEN.swap(true, Ordering::Relaxed) {
            return None;
        }
        Some(Self { _private: () })
    }
}

impl Processor<Bridge> for ArmCore {
    fn register_irq_handler(&mut self, handler: Bridge) {
        critical_section::with(|cs| {
            IRQ_BRIDGE.borrow_ref_mut(cs).replace(handler);
        });
    }

    fn enable_irq(&mut self) {
        // Safety: the handler is installed before IRQs are unmasked.
        unsafe { aarch32_cpu::interrupt::enable() };
    }
}

/// Body of the IRQ exception handler.
#[inline]
pub fn on_irq() {
    critical_section::with(|cs| {
        if let Some(bridge) = IRQ_BRIDGE.borrow_ref_mut(cs).as_mut() {
            bridge.on_irq();
        }
    });
}

/// Report a failed setup and halt.
pub fn halt_on_error(what: &str, error: zybo_hal::SetupError) -> ! {
    log::error!("{what} failed: {error}");
    loop {
        aarch32_cpu::asm::nop();
    }
}
