//! # SmartDOS - DOS Executable Entry
//!
//! Linked by the DOS extender toolchain together with its C runtime and
//! the AHCI driver; the runtime calls `main` once the program runs as a
//! DPMI client.

#![no_std]
#![no_main]

use core::ffi::{c_char, c_int, CStr};
use core::fmt::Write;
use core::panic::PanicInfo;
use smartdos_dpmi::ffi::ExternAhci;
use smartdos_dpmi::{ConsoleLogger, DiagConfig, Diagnostics, DosConsole};
use smartdos_hal::arch::current::{Dpmi, TscCounter};
use smartdos_hal::timer::BiosDelay;
use spin::{Mutex, Once};

/// Exit code after a panic
const PANIC_EXIT: u8 = 0xFF;

/// Exit code for bad command-line switches
const USAGE_EXIT: c_int = 1;

static BRIDGE: Once<Dpmi> = Once::new();
static LOGGER: ConsoleLogger = ConsoleLogger::new();
static AHCI: Mutex<ExternAhci> = Mutex::new(ExternAhci::new());
static DIAGNOSTICS: Mutex<Diagnostics> = Mutex::new(Diagnostics::new(DiagConfig::DEFAULT));

/// Program entry, called by the C runtime
#[no_mangle]
pub extern "C" fn main(argc: c_int, argv: *const *const c_char) -> c_int {
    // SAFETY: the extender starts us as a DPMI client with DS = ES
    let bridge: &'static Dpmi = BRIDGE.call_once(|| unsafe { Dpmi::new() });
    LOGGER.attach(bridge);

    let mut console = DosConsole::new(bridge);

    let argc = usize::try_from(argc).unwrap_or(0);
    let args = (1..argc).filter_map(|i| {
        // SAFETY: the runtime passes argc pointers to NUL-terminated strings
        let arg = unsafe { *argv.add(i) };
        if arg.is_null() {
            return None;
        }
        unsafe { CStr::from_ptr(arg) }.to_str().ok()
    });

    let config = match DiagConfig::from_args(args) {
        Ok(config) => config,
        Err(err) => {
            let _ = writeln!(console, "{}", err);
            let _ = writeln!(console, "Usage: SMARTDOS [/D:n] [/T:ms] [/Q] [/C] [/V]");
            return USAGE_EXIT;
        }
    };

    if LOGGER.install(config.log_level).is_err() {
        let _ = writeln!(console, "Logger already installed");
    }
    let version = bridge.version();
    log::info!("SmartDOS on DPMI {}.{:02}", version.major, version.minor);

    let counter = TscCounter::detect();
    let delay = BiosDelay::new(bridge);

    let mut diag = DIAGNOSTICS.lock();
    diag.configure(config);
    let mut ahci = AHCI.lock();
    let code = diag.run(&mut *ahci, &counter, &delay, &mut console);

    c_int::from(code)
}

#[panic_handler]
fn panic(info: &PanicInfo<'_>) -> ! {
    if let Some(bridge) = BRIDGE.get() {
        let mut console = DosConsole::new(bridge);
        let _ = writeln!(console, "\nSmartDOS panic: {}", info);
        let _ = console.terminate(PANIC_EXIT);
    }

    loop {
        core::hint::spin_loop();
    }
}
