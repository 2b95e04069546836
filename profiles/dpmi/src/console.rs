//! # DOS Console
//!
//! Text output through DOS character output (INT 21h, AH=02h), issued
//! via the real-mode bridge, plus a `log` backend writing to it.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicBool, Ordering};
use log::{LevelFilter, Log, Metadata, Record};
use smartdos_hal::bridge::{RealModeBridge, RealModeRegisters};
use smartdos_hal::HalResult;
use spin::{Mutex, Once};

/// DOS services interrupt
pub const DOS_SERVICES: u8 = 0x21;

/// INT 21h function: write character in DL
const DOS_WRITE_CHAR: u8 = 0x02;

/// INT 21h function: terminate with return code in AL
const DOS_TERMINATE: u8 = 0x4C;

/// Console writing through DOS
#[derive(Debug)]
pub struct DosConsole<B> {
    bridge: B,
}

impl<B: RealModeBridge> DosConsole<B> {
    /// Create a console over `bridge`
    pub const fn new(bridge: B) -> Self {
        Self { bridge }
    }

    /// Write one byte
    pub fn put_byte(&self, byte: u8) -> HalResult<()> {
        let mut regs = RealModeRegisters::new();
        regs.set_ah(DOS_WRITE_CHAR);
        regs.set_dl(byte);
        self.bridge.simulate_interrupt(DOS_SERVICES, &regs)?;
        Ok(())
    }

    /// End the program with `code`
    ///
    /// Only returns if the host refuses the call.
    pub fn terminate(&self, code: u8) -> HalResult<()> {
        let mut regs = RealModeRegisters::new();
        regs.set_ah(DOS_TERMINATE);
        regs.set_al(code);
        self.bridge.simulate_interrupt(DOS_SERVICES, &regs)?;
        Ok(())
    }
}

impl<B: RealModeBridge> Write for DosConsole<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.put_byte(b'\r').map_err(|_| fmt::Error)?;
            }
            self.put_byte(byte).map_err(|_| fmt::Error)?;
        }
        Ok(())
    }
}

/// Bridge shared by the logger
pub type SharedBridge = &'static (dyn RealModeBridge + Sync);

/// Most verbose level the console accepts
///
/// The bridge traces every interrupt it issues, and each console character
/// is one interrupt.
pub const MAX_CONSOLE_LEVEL: LevelFilter = LevelFilter::Debug;

/// `log` backend writing to the DOS console
///
/// Records emitted while a record is being written are dropped, and the
/// level never goes past [`MAX_CONSOLE_LEVEL`].
pub struct ConsoleLogger {
    bridge: Once<SharedBridge>,
    level: Mutex<LevelFilter>,
    busy: AtomicBool,
    installed: AtomicBool,
}

impl ConsoleLogger {
    /// Create a logger with nowhere to write yet
    pub const fn new() -> Self {
        Self {
            bridge: Once::new(),
            level: Mutex::new(LevelFilter::Warn),
            busy: AtomicBool::new(false),
            installed: AtomicBool::new(false),
        }
    }

    /// Give the logger its bridge; later calls are ignored
    pub fn attach(&self, bridge: SharedBridge) {
        self.bridge.call_once(|| bridge);
    }

    /// Change the level filter, capped at [`MAX_CONSOLE_LEVEL`]
    ///
    /// Once installed, the global maximum level follows.
    pub fn set_level(&self, level: LevelFilter) {
        let level = level.min(MAX_CONSOLE_LEVEL);
        *self.level.lock() = level;
        if self.installed.load(Ordering::Acquire) {
            log::set_max_level(level);
        }
    }

    /// Current level filter
    pub fn level(&self) -> LevelFilter {
        *self.level.lock()
    }

    /// Install as the global logger
    pub fn install(&'static self, level: LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_logger(self)?;
        self.installed.store(true, Ordering::Release);
        self.set_level(level);
        Ok(())
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsoleLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLogger")
            .field("attached", &self.bridge.is_completed())
            .field("level", &*self.level.lock())
            .finish()
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= *self.level.lock()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(&bridge) = self.bridge.get() else {
            return;
        };
        if self.busy.swap(true, Ordering::Acquire) {
            return;
        }

        let mut console = DosConsole::new(bridge);
        let _ = writeln!(
            console,
            "[{:<5}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );

        self.busy.store(false, Ordering::Release);
    }

    fn flush(&self) {}
}
