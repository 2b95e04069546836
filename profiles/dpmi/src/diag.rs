//! # Diagnostic Run
//!
//! The fixed sequence of one invocation:
//!
//! 1. Calibrate the cycle timer
//! 2. Detect the controller (absent: clean exit)
//! 3. Enumerate drives and print their identification
//! 4. Open a transfer session on the selected drive
//! 5. Read SMART data, evaluate it, print the report
//! 6. Close the session and shut the controller down
//!
//! Steps 4 to 6 are paired: every exit path after a successful detection
//! closes what was opened.

use crate::config::DiagConfig;
use core::fmt::{self, Write};
use smartdos_hal::timer::{Calibrator, CycleCounter, Delay};
use smartdos_smart::{evaluate, write_report, Evaluation, SmartState};
use smartdos_storage::{DriveTable, IdentString, StorageController, TransferSession};

/// Reasons a run ends early
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagError {
    /// No AHCI controller
    ControllerAbsent,
    /// Controller found no drive
    NoDrives,
    /// Selected drive does not exist
    NoSuchDrive {
        /// Requested index
        index: usize,
        /// Drives found
        found: usize,
    },
    /// SMART data could not be read
    AcquisitionFailure {
        /// Model of the drive
        model: IdentString,
    },
    /// Console output failed
    Output,
}

impl DiagError {
    /// Process exit code for the error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ControllerAbsent | Self::NoDrives => 0,
            Self::NoSuchDrive { .. } | Self::AcquisitionFailure { .. } | Self::Output => 1,
        }
    }
}

impl From<fmt::Error> for DiagError {
    fn from(_: fmt::Error) -> Self {
        Self::Output
    }
}

impl fmt::Display for DiagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControllerAbsent => write!(f, "AHCI controller not detected error!"),
            Self::NoDrives => write!(f, "No drives found."),
            Self::NoSuchDrive { index, found } => {
                write!(f, "Drive nr {} not found, {} drives detected.", index, found)
            }
            Self::AcquisitionFailure { model } => {
                write!(f, "Could not get SMART data from {}.", model)
            }
            Self::Output => write!(f, "Console output failed."),
        }
    }
}

/// State of the diagnostic tool
#[derive(Debug)]
pub struct Diagnostics {
    config: DiagConfig,
    calibrator: Calibrator,
    drives: DriveTable,
    smart: SmartState,
}

impl Diagnostics {
    /// Create the context for `config`
    pub const fn new(config: DiagConfig) -> Self {
        Self {
            calibrator: Calibrator::new(config.calibration_interval_ms),
            config,
            drives: DriveTable::new(),
            smart: SmartState::new(),
        }
    }

    /// Replace the configuration
    pub fn configure(&mut self, config: DiagConfig) {
        self.calibrator = Calibrator::new(config.calibration_interval_ms);
        self.config = config;
    }

    /// Active configuration
    pub fn config(&self) -> &DiagConfig {
        &self.config
    }

    /// Timer calibration of the last run
    pub fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }

    /// Drives found by the last run
    pub fn drives(&self) -> &DriveTable {
        &self.drives
    }

    /// SMART data of the last run
    pub fn smart(&self) -> &SmartState {
        &self.smart
    }

    /// Run the whole diagnostic and return the process exit code
    pub fn run<C, K, D, W>(&mut self, controller: &mut C, counter: &K, delay: &D, out: &mut W) -> u8
    where
        C: StorageController + ?Sized,
        K: CycleCounter + ?Sized,
        D: Delay + ?Sized,
        W: Write + ?Sized,
    {
        match self.diagnose(controller, counter, delay, out) {
            Ok(eval) => {
                log::info!("Diagnostic complete: drive {}", eval.status);
                0
            }
            Err(err) => {
                match err.exit_code() {
                    0 => log::info!("{}", err),
                    _ => log::error!("{}", err),
                }
                let _ = writeln!(out, "{}", err);
                err.exit_code()
            }
        }
    }

    /// Run the diagnostic, reporting why it stopped early
    pub fn diagnose<C, K, D, W>(
        &mut self,
        controller: &mut C,
        counter: &K,
        delay: &D,
        out: &mut W,
    ) -> Result<Evaluation, DiagError>
    where
        C: StorageController + ?Sized,
        K: CycleCounter + ?Sized,
        D: Delay + ?Sized,
        W: Write + ?Sized,
    {
        let cycles = self.calibrator.calibrate(counter, delay);
        if self.config.show_calibration {
            writeln!(
                out,
                "Timer : {} cycles per {} ms",
                cycles,
                self.calibrator.interval_ms()
            )?;
        }

        if !controller.detect() {
            return Err(DiagError::ControllerAbsent);
        }

        let result = self.examine(controller, out);
        controller.shutdown();
        result
    }

    fn examine<C, W>(&mut self, controller: &mut C, out: &mut W) -> Result<Evaluation, DiagError>
    where
        C: StorageController + ?Sized,
        W: Write + ?Sized,
    {
        self.drives.clear();
        let reported = controller.enumerate_drives(&mut self.drives);
        if reported != self.drives.len() {
            log::warn!(
                "Controller reported {} drives, table holds {}",
                reported,
                self.drives.len()
            );
        }
        writeln!(out)?;

        if self.config.show_drive_summary {
            for (nr, drive) in self.drives.iter().enumerate() {
                writeln!(
                    out,
                    "Drive nr {} size in sectors : {}, drive nr {} size in GB : {}",
                    nr,
                    drive.total_sectors(),
                    nr,
                    drive.capacity_gb()
                )?;
                writeln!(out, "Drive model : {}", drive.model())?;
                writeln!(out, "Drive serial number : {}", drive.serial())?;
                writeln!(out, "Drive firmware revision : {}", drive.firmware())?;
                writeln!(out)?;
            }
        }

        if self.drives.is_empty() {
            return Err(DiagError::NoDrives);
        }
        let index = self.config.drive_index;
        let drive = self.drives.get(index).ok_or(DiagError::NoSuchDrive {
            index,
            found: self.drives.len(),
        })?;

        let mut session = TransferSession::open(controller, drive);
        self.smart.reset();
        if let Err(err) = session.read_smart(&mut self.smart.table) {
            log::error!("SMART read on port {}: {}", drive.port(), err);
            return Err(DiagError::AcquisitionFailure {
                model: drive.model(),
            });
        }

        let eval = evaluate(&mut self.smart);
        writeln!(out, "SMART data for : {}", drive.model())?;
        writeln!(out)?;
        write_report(out, &self.smart)?;
        Ok(eval)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DiagConfig::DEFAULT)
    }
}
