//! # SmartDOS DPMI Profile
//!
//! Composes the HAL, storage and SMART crates into the diagnostic tool
//! that runs under a DPMI DOS extender.
//!
//! - **config**: command-line switches
//! - **console**: DOS console output and the `log` backend
//! - **diag**: the diagnostic sequence
//! - **ffi**: binding to the AHCI driver

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod config;
pub mod console;
pub mod diag;
pub mod ffi;

pub use config::{ConfigError, DiagConfig};
pub use console::{ConsoleLogger, DosConsole};
pub use diag::{DiagError, Diagnostics};
