//! # x86 (DPMI) Architecture HAL Implementation
//!
//! This module provides the hardware abstraction layer for a 32-bit
//! protected-mode client of a DPMI host: the real-mode bridge over
//! `int 0x31` and the time-stamp counter.

pub mod dpmi;
pub mod tsc;

pub use dpmi::{Dpmi, DpmiFlags, DpmiVersion};
pub use tsc::TscCounter;
