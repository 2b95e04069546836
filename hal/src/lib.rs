//! # SmartDOS HAL - Hardware Abstraction Layer
//!
//! This crate is the single boundary between the diagnostic tool and the
//! platform it runs on: a 32-bit protected-mode program hosted by a DPMI
//! DOS extender.
//!
//! ## Design Philosophy
//!
//! Everything that touches real mode, conventional memory or physical
//! memory goes through the [`bridge::RealModeBridge`] trait. The rest of the
//! workspace never issues `int 0x31` or BIOS calls directly, so it can be
//! exercised against [`arch_stubs::StubBridge`] on any host.
//!
//! - **bridge**: real-mode interrupts, DOS memory, physical mappings
//! - **timer**: cycle counter calibration and delays
//! - **arch**: the DPMI and TSC implementations (x86 only)
//! - **arch_stubs**: in-memory fakes for hosts and tests

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod bridge;
pub mod timer;

// Architecture-specific implementations
pub mod arch;

// Stub implementations (hosts and tests)
pub mod arch_stubs;

use core::fmt;

pub use bridge::{ConventionalBlock, CpuFlags, RealModeBridge, RealModeRegisters};
pub use timer::{Calibrator, CycleCounter, Delay};

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

/// Errors that can occur in HAL operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// The operation is not supported on this platform
    NotSupported,
    /// Invalid parameter provided
    InvalidParameter,
    /// The host refused to simulate the real-mode interrupt
    InterruptFailed {
        /// Interrupt vector that was requested
        vector: u8,
    },
    /// Not enough conventional memory for the request
    OutOfConventionalMemory {
        /// Largest block still available, in paragraphs
        largest_available: u16,
    },
    /// The selector does not refer to a DOS memory block
    InvalidSelector,
    /// The host refused the physical address mapping
    MappingFailed,
    /// Address is invalid or not currently mapped
    InvalidAddress,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported => write!(f, "operation not supported"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::InterruptFailed { vector } => {
                write!(f, "real-mode interrupt 0x{:02X} failed", vector)
            }
            Self::OutOfConventionalMemory { largest_available } => write!(
                f,
                "out of conventional memory ({} paragraphs available)",
                largest_available
            ),
            Self::InvalidSelector => write!(f, "invalid selector"),
            Self::MappingFailed => write!(f, "physical address mapping failed"),
            Self::InvalidAddress => write!(f, "invalid address"),
        }
    }
}

/// Physical address type
///
/// DPMI hosts address at most 4 GiB, so addresses are 32 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(u32);

impl PhysAddr {
    /// Create a new physical address
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if the address is aligned to the given alignment
    #[inline]
    pub const fn is_aligned(self, align: u32) -> bool {
        self.0 % align == 0
    }

    /// High 16 bits (DPMI passes addresses as BX:CX)
    #[inline]
    pub const fn high_word(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// Low 16 bits
    #[inline]
    pub const fn low_word(self) -> u16 {
        self.0 as u16
    }
}

/// Linear address in the protected-mode address space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct LinearAddr(u32);

impl LinearAddr {
    /// Create a new linear address
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Add an offset to the address
    #[inline]
    pub const fn add(self, offset: u32) -> Self {
        Self(self.0.wrapping_add(offset))
    }
}
