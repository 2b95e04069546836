//! # Time Stamp Counter
//!
//! RDTSC is available from the Pentium on. Older processors (and some
//! emulators) lack it, which CPUID leaf 1 reports in EDX bit 4.

use crate::timer::CycleCounter;
use core::arch::asm;
use core::arch::x86::{__cpuid, has_cpuid};

/// CPUID.01h:EDX.TSC
const CPUID_TSC: u32 = 1 << 4;

/// Read the Time Stamp Counter
///
/// # Safety
/// The processor must implement RDTSC, otherwise this raises #UD.
#[inline(always)]
pub unsafe fn read_tsc() -> u64 {
    let lo: u32;
    let hi: u32;

    // RDTSC instruction reads 64-bit TSC into EDX:EAX
    unsafe {
        asm!(
            "rdtsc",
            out("eax") lo,
            out("edx") hi,
            options(nostack, nomem, preserves_flags)
        );
    }

    (u64::from(hi) << 32) | u64::from(lo)
}

/// TSC-backed cycle counter
#[derive(Debug, Clone, Copy)]
pub struct TscCounter {
    available: bool,
}

impl TscCounter {
    /// Probe the processor for a usable TSC
    pub fn detect() -> Self {
        let available = has_cpuid() && {
            // SAFETY: CPUID presence was checked above
            let leaf = unsafe { __cpuid(1) };
            leaf.edx & CPUID_TSC != 0
        };
        if !available {
            log::warn!("Processor has no time stamp counter");
        }
        Self { available }
    }
}

impl CycleCounter for TscCounter {
    fn read(&self) -> u64 {
        if !self.available {
            return 0;
        }
        // SAFETY: `detect` confirmed RDTSC support
        unsafe { read_tsc() }
    }

    fn is_available(&self) -> bool {
        self.available
    }
}
