//! # DPMI Host Interface
//!
//! Real-mode bridge backed by the DPMI host's `int 0x31` services.
//!
//! ## Register conventions
//!
//! LLVM reserves EBX and ESI on 32-bit x86, so both are saved and loaded
//! inside the asm blocks rather than bound as operands. The host signals
//! failure with the carry flag, captured with `setc` before anything else
//! can clobber it.

use crate::bridge::{paragraphs_for, ConventionalBlock, RealModeBridge, RealModeRegisters};
use crate::{HalError, HalResult, LinearAddr, PhysAddr};
use bitflags::bitflags;
use core::arch::asm;

/// DPMI function numbers (AX)
mod function {
    pub const ALLOCATE_DOS_MEMORY: u32 = 0x0100;
    pub const FREE_DOS_MEMORY: u32 = 0x0101;
    pub const SIMULATE_INTERRUPT: u32 = 0x0300;
    pub const GET_VERSION: u32 = 0x0400;
    pub const MAP_PHYSICAL: u32 = 0x0800;
    pub const UNMAP_PHYSICAL: u32 = 0x0801;
}

bitflags! {
    /// Host capabilities reported by function 0400h (BX)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DpmiFlags: u16 {
        /// Host is a 32-bit implementation
        const HOST_32BIT = 1 << 0;
        /// Reflected interrupts switch the CPU to real mode (not V86)
        const REAL_MODE_REFLECTION = 1 << 1;
        /// Virtual memory is supported
        const VIRTUAL_MEMORY = 1 << 2;
    }
}

/// DPMI host version information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DpmiVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Host capabilities
    pub flags: DpmiFlags,
    /// Processor type (3 = 386, 4 = 486, 5 = Pentium, ...)
    pub processor: u8,
}

/// Bridge over a DPMI host
#[derive(Debug)]
pub struct Dpmi {
    version: DpmiVersion,
}

impl Dpmi {
    /// Attach to the DPMI host the program runs under
    ///
    /// # Safety
    /// The program must be a protected-mode client of a DPMI host, with DS
    /// and ES addressing the same flat data segment.
    pub unsafe fn new() -> Self {
        let version = unsafe { query_version() };
        log::info!(
            "DPMI host {}.{:02} (flags {:?}, cpu {}86)",
            version.major,
            version.minor,
            version.flags,
            version.processor
        );
        Self { version }
    }

    /// Version reported by the host
    pub fn version(&self) -> DpmiVersion {
        self.version
    }
}

/// Query the host version (function 0400h, cannot fail)
///
/// # Safety
/// Must run under a DPMI host.
unsafe fn query_version() -> DpmiVersion {
    let ax: u32;
    let flags: u32;
    let cpu: u32;

    unsafe {
        asm!(
            "push ebx",
            "int 0x31",
            "movzx edi, bx",
            "pop ebx",
            inout("eax") function::GET_VERSION => ax,
            out("edi") flags,
            out("ecx") cpu,
            out("edx") _,
        );
    }

    DpmiVersion {
        major: (ax >> 8) as u8,
        minor: ax as u8,
        flags: DpmiFlags::from_bits_truncate(flags as u16),
        processor: cpu as u8,
    }
}

impl RealModeBridge for Dpmi {
    fn simulate_interrupt(
        &self,
        vector: u8,
        regs: &RealModeRegisters,
    ) -> HalResult<RealModeRegisters> {
        let mut frame = *regs;
        // The host supplies a real-mode stack when SS:SP is zero
        frame.ss = 0;
        frame.sp = 0;
        frame.reserved = 0;

        let carry: u32;
        // SAFETY: ES:EDI points at a live call structure for the duration
        // of the call; the host writes the output registers back into it.
        unsafe {
            asm!(
                "push ebx",
                "push es",
                "push ds",
                "pop es",
                "mov ebx, edx",
                "xor ecx, ecx",
                "int 0x31",
                "setc dl",
                "movzx edx, dl",
                "pop es",
                "pop ebx",
                inout("eax") function::SIMULATE_INTERRUPT => _,
                inout("edx") u32::from(vector) => carry,
                out("ecx") _,
                in("edi") &mut frame as *mut RealModeRegisters,
            );
        }

        if carry != 0 {
            log::error!("DPMI: simulate int {:#04x} failed", vector);
            return Err(HalError::InterruptFailed { vector });
        }
        log::trace!("DPMI: int {:#04x} -> ax={:#06x}", vector, frame.ax());
        Ok(frame)
    }

    fn allocate_conventional(&self, size: u32) -> HalResult<ConventionalBlock> {
        let paragraphs = paragraphs_for(size)?;

        let ax: u32;
        let dx: u32;
        let result: u32;
        // SAFETY: function 0100h only reads BX and returns in AX/BX/DX
        unsafe {
            asm!(
                "push ebx",
                "mov ebx, ecx",
                "int 0x31",
                "setc cl",
                "movzx ecx, cl",
                "shl ebx, 16",
                "or ecx, ebx",
                "pop ebx",
                inout("eax") function::ALLOCATE_DOS_MEMORY => ax,
                inout("ecx") u32::from(paragraphs) => result,
                out("edx") dx,
            );
        }

        // ECX = largest available block (high word) | carry (low byte)
        if result & 0xFF != 0 {
            let largest_available = (result >> 16) as u16;
            log::error!(
                "DPMI: DOS allocation of {} paragraphs failed (error {:#06x}, {} free)",
                paragraphs,
                ax as u16,
                largest_available
            );
            return Err(HalError::OutOfConventionalMemory { largest_available });
        }

        let block = ConventionalBlock::new(ax as u16, dx as u16, paragraphs);
        log::debug!(
            "DPMI: {} paragraphs at segment {:#06x} (selector {:#06x})",
            paragraphs,
            block.segment(),
            block.selector()
        );
        Ok(block)
    }

    fn free_conventional(&self, block: ConventionalBlock) -> HalResult<()> {
        let carry: u32;
        // SAFETY: the selector came from function 0100h and is consumed here
        unsafe {
            asm!(
                "int 0x31",
                "setc cl",
                "movzx ecx, cl",
                inout("eax") function::FREE_DOS_MEMORY => _,
                in("edx") u32::from(block.selector()),
                out("ecx") carry,
            );
        }

        if carry != 0 {
            log::error!("DPMI: free of selector {:#06x} failed", block.selector());
            return Err(HalError::InvalidSelector);
        }
        Ok(())
    }

    fn map_physical(&self, addr: PhysAddr, size: u32) -> HalResult<LinearAddr> {
        if size == 0 {
            return Err(HalError::InvalidParameter);
        }

        let carry: u32;
        let linear: u32;
        // SAFETY: function 0800h takes BX:CX = address, SI:DI = size and
        // returns BX:CX = linear address; EBX and ESI are restored.
        unsafe {
            asm!(
                "push ebx",
                "push esi",
                "mov ebx, edx",
                "shr ebx, 16",
                "mov ecx, edx",
                "mov esi, edi",
                "shr esi, 16",
                "int 0x31",
                "setc al",
                "movzx eax, al",
                "shl ebx, 16",
                "mov bx, cx",
                "mov edx, ebx",
                "pop esi",
                "pop ebx",
                inout("eax") function::MAP_PHYSICAL => carry,
                inout("edx") addr.as_u32() => linear,
                inout("edi") size => _,
                out("ecx") _,
            );
        }

        if carry != 0 {
            log::error!(
                "DPMI: mapping {:#010x}+{:#x} failed",
                addr.as_u32(),
                size
            );
            return Err(HalError::MappingFailed);
        }
        log::debug!("DPMI: {:#010x} mapped at {:#010x}", addr.as_u32(), linear);
        Ok(LinearAddr::new(linear))
    }

    fn unmap_physical(&self, linear: LinearAddr) -> HalResult<()> {
        let carry: u32;
        // SAFETY: function 0801h takes BX:CX = linear address
        unsafe {
            asm!(
                "push ebx",
                "mov ebx, edx",
                "shr ebx, 16",
                "mov ecx, edx",
                "int 0x31",
                "setc al",
                "movzx eax, al",
                "pop ebx",
                inout("eax") function::UNMAP_PHYSICAL => carry,
                in("edx") linear.as_u32(),
                out("ecx") _,
            );
        }

        if carry != 0 {
            log::error!("DPMI: unmapping {:#010x} failed", linear.as_u32());
            return Err(HalError::InvalidAddress);
        }
        Ok(())
    }
}
