//! # Real-Mode Bridge
//!
//! This module defines the boundary through which protected-mode code
//! reaches services that only exist in real mode.
//!
//! The four operations mirror the DPMI services the tool relies on:
//!
//! | Operation                | DPMI function |
//! |--------------------------|---------------|
//! | simulate interrupt       | 0300h         |
//! | allocate DOS memory      | 0100h         |
//! | free DOS memory          | 0101h         |
//! | map / unmap physical     | 0800h / 0801h |
//!
//! Every operation reports failure through [`HalResult`]; none of them
//! panics. The bridge does not remember what callers allocated or mapped:
//! pairing allocate/free and map/unmap is the caller's job, which the
//! [`DosBuffer`] and [`PhysicalMapping`] guards do on every exit path.

use crate::{HalError, HalResult, LinearAddr, PhysAddr};
use bitflags::bitflags;
use static_assertions::assert_eq_size;

/// Size of a real-mode paragraph in bytes
pub const PARAGRAPH_SIZE: u32 = 16;

/// Largest DOS allocation expressible in BX (paragraphs)
pub const MAX_PARAGRAPHS: u32 = 0xFFFF;

/// Number of paragraphs needed to hold `size` bytes
///
/// A zero-byte request is served as a single paragraph so the caller still
/// receives a valid segment/selector pair.
pub fn paragraphs_for(size: u32) -> HalResult<u16> {
    let paragraphs = size.div_ceil(PARAGRAPH_SIZE).max(1);
    if paragraphs > MAX_PARAGRAPHS {
        return Err(HalError::InvalidParameter);
    }
    Ok(paragraphs as u16)
}

bitflags! {
    /// Real-mode FLAGS register as returned in the call structure
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CpuFlags: u16 {
        /// Carry flag (BIOS/DOS error indicator)
        const CARRY = 1 << 0;
        /// Parity flag
        const PARITY = 1 << 2;
        /// Auxiliary carry flag
        const AUX_CARRY = 1 << 4;
        /// Zero flag
        const ZERO = 1 << 6;
        /// Sign flag
        const SIGN = 1 << 7;
        /// Interrupt enable flag
        const INTERRUPT = 1 << 9;
        /// Direction flag
        const DIRECTION = 1 << 10;
        /// Overflow flag
        const OVERFLOW = 1 << 11;
    }
}

/// DPMI real-mode call structure
///
/// Passed to the host for interrupt simulation: the input registers go in,
/// the registers left by the real-mode handler come back out. The layout is
/// fixed by the DPMI specification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, packed(2))]
pub struct RealModeRegisters {
    /// EDI
    pub edi: u32,
    /// ESI
    pub esi: u32,
    /// EBP
    pub ebp: u32,
    /// Reserved by the host, must be zero
    pub reserved: u32,
    /// EBX
    pub ebx: u32,
    /// EDX
    pub edx: u32,
    /// ECX
    pub ecx: u32,
    /// EAX
    pub eax: u32,
    /// FLAGS
    pub flags: u16,
    /// ES
    pub es: u16,
    /// DS
    pub ds: u16,
    /// FS
    pub fs: u16,
    /// GS
    pub gs: u16,
    /// IP (ignored for interrupt simulation)
    pub ip: u16,
    /// CS (ignored for interrupt simulation)
    pub cs: u16,
    /// SP; zero lets the host provide a stack
    pub sp: u16,
    /// SS; zero lets the host provide a stack
    pub ss: u16,
}

assert_eq_size!(RealModeRegisters, [u8; 0x32]);

impl RealModeRegisters {
    /// All registers zeroed
    pub const fn new() -> Self {
        Self {
            edi: 0,
            esi: 0,
            ebp: 0,
            reserved: 0,
            ebx: 0,
            edx: 0,
            ecx: 0,
            eax: 0,
            flags: 0,
            es: 0,
            ds: 0,
            fs: 0,
            gs: 0,
            ip: 0,
            cs: 0,
            sp: 0,
            ss: 0,
        }
    }

    /// AX
    pub fn ax(&self) -> u16 {
        self.eax as u16
    }

    /// AH
    pub fn ah(&self) -> u8 {
        (self.eax >> 8) as u8
    }

    /// AL
    pub fn al(&self) -> u8 {
        self.eax as u8
    }

    /// BX
    pub fn bx(&self) -> u16 {
        self.ebx as u16
    }

    /// CX
    pub fn cx(&self) -> u16 {
        self.ecx as u16
    }

    /// DX
    pub fn dx(&self) -> u16 {
        self.edx as u16
    }

    /// Set AX, preserving the upper half of EAX
    pub fn set_ax(&mut self, val: u16) {
        self.eax = (self.eax & 0xFFFF_0000) | u32::from(val);
    }

    /// Set AH
    pub fn set_ah(&mut self, val: u8) {
        self.eax = (self.eax & 0xFFFF_00FF) | (u32::from(val) << 8);
    }

    /// Set AL
    pub fn set_al(&mut self, val: u8) {
        self.eax = (self.eax & 0xFFFF_FF00) | u32::from(val);
    }

    /// Set BX
    pub fn set_bx(&mut self, val: u16) {
        self.ebx = (self.ebx & 0xFFFF_0000) | u32::from(val);
    }

    /// Set CX
    pub fn set_cx(&mut self, val: u16) {
        self.ecx = (self.ecx & 0xFFFF_0000) | u32::from(val);
    }

    /// Set DX
    pub fn set_dx(&mut self, val: u16) {
        self.edx = (self.edx & 0xFFFF_0000) | u32::from(val);
    }

    /// Set DL
    pub fn set_dl(&mut self, val: u8) {
        self.edx = (self.edx & 0xFFFF_FF00) | u32::from(val);
    }

    /// Flags left by the real-mode handler
    pub fn cpu_flags(&self) -> CpuFlags {
        CpuFlags::from_bits_truncate(self.flags)
    }

    /// Carry reported by the real-mode service itself
    ///
    /// Distinct from the host's carry: the simulation may succeed while
    /// the BIOS or DOS function it invoked reports an error.
    pub fn carry(&self) -> bool {
        self.cpu_flags().contains(CpuFlags::CARRY)
    }
}

/// Block of conventional (sub-1MB) memory obtained from the host
///
/// Deliberately not `Clone`: freeing consumes the block, so one allocation
/// can be released at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct ConventionalBlock {
    segment: u16,
    selector: u16,
    paragraphs: u16,
}

impl ConventionalBlock {
    /// Wrap a segment/selector pair returned by the host
    pub const fn new(segment: u16, selector: u16, paragraphs: u16) -> Self {
        Self {
            segment,
            selector,
            paragraphs,
        }
    }

    /// Real-mode segment of the block
    pub const fn segment(&self) -> u16 {
        self.segment
    }

    /// Protected-mode selector of the block
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    /// Size in paragraphs
    pub const fn paragraphs(&self) -> u16 {
        self.paragraphs
    }

    /// Size in bytes
    pub const fn size(&self) -> u32 {
        self.paragraphs as u32 * PARAGRAPH_SIZE
    }

    /// Linear address of the block (segment * 16)
    pub const fn linear(&self) -> LinearAddr {
        LinearAddr::new((self.segment as u32) << 4)
    }
}

/// Protected-mode to real-mode bridge
///
/// The only channel through which BIOS, DOS and physical memory are
/// reached. Implemented by `Dpmi` (x86 only) on the target and by
/// [`crate::arch_stubs::StubBridge`] everywhere else.
pub trait RealModeBridge {
    /// Simulate a real-mode interrupt with the given register set
    ///
    /// Returns the registers left by the handler. An `Err` means the host
    /// could not perform the call; output registers are then meaningless.
    fn simulate_interrupt(
        &self,
        vector: u8,
        regs: &RealModeRegisters,
    ) -> HalResult<RealModeRegisters>;

    /// Allocate `size` bytes of conventional memory, rounded up to paragraphs
    fn allocate_conventional(&self, size: u32) -> HalResult<ConventionalBlock>;

    /// Release a block obtained from [`Self::allocate_conventional`]
    fn free_conventional(&self, block: ConventionalBlock) -> HalResult<()>;

    /// Map a physical address range into the linear address space
    fn map_physical(&self, addr: PhysAddr, size: u32) -> HalResult<LinearAddr>;

    /// Release a mapping obtained from [`Self::map_physical`]
    fn unmap_physical(&self, linear: LinearAddr) -> HalResult<()>;
}

impl<B: RealModeBridge + ?Sized> RealModeBridge for &B {
    fn simulate_interrupt(
        &self,
        vector: u8,
        regs: &RealModeRegisters,
    ) -> HalResult<RealModeRegisters> {
        (**self).simulate_interrupt(vector, regs)
    }

    fn allocate_conventional(&self, size: u32) -> HalResult<ConventionalBlock> {
        (**self).allocate_conventional(size)
    }

    fn free_conventional(&self, block: ConventionalBlock) -> HalResult<()> {
        (**self).free_conventional(block)
    }

    fn map_physical(&self, addr: PhysAddr, size: u32) -> HalResult<LinearAddr> {
        (**self).map_physical(addr, size)
    }

    fn unmap_physical(&self, linear: LinearAddr) -> HalResult<()> {
        (**self).unmap_physical(linear)
    }
}

// =============================================================================
// Ownership guards
// =============================================================================

/// Conventional memory that is freed when dropped
#[derive(Debug)]
pub struct DosBuffer<'b, B: RealModeBridge + ?Sized> {
    bridge: &'b B,
    block: Option<ConventionalBlock>,
}

impl<'b, B: RealModeBridge + ?Sized> DosBuffer<'b, B> {
    /// Allocate `size` bytes through `bridge`
    pub fn allocate(bridge: &'b B, size: u32) -> HalResult<Self> {
        let block = bridge.allocate_conventional(size)?;
        Ok(Self {
            bridge,
            block: Some(block),
        })
    }

    /// Real-mode segment
    pub fn segment(&self) -> u16 {
        self.block.as_ref().map_or(0, ConventionalBlock::segment)
    }

    /// Protected-mode selector
    pub fn selector(&self) -> u16 {
        self.block.as_ref().map_or(0, ConventionalBlock::selector)
    }

    /// Size in bytes
    pub fn size(&self) -> u32 {
        self.block.as_ref().map_or(0, ConventionalBlock::size)
    }

    /// Free now and report the host's answer
    pub fn release(mut self) -> HalResult<()> {
        match self.block.take() {
            Some(block) => self.bridge.free_conventional(block),
            None => Ok(()),
        }
    }
}

impl<B: RealModeBridge + ?Sized> Drop for DosBuffer<'_, B> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            let selector = block.selector();
            if let Err(err) = self.bridge.free_conventional(block) {
                log::warn!("DOS block (selector {:#06x}) not freed: {}", selector, err);
            }
        }
    }
}

/// Physical memory window that is unmapped when dropped
#[derive(Debug)]
pub struct PhysicalMapping<'b, B: RealModeBridge + ?Sized> {
    bridge: &'b B,
    linear: Option<LinearAddr>,
    size: u32,
}

impl<'b, B: RealModeBridge + ?Sized> PhysicalMapping<'b, B> {
    /// Map `size` bytes at `addr` through `bridge`
    pub fn map(bridge: &'b B, addr: PhysAddr, size: u32) -> HalResult<Self> {
        let linear = bridge.map_physical(addr, size)?;
        Ok(Self {
            bridge,
            linear: Some(linear),
            size,
        })
    }

    /// Linear address of the window
    pub fn linear(&self) -> Option<LinearAddr> {
        self.linear
    }

    /// Size of the window in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Unmap now and report the host's answer
    pub fn release(mut self) -> HalResult<()> {
        match self.linear.take() {
            Some(linear) => self.bridge.unmap_physical(linear),
            None => Ok(()),
        }
    }
}

impl<B: RealModeBridge + ?Sized> Drop for PhysicalMapping<'_, B> {
    fn drop(&mut self) {
        if let Some(linear) = self.linear.take() {
            if let Err(err) = self.bridge.unmap_physical(linear) {
                log::warn!("mapping at {:#010x} not released: {}", linear.as_u32(), err);
            }
        }
    }
}
