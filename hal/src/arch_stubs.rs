//! # Stub Platform
//!
//! In-memory implementations of the HAL traits. They back every test in
//! the workspace and let the tool run on hosts without a DPMI host.
//!
//! NOTE: the stub bridge never touches real memory. Segments, selectors
//! and linear addresses it hands out are bookkeeping values only.

use crate::bridge::{paragraphs_for, ConventionalBlock, RealModeBridge, RealModeRegisters};
use crate::timer::{CycleCounter, Delay};
use crate::{HalError, HalResult, LinearAddr, PhysAddr};
use arrayvec::ArrayVec;
use core::cell::Cell;
use spin::Mutex;

/// Maximum simultaneously allocated DOS blocks
const MAX_BLOCKS: usize = 32;

/// Maximum simultaneous physical mappings
const MAX_MAPPINGS: usize = 16;

/// Interrupts kept in the history
pub const HISTORY_LEN: usize = 256;

/// Conventional memory free at startup (576 KiB)
pub const DEFAULT_CONVENTIONAL_PARAGRAPHS: u32 = 0x9000;

/// First segment handed out
const FIRST_SEGMENT: u16 = 0x1000;

/// First selector handed out
const FIRST_SELECTOR: u16 = 0x00A7;

/// Base of the linear window used for physical mappings
const MAPPING_BASE: u32 = 0x8000_0000;

const PAGE_SIZE: u32 = 0x1000;

/// Simulated real-mode handler
///
/// Receives the vector and the register set to update in place. Returning
/// `false` makes the host refuse the call.
pub type InterruptHandler = fn(vector: u8, regs: &mut RealModeRegisters) -> bool;

fn passthrough(_vector: u8, _regs: &mut RealModeRegisters) -> bool {
    true
}

// =============================================================================
// Stub Bridge
// =============================================================================

#[derive(Debug)]
struct StubState {
    free_paragraphs: u32,
    next_segment: u16,
    next_selector: u16,
    blocks: ArrayVec<(u16, u16), MAX_BLOCKS>,
    mappings: ArrayVec<(LinearAddr, u32), MAX_MAPPINGS>,
    next_linear: u32,
    history: ArrayVec<(u8, RealModeRegisters), HISTORY_LEN>,
    interrupts: usize,
    last_request: Option<u16>,
}

/// Stub real-mode bridge
#[derive(Debug)]
pub struct StubBridge {
    state: Mutex<StubState>,
    handler: InterruptHandler,
}

impl StubBridge {
    /// Create a stub bridge with the default amount of DOS memory
    pub fn new() -> Self {
        Self::with_conventional_paragraphs(DEFAULT_CONVENTIONAL_PARAGRAPHS)
    }

    /// Create a stub bridge with `paragraphs` of free DOS memory
    pub fn with_conventional_paragraphs(paragraphs: u32) -> Self {
        Self {
            state: Mutex::new(StubState {
                free_paragraphs: paragraphs,
                next_segment: FIRST_SEGMENT,
                next_selector: FIRST_SELECTOR,
                blocks: ArrayVec::new(),
                mappings: ArrayVec::new(),
                next_linear: MAPPING_BASE,
                history: ArrayVec::new(),
                interrupts: 0,
                last_request: None,
            }),
            handler: passthrough,
        }
    }

    /// Replace the simulated real-mode handler
    pub fn with_handler(mut self, handler: InterruptHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Number of DOS blocks not yet freed
    pub fn outstanding_blocks(&self) -> usize {
        self.state.lock().blocks.len()
    }

    /// Number of physical mappings not yet released
    pub fn outstanding_mappings(&self) -> usize {
        self.state.lock().mappings.len()
    }

    /// Free DOS memory in paragraphs
    pub fn free_paragraphs(&self) -> u32 {
        self.state.lock().free_paragraphs
    }

    /// Paragraph count of the last allocation request sent to the host
    pub fn last_request_paragraphs(&self) -> Option<u16> {
        self.state.lock().last_request
    }

    /// Total interrupts simulated
    pub fn interrupt_count(&self) -> usize {
        self.state.lock().interrupts
    }

    /// Most recent interrupt with the registers the handler returned
    pub fn last_interrupt(&self) -> Option<(u8, RealModeRegisters)> {
        self.state.lock().history.last().copied()
    }

    /// Interrupt history, oldest first (bounded)
    pub fn history(&self) -> ArrayVec<(u8, RealModeRegisters), HISTORY_LEN> {
        self.state.lock().history.clone()
    }
}

impl Default for StubBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl RealModeBridge for StubBridge {
    fn simulate_interrupt(
        &self,
        vector: u8,
        regs: &RealModeRegisters,
    ) -> HalResult<RealModeRegisters> {
        let mut out = *regs;
        let accepted = (self.handler)(vector, &mut out);

        let mut state = self.state.lock();
        state.interrupts += 1;
        if state.history.is_full() {
            state.history.remove(0);
        }
        state.history.push((vector, out));

        if accepted {
            Ok(out)
        } else {
            Err(HalError::InterruptFailed { vector })
        }
    }

    fn allocate_conventional(&self, size: u32) -> HalResult<ConventionalBlock> {
        let paragraphs = paragraphs_for(size)?;
        let mut state = self.state.lock();
        state.last_request = Some(paragraphs);

        if u32::from(paragraphs) > state.free_paragraphs || state.blocks.is_full() {
            return Err(HalError::OutOfConventionalMemory {
                largest_available: state.free_paragraphs.min(0xFFFF) as u16,
            });
        }

        let segment = state.next_segment;
        let selector = state.next_selector;
        state.next_segment = segment.wrapping_add(paragraphs);
        state.next_selector = selector.wrapping_add(8);
        state.free_paragraphs -= u32::from(paragraphs);
        state.blocks.push((selector, paragraphs));

        Ok(ConventionalBlock::new(segment, selector, paragraphs))
    }

    fn free_conventional(&self, block: ConventionalBlock) -> HalResult<()> {
        let mut state = self.state.lock();
        let index = state
            .blocks
            .iter()
            .position(|&(selector, _)| selector == block.selector())
            .ok_or(HalError::InvalidSelector)?;
        let (_, paragraphs) = state.blocks.swap_remove(index);
        state.free_paragraphs += u32::from(paragraphs);
        Ok(())
    }

    fn map_physical(&self, addr: PhysAddr, size: u32) -> HalResult<LinearAddr> {
        if size == 0 || addr.as_u32().checked_add(size - 1).is_none() {
            return Err(HalError::InvalidParameter);
        }

        let mut state = self.state.lock();
        if state.mappings.is_full() {
            return Err(HalError::MappingFailed);
        }

        let offset = addr.as_u32() % PAGE_SIZE;
        let span = offset
            .checked_add(size)
            .and_then(|end| end.div_ceil(PAGE_SIZE).checked_mul(PAGE_SIZE))
            .ok_or(HalError::MappingFailed)?;
        let linear = LinearAddr::new(state.next_linear | offset);
        state.next_linear = state
            .next_linear
            .checked_add(span)
            .ok_or(HalError::MappingFailed)?;
        state.mappings.push((linear, size));

        Ok(linear)
    }

    fn unmap_physical(&self, linear: LinearAddr) -> HalResult<()> {
        let mut state = self.state.lock();
        let index = state
            .mappings
            .iter()
            .position(|&(mapped, _)| mapped == linear)
            .ok_or(HalError::InvalidAddress)?;
        state.mappings.swap_remove(index);
        Ok(())
    }
}

// =============================================================================
// Stub Timer
// =============================================================================

/// Cycle counter advancing by a fixed step on every read
#[derive(Debug)]
pub struct StubCycleCounter {
    next: Cell<u64>,
    step: u64,
    available: bool,
    reads: Cell<usize>,
}

impl StubCycleCounter {
    /// Counter starting at `start` and advancing `step` cycles per read
    pub const fn new(start: u64, step: u64) -> Self {
        Self {
            next: Cell::new(start),
            step,
            available: true,
            reads: Cell::new(0),
        }
    }

    /// Counter on a processor without one
    pub const fn unavailable() -> Self {
        Self {
            next: Cell::new(0),
            step: 0,
            available: false,
            reads: Cell::new(0),
        }
    }

    /// Number of reads so far
    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl CycleCounter for StubCycleCounter {
    fn read(&self) -> u64 {
        if !self.available {
            return 0;
        }
        self.reads.set(self.reads.get() + 1);
        let value = self.next.get();
        self.next.set(value.wrapping_add(self.step));
        value
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Delay that returns immediately, recording what was asked
#[derive(Debug, Default)]
pub struct StubDelay {
    calls: Cell<u32>,
    last_ms: Cell<u32>,
    fail: bool,
}

impl StubDelay {
    /// Succeeding delay
    pub const fn new() -> Self {
        Self {
            calls: Cell::new(0),
            last_ms: Cell::new(0),
            fail: false,
        }
    }

    /// Delay whose service is missing
    pub const fn failing() -> Self {
        Self {
            calls: Cell::new(0),
            last_ms: Cell::new(0),
            fail: true,
        }
    }

    /// Number of delays requested
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    /// Duration of the last request
    pub fn last_ms(&self) -> u32 {
        self.last_ms.get()
    }
}

impl Delay for StubDelay {
    fn delay_ms(&self, ms: u32) -> HalResult<()> {
        self.calls.set(self.calls.get() + 1);
        self.last_ms.set(ms);
        if self.fail {
            Err(HalError::NotSupported)
        } else {
            Ok(())
        }
    }
}
