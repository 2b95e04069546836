//! # Cycle Timer Calibration
//!
//! The processor's free-running cycle counter is only useful once its rate
//! is known. The [`Calibrator`] measures how many cycles elapse across a
//! known real-time delay and keeps the result for later conversions.
//!
//! Calibration has no failure mode: a missing counter or a failed delay
//! leaves the calibration at 0, and every conversion treats 0 as "unknown".

use crate::bridge::{RealModeBridge, RealModeRegisters};
use crate::{HalError, HalResult};

/// BIOS system services interrupt
pub const BIOS_SYSTEM_SERVICES: u8 = 0x15;

/// INT 15h function: wait for CX:DX microseconds
const BIOS_WAIT: u8 = 0x86;

/// Free-running cycle counter
pub trait CycleCounter {
    /// Read the current cycle count
    fn read(&self) -> u64;

    /// Whether the counter exists on this processor
    fn is_available(&self) -> bool {
        true
    }
}

/// Real-time delay source
pub trait Delay {
    /// Block for `ms` milliseconds
    fn delay_ms(&self, ms: u32) -> HalResult<()>;
}

/// Cycle counter calibration
#[derive(Debug, Clone)]
pub struct Calibrator {
    interval_ms: u32,
    cycles: u64,
}

impl Calibrator {
    /// Default reference interval: 1ms
    pub const DEFAULT_INTERVAL_MS: u32 = 1;

    /// Create an uncalibrated calibrator with the given reference interval
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            cycles: 0,
        }
    }

    /// Measure the counter across one reference interval
    ///
    /// Returns the number of cycles counted, which is also kept for
    /// [`Self::cycles_per_interval`]. Returns 0 when the measurement is
    /// impossible.
    pub fn calibrate<C, D>(&mut self, counter: &C, delay: &D) -> u64
    where
        C: CycleCounter + ?Sized,
        D: Delay + ?Sized,
    {
        self.cycles = 0;

        if !counter.is_available() {
            log::warn!("Cycle counter unavailable, timer left uncalibrated");
            return 0;
        }

        let start = counter.read();
        if let Err(err) = delay.delay_ms(self.interval_ms) {
            log::warn!("Calibration delay failed: {}", err);
            return 0;
        }
        let stop = counter.read();

        self.cycles = stop.wrapping_sub(start);
        log::info!(
            "Timer calibrated: {} cycles per {}ms",
            self.cycles,
            self.interval_ms
        );
        self.cycles
    }

    /// Last calibrated value (0 if never calibrated or degraded)
    #[inline]
    pub fn cycles_per_interval(&self) -> u64 {
        self.cycles
    }

    /// Reference interval in milliseconds
    #[inline]
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Whether a usable calibration exists
    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.cycles != 0
    }

    /// Convert a cycle count to microseconds, saturating at `u64::MAX`
    pub fn cycles_to_us(&self, cycles: u64) -> u64 {
        if self.cycles == 0 {
            return 0;
        }
        let interval_us = u128::from(self.interval_ms) * 1000;
        u64::try_from(u128::from(cycles) * interval_us / u128::from(self.cycles))
            .unwrap_or(u64::MAX)
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL_MS)
    }
}

/// Delay through the BIOS wait service (INT 15h, AH=86h)
#[derive(Debug)]
pub struct BiosDelay<B> {
    bridge: B,
}

impl<B: RealModeBridge> BiosDelay<B> {
    /// Create a delay source over `bridge`
    pub const fn new(bridge: B) -> Self {
        Self { bridge }
    }
}

impl<B: RealModeBridge> Delay for BiosDelay<B> {
    fn delay_ms(&self, ms: u32) -> HalResult<()> {
        let us = ms.saturating_mul(1000);

        let mut regs = RealModeRegisters::new();
        regs.set_ah(BIOS_WAIT);
        regs.set_cx((us >> 16) as u16);
        regs.set_dx(us as u16);

        let out = self.bridge.simulate_interrupt(BIOS_SYSTEM_SERVICES, &regs)?;
        if out.carry() {
            // BIOS without the wait service
            return Err(HalError::NotSupported);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch_stubs::{StubBridge, StubCycleCounter, StubDelay};
    use crate::bridge::CpuFlags;

    #[test]
    fn test_calibrate_measures_interval() {
        let counter = StubCycleCounter::new(1000, 2_400_000);
        let delay = StubDelay::new();
        let mut calibrator = Calibrator::default();

        assert_eq!(calibrator.calibrate(&counter, &delay), 2_400_000);
        assert_eq!(delay.calls(), 1);
        assert_eq!(delay.last_ms(), Calibrator::DEFAULT_INTERVAL_MS);
        assert_eq!(calibrator.cycles_per_interval(), 2_400_000);
        assert!(calibrator.is_calibrated());
    }

    #[test]
    fn test_accessor_does_not_remeasure() {
        let counter = StubCycleCounter::new(0, 500);
        let delay = StubDelay::new();
        let mut calibrator = Calibrator::new(10);
        calibrator.calibrate(&counter, &delay);
        let reads = counter.reads();

        assert_eq!(calibrator.cycles_per_interval(), 500);
        assert_eq!(calibrator.cycles_per_interval(), 500);
        assert_eq!(counter.reads(), reads);
    }

    #[test]
    fn test_unavailable_counter_degrades_to_zero() {
        let counter = StubCycleCounter::unavailable();
        let delay = StubDelay::new();
        let mut calibrator = Calibrator::default();

        assert_eq!(calibrator.calibrate(&counter, &delay), 0);
        assert!(!calibrator.is_calibrated());
        assert_eq!(calibrator.cycles_to_us(123_456), 0);
        assert_eq!(delay.calls(), 0);
    }

    #[test]
    fn test_failed_delay_degrades_to_zero() {
        let counter = StubCycleCounter::new(0, 500);
        let delay = StubDelay::failing();
        let mut calibrator = Calibrator::default();
        assert_eq!(calibrator.calibrate(&counter, &delay), 0);
    }

    #[test]
    fn test_cycles_to_us() {
        let counter = StubCycleCounter::new(0, 3_000_000);
        let mut calibrator = Calibrator::new(1);
        calibrator.calibrate(&counter, &StubDelay::new());

        // 3 GHz: 3000 cycles per microsecond
        assert_eq!(calibrator.cycles_to_us(3_000), 1);
        assert_eq!(calibrator.cycles_to_us(3_000_000), 1_000);
        assert_eq!(calibrator.cycles_to_us(u64::MAX), u64::MAX / 3_000);
    }

    #[test]
    fn test_cycles_to_us_saturates() {
        // One cycle per second
        let counter = StubCycleCounter::new(0, 1);
        let mut calibrator = Calibrator::new(1000);
        assert_eq!(calibrator.calibrate(&counter, &StubDelay::new()), 1);

        assert_eq!(calibrator.cycles_to_us(5), 5_000_000);
        assert_eq!(calibrator.cycles_to_us(u64::MAX), u64::MAX);
        assert_eq!(calibrator.cycles_to_us(u64::MAX / 1_000_000 + 1), u64::MAX);
    }

    #[test]
    fn test_bios_delay_registers() {
        let bridge = StubBridge::new();
        let delay = BiosDelay::new(&bridge);
        assert_eq!(delay.delay_ms(70), Ok(()));

        let (vector, regs) = bridge.last_interrupt().expect("interrupt issued");
        assert_eq!(vector, BIOS_SYSTEM_SERVICES);
        assert_eq!(regs.ah(), 0x86);
        // 70_000us = 0x0001_1170
        assert_eq!(regs.cx(), 0x0001);
        assert_eq!(regs.dx(), 0x1170);
    }

    #[test]
    fn test_bios_delay_carry_is_unsupported() {
        fn no_wait_service(_vector: u8, regs: &mut RealModeRegisters) -> bool {
            regs.flags = CpuFlags::CARRY.bits();
            true
        }

        let bridge = StubBridge::new().with_handler(no_wait_service);
        let delay = BiosDelay::new(&bridge);
        assert_eq!(delay.delay_ms(1), Err(HalError::NotSupported));
    }

    #[test]
    fn test_bios_delay_host_failure() {
        fn host_refuses(_vector: u8, _regs: &mut RealModeRegisters) -> bool {
            false
        }

        let bridge = StubBridge::new().with_handler(host_refuses);
        let delay = BiosDelay::new(&bridge);
        assert_eq!(
            delay.delay_ms(1),
            Err(HalError::InterruptFailed { vector: BIOS_SYSTEM_SERVICES })
        );
    }
}
