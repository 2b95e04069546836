//! # SMART Evaluator
//!
//! One pass over every slot of the attribute table. Empty slots are
//! skipped. For each attribute:
//!
//! 1. A critical attribute with any non-zero raw sub-field raises the
//!    status from perfect to warning.
//! 2. A value below its threshold marks the drive damaged.
//!
//! The status starts at perfect and only ever rises during the pass.

use crate::attributes::is_critical;
use crate::status::DriveStatus;
use crate::SmartState;
use smartdos_storage::SmartAttribute;

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evaluation {
    /// Final aggregate status
    pub status: DriveStatus,
    /// Attributes evaluated (occupied slots)
    pub rows: usize,
    /// Critical attributes with non-zero raw data
    pub critical_warnings: usize,
    /// Attributes below their threshold
    pub failing: usize,
}

/// Whether an attribute trips the critical rule
#[inline]
pub fn trips_critical(attribute: &SmartAttribute) -> bool {
    is_critical(attribute.id.get()) && attribute.raw.is_nonzero()
}

/// Fold one attribute into `status`
pub fn assess(status: &mut DriveStatus, attribute: &SmartAttribute) {
    if trips_critical(attribute) {
        status.warn();
    }
    if attribute.is_failing() {
        status.damage();
    }
}

/// Evaluate the attribute table and store the resulting status
pub fn evaluate(state: &mut SmartState) -> Evaluation {
    let mut eval = Evaluation::default();

    for attribute in state.table.iter() {
        assess(&mut eval.status, attribute);

        eval.rows += 1;
        if trips_critical(attribute) {
            eval.critical_warnings += 1;
            log::debug!(
                "SMART: critical attribute {} raw {}",
                attribute.id,
                attribute.raw.as_u64()
            );
        }
        if attribute.is_failing() {
            eval.failing += 1;
            log::warn!(
                "SMART: attribute {} below threshold ({} < {})",
                attribute.id,
                attribute.value,
                attribute.threshold
            );
        }
    }

    state.status = eval.status;
    log::info!(
        "SMART: {} attributes, drive {}",
        eval.rows,
        eval.status
    );
    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartdos_storage::RawData;

    fn attr(id: u8, value: u8, threshold: u8, raw: u32) -> Option<SmartAttribute> {
        SmartAttribute::from_raw(id, value, value, threshold, RawData::new(raw, 0, 0))
    }

    fn state_with(entries: &[(usize, Option<SmartAttribute>)]) -> SmartState {
        let mut state = SmartState::new();
        for (slot, entry) in entries {
            state.table.set(*slot, entry.clone()).expect("slot in range");
        }
        state
    }

    #[test]
    fn test_below_threshold_is_damaged() {
        let mut state = state_with(&[(0, attr(5, 50, 60, 12))]);
        let eval = evaluate(&mut state);
        assert_eq!(eval.status, DriveStatus::Damaged);
        assert_eq!(state.status, DriveStatus::Damaged);
        assert_eq!(eval.failing, 1);
        assert_eq!(eval.critical_warnings, 1);
    }

    #[test]
    fn test_lone_critical_raw_is_warning() {
        let mut state = state_with(&[(0, attr(1, 100, 0, 1))]);
        let eval = evaluate(&mut state);
        assert_eq!(eval.status, DriveStatus::Warning);
        assert_eq!(eval.rows, 1);
        assert_eq!(eval.failing, 0);
    }

    #[test]
    fn test_non_critical_raw_stays_perfect() {
        let mut state = state_with(&[
            (0, attr(9, 99, 0, 12_345)),
            (1, attr(194, 36, 0, 36)),
            (2, attr(12, 100, 20, 900)),
        ]);
        let eval = evaluate(&mut state);
        assert_eq!(eval.status, DriveStatus::Perfect);
        assert_eq!(eval.critical_warnings, 0);
    }

    #[test]
    fn test_any_raw_subfield_counts() {
        let high_only = SmartAttribute::from_raw(197, 100, 100, 0, RawData::new(0, 1, 0));
        let mut state = state_with(&[(0, high_only)]);
        assert_eq!(evaluate(&mut state).status, DriveStatus::Warning);

        let extra_only = SmartAttribute::from_raw(197, 100, 100, 0, RawData::new(0, 0, 1));
        let mut state = state_with(&[(0, extra_only)]);
        assert_eq!(evaluate(&mut state).status, DriveStatus::Warning);
    }

    #[test]
    fn test_damaged_is_sticky() {
        let mut state = state_with(&[
            (0, attr(3, 10, 21, 0)),
            (1, attr(5, 100, 10, 8)),
            (2, attr(9, 100, 0, 0)),
        ]);
        assert_eq!(evaluate(&mut state).status, DriveStatus::Damaged);
    }

    #[test]
    fn test_status_is_monotonic_over_the_scan() {
        let attrs = [attr(4, 100, 0, 0), attr(199, 200, 0, 3), attr(9, 90, 0, 7), attr(7, 5, 30, 1), attr(1, 100, 6, 0)];
        let mut status = DriveStatus::Perfect;
        let mut previous = status;
        for a in attrs.iter().flatten() {
            assess(&mut status, a);
            assert!(status >= previous);
            previous = status;
        }
        assert_eq!(status, DriveStatus::Damaged);
    }

    #[test]
    fn test_empty_slots_are_skipped() {
        let mut state = state_with(&[
            (0, None),
            (1, attr(0, 0, 255, 1)),
            (2, attr(9, 100, 0, 5)),
            (255, attr(10, 100, 0, 0)),
        ]);
        let eval = evaluate(&mut state);
        assert_eq!(eval.rows, 2);
        assert_eq!(eval.status, DriveStatus::Perfect);
    }

    #[test]
    fn test_adjacent_slots_both_scanned() {
        // An empty slot directly before an occupied one must not hide it
        let mut state = state_with(&[(0, None), (1, attr(5, 50, 60, 0))]);
        assert_eq!(evaluate(&mut state).status, DriveStatus::Damaged);
    }

    #[test]
    fn test_empty_table_is_perfect() {
        let mut state = SmartState::new();
        state.status = DriveStatus::Damaged;
        state.reset();
        let eval = evaluate(&mut state);
        assert_eq!(eval, Evaluation::default());
        assert_eq!(state.status, DriveStatus::Perfect);
    }
}
