//! # SmartDOS SMART Subsystem
//!
//! The SMART subsystem provides:
//! - The drive-wide health status
//! - The critical attribute set and well-known attribute names
//! - The evaluator that scans an attribute table
//! - The plain-text report
//!
//! ## Key Principle
//!
//! Evaluation only reads the attribute table and raises the status. It
//! never talks to the controller; acquisition happens before, in the
//! caller.

#![no_std]
#![warn(missing_docs)]

pub mod attributes;
pub mod evaluator;
pub mod report;
pub mod status;

use smartdos_storage::AttributeTable;

pub use attributes::{is_critical, known_attribute_name, CRITICAL_ATTRIBUTES};
pub use evaluator::{evaluate, Evaluation};
pub use report::{write_report, HEADER};
pub use status::{status_label, DriveStatus};

/// SMART data of one drive plus its aggregate status
#[derive(Debug, Clone, Default)]
pub struct SmartState {
    /// Attribute slots
    pub table: AttributeTable,
    /// Aggregate drive status
    pub status: DriveStatus,
}

impl SmartState {
    /// Create an empty state with status perfect
    pub const fn new() -> Self {
        Self {
            table: AttributeTable::new(),
            status: DriveStatus::Perfect,
        }
    }

    /// Clear every slot and return the status to perfect
    pub fn reset(&mut self) {
        self.table.clear();
        self.status = DriveStatus::Perfect;
    }
}
