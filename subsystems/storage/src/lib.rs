//! # SmartDOS Storage Subsystem
//!
//! The storage subsystem provides:
//! - Drive descriptors with the ATA task-file shadow
//! - The fixed-capacity drive table
//! - Identification string decoding
//! - The SMART attribute table
//! - The contract of the AHCI controller driver
//!
//! ## Key Principle
//!
//! The AHCI driver itself is an external collaborator. This crate only
//! describes what the driver hands over and what it is asked to do; it
//! never speaks the AHCI protocol.

#![no_std]
#![warn(missing_docs)]

pub mod attribute;
pub mod controller;
pub mod descriptor;
pub mod ident;

use core::fmt;

pub use attribute::{AttributeTable, RawData, SmartAttribute, SMART_SLOTS};
pub use controller::{StorageController, TransferSession};
pub use descriptor::{DriveDescriptor, DriveTable, TaskFile, MAX_DRIVES};
pub use ident::{IdentBytes, IdentError, IdentString};

/// Storage subsystem result type
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The drive table already holds the maximum number of drives
    TableFull,
    /// Attribute slot index outside the table
    SlotOutOfRange(usize),
    /// The controller could not read SMART data
    AcquisitionFailed,
    /// Identification text could not be decoded
    Ident(IdentError),
}

impl From<IdentError> for StorageError {
    fn from(err: IdentError) -> Self {
        Self::Ident(err)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableFull => write!(f, "drive table full ({} drives)", MAX_DRIVES),
            Self::SlotOutOfRange(index) => write!(f, "attribute slot {} out of range", index),
            Self::AcquisitionFailed => write!(f, "SMART data acquisition failed"),
            Self::Ident(err) => write!(f, "identification string: {}", err),
        }
    }
}
