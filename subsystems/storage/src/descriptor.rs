//! # Drive Descriptors
//!
//! One [`DriveDescriptor`] per drive reported by the controller, kept in a
//! fixed-capacity [`DriveTable`].

use crate::ident::{self, IdentString};
use crate::{StorageError, StorageResult};
use arrayvec::ArrayVec;
use bitflags::bitflags;

/// Bytes per logical sector
pub const SECTOR_SIZE: u64 = 512;

/// Model number field length (IDENTIFY words 27-46)
pub const MODEL_LEN: usize = 40;

/// Serial number field length (IDENTIFY words 10-19)
pub const SERIAL_LEN: usize = 20;

/// Firmware revision field length (IDENTIFY words 23-26)
pub const FIRMWARE_LEN: usize = 8;

/// Maximum number of drives the table holds
pub const MAX_DRIVES: usize = 128;

bitflags! {
    /// ATA status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AtaStatus: u8 {
        /// Error
        const ERR = 1 << 0;
        /// Data request
        const DRQ = 1 << 3;
        /// Device fault
        const DF = 1 << 5;
        /// Device ready
        const DRDY = 1 << 6;
        /// Busy
        const BSY = 1 << 7;
    }
}

/// Shadow of the ATA task-file registers after the last command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFile {
    /// Status register
    pub status: u8,
    /// Error register
    pub error: u8,
    /// Device/head register
    pub device: u8,
    /// Cylinder high (LBA 16-23)
    pub cyl_high: u8,
    /// Cylinder low (LBA 8-15)
    pub cyl_low: u8,
    /// Sector number (LBA 0-7)
    pub sector: u8,
    /// Sector count
    pub count: u8,
    /// LBA 24-31
    pub lba_low_hi: u8,
    /// LBA 32-39
    pub lba_mid_hi: u8,
    /// LBA 40-47
    pub lba_high_hi: u8,
    /// Sector count high byte
    pub count_hi: u8,
}

impl TaskFile {
    /// Decoded status register
    #[inline]
    pub fn status_flags(&self) -> AtaStatus {
        AtaStatus::from_bits_truncate(self.status)
    }

    /// Whether the last command ended in an error or device fault
    pub fn has_error(&self) -> bool {
        self.status_flags()
            .intersects(AtaStatus::ERR | AtaStatus::DF)
    }

    /// 48-bit LBA spread across the low and high-order registers
    pub fn lba48(&self) -> u64 {
        u64::from(self.sector)
            | u64::from(self.cyl_low) << 8
            | u64::from(self.cyl_high) << 16
            | u64::from(self.lba_low_hi) << 24
            | u64::from(self.lba_mid_hi) << 32
            | u64::from(self.lba_high_hi) << 40
    }
}

/// A detected drive
///
/// Identification fields keep the drive's byte-swapped word order; the
/// accessors decode them for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveDescriptor {
    total_sectors: u64,
    model: [u8; MODEL_LEN],
    serial: [u8; SERIAL_LEN],
    firmware: [u8; FIRMWARE_LEN],
    port: u32,
    task_file: TaskFile,
}

impl DriveDescriptor {
    /// Build a descriptor from raw IDENTIFY fields
    pub const fn from_raw(
        port: u32,
        total_sectors: u64,
        model: [u8; MODEL_LEN],
        serial: [u8; SERIAL_LEN],
        firmware: [u8; FIRMWARE_LEN],
    ) -> Self {
        Self {
            total_sectors,
            model,
            serial,
            firmware,
            port,
            task_file: TaskFile {
                status: 0,
                error: 0,
                device: 0,
                cyl_high: 0,
                cyl_low: 0,
                sector: 0,
                count: 0,
                lba_low_hi: 0,
                lba_mid_hi: 0,
                lba_high_hi: 0,
                count_hi: 0,
            },
        }
    }

    /// Build a descriptor from readable text, padding with spaces and
    /// storing it in drive word order
    pub fn with_ident(
        port: u32,
        total_sectors: u64,
        model: &str,
        serial: &str,
        firmware: &str,
    ) -> Self {
        Self::from_raw(
            port,
            total_sectors,
            encode_field(model),
            encode_field(serial),
            encode_field(firmware),
        )
    }

    /// Attach the task-file shadow left by the last command
    pub fn with_task_file(mut self, task_file: TaskFile) -> Self {
        self.task_file = task_file;
        self
    }

    /// Controller port the drive sits on
    #[inline]
    pub fn port(&self) -> u32 {
        self.port
    }

    /// Total addressable sectors
    #[inline]
    pub fn total_sectors(&self) -> u64 {
        self.total_sectors
    }

    /// Capacity in whole decimal gigabytes
    pub fn capacity_gb(&self) -> u64 {
        self.total_sectors.saturating_mul(SECTOR_SIZE) / 1_000_000_000
    }

    /// Model number, trailing padding removed
    pub fn model(&self) -> IdentString {
        ident::display_ident(&self.model).unwrap_or_default()
    }

    /// Serial number with every space removed
    ///
    /// Drives right-justify serials, so the padding is leading.
    pub fn serial(&self) -> IdentString {
        ident::decode_swapped(&self.serial, SERIAL_LEN)
            .and_then(|bytes| ident::compact_spaces(&ident::ident_text(&bytes)))
            .unwrap_or_default()
    }

    /// Firmware revision, trailing padding removed
    pub fn firmware(&self) -> IdentString {
        ident::display_ident(&self.firmware).unwrap_or_default()
    }

    /// Raw model field in drive word order
    #[inline]
    pub fn raw_model(&self) -> &[u8; MODEL_LEN] {
        &self.model
    }

    /// Task-file shadow registers
    #[inline]
    pub fn task_file(&self) -> &TaskFile {
        &self.task_file
    }
}

/// Encode text into a space-padded field in drive word order
fn encode_field<const N: usize>(text: &str) -> [u8; N] {
    let mut plain = [b' '; N];
    for (dst, src) in plain.iter_mut().zip(text.bytes()) {
        *dst = src;
    }
    let mut field = [0u8; N];
    // N is one of the even field lengths
    let _ = ident::swap_pairs(&plain, N, &mut field);
    field
}

/// Fixed-capacity table of detected drives
#[derive(Debug, Default)]
pub struct DriveTable {
    drives: ArrayVec<DriveDescriptor, MAX_DRIVES>,
}

impl DriveTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            drives: ArrayVec::new_const(),
        }
    }

    /// Append a drive
    pub fn push(&mut self, drive: DriveDescriptor) -> StorageResult<()> {
        self.drives
            .try_push(drive)
            .map_err(|_| StorageError::TableFull)
    }

    /// Drive at `index`
    pub fn get(&self, index: usize) -> Option<&DriveDescriptor> {
        self.drives.get(index)
    }

    /// Number of drives
    #[inline]
    pub fn len(&self) -> usize {
        self.drives.len()
    }

    /// Whether no drive was detected
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    /// Remove every drive
    pub fn clear(&mut self) {
        self.drives.clear();
    }

    /// Iterate over the drives in detection order
    pub fn iter(&self) -> impl Iterator<Item = &DriveDescriptor> {
        self.drives.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive() -> DriveDescriptor {
        DriveDescriptor::with_ident(0, 1_953_525_168, "WDC WD10EZEX-08WN4A0", "     WD-WCC6Y0123456", "01.01A01")
    }

    #[test]
    fn test_ident_fields_decode() {
        let d = drive();
        assert_eq!(d.model().as_str(), "WDC WD10EZEX-08WN4A0");
        assert_eq!(d.serial().as_str(), "WD-WCC6Y0123456");
        assert_eq!(d.firmware().as_str(), "01.01A01");
        // Stored in drive word order
        assert_eq!(&d.raw_model()[..4], b"DWC ");
    }

    #[test]
    fn test_capacity() {
        let d = drive();
        assert_eq!(d.total_sectors(), 1_953_525_168);
        assert_eq!(d.capacity_gb(), 1000);

        let tiny = DriveDescriptor::with_ident(1, 1000, "X", "", "");
        assert_eq!(tiny.capacity_gb(), 0);
        assert_eq!(tiny.serial().as_str(), "");
    }

    #[test]
    fn test_task_file() {
        let tf = TaskFile {
            status: (AtaStatus::DRDY | AtaStatus::ERR).bits(),
            sector: 0x01,
            cyl_low: 0x02,
            cyl_high: 0x03,
            lba_low_hi: 0x04,
            lba_mid_hi: 0x05,
            lba_high_hi: 0x06,
            ..TaskFile::default()
        };
        assert!(tf.has_error());
        assert_eq!(tf.lba48(), 0x0605_0403_0201);

        let d = drive().with_task_file(tf);
        assert_eq!(d.task_file().status_flags(), AtaStatus::DRDY | AtaStatus::ERR);
        assert!(!TaskFile::default().has_error());
    }

    #[test]
    fn test_table_capacity() {
        let mut table = DriveTable::new();
        assert!(table.is_empty());

        for port in 0..MAX_DRIVES as u32 {
            table
                .push(DriveDescriptor::with_ident(port, 0, "D", "", ""))
                .expect("within capacity");
        }
        assert_eq!(table.len(), MAX_DRIVES);
        assert_eq!(
            table.push(DriveDescriptor::with_ident(999, 0, "D", "", "")),
            Err(StorageError::TableFull)
        );
        assert_eq!(table.get(5).map(|d| d.port()), Some(5));
        assert!(table.get(MAX_DRIVES).is_none());

        table.clear();
        assert!(table.is_empty());
    }
}
