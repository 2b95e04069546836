//! # AHCI Driver Binding
//!
//! The AHCI driver is linked in from the DOS extender build as plain C.
//! This module mirrors the structures it fills and adapts its entry
//! points to [`StorageController`].
//!
//! Identification fields arrive exactly as copied from IDENTIFY data, in
//! drive word order. SMART entries with identifier 0 are unused slots.

use smartdos_storage::descriptor::{FIRMWARE_LEN, MODEL_LEN, SERIAL_LEN};
use smartdos_storage::{
    AttributeTable, DriveDescriptor, RawData, SmartAttribute, StorageResult, TaskFile,
    SMART_SLOTS,
};
use static_assertions::assert_eq_size;

/// Length of the name field of a SMART entry
pub const NAME_LEN: usize = 32;

/// Drive record filled by the driver
///
/// Mirrors the driver's `DISKDRIVE` structure and must be kept in step
/// with the `drives.h` the driver is built from: the driver writes an
/// array of these through `ahci_detect_drives`, so field order, offsets
/// and the 104-byte stride are all part of the contract. The offsets are
/// pinned by the tests below.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RawDiskDrive {
    /// Total addressable sectors
    pub total_sectors: u64,
    /// Capacity in GB as computed by the driver
    ///
    /// Present for layout only; descriptors recompute the capacity from
    /// `total_sectors`.
    pub total_gb: u32,
    /// AHCI port number
    pub port: u32,
    /// Model number (IDENTIFY words 27-46)
    pub model: [u8; MODEL_LEN],
    /// Serial number (IDENTIFY words 10-19)
    pub serial: [u8; SERIAL_LEN],
    /// Firmware revision (IDENTIFY words 23-26)
    pub firmware: [u8; FIRMWARE_LEN],
    /// Task file after the last command: status, error, device, cylinder
    /// high, cylinder low, sector, count
    pub regs: [u8; 7],
    /// High-order LBA low, mid, high and count
    pub regs_hi: [u8; 4],
    /// Driver-private tail
    _reserved: [u8; 9],
}

assert_eq_size!(RawDiskDrive, [u8; 104]);

impl RawDiskDrive {
    /// All-zero record
    pub const ZERO: Self = Self {
        total_sectors: 0,
        total_gb: 0,
        port: 0,
        model: [0; MODEL_LEN],
        serial: [0; SERIAL_LEN],
        firmware: [0; FIRMWARE_LEN],
        regs: [0; 7],
        regs_hi: [0; 4],
        _reserved: [0; 9],
    };

    /// Task-file shadow of the record
    pub fn task_file(&self) -> TaskFile {
        let [status, error, device, cyl_high, cyl_low, sector, count] = self.regs;
        let [lba_low_hi, lba_mid_hi, lba_high_hi, count_hi] = self.regs_hi;
        TaskFile {
            status,
            error,
            device,
            cyl_high,
            cyl_low,
            sector,
            count,
            lba_low_hi,
            lba_mid_hi,
            lba_high_hi,
            count_hi,
        }
    }

    /// Convert to a drive descriptor
    pub fn to_descriptor(&self) -> DriveDescriptor {
        DriveDescriptor::from_raw(
            self.port,
            self.total_sectors,
            self.model,
            self.serial,
            self.firmware,
        )
        .with_task_file(self.task_file())
    }
}

/// One SMART attribute as filled by the driver
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RawSmartEntry {
    /// Attribute identifier (0 = unused)
    pub id: u8,
    /// Current value
    pub value: u8,
    /// Worst value
    pub worst: u8,
    /// Threshold
    pub threshold: u8,
    /// Raw data bits 0-31
    pub raw_low: u32,
    /// Raw data bits 32-47
    pub raw_high: u16,
    /// Raw data top word
    pub raw_extra: u16,
    /// NUL-terminated ASCII name
    pub name: [u8; NAME_LEN],
}

assert_eq_size!(RawSmartEntry, [u8; 44]);

impl RawSmartEntry {
    /// Unused slot
    pub const EMPTY: Self = Self {
        id: 0,
        value: 0,
        worst: 0,
        threshold: 0,
        raw_low: 0,
        raw_high: 0,
        raw_extra: 0,
        name: [0; NAME_LEN],
    };

    /// Name up to the first NUL, empty if not ASCII
    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let bytes = &self.name[..len];
        if !bytes.is_ascii() {
            return "";
        }
        core::str::from_utf8(bytes).unwrap_or("")
    }

    /// Convert to an attribute; identifier 0 gives `None`
    pub fn to_attribute(&self) -> Option<SmartAttribute> {
        SmartAttribute::from_raw(
            self.id,
            self.value,
            self.worst,
            self.threshold,
            RawData::new(self.raw_low, self.raw_high, self.raw_extra),
        )
        .map(|attr| attr.with_name(self.name()))
    }
}

/// SMART block filled by the driver
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RawSmartData {
    /// Attribute slots
    pub entries: [RawSmartEntry; SMART_SLOTS],
    /// Status word, left to the evaluator
    pub status: u32,
}

assert_eq_size!(RawSmartData, [u8; 44 * SMART_SLOTS + 4]);

impl RawSmartData {
    /// Block with every slot unused
    pub const EMPTY: Self = Self {
        entries: [RawSmartEntry::EMPTY; SMART_SLOTS],
        status: 0,
    };

    /// Copy every slot into `table`
    pub fn fill_table(&self, table: &mut AttributeTable) -> StorageResult<()> {
        for (slot, entry) in self.entries.iter().enumerate() {
            table.set(slot, entry.to_attribute())?;
        }
        Ok(())
    }
}

#[cfg(feature = "dos-extender")]
pub use self::driver::ExternAhci;

#[cfg(feature = "dos-extender")]
mod driver {
    use super::{RawDiskDrive, RawSmartData};
    use smartdos_storage::descriptor::MAX_DRIVES;
    use smartdos_storage::{
        AttributeTable, DriveDescriptor, DriveTable, StorageController, StorageError,
        StorageResult,
    };

    extern "C" {
        fn ahci_detect_ahci() -> i32;
        fn ahci_detect_drives(drives: *mut RawDiskDrive) -> i32;
        fn ahci_start_disk_system(drive: *mut RawDiskDrive);
        fn ahci_reset_disk_system(drive: *mut RawDiskDrive);
        #[link_name = "ahci_get_SMART_data"]
        fn ahci_get_smart_data(data: *mut RawSmartData, drive: *mut RawDiskDrive) -> i32;
        fn ahci_close_ahci();
    }

    /// Controller backed by the linked AHCI driver
    #[derive(Debug)]
    pub struct ExternAhci {
        drives: [RawDiskDrive; MAX_DRIVES],
        count: usize,
        smart: RawSmartData,
    }

    impl ExternAhci {
        /// Create the binding; nothing is called until [`StorageController::detect`]
        pub const fn new() -> Self {
            Self {
                drives: [RawDiskDrive::ZERO; MAX_DRIVES],
                count: 0,
                smart: RawSmartData::EMPTY,
            }
        }

        fn record(&mut self, drive: &DriveDescriptor) -> Option<&mut RawDiskDrive> {
            self.drives[..self.count]
                .iter_mut()
                .find(|raw| raw.port == drive.port())
        }
    }

    impl Default for ExternAhci {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StorageController for ExternAhci {
        fn detect(&mut self) -> bool {
            // SAFETY: plain query without arguments
            unsafe { ahci_detect_ahci() != 0 }
        }

        fn enumerate_drives(&mut self, table: &mut DriveTable) -> usize {
            // SAFETY: the driver writes at most MAX_DRIVES records
            let found = unsafe { ahci_detect_drives(self.drives.as_mut_ptr()) };
            self.count = usize::try_from(found).unwrap_or(0).min(MAX_DRIVES);

            table.clear();
            for raw in &self.drives[..self.count] {
                if table.push(raw.to_descriptor()).is_err() {
                    break;
                }
            }
            log::info!("AHCI: {} drives", table.len());
            table.len()
        }

        fn open_session(&mut self, drive: &DriveDescriptor) {
            if let Some(raw) = self.record(drive) {
                // SAFETY: the record came from ahci_detect_drives
                unsafe { ahci_start_disk_system(raw) };
            }
        }

        fn close_session(&mut self, drive: &DriveDescriptor) {
            if let Some(raw) = self.record(drive) {
                // SAFETY: the record came from ahci_detect_drives
                unsafe { ahci_reset_disk_system(raw) };
            }
        }

        fn read_smart(
            &mut self,
            drive: &DriveDescriptor,
            table: &mut AttributeTable,
        ) -> StorageResult<()> {
            let port = drive.port();
            let index = self.drives[..self.count]
                .iter()
                .position(|raw| raw.port == port)
                .ok_or(StorageError::AcquisitionFailed)?;

            self.smart = RawSmartData::EMPTY;
            // SAFETY: both pointers reference buffers owned by self
            let ok = unsafe { ahci_get_smart_data(&mut self.smart, &mut self.drives[index]) };
            if ok == 0 {
                log::error!("AHCI: SMART read failed on port {}", port);
                return Err(StorageError::AcquisitionFailed);
            }
            self.smart.fill_table(table)
        }

        fn shutdown(&mut self) {
            // SAFETY: the driver tolerates closing after any state
            unsafe { ahci_close_ahci() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u8, name: &str) -> RawSmartEntry {
        let mut raw = RawSmartEntry {
            id,
            value: 100,
            worst: 99,
            threshold: 6,
            raw_low: 7,
            raw_high: 1,
            raw_extra: 2,
            ..RawSmartEntry::EMPTY
        };
        raw.name[..name.len()].copy_from_slice(name.as_bytes());
        raw
    }

    #[test]
    fn test_drive_record_conversion() {
        let mut raw = RawDiskDrive {
            total_sectors: 976_773_168,
            total_gb: 500,
            port: 3,
            regs: [0x50, 0, 0xE0, 0, 0, 1, 1],
            regs_hi: [0, 0, 0, 0],
            ..RawDiskDrive::ZERO
        };
        raw.model[..10].copy_from_slice(b"TS05D00M20");
        raw.model[10..].fill(b' ');

        let drive = raw.to_descriptor();
        assert_eq!(drive.port(), 3);
        assert_eq!(drive.capacity_gb(), 500);
        assert_eq!(drive.model().as_str(), "ST500DM002");
        assert_eq!(drive.task_file().status, 0x50);
        assert_eq!(drive.task_file().device, 0xE0);
        assert!(!drive.task_file().has_error());
    }

    #[test]
    fn test_drive_record_layout() {
        use core::mem::{align_of, offset_of, size_of};

        assert_eq!(offset_of!(RawDiskDrive, total_sectors), 0);
        assert_eq!(offset_of!(RawDiskDrive, total_gb), 8);
        assert_eq!(offset_of!(RawDiskDrive, port), 12);
        assert_eq!(offset_of!(RawDiskDrive, model), 16);
        assert_eq!(offset_of!(RawDiskDrive, serial), 56);
        assert_eq!(offset_of!(RawDiskDrive, firmware), 76);
        assert_eq!(offset_of!(RawDiskDrive, regs), 84);
        assert_eq!(offset_of!(RawDiskDrive, regs_hi), 91);
        assert_eq!(size_of::<[RawDiskDrive; 2]>(), 208);
        assert!(align_of::<RawDiskDrive>() <= 8);

        assert_eq!(offset_of!(RawSmartEntry, raw_low), 4);
        assert_eq!(offset_of!(RawSmartEntry, name), 12);
        assert_eq!(offset_of!(RawSmartData, status), 44 * SMART_SLOTS);
    }

    #[test]
    fn test_drive_capacity_ignores_driver_gb() {
        let raw = RawDiskDrive {
            total_sectors: 1_953_525_168,
            total_gb: 7,
            ..RawDiskDrive::ZERO
        };
        assert_eq!(raw.to_descriptor().capacity_gb(), 1000);
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry(9, "Power_On_Hours").name(), "Power_On_Hours");
        assert_eq!(entry(9, "").name(), "");

        let mut full = entry(9, "");
        full.name = [b'A'; NAME_LEN];
        assert_eq!(full.name().len(), NAME_LEN);

        let mut bad = entry(9, "");
        bad.name[0] = 0xC3;
        assert_eq!(bad.name(), "");
    }

    #[test]
    fn test_zero_id_becomes_empty_slot() {
        let mut data = RawSmartData::EMPTY;
        data.entries[0] = entry(0, "ghost");
        data.entries[1] = entry(5, "Reallocated_Sector_Ct");

        let mut table = AttributeTable::new();
        data.fill_table(&mut table).expect("all slots in range");

        assert!(table.get(0).is_none());
        let attr = table.get(1).expect("slot 1");
        assert_eq!(attr.id.get(), 5);
        assert_eq!(attr.name.as_str(), "Reallocated_Sector_Ct");
        assert_eq!(attr.raw, RawData::new(7, 1, 2));
        assert_eq!(table.occupied(), 1);
    }

    #[test]
    fn test_fill_replaces_previous_contents() {
        let mut table = AttributeTable::new();
        table
            .set(40, SmartAttribute::from_raw(194, 30, 30, 0, RawData::default()))
            .expect("slot 40");

        RawSmartData::EMPTY.fill_table(&mut table).expect("fill");
        assert_eq!(table.occupied(), 0);
    }
}
