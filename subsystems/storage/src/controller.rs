//! # Storage Controller Contract
//!
//! The AHCI controller driver is an external collaborator. The
//! [`StorageController`] trait is everything the diagnostic asks of it;
//! [`TransferSession`] pairs opening a drive's transfer session with
//! closing it.

use crate::attribute::AttributeTable;
use crate::descriptor::{DriveDescriptor, DriveTable};
use crate::StorageResult;

/// Storage controller driver
pub trait StorageController {
    /// Whether a controller is present
    fn detect(&mut self) -> bool;

    /// Fill `table` with the drives found and return how many there are
    fn enumerate_drives(&mut self, table: &mut DriveTable) -> usize;

    /// Prepare the transfer machinery for `drive`
    fn open_session(&mut self, drive: &DriveDescriptor);

    /// Tear down the transfer machinery for `drive`
    fn close_session(&mut self, drive: &DriveDescriptor);

    /// Read the drive's SMART attributes into `table`
    ///
    /// Empty slots come back as `None`.
    fn read_smart(
        &mut self,
        drive: &DriveDescriptor,
        table: &mut AttributeTable,
    ) -> StorageResult<()>;

    /// Release the controller
    fn shutdown(&mut self);
}

impl<C: StorageController + ?Sized> StorageController for &mut C {
    fn detect(&mut self) -> bool {
        (**self).detect()
    }

    fn enumerate_drives(&mut self, table: &mut DriveTable) -> usize {
        (**self).enumerate_drives(table)
    }

    fn open_session(&mut self, drive: &DriveDescriptor) {
        (**self).open_session(drive)
    }

    fn close_session(&mut self, drive: &DriveDescriptor) {
        (**self).close_session(drive)
    }

    fn read_smart(
        &mut self,
        drive: &DriveDescriptor,
        table: &mut AttributeTable,
    ) -> StorageResult<()> {
        (**self).read_smart(drive, table)
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// Open transfer session on one drive
///
/// The session is closed when the guard is dropped.
pub struct TransferSession<'c, 'd, C: StorageController + ?Sized> {
    controller: &'c mut C,
    drive: &'d DriveDescriptor,
}

impl<C: StorageController + ?Sized> core::fmt::Debug for TransferSession<'_, '_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransferSession")
            .field("port", &self.drive.port())
            .finish_non_exhaustive()
    }
}

impl<'c, 'd, C: StorageController + ?Sized> TransferSession<'c, 'd, C> {
    /// Open a session on `drive`
    pub fn open(controller: &'c mut C, drive: &'d DriveDescriptor) -> Self {
        log::debug!("Opening transfer session on port {}", drive.port());
        controller.open_session(drive);
        Self { controller, drive }
    }

    /// Drive the session is bound to
    #[inline]
    pub fn drive(&self) -> &DriveDescriptor {
        self.drive
    }

    /// Read SMART attributes through the session
    pub fn read_smart(&mut self, table: &mut AttributeTable) -> StorageResult<()> {
        self.controller.read_smart(self.drive, table)
    }
}

impl<C: StorageController + ?Sized> Drop for TransferSession<'_, '_, C> {
    fn drop(&mut self) {
        log::debug!("Closing transfer session on port {}", self.drive.port());
        self.controller.close_session(self.drive);
    }
}
