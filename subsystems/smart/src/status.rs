//! Drive health status.

use core::fmt;

/// Aggregate health of a drive
///
/// Ordered by severity. [`DriveStatus::Damaged`] is sticky: once reached,
/// nothing lowers it again until the state is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum DriveStatus {
    /// No problem found
    #[default]
    Perfect = 0,
    /// A critical attribute reports events
    Warning = 1,
    /// An attribute fell below its threshold
    Damaged = 2,
}

impl DriveStatus {
    /// Numeric status code
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Status for a numeric code, if defined
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Perfect),
            1 => Some(Self::Warning),
            2 => Some(Self::Damaged),
            _ => None,
        }
    }

    /// Raise to warning, but only from perfect
    pub fn warn(&mut self) {
        if *self == Self::Perfect {
            *self = Self::Warning;
        }
    }

    /// Mark the drive damaged
    pub fn damage(&mut self) {
        *self = Self::Damaged;
    }

    /// Lower-case label used in the report
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Warning => "warning",
            Self::Damaged => "damaged",
        }
    }
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label for a raw status code; undefined codes read "unknown"
pub const fn status_label(code: u8) -> &'static str {
    match DriveStatus::from_code(code) {
        Some(status) => status.label(),
        None => "unknown",
    }
}
