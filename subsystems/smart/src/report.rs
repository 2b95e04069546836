//! # SMART Report
//!
//! Plain-text rendering, one comma-separated row per attribute:
//!
//! ```text
//! Attribute name, Critical, ID, Value, Worst, Warning, XData, WData, Status
//! Reallocated_Sector_Ct, Y, 5, 50, 50, 60, 0000 0000, 12, BAD
//! ```
//!
//! The "Critical" column tells whether the drive defines a threshold for
//! the attribute. XData is the top two raw words in hex, WData the low
//! raw dword in decimal.

use crate::attributes::known_attribute_name;
use crate::status::DriveStatus;
use crate::SmartState;
use core::fmt::{self, Write};
use smartdos_storage::SmartAttribute;

/// Column header
pub const HEADER: &str = "Attribute name, Critical, ID, Value, Worst, Warning, XData, WData, Status";

/// Name used when neither the drive nor the catalogue names an attribute
pub const UNKNOWN_NAME: &str = "Unknown_Attribute";

/// Name shown for an attribute
pub fn display_name(attribute: &SmartAttribute) -> &str {
    if !attribute.name.is_empty() {
        return &attribute.name;
    }
    known_attribute_name(attribute.id.get()).unwrap_or(UNKNOWN_NAME)
}

/// Write one attribute row, without line terminator
pub fn write_row<W: Write + ?Sized>(out: &mut W, attribute: &SmartAttribute) -> fmt::Result {
    write!(
        out,
        "{}, {}, {}, {}, {}, {}, {:04X} {:04X}, {}, {}",
        display_name(attribute),
        if attribute.has_threshold() { "Y" } else { "N" },
        attribute.id,
        attribute.value,
        attribute.worst,
        attribute.threshold,
        attribute.raw.extra,
        attribute.raw.high,
        attribute.raw.low,
        if attribute.is_failing() { "BAD" } else { "OK" },
    )
}

/// Write the drive status line
pub fn write_status<W: Write + ?Sized>(out: &mut W, status: DriveStatus) -> fmt::Result {
    writeln!(out, "Drive status : {}", status)
}

/// Write the header, every attribute row, and the drive status
pub fn write_report<W: Write + ?Sized>(out: &mut W, state: &SmartState) -> fmt::Result {
    writeln!(out, "{}", HEADER)?;
    for attribute in state.table.iter() {
        write_row(out, attribute)?;
        writeln!(out)?;
    }
    writeln!(out)?;
    write_status(out, state.status)
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use crate::evaluate;
    use alloc::string::String;
    use smartdos_storage::RawData;

    fn row(attribute: &SmartAttribute) -> String {
        let mut line = String::new();
        write_row(&mut line, attribute).expect("write to string");
        line
    }

    #[test]
    fn test_failing_row() {
        let a = SmartAttribute::from_raw(5, 50, 50, 60, RawData::new(12, 0, 0)).expect("id 5");
        assert_eq!(row(&a), "Reallocated_Sector_Ct, Y, 5, 50, 50, 60, 0000 0000, 12, BAD");
    }

    #[test]
    fn test_row_without_threshold() {
        let a = SmartAttribute::from_raw(1, 100, 100, 0, RawData::new(1, 0, 0))
            .expect("id 1")
            .with_name("Raw_Read_Error_Rate");
        assert_eq!(row(&a), "Raw_Read_Error_Rate, N, 1, 100, 100, 0, 0000 0000, 1, OK");
    }

    #[test]
    fn test_raw_words_are_padded_hex() {
        let a = SmartAttribute::from_raw(190, 64, 45, 45, RawData::new(36, 0x2D, 0xABC))
            .expect("id 190")
            .with_name("Airflow");
        assert_eq!(row(&a), "Airflow, Y, 190, 64, 45, 45, 0ABC 002D, 36, OK");
    }

    #[test]
    fn test_unnamed_attribute() {
        let a = SmartAttribute::from_raw(170, 100, 100, 10, RawData::default()).expect("id 170");
        assert_eq!(display_name(&a), UNKNOWN_NAME);
    }

    #[test]
    fn test_full_report() {
        let mut state = SmartState::new();
        state
            .table
            .set(0, SmartAttribute::from_raw(1, 100, 100, 0, RawData::new(1, 0, 0)))
            .expect("slot 0");
        state
            .table
            .set(2, SmartAttribute::from_raw(9, 97, 97, 0, RawData::new(2_500, 0, 0)))
            .expect("slot 2");
        evaluate(&mut state);

        let mut out = String::new();
        write_report(&mut out, &state).expect("write to string");
        assert_eq!(
            out,
            "Attribute name, Critical, ID, Value, Worst, Warning, XData, WData, Status\n\
             Raw_Read_Error_Rate, N, 1, 100, 100, 0, 0000 0000, 1, OK\n\
             Power_On_Hours, N, 9, 97, 97, 0, 0000 0000, 2500, OK\n\
             \n\
             Drive status : warning\n"
        );
    }
}
