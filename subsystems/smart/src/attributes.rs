//! # Attribute Catalogue
//!
//! Which attributes count as critical, and the names drives commonly use
//! for them.

/// Attributes whose raw counters point at media or interface trouble
///
/// Read error rate, reallocated sectors, seek error rate, spin-up retries,
/// soft read errors, end-to-end errors, uncorrectable errors, hardware ECC
/// recovered, reallocation events, pending sectors, offline uncorrectable,
/// UDMA CRC errors, write error rate, and soft read errors (vendor alias).
pub const CRITICAL_ATTRIBUTES: [u8; 14] = [
    1, 5, 7, 10, 13, 184, 187, 195, 196, 197, 198, 199, 200, 201,
];

/// Whether `id` belongs to the critical set
pub fn is_critical(id: u8) -> bool {
    CRITICAL_ATTRIBUTES.contains(&id)
}

/// Conventional name for an attribute identifier
pub fn known_attribute_name(id: u8) -> Option<&'static str> {
    let name = match id {
        1 => "Raw_Read_Error_Rate",
        2 => "Throughput_Performance",
        3 => "Spin_Up_Time",
        4 => "Start_Stop_Count",
        5 => "Reallocated_Sector_Ct",
        7 => "Seek_Error_Rate",
        8 => "Seek_Time_Performance",
        9 => "Power_On_Hours",
        10 => "Spin_Retry_Count",
        11 => "Calibration_Retry_Count",
        12 => "Power_Cycle_Count",
        13 => "Read_Soft_Error_Rate",
        183 => "Runtime_Bad_Block",
        184 => "End-to-End_Error",
        187 => "Reported_Uncorrect",
        188 => "Command_Timeout",
        189 => "High_Fly_Writes",
        190 => "Airflow_Temperature_Cel",
        191 => "G-Sense_Error_Rate",
        192 => "Power-Off_Retract_Count",
        193 => "Load_Cycle_Count",
        194 => "Temperature_Celsius",
        195 => "Hardware_ECC_Recovered",
        196 => "Reallocated_Event_Count",
        197 => "Current_Pending_Sector",
        198 => "Offline_Uncorrectable",
        199 => "UDMA_CRC_Error_Count",
        200 => "Multi_Zone_Error_Rate",
        201 => "Soft_Read_Error_Rate",
        240 => "Head_Flying_Hours",
        241 => "Total_LBAs_Written",
        242 => "Total_LBAs_Read",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_set_is_exact() {
        let critical = (0..=u8::MAX).filter(|&id| is_critical(id)).count();
        assert_eq!(critical, 14);

        for id in CRITICAL_ATTRIBUTES {
            assert!(is_critical(id));
        }
        for id in [0, 2, 3, 4, 9, 12, 194, 202, 255] {
            assert!(!is_critical(id));
        }
    }

    #[test]
    fn test_critical_attributes_are_named() {
        for id in CRITICAL_ATTRIBUTES {
            assert!(known_attribute_name(id).is_some(), "id {} unnamed", id);
        }
        assert_eq!(known_attribute_name(9), Some("Power_On_Hours"));
        assert_eq!(known_attribute_name(0), None);
        assert_eq!(known_attribute_name(100), None);
    }
}
