//! # SMART Attribute Table
//!
//! SMART data is a fixed array of attribute slots. The controller hands
//! over identifier 0 for unused slots; that sentinel is turned into `None`
//! here, so nothing downstream ever sees an attribute numbered 0.

use crate::{StorageError, StorageResult};
use core::num::NonZeroU8;

/// Number of attribute slots
pub const SMART_SLOTS: usize = 256;

/// Attribute display name
pub type AttributeName = heapless::String<32>;

/// 48 bits of vendor raw data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawData {
    /// Bits 0-31
    pub low: u32,
    /// Bits 32-47
    pub high: u16,
    /// Bits 48-63 as delivered by the controller
    pub extra: u16,
}

impl RawData {
    /// Create raw data from its three sub-fields
    pub const fn new(low: u32, high: u16, extra: u16) -> Self {
        Self { low, high, extra }
    }

    /// Whether any sub-field is non-zero
    #[inline]
    pub fn is_nonzero(&self) -> bool {
        self.low != 0 || self.high != 0 || self.extra != 0
    }

    /// Sub-fields combined into one value
    pub fn as_u64(&self) -> u64 {
        u64::from(self.low) | u64::from(self.high) << 32 | u64::from(self.extra) << 48
    }
}

/// One SMART attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartAttribute {
    /// Attribute identifier
    pub id: NonZeroU8,
    /// Display name (may be empty)
    pub name: AttributeName,
    /// Current normalized value
    pub value: u8,
    /// Worst value recorded
    pub worst: u8,
    /// Failure threshold (0 = none defined)
    pub threshold: u8,
    /// Vendor raw data
    pub raw: RawData,
}

impl SmartAttribute {
    /// Create an attribute without a display name
    pub fn new(id: NonZeroU8, value: u8, worst: u8, threshold: u8, raw: RawData) -> Self {
        Self {
            id,
            name: AttributeName::new(),
            value,
            worst,
            threshold,
            raw,
        }
    }

    /// Build from a controller entry; identifier 0 is an empty slot
    pub fn from_raw(id: u8, value: u8, worst: u8, threshold: u8, raw: RawData) -> Option<Self> {
        NonZeroU8::new(id).map(|id| Self::new(id, value, worst, threshold, raw))
    }

    /// Set the display name, truncating at the name capacity
    pub fn with_name(mut self, name: &str) -> Self {
        self.name.clear();
        for ch in name.chars() {
            if self.name.push(ch).is_err() {
                break;
            }
        }
        self
    }

    /// Whether a failure threshold is defined
    #[inline]
    pub fn has_threshold(&self) -> bool {
        self.threshold != 0
    }

    /// Whether the value has fallen below the threshold
    #[inline]
    pub fn is_failing(&self) -> bool {
        self.value < self.threshold
    }
}

/// Fixed table of SMART attribute slots
#[derive(Debug, Clone)]
pub struct AttributeTable {
    slots: [Option<SmartAttribute>; SMART_SLOTS],
}

impl AttributeTable {
    const EMPTY: Option<SmartAttribute> = None;

    /// Create a table with every slot empty
    pub const fn new() -> Self {
        Self {
            slots: [Self::EMPTY; SMART_SLOTS],
        }
    }

    /// Empty every slot
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Fill or empty slot `index`
    pub fn set(&mut self, index: usize, attribute: Option<SmartAttribute>) -> StorageResult<()> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(StorageError::SlotOutOfRange(index))?;
        *slot = attribute;
        Ok(())
    }

    /// Attribute in slot `index`, if any
    pub fn get(&self, index: usize) -> Option<&SmartAttribute> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Iterate over occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = &SmartAttribute> {
        self.slots.iter().flatten()
    }

    /// Number of occupied slots
    pub fn occupied(&self) -> usize {
        self.iter().count()
    }
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(low: u32) -> RawData {
        RawData::new(low, 0, 0)
    }

    #[test]
    fn test_zero_id_is_empty_slot() {
        assert!(SmartAttribute::from_raw(0, 100, 100, 0, raw(7)).is_none());
        let attr = SmartAttribute::from_raw(9, 98, 98, 0, raw(1234)).expect("id 9");
        assert_eq!(attr.id.get(), 9);
        assert!(!attr.has_threshold());
        assert!(!attr.is_failing());
    }

    #[test]
    fn test_raw_data() {
        assert!(!RawData::default().is_nonzero());
        assert!(RawData::new(0, 0, 1).is_nonzero());
        assert!(RawData::new(0, 1, 0).is_nonzero());
        assert_eq!(RawData::new(0x1234_5678, 0x9ABC, 0xDEF0).as_u64(), 0xDEF0_9ABC_1234_5678);
    }

    #[test]
    fn test_name_truncates() {
        let attr = SmartAttribute::from_raw(1, 100, 100, 6, raw(0))
            .expect("id 1")
            .with_name("Raw_Read_Error_Rate_With_A_Very_Long_Suffix");
        assert_eq!(attr.name.len(), 32);
        assert!(attr.name.starts_with("Raw_Read_Error_Rate"));
    }

    #[test]
    fn test_table_slots() {
        let mut table = AttributeTable::new();
        assert_eq!(table.occupied(), 0);

        table
            .set(3, SmartAttribute::from_raw(5, 100, 100, 36, raw(0)))
            .expect("slot 3");
        table
            .set(255, SmartAttribute::from_raw(194, 40, 55, 0, raw(40)))
            .expect("slot 255");
        table
            .set(4, SmartAttribute::from_raw(0, 1, 1, 1, raw(1)))
            .expect("slot 4");
        assert_eq!(
            table.set(SMART_SLOTS, None),
            Err(StorageError::SlotOutOfRange(SMART_SLOTS))
        );

        assert_eq!(table.occupied(), 2);
        assert!(table.get(4).is_none());
        let ids: [u8; 2] = [5, 194];
        assert!(table.iter().map(|a| a.id.get()).eq(ids.iter().copied()));

        table.clear();
        assert_eq!(table.occupied(), 0);
    }
}
