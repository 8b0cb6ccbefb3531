//! Register and bit-field descriptors
//!
//! Descriptors are plain, immutable data: where a value lives on the device
//! and how wide it is. They are `Copy` and can be shared freely between
//! devices and threads. A [`BitField`] refers to its host register only by
//! address; it never holds a reference to a [`Register`].
//!
//! Both types are normally declared as constants:
//!
//! ```
//! use regbus_core::{Access, BitField, Register};
//!
//! const STATUS: Register<'static> = Register::new("STATUS", 0x02, 0x00);
//! const READY: BitField<'static> = BitField::new("READY", 0x02, 0b0000_0010, 1);
//! const OVF: BitField<'static> =
//!     BitField::new("OVF", 0x02, 0b0000_0001, 0).with_access(Access::WriteOneToClear);
//!
//! assert_eq!(READY.width(), 1);
//! assert!(READY.belongs_to(&STATUS));
//! ```
//!
//! An invalid bit-field constant fails to compile; descriptors built at run
//! time go through [`BitField::try_new`] instead.

use crate::error::{Error, Result};

/// Width of a register in bits
pub const REGISTER_BITS: u8 = 8;

/// Access class of a bit-field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// Readable and writable
    #[default]
    #[cfg_attr(feature = "std", serde(alias = "RW"))]
    ReadWrite,
    /// Status bits; writes are rejected
    #[cfg_attr(feature = "std", serde(alias = "RO"))]
    ReadOnly,
    /// Command bits; reads are rejected
    #[cfg_attr(feature = "std", serde(alias = "WO"))]
    WriteOnly,
    /// Event bits that clear when a 1 is written back
    #[cfg_attr(feature = "std", serde(alias = "W1C"))]
    WriteOneToClear,
}

impl Access {
    /// Whether the field may be read
    pub const fn is_readable(self) -> bool {
        !matches!(self, Access::WriteOnly)
    }

    /// Whether the field may be written
    pub const fn is_writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

impl core::fmt::Display for Access {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Access::ReadWrite => write!(f, "RW"),
            Access::ReadOnly => write!(f, "RO"),
            Access::WriteOnly => write!(f, "WO"),
            Access::WriteOneToClear => write!(f, "W1C"),
        }
    }
}

/// An 8-bit register with a single unique address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register<'a> {
    /// Label used in diagnostics
    pub name: &'a str,
    /// Register address (SMBus command byte)
    pub address: u8,
    /// Value after power-on reset
    pub reset: u8,
    /// Bits that carry configuration (the rest are reserved or status)
    pub mask: u8,
    /// Factory-programmed default, if the part has one
    pub default: Option<u8>,
}

impl<'a> Register<'a> {
    /// Create a register descriptor with every bit configurable
    pub const fn new(name: &'a str, address: u8, reset: u8) -> Self {
        Self {
            name,
            address,
            reset,
            mask: 0xFF,
            default: None,
        }
    }

    /// Set the configuration mask
    pub const fn with_mask(mut self, mask: u8) -> Self {
        self.mask = mask;
        self
    }

    /// Set the factory default value
    pub const fn with_default(mut self, default: u8) -> Self {
        self.default = Some(default);
        self
    }

    /// Value a freshly configured part should hold: factory default if
    /// present, reset value otherwise
    pub const fn default_or_reset(&self) -> u8 {
        match self.default {
            Some(value) => value,
            None => self.reset,
        }
    }
}

/// A field of one or more bits inside one 8-bit register
///
/// The field's value is `(raw & mask) >> offset`. The mask may be sparse;
/// the field width is the number of set bits in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField<'a> {
    name: &'a str,
    address: u8,
    mask: u8,
    offset: u8,
    access: Access,
}

impl<'a> BitField<'a> {
    /// Create a bit-field descriptor
    ///
    /// # Panics
    ///
    /// Panics if the mask is empty, the offset is not below 8, or a mask bit
    /// lies below the offset. In a `const` item this is a compile error.
    pub const fn new(name: &'a str, address: u8, mask: u8, offset: u8) -> Self {
        if !Self::fits(mask, offset) {
            panic!("bit-field mask/offset does not fit an 8-bit register");
        }
        Self {
            name,
            address,
            mask,
            offset,
            access: Access::ReadWrite,
        }
    }

    /// Create a bit-field descriptor, validating mask and offset
    pub fn try_new(name: &'a str, address: u8, mask: u8, offset: u8) -> Result<Self> {
        if !Self::fits(mask, offset) {
            return Err(Error::DescriptorOutOfRange);
        }
        Ok(Self::new(name, address, mask, offset))
    }

    /// Create a single-bit field at `bit`
    pub const fn bit(name: &'a str, address: u8, bit: u8) -> Self {
        if bit >= REGISTER_BITS {
            panic!("bit index does not fit an 8-bit register");
        }
        Self::new(name, address, 1 << bit, bit)
    }

    const fn fits(mask: u8, offset: u8) -> bool {
        mask != 0 && offset < REGISTER_BITS && (mask & ((1u8 << offset) - 1)) == 0
    }

    /// Set the access class
    pub const fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Label used in diagnostics
    pub const fn name(&self) -> &'a str {
        self.name
    }

    /// Address of the host register
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Bits covered by the field, in register position
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    /// Position of the field's least significant bit
    pub const fn offset(&self) -> u8 {
        self.offset
    }

    /// Access class
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Number of bits in the field
    pub const fn width(&self) -> u32 {
        self.mask.count_ones()
    }

    /// Largest value the field can hold, right-aligned
    pub const fn max_value(&self) -> u8 {
        self.mask >> self.offset
    }

    /// Whether every bit of `value` lands inside the field
    ///
    /// Sparse masks have holes, so this is stricter than comparing
    /// against [`max_value`](Self::max_value).
    pub const fn fits_value(&self, value: u8) -> bool {
        value & !self.max_value() == 0
    }

    /// Whether the field lives in `register`
    pub fn belongs_to(&self, register: &Register<'_>) -> bool {
        self.address == register.address
    }

    /// Extract the field from a raw register value
    pub const fn extract(&self, raw: u8) -> u8 {
        (raw & self.mask) >> self.offset
    }

    /// Replace the field in a raw register value, leaving other bits alone
    ///
    /// Bits of `value` that do not fit the field are dropped.
    pub const fn insert(&self, raw: u8, value: u8) -> u8 {
        (raw & !self.mask) | ((value << self.offset) & self.mask)
    }

    /// Register value that acknowledges a write-one-to-clear event
    pub const fn clear_pattern(&self) -> u8 {
        (1u8 << self.offset) & self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: Register<'static> = Register::new("CTRL", 0x20, 0x07).with_mask(0x7F);
    const MODE: BitField<'static> = BitField::new("MODE", 0x20, 0b0001_1100, 2);

    #[test]
    fn test_extract_and_insert() {
        assert_eq!(MODE.extract(0b1111_0111), 0b101);
        assert_eq!(MODE.insert(0b1111_1111, 0b010), 0b1110_1011);
        assert_eq!(MODE.insert(0x00, 0b111), 0b0001_1100);
    }

    #[test]
    fn test_insert_drops_oversized_value() {
        // 0b1000 does not fit a 3-bit field
        assert_eq!(MODE.insert(0x00, 0b1000), 0x00);
    }

    #[test]
    fn test_width_and_max_value() {
        assert_eq!(MODE.width(), 3);
        assert_eq!(MODE.max_value(), 0b111);

        let sparse = BitField::new("SPARSE", 0x20, 0b1010_0000, 5);
        assert_eq!(sparse.width(), 2);
        assert_eq!(sparse.extract(0b1010_0000), 0b101);
    }

    #[test]
    fn test_fits_value_respects_mask_holes() {
        assert!(MODE.fits_value(0b111));
        assert!(!MODE.fits_value(0b1000));

        let sparse = BitField::new("SPARSE", 0x20, 0b1010_0000, 5);
        assert!(sparse.fits_value(0b101));
        assert!(sparse.fits_value(0b100));
        // Below max_value but lands in the hole at bit 6
        assert!(!sparse.fits_value(0b010));
        assert_eq!(sparse.insert(0x00, 0b010), 0x00);
    }

    #[test]
    fn test_try_new_rejects_bad_descriptors() {
        assert_eq!(
            BitField::try_new("EMPTY", 0, 0x00, 0),
            Err(Error::DescriptorOutOfRange)
        );
        assert_eq!(
            BitField::try_new("OFFSET", 0, 0x80, 8),
            Err(Error::DescriptorOutOfRange)
        );
        // Mask bit 0 lies below offset 1
        assert_eq!(
            BitField::try_new("BELOW", 0, 0b0000_0011, 1),
            Err(Error::DescriptorOutOfRange)
        );
        assert!(BitField::try_new("OK", 0, 0b1100_0000, 6).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_new_panics_on_bad_descriptor() {
        let _ = BitField::new("BAD", 0, 0x01, 3);
    }

    #[test]
    fn test_single_bit_helper() {
        let ready = BitField::bit("READY", 0x02, 7);
        assert_eq!(ready.mask(), 0x80);
        assert_eq!(ready.offset(), 7);
        assert_eq!(ready.clear_pattern(), 0x80);
    }

    #[test]
    fn test_relationship_by_address() {
        assert!(MODE.belongs_to(&CTRL));
        let other = Register::new("OTHER", 0x21, 0);
        assert!(!MODE.belongs_to(&other));
    }

    #[test]
    fn test_register_defaults() {
        assert_eq!(CTRL.default_or_reset(), 0x07);
        assert_eq!(CTRL.with_default(0x11).default_or_reset(), 0x11);
        assert_eq!(CTRL.mask, 0x7F);
    }

    #[test]
    fn test_access_classes() {
        assert!(Access::ReadOnly.is_readable());
        assert!(!Access::ReadOnly.is_writable());
        assert!(!Access::WriteOnly.is_readable());
        assert!(Access::WriteOneToClear.is_writable());
        assert_eq!(MODE.access(), Access::ReadWrite);
    }
}
