//! Register maps loaded at runtime
//!
//! A register map describes one chip in a RON file so the command-line tool
//! (or any other caller) can address registers and fields by name:
//!
//! ```ron
//! (
//!     chip: "INA219",
//!     address: Some(0x40),
//!     registers: [
//!         (name: "CONFIG", address: 0x00, reset: 0x9F),
//!         (name: "STATUS", address: 0x02, reset: 0x00, mask: 0x03),
//!     ],
//!     fields: [
//!         (name: "MODE", register: "CONFIG", mask: 0x07),
//!         (name: "OVF", address: 0x02, mask: 0x01, access: W1C),
//!     ],
//! )
//! ```
//!
//! A field names its register either by `register` or by `address`. When
//! `offset` is omitted it is the position of the lowest mask bit.

use alloc::{string::String, vec::Vec};
use std::fs;
use std::io;
use std::path::Path;

use crate::register::{Access, BitField, Register};

/// Error type for register map loading
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// I/O error reading the file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// A field descriptor does not fit an 8-bit register
    #[error("Validation error: field {field}: {source}")]
    Descriptor {
        /// Name of the offending field
        field: String,
        /// Underlying descriptor error
        source: crate::Error,
    },
    /// Any other consistency problem
    #[error("Validation error: {0}")]
    Validation(String),
}

// ============================================================================
// RON deserialization types (intermediate format)
// ============================================================================

fn full_mask() -> u8 {
    0xFF
}

#[derive(Debug, Clone, serde::Deserialize)]
struct RegisterDef {
    name: String,
    address: u8,
    #[serde(default)]
    reset: u8,
    #[serde(default = "full_mask")]
    mask: u8,
    #[serde(default)]
    default: Option<u8>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct FieldDef {
    name: String,
    #[serde(default)]
    register: Option<String>,
    #[serde(default)]
    address: Option<u8>,
    mask: u8,
    #[serde(default)]
    offset: Option<u8>,
    #[serde(default)]
    access: Access,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct MapDef {
    chip: String,
    #[serde(default)]
    address: Option<u8>,
    #[serde(default)]
    registers: Vec<RegisterDef>,
    #[serde(default)]
    fields: Vec<FieldDef>,
}

// ============================================================================
// Loaded map
// ============================================================================

/// A register as described in a map file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    /// Register name
    pub name: String,
    /// Register address
    pub address: u8,
    /// Value after power-on reset
    pub reset: u8,
    /// Configurable bits
    pub mask: u8,
    /// Factory default, if any
    pub default: Option<u8>,
}

impl RegisterEntry {
    /// Borrow as a register descriptor
    pub fn descriptor(&self) -> Register<'_> {
        let reg = Register::new(&self.name, self.address, self.reset).with_mask(self.mask);
        match self.default {
            Some(value) => reg.with_default(value),
            None => reg,
        }
    }
}

/// A bit-field as described in a map file, already validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    name: String,
    address: u8,
    mask: u8,
    offset: u8,
    access: Access,
}

impl FieldEntry {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the host register
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Borrow as a bit-field descriptor
    pub fn descriptor(&self) -> BitField<'_> {
        // mask and offset were checked by BitField::try_new at load time
        BitField::new(&self.name, self.address, self.mask, self.offset).with_access(self.access)
    }
}

/// A named entry: either a whole register or one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<'m> {
    /// A whole register
    Register(&'m RegisterEntry),
    /// A bit-field
    Field(&'m FieldEntry),
}

/// Register map for one chip
#[derive(Debug, Clone, Default)]
pub struct RegisterMap {
    chip: String,
    address: Option<u8>,
    registers: Vec<RegisterEntry>,
    fields: Vec<FieldEntry>,
}

impl RegisterMap {
    /// Load a map from a RON file
    pub fn load_file(path: &Path) -> Result<Self, MapError> {
        let content = fs::read_to_string(path)?;
        Self::load_ron(&content)
    }

    /// Load a map from a RON string
    pub fn load_ron(content: &str) -> Result<Self, MapError> {
        let def: MapDef = ron::from_str(content)?;

        let mut registers: Vec<RegisterEntry> = Vec::with_capacity(def.registers.len());
        for reg in def.registers {
            if registers.iter().any(|r| r.name.eq_ignore_ascii_case(&reg.name)) {
                return Err(MapError::Validation(alloc::format!(
                    "duplicate register {}",
                    reg.name
                )));
            }
            if let Some(other) = registers.iter().find(|r| r.address == reg.address) {
                return Err(MapError::Validation(alloc::format!(
                    "registers {} and {} share address 0x{:02X}",
                    other.name,
                    reg.name,
                    reg.address
                )));
            }
            registers.push(RegisterEntry {
                name: reg.name,
                address: reg.address,
                reset: reg.reset,
                mask: reg.mask,
                default: reg.default,
            });
        }

        let mut fields: Vec<FieldEntry> = Vec::with_capacity(def.fields.len());
        for field in def.fields {
            let address = Self::field_address(&registers, &field)?;
            let offset = field
                .offset
                .unwrap_or_else(|| field.mask.trailing_zeros().min(7) as u8);
            BitField::try_new(&field.name, address, field.mask, offset).map_err(|source| {
                MapError::Descriptor {
                    field: field.name.clone(),
                    source,
                }
            })?;

            if fields.iter().any(|f| f.name.eq_ignore_ascii_case(&field.name))
                || registers.iter().any(|r| r.name.eq_ignore_ascii_case(&field.name))
            {
                return Err(MapError::Validation(alloc::format!(
                    "duplicate name {}",
                    field.name
                )));
            }

            fields.push(FieldEntry {
                name: field.name,
                address,
                mask: field.mask,
                offset,
                access: field.access,
            });
        }

        log::debug!(
            "Loaded register map {}: {} registers, {} fields",
            def.chip,
            registers.len(),
            fields.len()
        );

        Ok(Self {
            chip: def.chip,
            address: def.address,
            registers,
            fields,
        })
    }

    fn field_address(registers: &[RegisterEntry], field: &FieldDef) -> Result<u8, MapError> {
        let by_name = match &field.register {
            Some(name) => Some(
                registers
                    .iter()
                    .find(|r| r.name.eq_ignore_ascii_case(name))
                    .map(|r| r.address)
                    .ok_or_else(|| {
                        MapError::Validation(alloc::format!(
                            "field {} names unknown register {}",
                            field.name,
                            name
                        ))
                    })?,
            ),
            None => None,
        };

        match (by_name, field.address) {
            (Some(a), Some(b)) if a != b => Err(MapError::Validation(alloc::format!(
                "field {}: register and address disagree",
                field.name
            ))),
            (Some(address), _) => Ok(address),
            (None, Some(address)) => {
                if registers.iter().any(|r| r.address == address) {
                    Ok(address)
                } else {
                    Err(MapError::Validation(alloc::format!(
                        "field {} lives in unknown register 0x{:02X}",
                        field.name,
                        address
                    )))
                }
            }
            (None, None) => Err(MapError::Validation(alloc::format!(
                "field {} needs a register or an address",
                field.name
            ))),
        }
    }

    /// Chip name
    pub fn chip(&self) -> &str {
        &self.chip
    }

    /// Default device address, if the map gives one
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// All registers in file order
    pub fn registers(&self) -> &[RegisterEntry] {
        &self.registers
    }

    /// All fields in file order
    pub fn fields(&self) -> &[FieldEntry] {
        &self.fields
    }

    /// Find a register by name (case-insensitive)
    pub fn register(&self, name: &str) -> Option<&RegisterEntry> {
        self.registers
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Find a register by address
    pub fn register_at(&self, address: u8) -> Option<&RegisterEntry> {
        self.registers.iter().find(|r| r.address == address)
    }

    /// Find a field by name (case-insensitive)
    pub fn field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Find a register or field by name
    pub fn lookup(&self, name: &str) -> Option<Entry<'_>> {
        self.register(name)
            .map(Entry::Register)
            .or_else(|| self.field(name).map(Entry::Field))
    }

    /// Fields living in the register at `address`
    pub fn fields_of(&self, address: u8) -> impl Iterator<Item = &FieldEntry> {
        self.fields.iter().filter(move |f| f.address == address)
    }
}
