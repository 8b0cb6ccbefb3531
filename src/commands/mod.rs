//! CLI command implementations
//!
//! Every command that talks to a device receives a [`Device`] built from the
//! global options, so the library's diagnostic policy (debug tracing, quiet
//! mode, device name) applies uniformly.
//!
//! ## Raw commands
//!
//! `probe`, `read`, `write`, `dump` and the wide-address commands address
//! registers by number.
//!
//! ## Named commands
//!
//! `get`, `set`, `check` and `clear` resolve register and field names
//! through a RON register map.

mod detect;
mod list;
pub mod map;
pub mod named;
pub mod registers;
mod scan;

pub use detect::run_detect;
pub use list::list_buses;
pub use scan::run_scan;

use crate::buses::{self, BoxedBus};
use regbus_core::{Device, DeviceConfig, Verbosity};
use thiserror::Error;

/// Command-level failures that are not bus or map errors
#[derive(Debug, Error)]
pub enum CommandError {
    /// Name not found in the register map
    #[error("{name} is not in register map {chip}")]
    UnknownName { name: String, chip: String },

    /// A field operation was asked of a register
    #[error("{0} is a register, not a field")]
    NotAField(String),

    /// Neither the command line nor the map gave a device address
    #[error("No device address: pass --address or add `address` to the map")]
    NoAddress,

    /// Fields have no reset value to verify against
    #[error("Field {0} has no reset value; give the expected value")]
    MissingExpected(String),

    /// Verification failed
    #[error("{name}: expected 0x{expected:02X}, read 0x{actual:02X}")]
    Mismatch {
        name: String,
        expected: u8,
        actual: u8,
    },

    /// Value wider than the register
    #[error("Value 0x{0:04X} does not fit a byte register (use --word)")]
    ValueTooLarge(u16),
}

/// Global options that shape every device handle
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// Bus specification string
    pub bus: String,
    /// Trace every primitive
    pub debug: bool,
    /// Suppress keyed-operation diagnostics
    pub quiet: bool,
    /// Display name override
    pub name: Option<String>,
}

impl DeviceOptions {
    /// Device configuration for `address`, named after `fallback_name`
    /// unless a name was given on the command line
    pub fn config(&self, address: u8, fallback_name: Option<&str>) -> DeviceConfig {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Verbose
        };
        let config = DeviceConfig::new(address)
            .with_debug(self.debug)
            .with_verbosity(verbosity);
        match self.name.as_deref().or(fallback_name) {
            Some(name) => config.with_name(name),
            None => config,
        }
    }

    /// Open the bus and attach a device handle to it
    pub fn open(
        &self,
        address: u8,
        fallback_name: Option<&str>,
    ) -> Result<Device<BoxedBus>, Box<dyn std::error::Error>> {
        let bus = buses::open_bus(&self.bus)?;
        Ok(Device::new(bus, self.config(address, fallback_name)))
    }
}

/// Format a slice as rows of hex bytes, 16 per row, labelled from `base`
pub fn hex_rows(base: u16, data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            format!(
                "0x{:04X}: {}",
                base.wrapping_add((i * 16) as u16),
                bytes.join(" ")
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_config_from_options() {
        let options = DeviceOptions {
            bus: "dummy".into(),
            debug: true,
            quiet: true,
            name: None,
        };
        let config = options.config(0x40, Some("INA219"));
        assert_eq!(config.address, 0x40);
        assert_eq!(config.name.as_str(), "INA219");
        assert!(config.debug);
        assert_eq!(config.verbosity, Verbosity::Quiet);

        let options = DeviceOptions {
            name: Some("left".into()),
            ..options
        };
        assert_eq!(options.config(0x40, Some("INA219")).name.as_str(), "left");
    }

    #[test]
    fn test_hex_rows() {
        let data: Vec<u8> = (0..20).collect();
        let rows = hex_rows(0x10, &data);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("0x0010: 00 01 02"));
        assert_eq!(rows[1], "0x0020: 10 11 12 13");
    }
}
