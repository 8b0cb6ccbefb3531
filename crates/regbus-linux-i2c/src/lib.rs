//! regbus-linux-i2c - Linux i2c-dev support
//!
//! This crate provides an SMBus transport for Linux via the `/dev/i2c-N`
//! device interface.
//!
//! # Overview
//!
//! The Linux I2C core exposes each adapter through a character device at
//! `/dev/i2c-N`. Every transaction is one `I2C_SMBUS` ioctl; the kernel
//! driver performs the actual bus cycle and reports NACKs, timeouts and
//! arbitration loss through errno.
//!
//! # Example
//!
//! ```no_run
//! use regbus_core::{Device, DeviceConfig, Register};
//! use regbus_linux_i2c::{LinuxI2c, LinuxI2cConfig};
//!
//! const CONFIG: Register<'static> = Register::new("CONFIG", 0x00, 0x9F);
//!
//! // Pick the bus from the board revision
//! let i2c = LinuxI2c::open(&LinuxI2cConfig::new())?;
//!
//! // Or name it
//! let i2c = LinuxI2c::open(&LinuxI2cConfig::new().with_bus(1))?;
//!
//! let mut dev = Device::new(i2c, DeviceConfig::new(0x40).with_name("INA219"));
//! let value = dev.read_register(&CONFIG)?;
//! println!("CONFIG = 0x{:02X}", value);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Usage with regbus CLI
//!
//! ```bash
//! # Scan the auto-detected bus
//! regbus scan
//!
//! # Read a register on bus 1
//! regbus --bus linux_i2c:bus=1 read -a 0x40 -r 0x00
//!
//! # Talk to a device a kernel driver has claimed
//! regbus --bus linux_i2c:dev=/dev/i2c-3,force=1 probe -a 0x50
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with i2c-dev support (`CONFIG_I2C_CHARDEV`, or
//!   `modprobe i2c-dev`)
//! - Read/write access to `/dev/i2c-N`
//! - May require adding the user to the `i2c` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{classify, parse_options, LinuxI2c, LinuxI2cConfig};
pub use error::{LinuxI2cError, Result};

use regbus_core::transport::SmbusTransport;

/// Open a Linux I2C adapter and return a boxed transport
///
/// This is a convenience function for use in the CLI bus dispatch.
///
/// # Arguments
///
/// * `options` - Slice of (key, value) pairs from bus string parsing
///
/// # Example Options
///
/// - `bus=1` - Optional: adapter index (default: detected from the board)
/// - `dev=/dev/i2c-3` - Optional: device node, overrides `bus`
/// - `force=1` - Optional: use `I2C_SLAVE_FORCE`
pub fn open_linux_i2c(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn SmbusTransport + Send>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    let i2c = LinuxI2c::open(&config)?;
    Ok(Box::new(i2c))
}
