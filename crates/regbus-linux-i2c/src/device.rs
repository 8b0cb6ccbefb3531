//! Linux I2C device implementation
//!
//! This module provides the `LinuxI2c` struct that implements the
//! `SmbusTransport` trait using Linux's i2c-dev interface.

use crate::error::{LinuxI2cError, Result};

use nix::errno::Errno;
use regbus_core::bus_select;
use regbus_core::error::{BusError, BusResult};
use regbus_core::transport::{Functionality, SmbusTransport};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Largest payload of an SMBus block transfer
const BLOCK_MAX: usize = 32;

/// Linux i2c-dev ioctl constants
mod ioctl {
    use nix::{ioctl_read_bad, ioctl_write_int_bad, ioctl_write_ptr_bad};

    // i2c-dev requests carry no direction/size encoding
    const I2C_SLAVE: u16 = 0x0703;
    const I2C_SLAVE_FORCE: u16 = 0x0706;
    const I2C_FUNCS: u16 = 0x0705;
    const I2C_SMBUS: u16 = 0x0720;

    pub const I2C_SMBUS_READ: u8 = 1;
    pub const I2C_SMBUS_WRITE: u8 = 0;

    pub const I2C_SMBUS_QUICK: u32 = 0;
    pub const I2C_SMBUS_BYTE: u32 = 1;
    pub const I2C_SMBUS_BYTE_DATA: u32 = 2;
    pub const I2C_SMBUS_WORD_DATA: u32 = 3;
    pub const I2C_SMBUS_I2C_BLOCK_DATA: u32 = 8;

    /// Matches the kernel's `union i2c_smbus_data`
    #[repr(C)]
    pub union I2cSmbusData {
        pub byte: u8,
        pub word: u16,
        // block[0] is the length; up to 32 data bytes plus one for PEC
        pub block: [u8; 34],
    }

    impl Default for I2cSmbusData {
        fn default() -> Self {
            Self { block: [0; 34] }
        }
    }

    /// Matches the kernel's `struct i2c_smbus_ioctl_data`
    #[repr(C)]
    pub struct I2cSmbusIoctlData {
        pub read_write: u8,
        pub command: u8,
        pub size: u32,
        pub data: *mut I2cSmbusData,
    }

    ioctl_write_int_bad!(i2c_slave, I2C_SLAVE);
    ioctl_write_int_bad!(i2c_slave_force, I2C_SLAVE_FORCE);
    ioctl_read_bad!(i2c_funcs, I2C_FUNCS, libc::c_ulong);
    ioctl_write_ptr_bad!(i2c_smbus, I2C_SMBUS, I2cSmbusIoctlData);
}

use ioctl::I2cSmbusData;

/// Map an i2c-dev errno onto a bus error class
pub fn classify(errno: Errno) -> BusError {
    match errno {
        Errno::ENXIO | Errno::EREMOTEIO => BusError::Nack,
        Errno::ETIMEDOUT => BusError::Timeout,
        Errno::EAGAIN => BusError::ArbitrationLost,
        Errno::EOPNOTSUPP => BusError::Unsupported,
        _ => BusError::Io,
    }
}

/// Configuration for opening a Linux I2C adapter
#[derive(Debug, Clone, Default)]
pub struct LinuxI2cConfig {
    /// Bus index (`/dev/i2c-N`); detected from the board revision if unset
    pub bus: Option<u8>,
    /// Device node path, overrides `bus`
    pub device: Option<String>,
    /// Select targets with `I2C_SLAVE_FORCE` even if a kernel driver owns them
    pub force: bool,
}

impl LinuxI2cConfig {
    /// Create a configuration that auto-detects the bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Use bus `/dev/i2c-<bus>`
    pub fn with_bus(mut self, bus: u8) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Use an explicit device node
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Take targets away from kernel drivers
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Device node to open
    ///
    /// Without an explicit device or bus the board revision picks the bus.
    pub fn path(&self) -> String {
        if let Some(device) = &self.device {
            return device.clone();
        }
        let bus = self.bus.unwrap_or_else(bus_select::detect_bus);
        format!("/dev/i2c-{}", bus)
    }
}

/// Linux SMBus transport using the i2c-dev interface
///
/// The kernel binds an i2c-dev file descriptor to one target address at a
/// time. The current target is cached so the `I2C_SLAVE` ioctl is only
/// issued when the addressed device changes.
pub struct LinuxI2c {
    /// File handle for the i2c-dev node
    file: File,
    /// Device node path
    path: String,
    /// Adapter functionality reported by the kernel
    funcs: Functionality,
    /// Target address the descriptor is currently bound to
    current: Option<u8>,
    /// Use I2C_SLAVE_FORCE
    force: bool,
}

impl LinuxI2c {
    /// Open a Linux I2C adapter with the given configuration
    pub fn open(config: &LinuxI2cConfig) -> Result<Self> {
        let path = config.path();
        log::debug!("linux_i2c: Opening device {}", path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| LinuxI2cError::OpenFailed {
                path: path.clone(),
                source: e,
            })?;

        let mut raw: libc::c_ulong = 0;
        unsafe {
            ioctl::i2c_funcs(file.as_raw_fd(), &mut raw).map_err(|e| {
                LinuxI2cError::FuncsFailed {
                    path: path.clone(),
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }
        let funcs = Functionality::from_bits_truncate(raw as u32);

        log::info!("linux_i2c: Opened {} (functionality {:?})", path, funcs);
        if config.force {
            log::warn!("linux_i2c: Forcing access to addresses claimed by kernel drivers");
        }

        Ok(Self {
            file,
            path,
            funcs,
            current: None,
            force: config.force,
        })
    }

    /// Open bus `/dev/i2c-<bus>` with default settings
    pub fn open_bus(bus: u8) -> Result<Self> {
        Self::open(&LinuxI2cConfig::new().with_bus(bus))
    }

    /// Device node this transport was opened on
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Bind the descriptor to `device` unless it already is
    fn select(&mut self, device: u8) -> BusResult<()> {
        if self.current == Some(device) {
            return Ok(());
        }
        let fd = self.file.as_raw_fd();
        let result = unsafe {
            if self.force {
                ioctl::i2c_slave_force(fd, device as libc::c_int)
            } else {
                ioctl::i2c_slave(fd, device as libc::c_int)
            }
        };
        match result {
            Ok(_) => {
                self.current = Some(device);
                Ok(())
            }
            Err(Errno::EBUSY) => {
                log::error!(
                    "linux_i2c: 0x{:02X} is claimed by a kernel driver (use force=1)",
                    device
                );
                self.current = None;
                Err(BusError::Io)
            }
            Err(e) => {
                self.current = None;
                Err(classify(e))
            }
        }
    }

    /// Issue one I2C_SMBUS ioctl
    fn smbus_access(
        &mut self,
        device: u8,
        read_write: u8,
        command: u8,
        size: u32,
        data: Option<&mut I2cSmbusData>,
    ) -> BusResult<()> {
        self.select(device)?;
        let args = ioctl::I2cSmbusIoctlData {
            read_write,
            command,
            size,
            data: data.map_or(std::ptr::null_mut(), |d| d as *mut I2cSmbusData),
        };
        unsafe { ioctl::i2c_smbus(self.file.as_raw_fd(), &args) }
            .map(|_| ())
            .map_err(|e| {
                log::trace!("linux_i2c: SMBus size {} to 0x{:02X}: {}", size, device, e);
                classify(e)
            })
    }
}

impl SmbusTransport for LinuxI2c {
    fn functionality(&self) -> Functionality {
        self.funcs
    }

    fn write_quick(&mut self, device: u8) -> BusResult<()> {
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_WRITE,
            0,
            ioctl::I2C_SMBUS_QUICK,
            None,
        )
    }

    fn write_byte(&mut self, device: u8, value: u8) -> BusResult<()> {
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_WRITE,
            value,
            ioctl::I2C_SMBUS_BYTE,
            None,
        )
    }

    fn read_byte(&mut self, device: u8) -> BusResult<u8> {
        let mut data = I2cSmbusData::default();
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_READ,
            0,
            ioctl::I2C_SMBUS_BYTE,
            Some(&mut data),
        )?;
        Ok(unsafe { data.byte })
    }

    fn write_byte_data(&mut self, device: u8, reg: u8, value: u8) -> BusResult<()> {
        let mut data = I2cSmbusData { byte: value };
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_WRITE,
            reg,
            ioctl::I2C_SMBUS_BYTE_DATA,
            Some(&mut data),
        )
    }

    fn read_byte_data(&mut self, device: u8, reg: u8) -> BusResult<u8> {
        let mut data = I2cSmbusData::default();
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_READ,
            reg,
            ioctl::I2C_SMBUS_BYTE_DATA,
            Some(&mut data),
        )?;
        Ok(unsafe { data.byte })
    }

    fn write_word_data(&mut self, device: u8, reg: u8, value: u16) -> BusResult<()> {
        let mut data = I2cSmbusData { word: value };
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_WRITE,
            reg,
            ioctl::I2C_SMBUS_WORD_DATA,
            Some(&mut data),
        )
    }

    fn read_word_data(&mut self, device: u8, reg: u8) -> BusResult<u16> {
        let mut data = I2cSmbusData::default();
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_READ,
            reg,
            ioctl::I2C_SMBUS_WORD_DATA,
            Some(&mut data),
        )?;
        Ok(unsafe { data.word })
    }

    fn write_block_data(&mut self, device: u8, reg: u8, bytes: &[u8]) -> BusResult<()> {
        if bytes.len() > BLOCK_MAX {
            return Err(BusError::Io);
        }
        let mut block = [0u8; 34];
        block[0] = bytes.len() as u8;
        block[1..=bytes.len()].copy_from_slice(bytes);
        let mut data = I2cSmbusData { block };
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_WRITE,
            reg,
            ioctl::I2C_SMBUS_I2C_BLOCK_DATA,
            Some(&mut data),
        )
    }

    fn read_block_data(&mut self, device: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        if buf.len() > BLOCK_MAX {
            return Err(BusError::Io);
        }
        let mut block = [0u8; 34];
        block[0] = buf.len() as u8;
        let mut data = I2cSmbusData { block };
        self.smbus_access(
            device,
            ioctl::I2C_SMBUS_READ,
            reg,
            ioctl::I2C_SMBUS_I2C_BLOCK_DATA,
            Some(&mut data),
        )?;
        let block = unsafe { data.block };
        // The kernel reports how many bytes it actually read
        let len = (block[0] as usize).min(buf.len());
        buf[..len].copy_from_slice(&block[1..=len]);
        if len < buf.len() {
            log::warn!(
                "linux_i2c: short block read from 0x{:02X}: {} of {} bytes",
                device,
                len,
                buf.len()
            );
            return Err(BusError::Io);
        }
        Ok(())
    }

    fn exclusive(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SmbusTransport) -> BusResult<()>,
    ) -> BusResult<()> {
        // One descriptor, one caller: nothing else can interleave in-process
        op(self)
    }
}

/// Parse bus options from a list of key-value pairs
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<LinuxI2cConfig, String> {
    let mut config = LinuxI2cConfig::default();

    for (key, value) in options {
        match *key {
            "bus" => {
                let bus: u8 = value
                    .parse()
                    .map_err(|_| format!("Invalid bus value: {}", value))?;
                config.bus = Some(bus);
            }
            "dev" => {
                config.device = Some(value.to_string());
            }
            "force" => {
                config.force = match *value {
                    "1" | "yes" | "true" | "on" => true,
                    "0" | "no" | "false" | "off" => false,
                    _ => return Err(format!("Invalid force value: {}", value)),
                };
            }
            _ => {
                log::warn!("linux_i2c: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("bus", "1"), ("force", "yes")]).unwrap();
        assert_eq!(config.bus, Some(1));
        assert!(config.force);
        assert_eq!(config.path(), "/dev/i2c-1");

        let config = parse_options(&[("dev", "/dev/i2c-7"), ("bus", "0")]).unwrap();
        assert_eq!(config.path(), "/dev/i2c-7");
    }

    #[test]
    fn test_parse_options_rejects_bad_values() {
        assert!(parse_options(&[("bus", "300")]).is_err());
        assert!(parse_options(&[("force", "maybe")]).is_err());
    }

    #[test]
    fn test_errno_classification() {
        assert_eq!(classify(Errno::ENXIO), BusError::Nack);
        assert_eq!(classify(Errno::EREMOTEIO), BusError::Nack);
        assert_eq!(classify(Errno::ETIMEDOUT), BusError::Timeout);
        assert_eq!(classify(Errno::EAGAIN), BusError::ArbitrationLost);
        assert_eq!(classify(Errno::EOPNOTSUPP), BusError::Unsupported);
        assert_eq!(classify(Errno::EIO), BusError::Io);
    }

    #[test]
    fn test_open_missing_device() {
        let config = LinuxI2cConfig::new().with_device("/nonexistent/i2c-99");
        assert!(matches!(
            LinuxI2c::open(&config),
            Err(LinuxI2cError::OpenFailed { .. })
        ));
    }
}
