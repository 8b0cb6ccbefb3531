//! Register and bit-field operations
//!
//! These operations compose the [`Device`] primitives into named,
//! diagnosable accesses keyed by a descriptor instead of a raw address.
//!
//! # Diagnostics
//!
//! Keyed operations log at info level when the device is in debug mode or
//! its verbosity is [`Verbosity::Verbose`]. Verification mismatches are
//! always logged at error level. [`Device::read_field_quiet`] only logs in
//! debug mode and is meant for polling loops.
//!
//! # Locking
//!
//! [`Device::write_field`] and [`Device::clear_event`] read a register and
//! then write it. Both calls run inside one [`SmbusTransport::exclusive`]
//! span, so when the devices on a bus share a
//! [`SharedBus`](crate::transport::SharedBus) another device cannot slip a
//! write in between. With unshared transports the caller must serialize
//! access to fields that live in the same register.
//!
//! [`Verbosity::Verbose`]: crate::device::Verbosity::Verbose

use crate::device::{trace_read_byte, trace_write_byte, Device};
use crate::error::{Error, Result};
use crate::register::{BitField, Register};
use crate::transport::{Functionality, SmbusTransport};

/// Outcome of a read-and-verify operation
///
/// A mismatch is not an error: the actual value is always returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// Value the caller expected
    pub expected: u8,
    /// Value read from the device
    pub actual: u8,
}

impl Verification {
    /// Whether the device held the expected value
    pub fn is_match(&self) -> bool {
        self.expected == self.actual
    }
}

/// Outcome of [`Device::clear_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// The event was set and has been acknowledged
    Cleared,
    /// The event was not set; nothing was written
    NotSet,
}

impl<T: SmbusTransport> Device<T> {
    fn check_readable(&self, field: &BitField<'_>) -> Result<()> {
        if field.access().is_readable() {
            Ok(())
        } else {
            log::error!("{}: field {} is write-only", self.label(), field.name());
            Err(Error::WriteOnly)
        }
    }

    fn check_writable(&self, field: &BitField<'_>) -> Result<()> {
        if field.access().is_writable() {
            Ok(())
        } else {
            log::error!("{}: field {} is read-only", self.label(), field.name());
            Err(Error::ReadOnly)
        }
    }

    /// Write a full register
    pub fn write_register(&mut self, register: &Register<'_>, value: u8) -> Result<()> {
        self.write_byte(register.address, value)?;
        if self.chatty() {
            log::info!(
                "{}: wrote register {} (0x{:02X}) = 0x{:02X}",
                self.label(),
                register.name,
                register.address,
                value
            );
        }
        Ok(())
    }

    /// Read a full register
    pub fn read_register(&mut self, register: &Register<'_>) -> Result<u8> {
        let value = self.read_u8(register.address)?;
        if self.chatty() {
            log::info!(
                "{}: read register {} (0x{:02X}) = 0x{:02X}",
                self.label(),
                register.name,
                register.address,
                value
            );
        }
        Ok(value)
    }

    /// Read a full register and compare it with `expected`
    pub fn read_register_and_verify(
        &mut self,
        register: &Register<'_>,
        expected: u8,
    ) -> Result<Verification> {
        let actual = self.read_u8(register.address)?;
        if self.chatty() {
            log::info!(
                "{}: checked register {} (0x{:02X}) = 0x{:02X}",
                self.label(),
                register.name,
                register.address,
                actual
            );
        }
        let check = Verification { expected, actual };
        if !check.is_match() {
            log::error!(
                "{}: FAIL register {}: expected 0x{:02X}, read 0x{:02X}",
                self.label(),
                register.name,
                expected,
                actual
            );
        }
        Ok(check)
    }

    /// Write the register's reset value
    pub fn reset_register(&mut self, register: &Register<'_>) -> Result<()> {
        self.write_register(register, register.reset)
    }

    /// Verify that the register holds its reset value
    pub fn check_reset(&mut self, register: &Register<'_>) -> Result<Verification> {
        self.read_register_and_verify(register, register.reset)
    }

    /// Write the factory default, or the reset value when there is none
    pub fn restore_default(&mut self, register: &Register<'_>) -> Result<()> {
        self.write_register(register, register.default_or_reset())
    }

    fn extract_field(&mut self, field: &BitField<'_>) -> Result<u8> {
        self.check_readable(field)?;
        let raw = self.read_u8(field.address())?;
        Ok(field.extract(raw))
    }

    /// Read a bit-field, right-aligned to bit 0
    pub fn read_field(&mut self, field: &BitField<'_>) -> Result<u8> {
        let value = self.extract_field(field)?;
        if self.chatty() {
            log::info!(
                "{}: read field {} = 0x{:02X}",
                self.label(),
                field.name(),
                value
            );
        }
        Ok(value)
    }

    /// Read a bit-field and compare it with `expected`
    pub fn read_field_and_verify(
        &mut self,
        field: &BitField<'_>,
        expected: u8,
    ) -> Result<Verification> {
        let actual = self.extract_field(field)?;
        if self.chatty() {
            log::info!(
                "{}: checked field {} = 0x{:02X}",
                self.label(),
                field.name(),
                actual
            );
        }
        let check = Verification { expected, actual };
        if !check.is_match() {
            log::error!(
                "{}: FAIL field {}: expected 0x{:02X}, read 0x{:02X}",
                self.label(),
                field.name(),
                expected,
                actual
            );
        }
        Ok(check)
    }

    /// Read a bit-field, logging only in debug mode
    pub fn read_field_quiet(&mut self, field: &BitField<'_>) -> Result<u8> {
        let value = self.extract_field(field)?;
        if self.debug {
            log::info!(
                "{}: read field {} = 0x{:02X}",
                self.label(),
                field.name(),
                value
            );
        }
        Ok(value)
    }

    /// Replace a bit-field, leaving every other bit of the register alone
    ///
    /// Bits of `value` that fall outside the field mask are dropped with a
    /// warning.
    pub fn write_field(&mut self, field: &BitField<'_>, value: u8) -> Result<()> {
        self.check_writable(field)?;
        self.require(Functionality::SMBUS_BYTE_DATA)?;
        if !field.fits_value(value) {
            log::warn!(
                "{}: value 0x{:02X} does not fit the {}-bit field {}",
                self.label(),
                value,
                field.width(),
                field.name()
            );
        }

        let reg = field.address();
        let debug = self.debug;
        self.exclusive(|bus, address| {
            let raw = bus.read_byte_data(address, reg);
            if debug {
                trace_read_byte(address, reg, &raw);
            }
            let written = field.insert(raw?, value);
            let result = bus.write_byte_data(address, reg, written);
            if debug {
                trace_write_byte(address, reg, written, &result);
            }
            result
        })?;

        if self.chatty() {
            log::info!(
                "{}: wrote field {} = 0x{:02X}",
                self.label(),
                field.name(),
                value
            );
        }
        Ok(())
    }

    /// Acknowledge a self-clearing event bit
    ///
    /// If the field reads non-zero, a single 1 at the field's offset is
    /// written to the register; otherwise nothing is written.
    pub fn clear_event(&mut self, field: &BitField<'_>) -> Result<EventState> {
        self.check_readable(field)?;
        self.check_writable(field)?;
        self.require(Functionality::SMBUS_BYTE_DATA)?;

        let reg = field.address();
        let pattern = field.clear_pattern();
        let debug = self.debug;
        let mut state = EventState::NotSet;
        self.exclusive(|bus, address| {
            let raw = bus.read_byte_data(address, reg);
            if debug {
                trace_read_byte(address, reg, &raw);
            }
            if field.extract(raw?) != 0 {
                let result = bus.write_byte_data(address, reg, pattern);
                if debug {
                    trace_write_byte(address, reg, pattern, &result);
                }
                result?;
                state = EventState::Cleared;
            }
            Ok(())
        })?;

        match state {
            EventState::Cleared => {
                log::info!("{}: cleared event {}", self.label(), field.name())
            }
            EventState::NotSet => log::info!(
                "{}: asked to clear event {}, but it is not set",
                self.label(),
                field.name()
            ),
        }
        Ok(state)
    }

    /// Send a quick write to wake the device or probe for its presence
    pub fn unlock_bus(&mut self) -> Result<()> {
        self.write_quick()?;
        if self.chatty() {
            log::info!(
                "{}: quick write sent to 0x{:02X}",
                self.label(),
                self.address()
            );
        }
        Ok(())
    }

    /// Write a register that has no descriptor
    pub fn raw_write(&mut self, reg: u8, value: u8) -> Result<()> {
        self.write_byte(reg, value)?;
        if self.chatty() {
            log::info!(
                "{}: wrote 0x{:02X} to register 0x{:02X}",
                self.label(),
                value,
                reg
            );
        }
        Ok(())
    }

    /// Read a register that has no descriptor
    pub fn raw_read(&mut self, reg: u8) -> Result<u8> {
        let value = self.read_u8(reg)?;
        if self.chatty() {
            log::info!(
                "{}: read register 0x{:02X} = 0x{:02X}",
                self.label(),
                reg,
                value
            );
        }
        Ok(value)
    }
}
