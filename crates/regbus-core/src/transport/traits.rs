//! Transport trait definitions
//!
//! A transport is one open bus adapter. It knows nothing about registers
//! beyond the command byte of an SMBus transaction; all mask/shift logic
//! lives in [`crate::device`] and [`crate::access`].

use crate::error::BusResult;
use bitflags::bitflags;

bitflags! {
    /// SMBus/I2C adapter functionality flags
    ///
    /// Values match the Linux `I2C_FUNC_*` constants so the Linux backend can
    /// pass the `I2C_FUNCS` ioctl result straight through.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Functionality: u32 {
        /// Plain I2C transfers
        const I2C                    = 0x0000_0001;
        /// SMBus quick command (address only, no payload)
        const SMBUS_QUICK            = 0x0001_0000;
        /// Receive byte (no command byte)
        const SMBUS_READ_BYTE        = 0x0002_0000;
        /// Send byte (no command byte)
        const SMBUS_WRITE_BYTE       = 0x0004_0000;
        /// Read byte data
        const SMBUS_READ_BYTE_DATA   = 0x0008_0000;
        /// Write byte data
        const SMBUS_WRITE_BYTE_DATA  = 0x0010_0000;
        /// Read word data
        const SMBUS_READ_WORD_DATA   = 0x0020_0000;
        /// Write word data
        const SMBUS_WRITE_WORD_DATA  = 0x0040_0000;
        /// I2C-style block read (length chosen by the master)
        const SMBUS_READ_I2C_BLOCK   = 0x0400_0000;
        /// I2C-style block write
        const SMBUS_WRITE_I2C_BLOCK  = 0x0800_0000;

        /// Both byte-data directions
        const SMBUS_BYTE_DATA =
            Self::SMBUS_READ_BYTE_DATA.bits() | Self::SMBUS_WRITE_BYTE_DATA.bits();
        /// Both word-data directions
        const SMBUS_WORD_DATA =
            Self::SMBUS_READ_WORD_DATA.bits() | Self::SMBUS_WRITE_WORD_DATA.bits();
        /// Both I2C block directions
        const SMBUS_I2C_BLOCK =
            Self::SMBUS_READ_I2C_BLOCK.bits() | Self::SMBUS_WRITE_I2C_BLOCK.bits();
        /// Everything this crate can use
        const SMBUS_EMUL = Self::SMBUS_QUICK.bits()
            | Self::SMBUS_READ_BYTE.bits()
            | Self::SMBUS_WRITE_BYTE.bits()
            | Self::SMBUS_BYTE_DATA.bits()
            | Self::SMBUS_WORD_DATA.bits()
            | Self::SMBUS_I2C_BLOCK.bits();
    }
}

impl Default for Functionality {
    fn default() -> Self {
        Functionality::empty()
    }
}

/// Byte-level SMBus transport
///
/// Every call addresses one device by its 7-bit bus address and either
/// succeeds or fails with a classified [`BusError`](crate::error::BusError).
/// Implementations provide mutual exclusion at single-call granularity at
/// most; anything longer goes through [`exclusive`](Self::exclusive).
///
/// Word transactions use SMBus byte order: the low byte travels first, so
/// the returned `u16` is the native little-endian interpretation.
pub trait SmbusTransport {
    /// Get the transactions supported by this adapter
    fn functionality(&self) -> Functionality;

    /// Address the device with no payload (SMBus quick write)
    fn write_quick(&mut self, device: u8) -> BusResult<()>;

    /// Send one byte with no command byte
    fn write_byte(&mut self, device: u8, value: u8) -> BusResult<()>;

    /// Receive one byte with no command byte
    fn read_byte(&mut self, device: u8) -> BusResult<u8>;

    /// Write one byte to register `reg`
    fn write_byte_data(&mut self, device: u8, reg: u8, value: u8) -> BusResult<()>;

    /// Read one byte from register `reg`
    fn read_byte_data(&mut self, device: u8, reg: u8) -> BusResult<u8>;

    /// Write a 16-bit word starting at register `reg`
    fn write_word_data(&mut self, device: u8, reg: u8, value: u16) -> BusResult<()>;

    /// Read a 16-bit word starting at register `reg`
    fn read_word_data(&mut self, device: u8, reg: u8) -> BusResult<u16>;

    /// Write `data` starting at register `reg` in one block transfer
    fn write_block_data(&mut self, device: u8, reg: u8, data: &[u8]) -> BusResult<()>;

    /// Fill `buf` starting at register `reg` in one block transfer
    fn read_block_data(&mut self, device: u8, reg: u8, buf: &mut [u8]) -> BusResult<()>;

    /// Run `op` with exclusive access to the bus
    ///
    /// Compound operations (read-modify-write, wide-address reads) issue
    /// more than one call and are only atomic when every call happens
    /// inside one `exclusive` span. Transports that are never shared simply
    /// call `op(self)`.
    fn exclusive(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SmbusTransport) -> BusResult<()>,
    ) -> BusResult<()>;
}

// Blanket impl for boxed transports to allow runtime backend selection
#[cfg(feature = "alloc")]
impl SmbusTransport for alloc::boxed::Box<dyn SmbusTransport + Send> {
    fn functionality(&self) -> Functionality {
        (**self).functionality()
    }

    fn write_quick(&mut self, device: u8) -> BusResult<()> {
        (**self).write_quick(device)
    }

    fn write_byte(&mut self, device: u8, value: u8) -> BusResult<()> {
        (**self).write_byte(device, value)
    }

    fn read_byte(&mut self, device: u8) -> BusResult<u8> {
        (**self).read_byte(device)
    }

    fn write_byte_data(&mut self, device: u8, reg: u8, value: u8) -> BusResult<()> {
        (**self).write_byte_data(device, reg, value)
    }

    fn read_byte_data(&mut self, device: u8, reg: u8) -> BusResult<u8> {
        (**self).read_byte_data(device, reg)
    }

    fn write_word_data(&mut self, device: u8, reg: u8, value: u16) -> BusResult<()> {
        (**self).write_word_data(device, reg, value)
    }

    fn read_word_data(&mut self, device: u8, reg: u8) -> BusResult<u16> {
        (**self).read_word_data(device, reg)
    }

    fn write_block_data(&mut self, device: u8, reg: u8, data: &[u8]) -> BusResult<()> {
        (**self).write_block_data(device, reg, data)
    }

    fn read_block_data(&mut self, device: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        (**self).read_block_data(device, reg, buf)
    }

    fn exclusive(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SmbusTransport) -> BusResult<()>,
    ) -> BusResult<()> {
        (**self).exclusive(op)
    }
}

/// Information about a bus backend
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// Name of the backend
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Description
    pub description: &'static str,
    /// Whether this backend requires elevated privileges
    pub requires_root: bool,
}
