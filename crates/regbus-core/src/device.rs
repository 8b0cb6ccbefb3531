//! Device handle and low-level primitives
//!
//! A [`Device`] owns one transport handle and one bus address. Every
//! primitive in this module turns a register address and a value into one
//! transport call (two for the wide-address helpers), handles signedness and
//! byte order, and converts transport failures into [`Error::Transport`].

use core::fmt;

use crate::error::{BusError, BusResult, Error, Result};
use crate::transport::{Functionality, SmbusTransport};

/// Largest block an SMBus block transfer can carry
pub const BLOCK_MAX: usize = 32;

/// Maximum length of a device display name
pub const NAME_MAX: usize = 32;

/// Byte order of a 16-bit register pair
///
/// SMBus word transfers are little-endian on the wire, which is what the
/// transport returns. Parts that put the high byte at the lower address
/// need [`ByteOrder::Big`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Low byte at the register address (SMBus native)
    #[default]
    Little,
    /// High byte at the register address
    Big,
}

/// How chatty the keyed register operations are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Log every keyed access (quiet level 0)
    #[default]
    Verbose,
    /// Log only verification failures (quiet level 1)
    Quiet,
}

impl Verbosity {
    /// Map a numeric quiet level; only level 1 silences diagnostics
    pub fn from_quiet_level(level: u8) -> Self {
        if level == 1 {
            Verbosity::Quiet
        } else {
            Verbosity::Verbose
        }
    }
}

/// Configuration for a device handle
#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
    /// 7-bit bus address
    pub address: u8,
    /// Display name used in diagnostics
    pub name: heapless::String<NAME_MAX>,
    /// Trace every primitive at debug level
    pub debug: bool,
    /// Keyed-operation diagnostic policy
    pub verbosity: Verbosity,
}

impl DeviceConfig {
    /// Create a new configuration for the device at `address`
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Set the display name (truncated to 32 bytes)
    pub fn with_name(mut self, name: &str) -> Self {
        self.name.clear();
        for c in name.chars() {
            if self.name.push(c).is_err() {
                break;
            }
        }
        self
    }

    /// Enable or disable primitive tracing
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the diagnostic policy
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// One physical chip on a bus
///
/// The device exclusively owns its transport handle. To put several
/// devices on one bus, give each a clone of a
/// [`SharedBus`](crate::transport::SharedBus).
pub struct Device<T> {
    pub(crate) transport: T,
    address: u8,
    name: heapless::String<NAME_MAX>,
    pub(crate) debug: bool,
    pub(crate) verbosity: Verbosity,
}

/// Display helper: the device name, or its address when unnamed
pub struct Label<'a> {
    name: &'a str,
    address: u8,
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "device 0x{:02X}", self.address)
        } else {
            f.write_str(self.name)
        }
    }
}

fn outcome<R, E>(result: &core::result::Result<R, E>) -> &'static str {
    if result.is_ok() {
        ""
    } else {
        " (failed)"
    }
}

/// Trace one byte-data read
pub(crate) fn trace_read_byte(address: u8, reg: u8, result: &BusResult<u8>) {
    match result {
        Ok(value) => log::debug!(
            "i2c: 0x{:02X} returned 0x{:02X} from register 0x{:02X}",
            address,
            value,
            reg
        ),
        Err(_) => log::debug!(
            "i2c: 0x{:02X} read of register 0x{:02X} failed",
            address,
            reg
        ),
    }
}

/// Trace one byte-data write
pub(crate) fn trace_write_byte(address: u8, reg: u8, value: u8, result: &BusResult<()>) {
    log::debug!(
        "i2c: 0x{:02X} wrote 0x{:02X} to register 0x{:02X}{}",
        address,
        value,
        reg,
        outcome(result)
    );
}

impl<T> Device<T> {
    /// Create a device handle on `transport`
    pub fn new(transport: T, config: DeviceConfig) -> Self {
        Self {
            transport,
            address: config.address,
            name: config.name,
            debug: config.debug,
            verbosity: config.verbosity,
        }
    }

    /// Bus address of the device
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Display name of the device
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name for diagnostics, falling back to the address
    pub fn label(&self) -> Label<'_> {
        Label {
            name: &self.name,
            address: self.address,
        }
    }

    /// Whether primitive tracing is on
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Turn primitive tracing on or off
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Current diagnostic policy
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Change the diagnostic policy
    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the device and return the transport
    pub fn release(self) -> T {
        self.transport
    }

    /// Keyed operations log unless the device is quiet and not debugging
    pub(crate) fn chatty(&self) -> bool {
        self.debug || self.verbosity != Verbosity::Quiet
    }

    fn fail(&self, source: BusError) -> Error {
        log::error!(
            "Error accessing 0x{:02X}: {} (check the device address)",
            self.address,
            source
        );
        Error::Transport {
            device: self.address,
            source,
        }
    }

    fn bus<R>(&self, result: BusResult<R>) -> Result<R> {
        result.map_err(|e| self.fail(e))
    }
}

impl<T: SmbusTransport> Device<T> {
    pub(crate) fn require(&self, needed: Functionality) -> Result<()> {
        let missing = needed - self.transport.functionality();
        if missing.is_empty() {
            Ok(())
        } else {
            log::error!("{}: transport lacks {:?}", self.label(), missing);
            Err(Error::Unsupported(missing))
        }
    }

    /// Run `op` with the bus held for its whole duration
    pub(crate) fn exclusive<F>(&mut self, mut op: F) -> Result<()>
    where
        F: FnMut(&mut dyn SmbusTransport, u8) -> BusResult<()>,
    {
        let address = self.address;
        let result = self
            .transport
            .exclusive(&mut |bus: &mut dyn SmbusTransport| op(bus, address));
        self.bus(result)
    }

    /// Write one byte to register `reg`
    pub fn write_byte(&mut self, reg: u8, value: u8) -> Result<()> {
        self.require(Functionality::SMBUS_WRITE_BYTE_DATA)?;
        let result = self.transport.write_byte_data(self.address, reg, value);
        if self.debug {
            trace_write_byte(self.address, reg, value, &result);
        }
        self.bus(result)
    }

    /// Write a 16-bit word to the register pair starting at `reg`
    pub fn write_word(&mut self, reg: u8, value: u16) -> Result<()> {
        self.require(Functionality::SMBUS_WRITE_WORD_DATA)?;
        let result = self.transport.write_word_data(self.address, reg, value);
        if self.debug {
            log::debug!(
                "i2c: 0x{:02X} wrote 0x{:04X} to register pair 0x{:02X},0x{:02X}{}",
                self.address,
                value,
                reg,
                reg.wrapping_add(1),
                outcome(&result)
            );
        }
        self.bus(result)
    }

    /// Send one byte with no register addressing
    pub fn write_raw(&mut self, value: u8) -> Result<()> {
        self.require(Functionality::SMBUS_WRITE_BYTE)?;
        let result = self.transport.write_byte(self.address, value);
        if self.debug {
            log::debug!(
                "i2c: 0x{:02X} wrote raw 0x{:02X}{}",
                self.address,
                value,
                outcome(&result)
            );
        }
        self.bus(result)
    }

    /// Address the device with no payload
    pub fn write_quick(&mut self) -> Result<()> {
        self.require(Functionality::SMBUS_QUICK)?;
        let result = self.transport.write_quick(self.address);
        if self.debug {
            log::debug!("i2c: quick write to 0x{:02X}{}", self.address, outcome(&result));
        }
        self.bus(result)
    }

    /// Write `data` starting at register `reg` in one block transfer
    pub fn write_block(&mut self, reg: u8, data: &[u8]) -> Result<()> {
        if data.len() > BLOCK_MAX {
            log::error!(
                "{}: block write of {} bytes exceeds the {} byte limit",
                self.label(),
                data.len(),
                BLOCK_MAX
            );
            return Err(Error::BlockTooLong { len: data.len() });
        }
        self.require(Functionality::SMBUS_WRITE_I2C_BLOCK)?;
        let result = self.transport.write_block_data(self.address, reg, data);
        if self.debug {
            log::debug!(
                "i2c: 0x{:02X} wrote {:02X?} to register 0x{:02X}{}",
                self.address,
                data,
                reg,
                outcome(&result)
            );
        }
        self.bus(result)
    }

    /// Read an unsigned byte from register `reg`
    pub fn read_u8(&mut self, reg: u8) -> Result<u8> {
        self.require(Functionality::SMBUS_READ_BYTE_DATA)?;
        let result = self.transport.read_byte_data(self.address, reg);
        if self.debug {
            trace_read_byte(self.address, reg, &result);
        }
        self.bus(result)
    }

    /// Read a two's-complement byte from register `reg`
    pub fn read_i8(&mut self, reg: u8) -> Result<i8> {
        self.read_u8(reg).map(|value| value as i8)
    }

    /// Read an unsigned 16-bit value from the register pair at `reg`
    pub fn read_u16(&mut self, reg: u8, order: ByteOrder) -> Result<u16> {
        self.require(Functionality::SMBUS_READ_WORD_DATA)?;
        let result = self
            .transport
            .read_word_data(self.address, reg)
            .map(|word| match order {
                ByteOrder::Little => word,
                ByteOrder::Big => word.swap_bytes(),
            });
        if self.debug {
            match &result {
                Ok(value) => log::debug!(
                    "i2c: 0x{:02X} returned 0x{:04X} from register 0x{:02X} ({:?} endian)",
                    self.address,
                    value,
                    reg,
                    order
                ),
                Err(_) => log::debug!(
                    "i2c: 0x{:02X} word read of register 0x{:02X} failed",
                    self.address,
                    reg
                ),
            }
        }
        self.bus(result)
    }

    /// Read a two's-complement 16-bit value from the register pair at `reg`
    pub fn read_i16(&mut self, reg: u8, order: ByteOrder) -> Result<i16> {
        self.read_u16(reg, order).map(|value| value as i16)
    }

    /// Read `len` bytes starting at register `reg`
    ///
    /// Lengths above [`BLOCK_MAX`] are rejected without touching the bus.
    pub fn read_block(&mut self, reg: u8, len: usize) -> Result<heapless::Vec<u8, BLOCK_MAX>> {
        if len > BLOCK_MAX {
            log::error!(
                "{}: block read of {} bytes exceeds the {} byte limit",
                self.label(),
                len,
                BLOCK_MAX
            );
            return Err(Error::BlockTooLong { len });
        }
        self.require(Functionality::SMBUS_READ_I2C_BLOCK)?;

        let mut buf = [0u8; BLOCK_MAX];
        let result = self
            .transport
            .read_block_data(self.address, reg, &mut buf[..len]);
        if self.debug {
            log::debug!(
                "i2c: 0x{:02X} returned {:02X?} from register 0x{:02X}{}",
                self.address,
                &buf[..len],
                reg,
                outcome(&result)
            );
        }
        self.bus(result)?;

        heapless::Vec::from_slice(&buf[..len]).map_err(|_| Error::BlockTooLong { len })
    }

    /// Receive one byte with no register addressing
    pub fn read_raw(&mut self) -> Result<u8> {
        self.require(Functionality::SMBUS_READ_BYTE)?;
        let result = self.transport.read_byte(self.address);
        if self.debug {
            match &result {
                Ok(value) => {
                    log::debug!("i2c: 0x{:02X} returned raw 0x{:02X}", self.address, value)
                }
                Err(_) => log::debug!("i2c: 0x{:02X} raw read failed", self.address),
            }
        }
        self.bus(result)
    }

    /// Read one byte from a 16-bit memory map
    ///
    /// The high address byte goes out as the command byte of a one-byte
    /// block write carrying the low address byte; a plain byte read then
    /// returns the addressed location. Both calls run under one bus lock.
    pub fn read_wide(&mut self, addr16: u16) -> Result<u8> {
        self.require(Functionality::SMBUS_WRITE_I2C_BLOCK | Functionality::SMBUS_READ_BYTE)?;
        let [hi, lo] = addr16.to_be_bytes();
        let mut value = 0u8;
        let result = self.exclusive(|bus, address| {
            bus.write_block_data(address, hi, &[lo])?;
            value = bus.read_byte(address)?;
            Ok(())
        });
        if self.debug {
            log::debug!(
                "i2c: 0x{:02X} returned 0x{:02X} from address 0x{:04X}{}",
                self.address,
                value,
                addr16,
                outcome(&result)
            );
        }
        result.map(|_| value)
    }

    /// Write `data` into a 16-bit memory map starting at `addr16`
    ///
    /// The low address byte is sent as the first data byte, so at most
    /// `BLOCK_MAX - 1` bytes of payload fit.
    pub fn write_block_wide(&mut self, addr16: u16, data: &[u8]) -> Result<()> {
        let len = data.len() + 1;
        if len > BLOCK_MAX {
            log::error!(
                "{}: wide block write of {} bytes exceeds the {} byte limit",
                self.label(),
                len,
                BLOCK_MAX
            );
            return Err(Error::BlockTooLong { len });
        }
        let [hi, lo] = addr16.to_be_bytes();
        let mut block = [0u8; BLOCK_MAX];
        block[0] = lo;
        block[1..len].copy_from_slice(data);
        self.write_block(hi, &block[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeBus};

    fn device() -> Device<FakeBus> {
        Device::new(FakeBus::with_device(0x40), DeviceConfig::new(0x40))
    }

    #[test]
    fn test_signed_byte() {
        let mut dev = device();
        dev.write_byte(0x01, 0xFE).unwrap();
        assert_eq!(dev.read_u8(0x01).unwrap(), 0xFE);
        assert_eq!(dev.read_i8(0x01).unwrap(), -2);

        dev.write_byte(0x02, 0x7F).unwrap();
        assert_eq!(dev.read_i8(0x02).unwrap(), 127);
    }

    #[test]
    fn test_word_byte_order() {
        let mut dev = device();
        dev.write_byte(0x10, 0x34).unwrap();
        dev.write_byte(0x11, 0x12).unwrap();

        assert_eq!(dev.read_u16(0x10, ByteOrder::Little).unwrap(), 0x1234);
        assert_eq!(dev.read_u16(0x10, ByteOrder::Big).unwrap(), 0x3412);
    }

    #[test]
    fn test_signed_word() {
        let mut dev = device();
        dev.write_word(0x20, 0x8000).unwrap();
        assert_eq!(dev.read_i16(0x20, ByteOrder::Little).unwrap(), -32768);

        dev.write_word(0x20, 0x7FFF).unwrap();
        assert_eq!(dev.read_i16(0x20, ByteOrder::Little).unwrap(), 32767);

        // 0x00FF read big-endian is 0xFF00
        dev.write_word(0x20, 0x00FF).unwrap();
        assert_eq!(dev.read_i16(0x20, ByteOrder::Big).unwrap(), -256);
    }

    #[test]
    fn test_read_block_too_long_touches_nothing() {
        let mut dev = device();
        assert_eq!(dev.read_block(0x00, 33), Err(Error::BlockTooLong { len: 33 }));
        assert!(dev.transport().calls.is_empty());
    }

    #[test]
    fn test_write_block_too_long_touches_nothing() {
        let mut dev = device();
        let data = [0u8; 33];
        assert_eq!(dev.write_block(0x00, &data), Err(Error::BlockTooLong { len: 33 }));
        assert!(dev.transport().calls.is_empty());
    }

    #[test]
    fn test_block_round_trip() {
        let mut dev = device();
        dev.write_block(0x30, &[1, 2, 3, 4]).unwrap();
        let data = dev.read_block(0x30, 4).unwrap();
        assert_eq!(data.as_slice(), &[1, 2, 3, 4]);

        let full = dev.read_block(0x00, BLOCK_MAX).unwrap();
        assert_eq!(full.len(), BLOCK_MAX);
    }

    #[test]
    fn test_read_wide_issues_two_calls() {
        let mut dev = device();
        dev.transport.set_register(0x05, 0xAB);
        dev.transport.calls.clear();

        assert_eq!(dev.read_wide(0x0105).unwrap(), 0xAB);
        assert_eq!(
            dev.transport().calls,
            std::vec![Call::WriteBlock(0x40, 0x01, std::vec![0x05]), Call::ReadByte(0x40)]
        );
    }

    #[test]
    fn test_write_block_wide_prepends_low_byte() {
        let mut dev = device();
        dev.write_block_wide(0x0210, &[0xAA, 0xBB]).unwrap();
        assert_eq!(
            dev.transport().calls,
            std::vec![Call::WriteBlock(0x40, 0x02, std::vec![0x10, 0xAA, 0xBB])]
        );

        let data = [0u8; BLOCK_MAX];
        assert_eq!(
            dev.write_block_wide(0x0210, &data),
            Err(Error::BlockTooLong { len: BLOCK_MAX + 1 })
        );
    }

    #[test]
    fn test_raw_and_quick() {
        let mut dev = device();
        dev.write_raw(0x07).unwrap();
        dev.write_quick().unwrap();
        assert_eq!(
            dev.transport().calls,
            std::vec![Call::WriteByte(0x40, 0x07), Call::Quick(0x40)]
        );
    }

    #[test]
    fn test_transport_failure_is_typed() {
        let mut dev = Device::new(FakeBus::with_device(0x40), DeviceConfig::new(0x41));
        let err = dev.read_u8(0x00).unwrap_err();
        assert_eq!(
            err,
            Error::Transport {
                device: 0x41,
                source: BusError::Nack
            }
        );
        assert!(err.is_nack());

        // A register really holding 0xFF is not an error
        let mut dev = device();
        dev.write_byte(0x00, 0xFF).unwrap();
        assert_eq!(dev.read_i8(0x00).unwrap(), -1);
    }

    #[test]
    fn test_next_operation_runs_after_failure() {
        let mut dev = device();
        dev.transport.fail_next = Some(BusError::Timeout);
        assert!(dev.write_byte(0x00, 0x12).is_err());
        dev.write_byte(0x00, 0x34).unwrap();
        assert_eq!(dev.read_u8(0x00).unwrap(), 0x34);
    }

    #[test]
    fn test_missing_functionality() {
        let mut bus = FakeBus::with_device(0x40);
        bus.functionality = Functionality::SMBUS_BYTE_DATA;
        let mut dev = Device::new(bus, DeviceConfig::new(0x40));

        assert_eq!(
            dev.write_quick(),
            Err(Error::Unsupported(Functionality::SMBUS_QUICK))
        );
        assert!(dev.transport().calls.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = DeviceConfig::new(0x48)
            .with_name("a-name-that-is-far-too-long-for-the-buffer")
            .with_debug(true)
            .with_verbosity(Verbosity::Quiet);
        assert_eq!(config.name.len(), NAME_MAX);

        let mut dev = Device::new(FakeBus::with_device(0x48), config);
        assert!(dev.is_debug());
        assert!(dev.chatty());
        assert_eq!(dev.address(), 0x48);

        dev.set_debug(false);
        assert!(!dev.is_debug());
        assert!(!dev.chatty());

        let unnamed = device();
        assert_eq!(std::format!("{}", unnamed.label()), "device 0x40");
    }

    #[test]
    fn test_quiet_level_mapping() {
        assert_eq!(Verbosity::from_quiet_level(0), Verbosity::Verbose);
        assert_eq!(Verbosity::from_quiet_level(1), Verbosity::Quiet);
        assert_eq!(Verbosity::from_quiet_level(2), Verbosity::Verbose);
    }
}
