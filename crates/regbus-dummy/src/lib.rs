//! regbus-dummy - In-memory SMBus emulator for testing
//!
//! This crate provides a dummy bus that emulates SMBus devices in memory.
//! It's useful for testing and development without real hardware.
//!
//! Two kinds of device can be attached:
//!
//! - register files: 256 byte-wide registers addressed by the SMBus command
//!   byte, with optional read-only and write-one-to-clear bits
//! - 16-bit memories: 64 KiB addressed through a block write carrying the
//!   low address byte (the high byte rides in the command byte), read back
//!   with plain byte reads that auto-increment
//!
//! Every call is recorded in a transaction log and a single fault can be
//! armed to make the next call fail.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::collections::BTreeMap;
#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use regbus_core::error::{BusError, BusResult};
use regbus_core::transport::{Functionality, SmbusTransport};

/// Number of registers in a register-file device
pub const REGISTER_COUNT: usize = 256;

/// Size of a 16-bit memory device
pub const MEMORY_SIZE: usize = 0x1_0000;

/// Configuration for the dummy bus
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Functionality advertised by the emulated adapter
    pub functionality: Functionality,
    /// Power-on content of every register
    pub fill: u8,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            functionality: Functionality::SMBUS_EMUL,
            fill: 0x00,
        }
    }
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Quick write
    Quick(u8),
    /// Send byte (device, value)
    SendByte(u8, u8),
    /// Receive byte (device)
    ReceiveByte(u8),
    /// Write byte data (device, register, value)
    WriteByteData(u8, u8, u8),
    /// Read byte data (device, register)
    ReadByteData(u8, u8),
    /// Write word data (device, register, value)
    WriteWordData(u8, u8, u16),
    /// Read word data (device, register)
    ReadWordData(u8, u8),
    /// I2C block write (device, register, payload)
    #[cfg(feature = "alloc")]
    WriteBlock(u8, u8, Vec<u8>),
    /// I2C block read (device, register, length)
    ReadBlock(u8, u8, usize),
}

impl Transaction {
    /// Whether this call can change device state
    pub fn is_write(&self) -> bool {
        match self {
            Transaction::SendByte(..)
            | Transaction::WriteByteData(..)
            | Transaction::WriteWordData(..) => true,
            #[cfg(feature = "alloc")]
            Transaction::WriteBlock(..) => true,
            _ => false,
        }
    }
}

/// Register file of one emulated device
#[cfg(feature = "alloc")]
#[derive(Debug, Clone)]
struct RegisterFile {
    regs: [u8; REGISTER_COUNT],
    read_only: [u8; REGISTER_COUNT],
    write_one_to_clear: [u8; REGISTER_COUNT],
    pointer: u8,
}

#[cfg(feature = "alloc")]
impl RegisterFile {
    fn new(fill: u8) -> Self {
        Self {
            regs: [fill; REGISTER_COUNT],
            read_only: [0; REGISTER_COUNT],
            write_one_to_clear: [0; REGISTER_COUNT],
            pointer: 0,
        }
    }

    /// Apply a bus write to one register
    fn store(&mut self, reg: u8, value: u8) {
        let idx = reg as usize;
        let old = self.regs[idx];
        let w1c = self.write_one_to_clear[idx];
        let ro = self.read_only[idx] & !w1c;
        self.regs[idx] = (old & ro) | (value & !ro & !w1c) | (old & w1c & !value);
    }
}

#[cfg(feature = "alloc")]
#[derive(Debug, Clone)]
enum Target {
    Registers(RegisterFile),
    Memory { data: Vec<u8>, pointer: u16 },
}

/// Dummy SMBus adapter
///
/// Emulates any number of devices in memory for testing purposes.
#[cfg(feature = "alloc")]
pub struct DummyBus {
    config: DummyConfig,
    devices: BTreeMap<u8, Target>,
    log: Vec<Transaction>,
    fault: Option<BusError>,
}

#[cfg(feature = "alloc")]
impl DummyBus {
    /// Create an empty bus with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            devices: BTreeMap::new(),
            log: Vec::new(),
            fault: None,
        }
    }

    /// Create an empty bus with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a bus with one register-file device attached
    pub fn with_device(address: u8) -> Self {
        let mut bus = Self::new_default();
        bus.attach(address);
        bus
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Attach a register-file device at `address`
    pub fn attach(&mut self, address: u8) {
        log::debug!("dummy: attached register file at 0x{:02X}", address);
        self.devices
            .insert(address, Target::Registers(RegisterFile::new(self.config.fill)));
    }

    /// Attach a 16-bit memory device at `address`
    pub fn attach_memory(&mut self, address: u8) {
        log::debug!("dummy: attached 16-bit memory at 0x{:02X}", address);
        self.devices.insert(
            address,
            Target::Memory {
                data: vec![self.config.fill; MEMORY_SIZE],
                pointer: 0,
            },
        );
    }

    /// Remove the device at `address`
    pub fn detach(&mut self, address: u8) -> bool {
        self.devices.remove(&address).is_some()
    }

    /// Addresses of all attached devices
    pub fn addresses(&self) -> impl Iterator<Item = u8> + '_ {
        self.devices.keys().copied()
    }

    fn registers(&self, device: u8) -> Option<&RegisterFile> {
        match self.devices.get(&device) {
            Some(Target::Registers(file)) => Some(file),
            _ => None,
        }
    }

    fn registers_mut(&mut self, device: u8) -> Option<&mut RegisterFile> {
        match self.devices.get_mut(&device) {
            Some(Target::Registers(file)) => Some(file),
            _ => None,
        }
    }

    /// Current content of a register, bypassing the bus
    pub fn register(&self, device: u8, reg: u8) -> Option<u8> {
        self.registers(device).map(|file| file.regs[reg as usize])
    }

    /// Set a register from the device side, ignoring access masks
    ///
    /// Use this to emulate hardware raising status or event bits.
    pub fn set_register(&mut self, device: u8, reg: u8, value: u8) {
        if let Some(file) = self.registers_mut(device) {
            file.regs[reg as usize] = value;
        }
    }

    /// Mark bits of a register as read-only for bus writes
    pub fn set_read_only(&mut self, device: u8, reg: u8, mask: u8) {
        if let Some(file) = self.registers_mut(device) {
            file.read_only[reg as usize] = mask;
        }
    }

    /// Mark bits of a register as write-one-to-clear
    pub fn set_write_one_to_clear(&mut self, device: u8, reg: u8, mask: u8) {
        if let Some(file) = self.registers_mut(device) {
            file.write_one_to_clear[reg as usize] = mask;
        }
    }

    /// Content of a 16-bit memory device
    pub fn memory(&self, device: u8) -> Option<&[u8]> {
        match self.devices.get(&device) {
            Some(Target::Memory { data, .. }) => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Mutable content of a 16-bit memory device
    pub fn memory_mut(&mut self, device: u8) -> Option<&mut [u8]> {
        match self.devices.get_mut(&device) {
            Some(Target::Memory { data, .. }) => Some(data.as_mut_slice()),
            _ => None,
        }
    }

    /// Make the next transport call fail with `error`
    pub fn inject_fault(&mut self, error: BusError) {
        self.fault = Some(error);
    }

    /// Every call issued so far
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Number of calls that could change device state
    pub fn write_count(&self) -> usize {
        self.log.iter().filter(|t| t.is_write()).count()
    }

    /// Forget the transaction log
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Record a call and resolve its target
    fn begin(&mut self, transaction: Transaction) -> BusResult<&mut Target> {
        log::trace!("dummy: {:?}", transaction);
        let device = match &transaction {
            Transaction::Quick(d)
            | Transaction::SendByte(d, _)
            | Transaction::ReceiveByte(d)
            | Transaction::WriteByteData(d, ..)
            | Transaction::ReadByteData(d, _)
            | Transaction::WriteWordData(d, ..)
            | Transaction::ReadWordData(d, _)
            | Transaction::WriteBlock(d, ..)
            | Transaction::ReadBlock(d, ..) => *d,
        };
        self.log.push(transaction);

        if let Some(error) = self.fault.take() {
            log::debug!("dummy: injected fault {:?} for 0x{:02X}", error, device);
            return Err(error);
        }
        self.devices.get_mut(&device).ok_or(BusError::Nack)
    }

    fn begin_registers(&mut self, transaction: Transaction) -> BusResult<&mut RegisterFile> {
        match self.begin(transaction)? {
            Target::Registers(file) => Ok(file),
            Target::Memory { .. } => Err(BusError::Unsupported),
        }
    }
}

#[cfg(feature = "alloc")]
impl SmbusTransport for DummyBus {
    fn functionality(&self) -> Functionality {
        self.config.functionality
    }

    fn write_quick(&mut self, device: u8) -> BusResult<()> {
        self.begin(Transaction::Quick(device)).map(|_| ())
    }

    fn write_byte(&mut self, device: u8, value: u8) -> BusResult<()> {
        let file = self.begin_registers(Transaction::SendByte(device, value))?;
        file.pointer = value;
        Ok(())
    }

    fn read_byte(&mut self, device: u8) -> BusResult<u8> {
        match self.begin(Transaction::ReceiveByte(device))? {
            Target::Registers(file) => Ok(file.regs[file.pointer as usize]),
            Target::Memory { data, pointer } => {
                let value = data[*pointer as usize];
                *pointer = pointer.wrapping_add(1);
                Ok(value)
            }
        }
    }

    fn write_byte_data(&mut self, device: u8, reg: u8, value: u8) -> BusResult<()> {
        let file = self.begin_registers(Transaction::WriteByteData(device, reg, value))?;
        file.store(reg, value);
        file.pointer = reg;
        Ok(())
    }

    fn read_byte_data(&mut self, device: u8, reg: u8) -> BusResult<u8> {
        let file = self.begin_registers(Transaction::ReadByteData(device, reg))?;
        file.pointer = reg;
        Ok(file.regs[reg as usize])
    }

    fn write_word_data(&mut self, device: u8, reg: u8, value: u16) -> BusResult<()> {
        let file = self.begin_registers(Transaction::WriteWordData(device, reg, value))?;
        let [lo, hi] = value.to_le_bytes();
        file.store(reg, lo);
        file.store(reg.wrapping_add(1), hi);
        file.pointer = reg;
        Ok(())
    }

    fn read_word_data(&mut self, device: u8, reg: u8) -> BusResult<u16> {
        let file = self.begin_registers(Transaction::ReadWordData(device, reg))?;
        file.pointer = reg;
        let lo = file.regs[reg as usize];
        let hi = file.regs[reg.wrapping_add(1) as usize];
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn write_block_data(&mut self, device: u8, reg: u8, data: &[u8]) -> BusResult<()> {
        match self.begin(Transaction::WriteBlock(device, reg, data.to_vec()))? {
            Target::Registers(file) => {
                for (i, &byte) in data.iter().enumerate() {
                    file.store(reg.wrapping_add(i as u8), byte);
                }
                file.pointer = reg;
                Ok(())
            }
            Target::Memory { data: mem, pointer } => {
                // The command byte and first data byte form the address
                let (&lo, payload) = data.split_first().ok_or(BusError::Io)?;
                let mut addr = u16::from_be_bytes([reg, lo]);
                for &byte in payload {
                    mem[addr as usize] = byte;
                    addr = addr.wrapping_add(1);
                }
                *pointer = u16::from_be_bytes([reg, lo]);
                Ok(())
            }
        }
    }

    fn read_block_data(&mut self, device: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        let file = self.begin_registers(Transaction::ReadBlock(device, reg, buf.len()))?;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = file.regs[reg.wrapping_add(i as u8) as usize];
        }
        file.pointer = reg;
        Ok(())
    }

    fn exclusive(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SmbusTransport) -> BusResult<()>,
    ) -> BusResult<()> {
        op(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regbus_core::{
        Access, BitField, ByteOrder, Device, DeviceConfig, Error, EventState, Register, Verbosity,
        BLOCK_MAX,
    };

    const CONFIG: Register<'static> = Register::new("CONFIG", 0x00, 0x9F);
    const STATUS: Register<'static> = Register::new("STATUS", 0x01, 0x00);
    const MODE: BitField<'static> = BitField::new("MODE", 0x00, 0b0000_0111, 0);
    const RANGE: BitField<'static> = BitField::new("RANGE", 0x00, 0b0110_0000, 5);
    const OVF: BitField<'static> =
        BitField::bit("OVF", 0x01, 2).with_access(Access::WriteOneToClear);
    const READY: BitField<'static> = BitField::bit("READY", 0x01, 7).with_access(Access::ReadOnly);

    fn sensor() -> Device<DummyBus> {
        let mut bus = DummyBus::with_device(0x40);
        bus.set_read_only(0x40, 0x01, 0x80);
        bus.set_write_one_to_clear(0x40, 0x01, 0x04);
        Device::new(bus, DeviceConfig::new(0x40).with_name("SENSOR"))
    }

    #[test]
    fn test_register_round_trip() {
        let mut dev = sensor();
        dev.write_register(&CONFIG, 0x3C).unwrap();
        assert_eq!(dev.read_register(&CONFIG).unwrap(), 0x3C);
        assert!(dev.read_register_and_verify(&CONFIG, 0x3C).unwrap().is_match());
    }

    #[test]
    fn test_field_write_preserves_neighbours() {
        let mut dev = sensor();
        for pattern in [0x00u8, 0xFF, 0x96, 0x69] {
            dev.write_register(&CONFIG, pattern).unwrap();
            for value in 0..=RANGE.max_value() {
                dev.write_field(&RANGE, value).unwrap();
                let raw = dev.read_register(&CONFIG).unwrap();
                assert_eq!(raw & !RANGE.mask(), pattern & !RANGE.mask());
                assert_eq!(dev.read_field(&RANGE).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_neighbouring_fields_are_independent() {
        let mut dev = sensor();
        dev.write_field(&MODE, 0b101).unwrap();
        dev.write_field(&RANGE, 0b10).unwrap();
        assert_eq!(dev.read_field(&MODE).unwrap(), 0b101);
        assert_eq!(dev.read_register(&CONFIG).unwrap(), 0b0100_0101);
    }

    #[test]
    fn test_reads_do_not_change_state() {
        let mut dev = sensor();
        dev.write_register(&CONFIG, 0xA7).unwrap();
        dev.transport_clear_log();

        let first = dev.read_field(&MODE).unwrap();
        let second = dev.read_field(&MODE).unwrap();
        assert_eq!(first, second);
        assert_eq!(dev.transport().write_count(), 0);
        assert_eq!(dev.transport().register(0x40, 0x00), Some(0xA7));
    }

    #[test]
    fn test_verify_reports_actual_value() {
        let mut dev = sensor();
        dev.write_register(&CONFIG, 0x11).unwrap();
        let check = dev.read_register_and_verify(&CONFIG, 0x9F).unwrap();
        assert!(!check.is_match());
        assert_eq!(check.actual, 0x11);

        let check = dev.check_reset(&CONFIG).unwrap();
        assert!(!check.is_match());
        dev.reset_register(&CONFIG).unwrap();
        assert!(dev.check_reset(&CONFIG).unwrap().is_match());
    }

    #[test]
    fn test_clear_event() {
        let mut dev = sensor();

        // Not raised: nothing is written
        dev.transport_clear_log();
        assert_eq!(dev.clear_event(&OVF).unwrap(), EventState::NotSet);
        assert_eq!(dev.transport().write_count(), 0);

        // Raised by the hardware together with READY
        dev.transport_set(0x01, 0b1000_0100);
        assert_eq!(dev.clear_event(&OVF).unwrap(), EventState::Cleared);
        assert_eq!(dev.read_field(&OVF).unwrap(), 0);
        // The read-only READY bit survives the acknowledge write
        assert_eq!(dev.read_field(&READY).unwrap(), 1);
        assert_eq!(dev.read_register(&STATUS).unwrap(), 0b1000_0000);
    }

    #[test]
    fn test_read_only_bits_ignore_bus_writes() {
        let mut dev = sensor();
        dev.raw_write(0x01, 0xFF).unwrap();
        // READY is read-only, OVF is write-one-to-clear on a clear bit
        assert_eq!(dev.raw_read(0x01).unwrap(), 0b0111_1011);
        assert_eq!(dev.write_field(&READY, 1), Err(Error::ReadOnly));
    }

    #[test]
    fn test_block_limit() {
        let mut dev = sensor();
        dev.transport_clear_log();
        assert_eq!(
            dev.read_block(0x00, BLOCK_MAX + 1),
            Err(Error::BlockTooLong { len: BLOCK_MAX + 1 })
        );
        assert!(dev.transport().transactions().is_empty());

        let data: Vec<u8> = (0..BLOCK_MAX as u8).collect();
        dev.write_block(0x80, &data).unwrap();
        assert_eq!(dev.read_block(0x80, BLOCK_MAX).unwrap().as_slice(), &data[..]);
    }

    #[test]
    fn test_words() {
        let mut dev = sensor();
        dev.write_word(0x10, 0xFF80).unwrap();
        assert_eq!(dev.read_u16(0x10, ByteOrder::Little).unwrap(), 0xFF80);
        assert_eq!(dev.read_i16(0x10, ByteOrder::Little).unwrap(), -128);
        assert_eq!(dev.read_u16(0x10, ByteOrder::Big).unwrap(), 0x80FF);
    }

    #[test]
    fn test_wide_address_memory() {
        let mut bus = DummyBus::new_default();
        bus.attach_memory(0x50);
        bus.memory_mut(0x50).unwrap()[0x1234] = 0x5A;
        let mut dev = Device::new(bus, DeviceConfig::new(0x50));

        assert_eq!(dev.read_wide(0x1234).unwrap(), 0x5A);

        dev.write_block_wide(0x0FFE, &[1, 2, 3]).unwrap();
        assert_eq!(&dev.transport().memory(0x50).unwrap()[0x0FFE..0x1001], &[1, 2, 3]);
        assert_eq!(dev.read_wide(0x0FFF).unwrap(), 2);
        assert_eq!(dev.read_raw().unwrap(), 3);
    }

    #[test]
    fn test_absent_device_is_distinguishable() {
        let mut bus = DummyBus::with_device(0x40);
        bus.set_register(0x40, 0x00, 0xFF);
        let mut present = Device::new(bus, DeviceConfig::new(0x40));
        assert_eq!(present.read_i8(0x00).unwrap(), -1);

        let bus = present.release();
        let mut absent = Device::new(bus, DeviceConfig::new(0x41));
        let err = absent.read_i8(0x00).unwrap_err();
        assert!(err.is_nack());
        assert!(absent.unlock_bus().unwrap_err().is_nack());
    }

    #[test]
    fn test_detached_device_stops_answering() {
        let mut dev = sensor();
        dev.write_register(&CONFIG, 0x12).unwrap();

        assert!(dev.transport_mut().detach(0x40));
        assert!(!dev.transport_mut().detach(0x40));
        assert!(dev.read_register(&CONFIG).unwrap_err().is_nack());

        // Re-attaching starts from a fresh register file
        dev.transport_mut().attach(0x40);
        assert_eq!(dev.read_register(&CONFIG).unwrap(), 0x00);
    }

    #[test]
    fn test_injected_fault_is_one_shot() {
        let mut dev = sensor();
        dev.transport_fault(BusError::Timeout);
        assert_eq!(
            dev.write_register(&CONFIG, 0x01),
            Err(Error::Transport {
                device: 0x40,
                source: BusError::Timeout
            })
        );
        dev.write_register(&CONFIG, 0x02).unwrap();
        assert_eq!(dev.read_register(&CONFIG).unwrap(), 0x02);
    }

    #[test]
    fn test_missing_functionality() {
        let config = DummyConfig {
            functionality: Functionality::SMBUS_BYTE_DATA,
            ..Default::default()
        };
        let mut bus = DummyBus::new(config);
        bus.attach(0x40);
        let mut dev = Device::new(bus, DeviceConfig::new(0x40).with_verbosity(Verbosity::Quiet));

        assert!(matches!(dev.read_block(0x00, 4), Err(Error::Unsupported(_))));
        assert!(dev.transport().transactions().is_empty());
        dev.write_field(&MODE, 3).unwrap();
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_shared_bus_between_devices() {
        use regbus_core::transport::SharedBus;

        let mut bus = DummyBus::new_default();
        bus.attach(0x40);
        bus.attach(0x41);
        let shared = SharedBus::new(bus);

        let mut a = Device::new(shared.clone(), DeviceConfig::new(0x40));
        let mut b = Device::new(shared.clone(), DeviceConfig::new(0x41));
        a.write_register(&CONFIG, 0x12).unwrap();
        b.write_register(&CONFIG, 0x34).unwrap();

        let bus = shared.lock();
        assert_eq!(bus.register(0x40, 0x00), Some(0x12));
        assert_eq!(bus.register(0x41, 0x00), Some(0x34));
        assert_eq!(bus.addresses().collect::<Vec<_>>(), [0x40, 0x41]);
    }

    // Test helpers reaching through the device to the emulator
    trait DummyDeviceExt {
        fn transport_clear_log(&mut self);
        fn transport_set(&mut self, reg: u8, value: u8);
        fn transport_fault(&mut self, error: BusError);
    }

    impl DummyDeviceExt for Device<DummyBus> {
        fn transport_clear_log(&mut self) {
            self.transport_mut().clear_log();
        }

        fn transport_set(&mut self, reg: u8, value: u8) {
            let address = self.address();
            self.transport_mut().set_register(address, reg, value);
        }

        fn transport_fault(&mut self, error: BusError) {
            self.transport_mut().inject_fault(error);
        }
    }
}
