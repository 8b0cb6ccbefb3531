//! In-crate fake transport and log capture for unit tests

use crate::error::{BusError, BusResult};
use crate::transport::{Functionality, SmbusTransport};

use std::cell::RefCell;
use std::string::{String, ToString};
use std::sync::Once;
use std::vec::Vec;

std::thread_local! {
    static RECORDS: RefCell<Vec<(log::Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Logger that keeps records per thread, so parallel tests stay apart
struct CaptureLogger;

impl log::Log for CaptureLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        RECORDS.with(|records| {
            records
                .borrow_mut()
                .push((record.level(), record.args().to_string()))
        });
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INSTALL: Once = Once::new();

/// Run `f` and return the log records it emitted on this thread
pub fn capture_logs<F: FnOnce()>(f: F) -> Vec<(log::Level, String)> {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| records.borrow_mut().clear());
    f();
    RECORDS.with(|records| records.borrow_mut().drain(..).collect())
}

/// One recorded transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Quick(u8),
    WriteByte(u8, u8),
    ReadByte(u8),
    WriteByteData(u8, u8, u8),
    ReadByteData(u8, u8),
    WriteWordData(u8, u8, u16),
    ReadWordData(u8, u8),
    WriteBlock(u8, u8, Vec<u8>),
    ReadBlock(u8, u8, usize),
}

/// Register file for a single device plus a call log
///
/// A plain byte read returns the register selected by the last block
/// write's first data byte, which is how wide-address parts behave.
pub struct FakeBus {
    device: u8,
    regs: [u8; 256],
    pointer: u8,
    pub calls: Vec<Call>,
    pub fail_next: Option<BusError>,
    pub functionality: Functionality,
}

impl FakeBus {
    pub fn with_device(device: u8) -> Self {
        Self {
            device,
            regs: [0; 256],
            pointer: 0,
            calls: Vec::new(),
            fail_next: None,
            functionality: Functionality::SMBUS_EMUL,
        }
    }

    pub fn register(&self, _device: u8, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    pub fn set_register(&mut self, reg: u8, value: u8) {
        self.regs[reg as usize] = value;
    }

    pub fn writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::WriteByte(..)
                        | Call::WriteByteData(..)
                        | Call::WriteWordData(..)
                        | Call::WriteBlock(..)
                )
            })
            .count()
    }

    fn check(&mut self, device: u8) -> BusResult<()> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        if device != self.device {
            return Err(BusError::Nack);
        }
        Ok(())
    }
}

impl SmbusTransport for FakeBus {
    fn functionality(&self) -> Functionality {
        self.functionality
    }

    fn write_quick(&mut self, device: u8) -> BusResult<()> {
        self.calls.push(Call::Quick(device));
        self.check(device)
    }

    fn write_byte(&mut self, device: u8, value: u8) -> BusResult<()> {
        self.calls.push(Call::WriteByte(device, value));
        self.check(device)?;
        self.pointer = value;
        Ok(())
    }

    fn read_byte(&mut self, device: u8) -> BusResult<u8> {
        self.calls.push(Call::ReadByte(device));
        self.check(device)?;
        Ok(self.regs[self.pointer as usize])
    }

    fn write_byte_data(&mut self, device: u8, reg: u8, value: u8) -> BusResult<()> {
        self.calls.push(Call::WriteByteData(device, reg, value));
        self.check(device)?;
        self.regs[reg as usize] = value;
        Ok(())
    }

    fn read_byte_data(&mut self, device: u8, reg: u8) -> BusResult<u8> {
        self.calls.push(Call::ReadByteData(device, reg));
        self.check(device)?;
        Ok(self.regs[reg as usize])
    }

    fn write_word_data(&mut self, device: u8, reg: u8, value: u16) -> BusResult<()> {
        self.calls.push(Call::WriteWordData(device, reg, value));
        self.check(device)?;
        let [lo, hi] = value.to_le_bytes();
        self.regs[reg as usize] = lo;
        self.regs[reg.wrapping_add(1) as usize] = hi;
        Ok(())
    }

    fn read_word_data(&mut self, device: u8, reg: u8) -> BusResult<u16> {
        self.calls.push(Call::ReadWordData(device, reg));
        self.check(device)?;
        let lo = self.regs[reg as usize];
        let hi = self.regs[reg.wrapping_add(1) as usize];
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn write_block_data(&mut self, device: u8, reg: u8, data: &[u8]) -> BusResult<()> {
        self.calls.push(Call::WriteBlock(device, reg, data.iter().copied().collect()));
        self.check(device)?;
        if let Some(&first) = data.first() {
            self.pointer = first;
        }
        for (i, &byte) in data.iter().enumerate() {
            self.regs[reg.wrapping_add(i as u8) as usize] = byte;
        }
        Ok(())
    }

    fn read_block_data(&mut self, device: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        self.calls.push(Call::ReadBlock(device, reg, buf.len()));
        self.check(device)?;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.regs[reg.wrapping_add(i as u8) as usize];
        }
        Ok(())
    }

    fn exclusive(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SmbusTransport) -> BusResult<()>,
    ) -> BusResult<()> {
        op(self)
    }
}
