//! Register-number commands: probe, read, write, dump and wide access

use super::{hex_rows, CommandError};
use crate::buses::BoxedBus;
use regbus_core::{ByteOrder, Device, BLOCK_MAX};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Check that the device acknowledges its address
pub fn run_probe(dev: &mut Device<BoxedBus>) -> CmdResult {
    dev.unlock_bus()?;
    println!("{} responds at 0x{:02X}", dev.label(), dev.address());
    Ok(())
}

/// Format a register value for display
pub fn format_value(raw: u16, word: bool, signed: bool) -> String {
    match (word, signed) {
        (false, false) => format!("0x{:02X}", raw as u8),
        (false, true) => format!("{}", raw as u8 as i8),
        (true, false) => format!("0x{:04X}", raw),
        (true, true) => format!("{}", raw as i16),
    }
}

/// Read one register or register pair
pub fn run_read(
    dev: &mut Device<BoxedBus>,
    register: u8,
    word: bool,
    signed: bool,
    big_endian: bool,
) -> CmdResult {
    let raw = if word {
        let order = if big_endian {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        };
        dev.read_u16(register, order)?
    } else {
        dev.raw_read(register)? as u16
    };
    println!("{}", format_value(raw, word, signed));
    Ok(())
}

/// Write one register or register pair
pub fn run_write(dev: &mut Device<BoxedBus>, register: u8, value: u16, word: bool) -> CmdResult {
    if word {
        dev.write_word(register, value)?;
    } else {
        let byte = u8::try_from(value).map_err(|_| CommandError::ValueTooLarge(value))?;
        dev.raw_write(register, byte)?;
    }
    Ok(())
}

/// Dump a block of registers
pub fn run_dump(dev: &mut Device<BoxedBus>, start: u8, len: usize) -> CmdResult {
    let data = dev.read_block(start, len)?;
    for line in hex_rows(start as u16, &data) {
        println!("{}", line);
    }
    Ok(())
}

/// Read `count` bytes from a 16-bit address space
pub fn read_wide_range(
    dev: &mut Device<BoxedBus>,
    location: u16,
    count: u16,
) -> Result<Vec<u8>, regbus_core::Error> {
    (0..count)
        .map(|i| dev.read_wide(location.wrapping_add(i)))
        .collect()
}

/// Print bytes from a 16-bit address space
pub fn run_read_wide(dev: &mut Device<BoxedBus>, location: u16, count: u16) -> CmdResult {
    let data = read_wide_range(dev, location, count)?;
    for line in hex_rows(location, &data) {
        println!("{}", line);
    }
    Ok(())
}

/// Write bytes into a 16-bit address space
pub fn run_write_wide(dev: &mut Device<BoxedBus>, location: u16, data: &[u8]) -> CmdResult {
    if data.len() >= BLOCK_MAX {
        log::warn!(
            "At most {} bytes fit one wide write; the transfer will be rejected",
            BLOCK_MAX - 1
        );
    }
    dev.write_block_wide(location, data)?;
    log::info!(
        "{}: wrote {} byte(s) at 0x{:04X}",
        dev.label(),
        data.len(),
        location
    );
    Ok(())
}
