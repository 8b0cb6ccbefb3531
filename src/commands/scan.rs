//! Bus scan command
//!
//! Probes each address the way `i2cdetect` does in auto mode: a quick write
//! everywhere except the EEPROM ranges, where a quick write can corrupt some
//! parts and a one-byte read is used instead.

use crate::buses::BoxedBus;
use indicatif::{ProgressBar, ProgressStyle};
use regbus_core::error::BusError;
use regbus_core::transport::Functionality;

/// What answered at one address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Not probed
    Skipped,
    /// No acknowledge
    Absent,
    /// Device acknowledged
    Present,
    /// Probe failed for a reason other than a NACK
    Error,
}

fn create_progress_bar_style() -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("#>-"))
}

fn prefers_read(address: u8) -> bool {
    matches!(address, 0x30..=0x37 | 0x50..=0x5F)
}

/// Probe one address
pub fn probe_address(bus: &mut BoxedBus, address: u8) -> Slot {
    let funcs = bus.functionality();
    let result = if (prefers_read(address) || !funcs.contains(Functionality::SMBUS_QUICK))
        && funcs.contains(Functionality::SMBUS_READ_BYTE)
    {
        bus.read_byte(address).map(|_| ())
    } else if funcs.contains(Functionality::SMBUS_QUICK) {
        bus.write_quick(address)
    } else {
        return Slot::Skipped;
    };

    match result {
        Ok(()) => Slot::Present,
        Err(BusError::Nack) => Slot::Absent,
        Err(e) => {
            log::debug!("scan: 0x{:02X}: {}", address, e);
            Slot::Error
        }
    }
}

/// Probe every address in `first..=last`
pub fn scan(
    bus: &mut BoxedBus,
    first: u8,
    last: u8,
    progress: Option<&ProgressBar>,
) -> [Slot; 128] {
    let mut slots = [Slot::Skipped; 128];
    for address in first..=last.min(0x7F) {
        if let Some(pb) = progress {
            pb.set_message(format!("0x{:02X}", address));
        }
        slots[address as usize] = probe_address(bus, address);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }
    slots
}

/// Format the scan result as an `i2cdetect`-style grid
pub fn format_grid(slots: &[Slot; 128]) -> Vec<String> {
    let mut lines = vec![
        "     0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f".to_string(),
    ];
    for row in (0..128).step_by(16) {
        let mut line = format!("{:02x}:", row);
        for address in row..row + 16 {
            let cell = match slots[address] {
                Slot::Skipped => "   ".to_string(),
                Slot::Absent => " --".to_string(),
                Slot::Present => format!(" {:02x}", address),
                Slot::Error => " XX".to_string(),
            };
            line.push_str(&cell);
        }
        lines.push(line.trim_end().to_string());
    }
    lines
}

/// Scan the bus and print what answered
pub fn run_scan(bus: &mut BoxedBus, first: u8, last: u8) -> Result<(), Box<dyn std::error::Error>> {
    if first > last {
        return Err(format!("Empty range 0x{:02X}..0x{:02X}", first, last).into());
    }
    if !bus
        .functionality()
        .intersects(Functionality::SMBUS_QUICK | Functionality::SMBUS_READ_BYTE)
    {
        return Err("Bus supports neither quick writes nor byte reads; cannot scan".into());
    }

    let pb = ProgressBar::new((last - first) as u64 + 1);
    pb.set_style(create_progress_bar_style()?);
    let slots = scan(bus, first, last, Some(&pb));
    pb.finish_and_clear();

    for line in format_grid(&slots) {
        println!("{}", line);
    }

    let found = slots.iter().filter(|s| **s == Slot::Present).count();
    log::info!("Found {} device(s)", found);
    Ok(())
}
