//! Board detection command

use regbus_core::bus_select::{parse_revision, CPUINFO_PATH};
use std::path::Path;

/// Show which bus the board revision selects
pub fn run_detect(cpuinfo: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = cpuinfo.unwrap_or_else(|| Path::new(CPUINFO_PATH));

    match std::fs::read_to_string(path) {
        Ok(text) => {
            let revision = parse_revision(&text);
            println!("Board:   {}", revision);
            println!("I2C bus: {} (/dev/i2c-{})", revision.bus_index(), revision.bus_index());
        }
        Err(e) => {
            log::warn!("Cannot read {}: {}", path.display(), e);
            println!("Board:   unknown");
            println!("I2C bus: 0 (/dev/i2c-0)");
        }
    }

    Ok(())
}
