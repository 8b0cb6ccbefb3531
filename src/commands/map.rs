//! Register map display

use regbus_core::register::BitField;
use regbus_core::RegisterMap;
use std::path::Path;

/// Bit position of a field: `[hi:lo]` for contiguous masks, the mask otherwise
pub fn format_bits(field: &BitField<'_>) -> String {
    let mask = field.mask();
    let lo = mask.trailing_zeros();
    let hi = 7 - mask.leading_zeros();
    let contiguous = (mask >> lo).count_ones() == hi - lo + 1;

    if !contiguous {
        format!("mask 0x{:02X}", mask)
    } else if hi == lo {
        format!("[{}]", lo)
    } else {
        format!("[{}:{}]", hi, lo)
    }
}

/// Render a register map as text
pub fn format_map(map: &RegisterMap) -> Vec<String> {
    let mut lines = Vec::new();
    match map.address() {
        Some(address) => lines.push(format!("{} at 0x{:02X}", map.chip(), address)),
        None => lines.push(map.chip().to_string()),
    }

    for reg in map.registers() {
        let mut line = format!(
            "  0x{:02X} {:16} reset 0x{:02X}",
            reg.address, reg.name, reg.reset
        );
        if reg.mask != 0xFF {
            line.push_str(&format!("  mask 0x{:02X}", reg.mask));
        }
        if let Some(default) = reg.default {
            line.push_str(&format!("  default 0x{:02X}", default));
        }
        lines.push(line);

        for field in map.fields_of(reg.address) {
            let bits = field.descriptor();
            lines.push(format!(
                "         {:16} {:10} {}",
                field.name(),
                format_bits(&bits),
                bits.access()
            ));
        }
    }
    lines
}

/// Load and print a register map
pub fn run_map(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let map = RegisterMap::load_file(path)?;
    for line in format_map(&map) {
        println!("{}", line);
    }
    log::debug!(
        "{}: {} register(s), {} field(s)",
        path.display(),
        map.registers().len(),
        map.fields().len()
    );
    Ok(())
}
