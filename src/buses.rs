//! Bus backend registration and dispatch
//!
//! This module provides a centralized registry for all bus backends, with
//! support for feature-gated inclusion and dynamic help text generation.

use crate::cli::parse_hex_u8;
use regbus_core::transport::{SmbusTransport, TransportInfo};

/// Transport type handed to every command
pub type BoxedBus = Box<dyn SmbusTransport + Send>;

/// Get information about all available bus backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_buses() -> Vec<TransportInfo> {
    let mut buses = Vec::new();

    #[cfg(feature = "linux-i2c")]
    buses.push(TransportInfo {
        name: "linux_i2c",
        aliases: &["linux-i2c", "i2c-dev"],
        description: "Linux i2c-dev interface (bus=<N>,dev=/dev/i2c-N,force=<0|1>)",
        requires_root: false,
    });

    #[cfg(feature = "dummy")]
    buses.push(TransportInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory device emulator (attach=<addr>,memory=<addr>,fill=<byte>)",
        requires_root: false,
    });

    buses
}

/// Generate help text listing all available bus backends
pub fn bus_help() -> String {
    let buses = available_buses();

    if buses.is_empty() {
        return "No bus backends available (recompile with backend features enabled)".to_string();
    }

    let mut help = String::from("Available buses:\n");
    for b in &buses {
        let root = if b.requires_root { " [requires root]" } else { "" };
        help.push_str(&format!("  {:10} - {}{}\n", b.name, b.description, root));
    }
    help
}

/// Resolve a bus name or alias to its canonical name
pub fn find_bus(name: &str) -> Option<&'static str> {
    available_buses()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Parse a bus string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2". Keys may repeat.
pub fn parse_bus_string(s: &str) -> Result<(&str, Vec<(&str, &str)>), Box<dyn std::error::Error>> {
    let (name, opts) = s.split_once(':').unwrap_or((s, ""));

    let mut options = Vec::new();
    if !opts.is_empty() {
        for opt in opts.split(',') {
            match opt.split_once('=') {
                Some(pair) => options.push(pair),
                None => {
                    return Err(
                        format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                    )
                }
            }
        }
    }

    Ok((name, options))
}

/// Open the bus described by `spec`
pub fn open_bus(spec: &str) -> Result<BoxedBus, Box<dyn std::error::Error>> {
    let (name, options) = parse_bus_string(spec)?;

    let canonical_name = match find_bus(name) {
        Some(n) => n,
        None => return Err(unknown_bus_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "linux-i2c")]
        "linux_i2c" => {
            log::debug!("Opening Linux I2C bus...");
            regbus_linux_i2c::open_linux_i2c(&options).map_err(|e| {
                format!(
                    "Failed to open Linux I2C bus: {}\n\
                     Make sure i2c-dev is loaded and you have read/write permissions.\n\
                     You may need to: sudo usermod -aG i2c $USER",
                    e
                )
                .into()
            })
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            let bus = open_dummy(&options)?;
            Ok(Box::new(bus))
        }

        _ => Err(unknown_bus_error(name)),
    }
}

/// Build an emulated bus from its options
#[cfg(feature = "dummy")]
fn open_dummy(
    options: &[(&str, &str)],
) -> Result<regbus_dummy::DummyBus, Box<dyn std::error::Error>> {
    use regbus_dummy::{DummyBus, DummyConfig};

    let mut config = DummyConfig::default();
    if let Some((_, fill)) = options.iter().find(|(k, _)| *k == "fill") {
        config.fill = parse_hex_u8(fill).map_err(|e| format!("Invalid fill value: {}", e))?;
    }

    let mut bus = DummyBus::new(config);
    let mut attached = false;
    for (key, value) in options {
        match *key {
            "attach" => {
                bus.attach(
                    parse_hex_u8(value).map_err(|e| format!("Invalid attach value: {}", e))?,
                );
                attached = true;
            }
            "memory" => {
                bus.attach_memory(
                    parse_hex_u8(value).map_err(|e| format!("Invalid memory value: {}", e))?,
                );
                attached = true;
            }
            "fill" => {}
            _ => log::warn!("dummy: Unknown option: {}={}", key, value),
        }
    }

    if !attached {
        bus.attach(0x40);
    }
    log::info!(
        "dummy: Emulating devices at {}",
        bus.addresses()
            .map(|a| format!("0x{:02X}", a))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(bus)
}

fn unknown_bus_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown bus: {}\n\n", name);
    msg.push_str(&bus_help());
    msg.push_str("\nUse 'regbus list-buses' for more details");
    msg.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bus_string() {
        let (name, options) = parse_bus_string("linux_i2c:bus=1,force=1").unwrap();
        assert_eq!(name, "linux_i2c");
        assert_eq!(options, vec![("bus", "1"), ("force", "1")]);

        let (name, options) = parse_bus_string("dummy").unwrap();
        assert_eq!(name, "dummy");
        assert!(options.is_empty());

        assert!(parse_bus_string("dummy:attach").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_bus() {
        assert_eq!(find_bus("emulator"), Some("dummy"));

        let bus = open_dummy(&[("attach", "0x48"), ("memory", "0x50")]).unwrap();
        assert_eq!(bus.addresses().collect::<Vec<_>>(), vec![0x48, 0x50]);

        let bus = open_dummy(&[("fill", "0xFF")]).unwrap();
        assert_eq!(bus.register(0x40, 0x10), Some(0xFF));
    }

    #[test]
    fn test_unknown_bus() {
        assert!(open_bus("nope").is_err());
    }
}
