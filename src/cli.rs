//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u8
pub fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal u16
fn parse_hex_u16(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u16>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a 7-bit device address
fn parse_device_address(s: &str) -> Result<u8, String> {
    let address = parse_hex_u8(s)?;
    if address > 0x7F {
        return Err(format!("0x{:02X} is not a 7-bit address", address));
    }
    Ok(address)
}

#[derive(Parser)]
#[command(name = "regbus")]
#[command(author, version, about = "SMBus/I2C register access tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Bus to use, as name[:key=value,...] (see list-buses)
    #[arg(short, long, default_value = "linux_i2c", global = true)]
    pub bus: String,

    /// Trace every bus transaction
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only report verification failures and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Device name used in messages
    #[arg(long = "name", global = true, value_name = "NAME")]
    pub device_name: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared by register commands
#[derive(clap::Args, Debug, Clone)]
pub struct Target {
    /// Device address (7-bit, hex or decimal)
    #[arg(short, long, value_parser = parse_device_address)]
    pub address: u8,
}

/// Register map selection shared by named commands
#[derive(clap::Args, Debug, Clone)]
pub struct MapArgs {
    /// Register map file (RON format)
    #[arg(short, long)]
    pub map: PathBuf,

    /// Device address (defaults to the address given in the map)
    #[arg(short, long, value_parser = parse_device_address)]
    pub address: Option<u8>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List supported bus backends
    ListBuses,

    /// Show the detected board revision and bus index
    Detect {
        /// Read platform identification from this file instead of /proc/cpuinfo
        #[arg(long)]
        cpuinfo: Option<PathBuf>,
    },

    /// Probe every address on the bus
    Scan {
        /// First address to probe
        #[arg(long, default_value = "0x03", value_parser = parse_device_address)]
        first: u8,

        /// Last address to probe
        #[arg(long, default_value = "0x77", value_parser = parse_device_address)]
        last: u8,
    },

    /// Check that a device answers (quick write)
    Probe {
        #[command(flatten)]
        target: Target,
    },

    /// Read a register
    Read {
        #[command(flatten)]
        target: Target,

        /// Register address
        #[arg(short, long, value_parser = parse_hex_u8)]
        register: u8,

        /// Read a 16-bit register pair
        #[arg(short, long)]
        word: bool,

        /// Interpret the value as two's complement
        #[arg(short, long)]
        signed: bool,

        /// High byte at the lower address (with --word)
        #[arg(long)]
        big_endian: bool,
    },

    /// Write a register
    Write {
        #[command(flatten)]
        target: Target,

        /// Register address
        #[arg(short, long, value_parser = parse_hex_u8)]
        register: u8,

        /// Value to write
        #[arg(value_parser = parse_hex_u16)]
        value: u16,

        /// Write a 16-bit register pair
        #[arg(short, long)]
        word: bool,
    },

    /// Dump a range of registers with one block read
    Dump {
        #[command(flatten)]
        target: Target,

        /// First register
        #[arg(long, default_value = "0x00", value_parser = parse_hex_u8)]
        start: u8,

        /// Number of registers (at most 32)
        #[arg(short, long, default_value = "16")]
        len: usize,
    },

    /// Read from a device with a 16-bit address space
    ReadWide {
        #[command(flatten)]
        target: Target,

        /// 16-bit location
        #[arg(value_parser = parse_hex_u16)]
        location: u16,

        /// Number of bytes to read
        #[arg(short, long, default_value = "1")]
        count: u16,
    },

    /// Write to a device with a 16-bit address space
    WriteWide {
        #[command(flatten)]
        target: Target,

        /// 16-bit location
        #[arg(value_parser = parse_hex_u16)]
        location: u16,

        /// Bytes to write (at most 31)
        #[arg(required = true, value_parser = parse_hex_u8)]
        data: Vec<u8>,
    },

    /// Read a named register or field
    Get {
        #[command(flatten)]
        map: MapArgs,

        /// Register or field name
        name: String,
    },

    /// Write a named register or field
    Set {
        #[command(flatten)]
        map: MapArgs,

        /// Register or field name
        name: String,

        /// Value to write
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Verify a named register or field
    Check {
        #[command(flatten)]
        map: MapArgs,

        /// Register or field name
        name: String,

        /// Expected value (defaults to the register's reset value)
        #[arg(value_parser = parse_hex_u8)]
        expected: Option<u8>,
    },

    /// Acknowledge an event field
    Clear {
        #[command(flatten)]
        map: MapArgs,

        /// Field name
        name: String,
    },

    /// Print a register map
    Map {
        /// Register map file (RON format)
        file: PathBuf,
    },
}
