//! regbus - SMBus/I2C register access tool
//!
//! Talks to register-based devices (sensors, port expanders, EEPROMs) through
//! a pluggable bus backend:
//! - **linux_i2c** - the kernel `/dev/i2c-N` character devices
//! - **dummy** - an in-memory bus for trying commands without hardware
//!
//! Registers can be addressed by number, or by name through a RON register
//! map that also describes the bit-fields inside each register.

mod buses;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, MapArgs};
use commands::{named, registers, DeviceOptions};
use regbus_core::{Device, RegisterMap};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logger; RUST_LOG still overrides the flags
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose, cli.debug))
        .parse_default_env()
        .init();

    let options = DeviceOptions {
        bus: cli.bus,
        debug: cli.debug,
        quiet: cli.quiet,
        name: cli.device_name,
    };

    match cli.command {
        Commands::ListBuses => {
            commands::list_buses();
            Ok(())
        }
        Commands::Detect { cpuinfo } => commands::run_detect(cpuinfo.as_deref()),
        Commands::Scan { first, last } => {
            let mut bus = buses::open_bus(&options.bus)?;
            commands::run_scan(&mut bus, first, last)
        }
        Commands::Probe { target } => {
            let mut dev = options.open(target.address, None)?;
            registers::run_probe(&mut dev)
        }
        Commands::Read {
            target,
            register,
            word,
            signed,
            big_endian,
        } => {
            let mut dev = options.open(target.address, None)?;
            registers::run_read(&mut dev, register, word, signed, big_endian)
        }
        Commands::Write {
            target,
            register,
            value,
            word,
        } => {
            let mut dev = options.open(target.address, None)?;
            registers::run_write(&mut dev, register, value, word)
        }
        Commands::Dump { target, start, len } => {
            let mut dev = options.open(target.address, None)?;
            registers::run_dump(&mut dev, start, len)
        }
        Commands::ReadWide {
            target,
            location,
            count,
        } => {
            let mut dev = options.open(target.address, None)?;
            registers::run_read_wide(&mut dev, location, count)
        }
        Commands::WriteWide {
            target,
            location,
            data,
        } => {
            let mut dev = options.open(target.address, None)?;
            registers::run_write_wide(&mut dev, location, &data)
        }
        Commands::Get { map, name } => {
            let (mut dev, map) = open_mapped(&options, &map)?;
            named::run_get(&mut dev, &map, &name)
        }
        Commands::Set { map, name, value } => {
            let (mut dev, map) = open_mapped(&options, &map)?;
            named::run_set(&mut dev, &map, &name, value)
        }
        Commands::Check {
            map,
            name,
            expected,
        } => {
            let (mut dev, map) = open_mapped(&options, &map)?;
            named::run_check(&mut dev, &map, &name, expected)
        }
        Commands::Clear { map, name } => {
            let (mut dev, map) = open_mapped(&options, &map)?;
            named::run_clear(&mut dev, &map, &name)
        }
        Commands::Map { file } => commands::map::run_map(&file),
    }
}

/// Load a register map and open the device it describes
fn open_mapped(
    options: &DeviceOptions,
    args: &MapArgs,
) -> Result<(Device<buses::BoxedBus>, RegisterMap), Box<dyn std::error::Error>> {
    let map = RegisterMap::load_file(&args.map)?;
    let address = named::resolve_address(&map, args.address)?;
    log::debug!(
        "Loaded map {} for {} ({} registers)",
        args.map.display(),
        map.chip(),
        map.registers().len()
    );
    let dev = options.open(address, Some(map.chip()))?;
    Ok((dev, map))
}

/// Log level from `-v` count and `--debug`
fn log_level(verbose: u8, debug: bool) -> log::LevelFilter {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    // Primitive traces are debug lines; --debug must let them through
    if debug {
        level.max(log::LevelFilter::Debug)
    } else {
        level
    }
}
