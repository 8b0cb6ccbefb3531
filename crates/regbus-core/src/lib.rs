//! regbus-core - Register and bit-field access for SMBus/I2C devices
//!
//! This crate lets a caller describe a register or a bit-field once, as
//! plain data, and then read, write and verify it on a device without
//! repeating mask and shift arithmetic at every call site. It is designed
//! to be `no_std` compatible; the bus itself is abstracted behind the
//! [`transport::SmbusTransport`] trait.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`): board
//!   revision detection from `/proc/cpuinfo`, the [`transport::SharedBus`]
//!   lock and RON register maps
//! - `alloc` - Enable heap allocation
//!
//! # Example
//!
//! ```ignore
//! use regbus_core::{BitField, Device, DeviceConfig, Register};
//!
//! const CONFIG: Register<'static> = Register::new("CONFIG", 0x00, 0x9F);
//! const MODE: BitField<'static> = BitField::new("MODE", 0x00, 0b0000_0111, 0);
//!
//! fn configure<T: regbus_core::transport::SmbusTransport>(bus: T) -> regbus_core::Result<()> {
//!     let mut dev = Device::new(bus, DeviceConfig::new(0x40).with_name("INA219"));
//!     dev.write_field(&MODE, 0b101)?;
//!     let check = dev.read_register_and_verify(&CONFIG, 0x9D)?;
//!     println!("CONFIG = 0x{:02X}", check.actual);
//!     Ok(())
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod access;
pub mod bus_select;
pub mod device;
pub mod error;
#[cfg(feature = "std")]
pub mod map;
pub mod register;
pub mod transport;

#[cfg(test)]
mod testing;

pub use access::{EventState, Verification};
pub use bus_select::{select_bus, BoardRevision};
pub use device::{ByteOrder, Device, DeviceConfig, Verbosity, BLOCK_MAX};
pub use error::{BusError, Error, Result};
#[cfg(feature = "std")]
pub use map::{MapError, RegisterMap};
pub use register::{Access, BitField, Register};
