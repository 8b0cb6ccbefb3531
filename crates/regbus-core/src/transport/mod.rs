//! Bus transport traits and adapters
//!
//! This module defines the byte-level SMBus primitive that every bus
//! backend must implement, plus the shared-bus lock used when several
//! devices on one physical bus are driven from different threads.

#[cfg(feature = "std")]
mod shared;
mod traits;

#[cfg(feature = "std")]
pub use shared::SharedBus;
pub use traits::*;
