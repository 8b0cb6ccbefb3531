//! Error types for regbus-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

use crate::transport::Functionality;

/// Classified failure reported by a bus transport
///
/// Transports map their native error codes onto these classes so that a
/// caller can tell an absent device apart from a timeout or a driver that
/// lacks a transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No acknowledge from the device (device absent or wrong address)
    Nack,
    /// Transaction timed out
    Timeout,
    /// Lost arbitration or the adapter was busy
    ArbitrationLost,
    /// The adapter does not support the requested transaction
    Unsupported,
    /// Any other I/O failure
    Io,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A transport call failed while talking to `device`
    Transport {
        /// Bus address of the device that was addressed
        device: u8,
        /// Classified bus failure
        source: BusError,
    },

    /// Block transfer longer than the 32 byte SMBus block limit
    BlockTooLong {
        /// Requested length in bytes
        len: usize,
    },

    /// Bit-field mask/offset does not fit an 8-bit register
    DescriptorOutOfRange,

    /// Transport does not advertise the transaction this operation needs
    Unsupported(Functionality),

    /// Attempted to write a read-only bit-field
    ReadOnly,

    /// Attempted to read a write-only bit-field
    WriteOnly,
}

impl Error {
    /// Returns true if the device did not acknowledge its address
    pub fn is_nack(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                source: BusError::Nack,
                ..
            }
        )
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "no acknowledge"),
            Self::Timeout => write!(f, "timed out"),
            Self::ArbitrationLost => write!(f, "arbitration lost"),
            Self::Unsupported => write!(f, "transaction not supported by adapter"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { device, source } => {
                write!(f, "error accessing device 0x{:02X}: {}", device, source)
            }
            Self::BlockTooLong { len } => {
                write!(f, "block of {} bytes exceeds the 32 byte limit", len)
            }
            Self::DescriptorOutOfRange => {
                write!(f, "bit-field mask/offset does not fit an 8-bit register")
            }
            Self::Unsupported(func) => {
                write!(f, "transport lacks functionality {:?}", func)
            }
            Self::ReadOnly => write!(f, "bit-field is read-only"),
            Self::WriteOnly => write!(f, "bit-field is write-only"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for BusError {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

/// Result type returned by transport calls
pub type BusResult<T> = core::result::Result<T, BusError>;
