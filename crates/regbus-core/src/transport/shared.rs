//! Shared bus handle
//!
//! One `SharedBus` wraps one physical bus. Clone it once per [`Device`]
//! that lives on that bus; every clone serializes through the same mutex.
//!
//! [`Device`]: crate::device::Device

use super::traits::{Functionality, SmbusTransport};
use crate::error::BusResult;

use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable, mutex-guarded transport shared between devices on one bus
///
/// Single calls hold the lock for the duration of the call. Compound
/// operations go through [`SmbusTransport::exclusive`], which holds the
/// lock across the whole read-then-write span so a second device writing
/// the same register cannot interleave.
pub struct SharedBus<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: SmbusTransport> SharedBus<T> {
    /// Wrap a transport so it can be shared
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// Lock the bus for direct access
    ///
    /// A poisoned lock is recovered: a panic on another thread does not
    /// leave the bus itself in a bad state.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of handles sharing this bus
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<T: SmbusTransport> SmbusTransport for SharedBus<T> {
    fn functionality(&self) -> Functionality {
        self.lock().functionality()
    }

    fn write_quick(&mut self, device: u8) -> BusResult<()> {
        self.lock().write_quick(device)
    }

    fn write_byte(&mut self, device: u8, value: u8) -> BusResult<()> {
        self.lock().write_byte(device, value)
    }

    fn read_byte(&mut self, device: u8) -> BusResult<u8> {
        self.lock().read_byte(device)
    }

    fn write_byte_data(&mut self, device: u8, reg: u8, value: u8) -> BusResult<()> {
        self.lock().write_byte_data(device, reg, value)
    }

    fn read_byte_data(&mut self, device: u8, reg: u8) -> BusResult<u8> {
        self.lock().read_byte_data(device, reg)
    }

    fn write_word_data(&mut self, device: u8, reg: u8, value: u16) -> BusResult<()> {
        self.lock().write_word_data(device, reg, value)
    }

    fn read_word_data(&mut self, device: u8, reg: u8) -> BusResult<u16> {
        self.lock().read_word_data(device, reg)
    }

    fn write_block_data(&mut self, device: u8, reg: u8, data: &[u8]) -> BusResult<()> {
        self.lock().write_block_data(device, reg, data)
    }

    fn read_block_data(&mut self, device: u8, reg: u8, buf: &mut [u8]) -> BusResult<()> {
        self.lock().read_block_data(device, reg, buf)
    }

    fn exclusive(
        &mut self,
        op: &mut dyn FnMut(&mut dyn SmbusTransport) -> BusResult<()>,
    ) -> BusResult<()> {
        let mut guard = self.lock();
        guard.exclusive(op)
    }
}
