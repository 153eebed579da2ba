//! Bootstrap buffer
//!
//! A fixed static-sized buffer that serves allocation requests while the
//! allocator is still initialising (before the heap primitive can be used).
//! Claims are bump-allocated at 16-byte granularity. Releasing the last live
//! claim zeroes the buffer and makes the whole capacity available again.

use crate::error::{Result, RuntimeError};
use std::cell::{Cell, UnsafeCell};

/// Capacity of the bootstrap buffer in bytes
pub const BOOTSTRAP_BUFFER_SIZE: usize = 1024;

const CLAIM_ALIGN: usize = 16;

#[repr(C, align(16))]
struct Storage([u8; BOOTSTRAP_BUFFER_SIZE]);

pub struct BootstrapBuffer {
    storage: UnsafeCell<Storage>,
    cursor: Cell<usize>,
    live: Cell<usize>,
}

impl BootstrapBuffer {
    pub const fn new() -> Self {
        Self {
            storage: UnsafeCell::new(Storage([0; BOOTSTRAP_BUFFER_SIZE])),
            cursor: Cell::new(0),
            live: Cell::new(0),
        }
    }

    fn base(&self) -> *mut u8 {
        self.storage.get().cast()
    }

    /// Whether `ptr` points into the buffer
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.base() as usize;
        let addr = ptr as usize;
        addr >= start && addr < start + BOOTSTRAP_BUFFER_SIZE
    }

    /// Bytes available from `ptr` to the end of the buffer
    pub fn remaining_from(&self, ptr: *const u8) -> usize {
        if !self.contains(ptr) {
            return 0;
        }
        self.base() as usize + BOOTSTRAP_BUFFER_SIZE - ptr as usize
    }

    /// Number of claims not yet released
    pub fn live_claims(&self) -> usize {
        self.live.get()
    }

    /// Claim `size` bytes
    pub fn claim(&self, size: usize) -> Result<*mut u8> {
        let offset = self.cursor.get();
        let rounded = size
            .max(1)
            .checked_next_multiple_of(CLAIM_ALIGN)
            .ok_or_else(|| RuntimeError::bootstrap_overflow(size, BOOTSTRAP_BUFFER_SIZE))?;
        if rounded > BOOTSTRAP_BUFFER_SIZE - offset {
            return Err(RuntimeError::bootstrap_overflow(
                size,
                BOOTSTRAP_BUFFER_SIZE - offset,
            ));
        }

        self.cursor.set(offset + rounded);
        self.live.set(self.live.get() + 1);
        // SAFETY: offset + rounded <= BOOTSTRAP_BUFFER_SIZE.
        Ok(unsafe { self.base().add(offset) })
    }

    /// Release one claim; the last release clears the buffer
    pub fn release(&self) {
        let live = self.live.get().saturating_sub(1);
        self.live.set(live);
        if live == 0 {
            self.clear();
        }
    }

    /// Zero the buffer and reset the claim cursor
    pub fn clear(&self) {
        // SAFETY: the buffer is only touched through this thread's allocator.
        unsafe { self.base().write_bytes(0, BOOTSTRAP_BUFFER_SIZE) };
        self.cursor.set(0);
        self.live.set(0);
    }
}

impl Default for BootstrapBuffer {
    fn default() -> Self {
        Self::new()
    }
}
