//! Heap pool: two arrays of lazily created heap handles
//!
//! The pool is plain data with interior mutability and no destructor, so it
//! can sit in a `const`-initialised thread local without allocating or
//! registering a TLS destructor. A heap is created on the first request for
//! its slot and kept for the lifetime of the pool.

use crate::domain::{select_slot, Domain, DomainSlot, DomainState, MAX_HEAPS, RESERVED_SLOTS};
use crate::error::{Result, RuntimeError};
use crate::ports::{HeapBackend, HeapHandle};
use std::cell::Cell;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Cell<Option<HeapHandle>> = Cell::new(None);

/// Per-domain heap arrays indexed by slot
pub struct HeapPool<B: HeapBackend, const N: usize = MAX_HEAPS> {
    backend: B,
    safe: [Cell<Option<HeapHandle>>; N],
    unsafe_heaps: [Cell<Option<HeapHandle>>; N],
}

impl<B: HeapBackend, const N: usize> HeapPool<B, N> {
    /// Create an empty pool. `N` must leave room beyond the reserved slots.
    pub const fn new(backend: B) -> Self {
        assert!(N > RESERVED_SLOTS, "pool capacity must exceed the reserved slots");
        Self {
            backend,
            safe: [EMPTY_SLOT; N],
            unsafe_heaps: [EMPTY_SLOT; N],
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn cell(&self, slot: DomainSlot) -> &Cell<Option<HeapHandle>> {
        match slot.domain {
            Domain::Safe => &self.safe[slot.index],
            Domain::Unsafe => &self.unsafe_heaps[slot.index],
        }
    }

    /// Heap already created for `slot`, without creating one
    pub fn get(&self, slot: DomainSlot) -> Option<HeapHandle> {
        self.cell(slot).get()
    }

    /// Heap for `slot`, created on first use
    pub fn heap_for(&self, slot: DomainSlot) -> Result<HeapHandle> {
        let cell = self.cell(slot);
        if let Some(heap) = cell.get() {
            return Ok(heap);
        }

        let heap = self
            .backend
            .create_heap()
            .ok_or_else(|| RuntimeError::heap_creation(slot.domain, slot.index))?;
        cell.set(Some(heap));
        #[cfg(feature = "alloc-tracing")]
        tracing::debug!("created heap {:p} for {}", heap.as_ptr(), slot);
        Ok(heap)
    }

    /// Heap selected by the (type tag, unsafe flag) pair
    pub fn heap_for_state(&self, state: DomainState) -> Result<HeapHandle> {
        self.heap_for(select_slot(state, N))
    }

    /// Number of heaps created in `domain`
    pub fn created(&self, domain: Domain) -> usize {
        let cells = match domain {
            Domain::Safe => &self.safe,
            Domain::Unsafe => &self.unsafe_heaps,
        };
        cells.iter().filter(|cell| cell.get().is_some()).count()
    }
}
