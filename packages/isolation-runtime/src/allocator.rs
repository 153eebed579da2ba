//! Domain allocator
//!
//! Routes `malloc`/`calloc`/`realloc`/`free`-shaped requests through the
//! slot chosen by [`select_slot`](crate::domain::select_slot). Failures come
//! back as null pointers; a request is never retried in another heap or
//! another domain. Nothing on the allocation path logs, so the allocator can
//! sit behind a replacement `malloc` while a subscriber is installed.
//!
//! The bootstrap buffer and the initialization window belong to one
//! allocator instance. With one allocator per thread, a bootstrap claim must
//! be freed or resized on the thread that made it; another thread's
//! allocator does not recognise the pointer and hands it to the backend.

use crate::bootstrap::BootstrapBuffer;
use crate::domain::{select_slot, DomainSlot, DomainState, MAX_HEAPS};
use crate::error::{Result, RuntimeError};
use crate::pool::HeapPool;
use crate::ports::{HeapBackend, HeapHandle};
use std::cell::Cell;
use std::ptr;

pub struct DomainAllocator<B: HeapBackend, const N: usize = MAX_HEAPS> {
    pool: HeapPool<B, N>,
    bootstrap: BootstrapBuffer,
    initializing: Cell<bool>,
}

impl<B: HeapBackend, const N: usize> DomainAllocator<B, N> {
    pub const fn new(backend: B) -> Self {
        Self {
            pool: HeapPool::new(backend),
            bootstrap: BootstrapBuffer::new(),
            initializing: Cell::new(false),
        }
    }

    pub fn pool(&self) -> &HeapPool<B, N> {
        &self.pool
    }

    pub fn bootstrap(&self) -> &BootstrapBuffer {
        &self.bootstrap
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.get()
    }

    /// Serve every allocation from the bootstrap buffer until
    /// [`finish_initialization`](Self::finish_initialization)
    pub fn begin_initialization(&self) {
        self.initializing.set(true);
    }

    pub fn finish_initialization(&self) -> Result<()> {
        if !self.initializing.replace(false) {
            return Err(RuntimeError::config(
                "finish_initialization called while not initializing",
            ));
        }
        Ok(())
    }

    /// Slot the next allocation under `state` will use
    pub fn slot_for(&self, state: DomainState) -> DomainSlot {
        select_slot(state, N)
    }

    fn heap(&self, state: DomainState) -> Option<HeapHandle> {
        self.pool.heap_for_state(state).ok()
    }

    fn claim_bootstrap(&self, size: usize) -> *mut u8 {
        self.bootstrap.claim(size).unwrap_or(ptr::null_mut())
    }

    pub fn allocate(&self, state: DomainState, size: usize) -> *mut u8 {
        if self.initializing.get() {
            return self.claim_bootstrap(size);
        }
        match self.heap(state) {
            Some(heap) => self.pool.backend().alloc(heap, size),
            None => ptr::null_mut(),
        }
    }

    /// Zero-initialised allocation of `count * size` bytes
    pub fn allocate_zeroed(&self, state: DomainState, count: usize, size: usize) -> *mut u8 {
        if self.initializing.get() {
            // Claims come from a cleared buffer.
            return match count.checked_mul(size) {
                Some(total) => self.claim_bootstrap(total),
                None => ptr::null_mut(),
            };
        }
        match self.heap(state) {
            Some(heap) => self.pool.backend().alloc_zeroed(heap, count, size),
            None => ptr::null_mut(),
        }
    }

    /// # Safety
    /// `ptr` must be null, a bootstrap claim, or a live block from this allocator.
    pub unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        if self.bootstrap.contains(ptr) {
            self.bootstrap.release();
            return;
        }
        unsafe { self.pool.backend().free(ptr) };
    }

    /// Resize `ptr`; a bootstrap claim is copied into a heap block.
    ///
    /// # Safety
    /// Same contract as [`free`](Self::free).
    pub unsafe fn resize(&self, state: DomainState, ptr: *mut u8, new_size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(state, new_size);
        }

        if self.bootstrap.contains(ptr) {
            let replacement = self.allocate(state, new_size);
            if replacement.is_null() {
                return replacement;
            }
            let len = self.bootstrap.remaining_from(ptr).min(new_size);
            unsafe {
                ptr::copy(ptr, replacement, len);
                self.free(ptr);
            }
            return replacement;
        }

        match self.heap(state) {
            Some(heap) => unsafe { self.pool.backend().resize(heap, ptr, new_size) },
            None => ptr::null_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::error::ErrorKind;
    use crate::infrastructure::InMemoryBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type TestAllocator = DomainAllocator<InMemoryBackend, 16>;

    #[test]
    fn test_allocation_lands_in_selected_heap() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        let state = DomainState::new(5, 0);

        let ptr = allocator.allocate(state, 24);
        let heap = allocator.pool().get(DomainSlot::safe(5)).unwrap();
        assert_eq!(allocator.pool().backend().owner(ptr), Some(heap));
        unsafe { allocator.free(ptr) };
        assert_eq!(allocator.pool().backend().live_blocks(heap), 0);
    }

    #[test]
    fn test_flag_moves_allocation_to_unsafe_domain() {
        let allocator = TestAllocator::new(InMemoryBackend::new());

        let ptr = allocator.allocate(DomainState::new(5, 0b10), 8);
        assert_eq!(allocator.slot_for(DomainState::new(5, 0b10)), DomainSlot::unsafe_slot(5));
        let heap = allocator.pool().get(DomainSlot::unsafe_slot(5)).unwrap();
        assert_eq!(allocator.pool().backend().owner(ptr), Some(heap));
        assert_eq!(allocator.pool().created(Domain::Safe), 0);
        unsafe { allocator.free(ptr) };
    }

    #[test]
    fn test_exhausted_heap_returns_null_without_spillover() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        let state = DomainState::new(7, 1);
        let heap = allocator.pool().heap_for_state(state).unwrap();
        allocator.pool().backend().set_exhausted(heap, true);

        assert!(allocator.allocate(state, 8).is_null());
        assert!(allocator.allocate_zeroed(state, 1, 8).is_null());
        assert_eq!(allocator.pool().backend().heaps_created(), 1);
    }

    #[test]
    fn test_heap_creation_failure_returns_null() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        allocator.pool().backend().refuse_heap_creation(true);
        assert!(allocator.allocate(DomainState::new(3, 0), 8).is_null());
    }

    #[test]
    fn test_bootstrap_during_initialization() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        allocator.begin_initialization();

        let ptr = allocator.allocate(DomainState::new(5, 0), 64);
        assert!(allocator.bootstrap().contains(ptr));
        assert_eq!(allocator.pool().backend().heaps_created(), 0);

        unsafe { allocator.free(ptr) };
        assert_eq!(allocator.bootstrap().live_claims(), 0);
        allocator.finish_initialization().unwrap();
        assert!(!allocator.is_initializing());
    }

    #[test]
    fn test_bootstrap_overflow_is_null() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        allocator.begin_initialization();
        assert!(allocator.allocate(DomainState::default(), 4096).is_null());
        assert!(allocator
            .allocate_zeroed(DomainState::default(), usize::MAX, 2)
            .is_null());
    }

    #[test]
    fn test_finish_without_begin_is_error() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        let err = allocator.finish_initialization().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Config);
    }

    #[test]
    fn test_resize_bootstrap_claim_copies_into_heap() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        allocator.begin_initialization();
        let early = allocator.allocate(DomainState::default(), 4);
        unsafe { early.copy_from_nonoverlapping([9u8, 8, 7, 6].as_ptr(), 4) };
        allocator.finish_initialization().unwrap();

        let state = DomainState::new(4, 0);
        let moved = unsafe { allocator.resize(state, early, 32) };
        assert!(!allocator.bootstrap().contains(moved));
        let heap = allocator.pool().get(DomainSlot::safe(4)).unwrap();
        assert_eq!(allocator.pool().backend().owner(moved), Some(heap));
        assert_eq!(unsafe { std::slice::from_raw_parts(moved, 4) }, &[9, 8, 7, 6]);
        assert_eq!(allocator.bootstrap().live_claims(), 0);
        unsafe { allocator.free(moved) };
    }

    #[test]
    fn test_resize_null_allocates() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        let ptr = unsafe { allocator.resize(DomainState::new(1, 0), std::ptr::null_mut(), 16) };
        let heap = allocator.pool().get(DomainSlot::safe(1)).unwrap();
        assert_eq!(allocator.pool().backend().owner(ptr), Some(heap));
        unsafe { allocator.free(ptr) };
    }

    #[test]
    fn test_bootstrap_claims_are_per_allocator() {
        let first = TestAllocator::new(InMemoryBackend::new());
        let second = TestAllocator::new(InMemoryBackend::new());
        first.begin_initialization();
        second.begin_initialization();

        let claim = first.allocate(DomainState::default(), 16);
        assert!(first.bootstrap().contains(claim));
        assert!(!second.bootstrap().contains(claim));

        unsafe { first.free(claim) };
        assert_eq!(first.bootstrap().live_claims(), 0);
    }

    /// Counts every event dispatched while it is the default subscriber
    struct EventCounter(Arc<AtomicUsize>);

    impl tracing::Subscriber for EventCounter {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
        fn event(&self, _: &tracing::Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn enter(&self, _: &tracing::span::Id) {}
        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[cfg(not(feature = "alloc-tracing"))]
    #[test]
    fn test_allocation_path_emits_no_events() {
        let events = Arc::new(AtomicUsize::new(0));
        tracing::subscriber::with_default(EventCounter(events.clone()), || {
            let allocator = TestAllocator::new(InMemoryBackend::new());

            // Heap creation, refused creation and bootstrap overflow.
            let ptr = allocator.allocate(DomainState::new(5, 0), 8);
            allocator.pool().backend().refuse_heap_creation(true);
            assert!(allocator.allocate(DomainState::new(6, 0), 8).is_null());
            allocator.begin_initialization();
            assert!(allocator.allocate(DomainState::default(), 4096).is_null());
            unsafe { allocator.free(ptr) };
            assert_eq!(events.load(Ordering::SeqCst), 0);

            tracing::info!("outside the allocator");
        });
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_free_null_is_noop() {
        let allocator = TestAllocator::new(InMemoryBackend::new());
        unsafe { allocator.free(std::ptr::null_mut()) };
        assert_eq!(allocator.pool().backend().heaps_created(), 0);
    }
}
