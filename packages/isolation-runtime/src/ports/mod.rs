//! Heap primitive port
//!
//! The pool only needs four capabilities from the underlying allocator:
//! create a heap, allocate from it, free a pointer, and resize a pointer.

use std::ffi::c_void;
use std::ptr::NonNull;

/// Opaque handle to one heap instance owned by a [`HeapBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle(NonNull<c_void>);

impl HeapHandle {
    /// Wrap a raw heap pointer; `None` when the primitive returned null
    #[inline]
    pub fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Capability interface over the allocation primitive.
///
/// Implementations report failure the way the primitive does: `None` from
/// [`create_heap`](Self::create_heap), null from the allocation calls. Callers
/// never retry and never fall back to a different heap.
pub trait HeapBackend {
    /// Create a fresh heap instance
    fn create_heap(&self) -> Option<HeapHandle>;

    /// Allocate `size` bytes from `heap`
    fn alloc(&self, heap: HeapHandle, size: usize) -> *mut u8;

    /// Allocate `count * size` zeroed bytes from `heap`
    fn alloc_zeroed(&self, heap: HeapHandle, count: usize, size: usize) -> *mut u8;

    /// Release a block
    ///
    /// # Safety
    /// `ptr` must be null or a live block returned by this backend.
    unsafe fn free(&self, ptr: *mut u8);

    /// Resize a block, allocating any replacement from `heap`
    ///
    /// # Safety
    /// `ptr` must be null or a live block returned by this backend.
    unsafe fn resize(&self, heap: HeapHandle, ptr: *mut u8, new_size: usize) -> *mut u8;
}
