//! mimalloc heap backend
//!
//! Each pool slot owns one `mi_heap_t`. Heaps are never deleted: pool entries
//! live until thread teardown, and mimalloc abandons the heap's pages to be
//! reclaimed by other threads when the owning thread exits.

use crate::ports::{HeapBackend, HeapHandle};
use libmimalloc_sys as mi;

/// Heap primitive backed by mimalloc first-class heaps
#[derive(Debug, Clone, Copy, Default)]
pub struct MiMallocBackend;

impl HeapBackend for MiMallocBackend {
    fn create_heap(&self) -> Option<HeapHandle> {
        let heap = unsafe { mi::mi_heap_new() };
        HeapHandle::from_raw(heap.cast())
    }

    fn alloc(&self, heap: HeapHandle, size: usize) -> *mut u8 {
        unsafe { mi::mi_heap_malloc(heap.as_ptr().cast(), size).cast() }
    }

    fn alloc_zeroed(&self, heap: HeapHandle, count: usize, size: usize) -> *mut u8 {
        unsafe { mi::mi_heap_calloc(heap.as_ptr().cast(), count, size).cast() }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { mi::mi_free(ptr.cast()) }
    }

    unsafe fn resize(&self, heap: HeapHandle, ptr: *mut u8, new_size: usize) -> *mut u8 {
        unsafe { mi::mi_heap_realloc(heap.as_ptr().cast(), ptr.cast(), new_size).cast() }
    }
}
