//! Per-thread allocator over mimalloc heaps
//!
//! Each thread owns one [`DomainAllocator`] in a `const`-initialised thread
//! local, so no lock is ever taken. After thread-local teardown the
//! allocation calls return null and `free` becomes a plain `mi_free`.
//!
//! The initialization window and its bootstrap buffer are per thread too.
//! A bootstrap claim must be freed or reallocated on the thread that made
//! it: any other thread sees an unknown pointer and passes it to `mi_free`.
//! Open the window only on the thread that loads the allocator, before
//! other threads start.

use crate::allocator::DomainAllocator;
use crate::error::Result;
use crate::infrastructure::MiMallocBackend;
use crate::ports::HeapBackend;
use crate::state;

thread_local! {
    static ALLOCATOR: DomainAllocator<MiMallocBackend> =
        const { DomainAllocator::new(MiMallocBackend) };
}

pub fn malloc(size: usize) -> *mut u8 {
    let domain = state::current();
    ALLOCATOR
        .try_with(|allocator| allocator.allocate(domain, size))
        .unwrap_or(std::ptr::null_mut())
}

pub fn calloc(count: usize, size: usize) -> *mut u8 {
    let domain = state::current();
    ALLOCATOR
        .try_with(|allocator| allocator.allocate_zeroed(domain, count, size))
        .unwrap_or(std::ptr::null_mut())
}

/// # Safety
/// `ptr` must be null or a block returned by this module on the current thread
/// (or any mimalloc block, which `mi_free` accepts from every thread).
pub unsafe fn realloc(ptr: *mut u8, new_size: usize) -> *mut u8 {
    let domain = state::current();
    ALLOCATOR
        .try_with(|allocator| unsafe { allocator.resize(domain, ptr, new_size) })
        .unwrap_or(std::ptr::null_mut())
}

/// # Safety
/// Same contract as [`realloc`].
pub unsafe fn free(ptr: *mut u8) {
    let handled = ALLOCATOR
        .try_with(|allocator| unsafe { allocator.free(ptr) })
        .is_ok();
    if !handled && !ptr.is_null() {
        unsafe { MiMallocBackend.free(ptr) };
    }
}

pub fn begin_initialization() {
    let _ = ALLOCATOR.try_with(|allocator| allocator.begin_initialization());
}

pub fn finish_initialization() -> Result<()> {
    ALLOCATOR
        .try_with(|allocator| allocator.finish_initialization())
        .unwrap_or(Ok(()))
}
