//! C entry points
//!
//! Instrumented code writes the flag and type tag through `domain_flag_store`
//! and `domain_type_tag_store`; allocation calls are redirected to the
//! `domain_*` allocation functions.

use crate::{global, state};
use std::ffi::c_void;

#[no_mangle]
pub extern "C" fn domain_malloc(size: usize) -> *mut c_void {
    global::malloc(size).cast()
}

#[no_mangle]
pub extern "C" fn domain_calloc(count: usize, size: usize) -> *mut c_void {
    global::calloc(count, size).cast()
}

/// # Safety
/// `ptr` must be null or a block returned by the `domain_*` allocation functions.
#[no_mangle]
pub unsafe extern "C" fn domain_realloc(ptr: *mut c_void, new_size: usize) -> *mut c_void {
    unsafe { global::realloc(ptr.cast(), new_size).cast() }
}

/// # Safety
/// `ptr` must be null or a block returned by the `domain_*` allocation functions.
#[no_mangle]
pub unsafe extern "C" fn domain_free(ptr: *mut c_void) {
    unsafe { global::free(ptr.cast()) }
}

#[no_mangle]
pub extern "C" fn domain_flag_store(value: u64) {
    state::set_unsafe_flag(value);
}

#[no_mangle]
pub extern "C" fn domain_flag_load() -> u64 {
    state::unsafe_flag()
}

#[no_mangle]
pub extern "C" fn domain_type_tag_store(tag: u64) {
    state::set_type_tag(tag);
}

#[no_mangle]
pub extern "C" fn domain_allocator_begin_init() {
    global::begin_initialization();
}

/// Returns 0 on success, -1 when no initialization window was open
#[no_mangle]
pub extern "C" fn domain_allocator_finish_init() -> i32 {
    match global::finish_initialization() {
        Ok(()) => 0,
        Err(err) => {
            tracing::warn!("{}", err);
            -1
        }
    }
}
