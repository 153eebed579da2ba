//! Thread-local domain registers
//!
//! Two registers per thread: the unsafe flag written by instrumented call
//! sites, and the type tag written around smart-pointer API calls. Both start
//! at zero, so a thread that never touches them allocates in the foreign
//! domain (`UNSAFE[0]`).

use crate::domain::DomainState;
use std::cell::Cell;

thread_local! {
    static UNSAFE_FLAG: Cell<u64> = const { Cell::new(0) };
    static TYPE_TAG: Cell<u64> = const { Cell::new(0) };
}

#[inline]
pub fn unsafe_flag() -> u64 {
    UNSAFE_FLAG.with(|cell| cell.get())
}

#[inline]
pub fn set_unsafe_flag(value: u64) {
    UNSAFE_FLAG.with(|flag| flag.set(value));
}

#[inline]
pub fn type_tag() -> u64 {
    TYPE_TAG.with(|cell| cell.get())
}

#[inline]
pub fn set_type_tag(tag: u64) {
    TYPE_TAG.with(|t| t.set(tag));
}

/// Read both registers; after thread-local teardown both read as zero
#[inline]
pub fn current() -> DomainState {
    DomainState {
        unsafe_flag: UNSAFE_FLAG.try_with(|cell| cell.get()).unwrap_or(0),
        type_tag: TYPE_TAG.try_with(|cell| cell.get()).unwrap_or(0),
    }
}

/// Restores the previous type tag when dropped
#[must_use = "the tag is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct TypeTagGuard {
    previous: u64,
}

impl TypeTagGuard {
    pub fn enter(tag: u64) -> Self {
        let previous = type_tag();
        set_type_tag(tag);
        Self { previous }
    }
}

impl Drop for TypeTagGuard {
    fn drop(&mut self) {
        set_type_tag(self.previous);
    }
}

/// Run `f` with the type tag set to `tag`
pub fn with_type_tag<R>(tag: u64, f: impl FnOnce() -> R) -> R {
    let _guard = TypeTagGuard::enter(tag);
    f()
}
