//! Domain model: isolation domains, reserved type tags and slot placement
//!
//! The placement rule is the only policy in the runtime. Everything else
//! (pool, allocator, C entry points) just follows the slot it returns.
//!
//! ## Selection rule (priority order)
//!
//! | type tag            | unsafe flag | slot                      |
//! |---------------------|-------------|---------------------------|
//! | `1` (smart pointer) | any         | `SAFE[1]`                 |
//! | `0` (foreign)       | any         | `UNSAFE[0]`               |
//! | `t >= 2`            | `0`         | `SAFE[placement(t)]`      |
//! | `t >= 2`            | `!= 0`      | `UNSAFE[placement(t)]`    |
//!
//! `placement(t)` reduces `t` modulo the pool capacity and steps away from the
//! two reserved slots by advancing modulo `t` (not the capacity).

use std::fmt;

/// Number of heap slots per domain
pub const MAX_HEAPS: usize = 1024;

/// Type tag of allocations made from foreign / uninstrumented code
pub const FOREIGN_TYPE_TAG: u64 = 0;

/// Type tag of allocations made inside the managed smart-pointer API
pub const SMART_POINTER_TYPE_TAG: u64 = 1;

/// Slots `0` and `1` are owned by the two reserved tags
pub const RESERVED_SLOTS: usize = 2;

/// Isolation domain of an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Safe,
    Unsafe,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Safe => "safe",
            Domain::Unsafe => "unsafe",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the thread-local registers consulted by the selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DomainState {
    /// Bitmask written by instrumented call sites; any nonzero value means unsafe
    pub unsafe_flag: u64,
    /// Logical object domain of the next allocation
    pub type_tag: u64,
}

impl DomainState {
    pub fn new(type_tag: u64, unsafe_flag: u64) -> Self {
        Self {
            unsafe_flag,
            type_tag,
        }
    }
}

/// A (domain, index) pair addressing one heap in the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainSlot {
    pub domain: Domain,
    pub index: usize,
}

impl DomainSlot {
    pub const fn safe(index: usize) -> Self {
        Self {
            domain: Domain::Safe,
            index,
        }
    }

    pub const fn unsafe_slot(index: usize) -> Self {
        Self {
            domain: Domain::Unsafe,
            index,
        }
    }
}

impl fmt::Display for DomainSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.domain, self.index)
    }
}

/// Map a non-reserved type tag onto a slot index in `[2, capacity)`.
///
/// Total for every `type_tag >= 2` and `capacity > 2`: a reduced value below 2
/// implies `type_tag >= capacity > 2`, so advancing modulo `type_tag` walks
/// 0 → 1 → 2 without wrapping.
#[inline]
pub fn placement_index(type_tag: u64, capacity: usize) -> usize {
    debug_assert!(type_tag >= RESERVED_SLOTS as u64);
    debug_assert!(capacity > RESERVED_SLOTS);

    let mut index = type_tag % capacity as u64;
    while index < RESERVED_SLOTS as u64 {
        index = (index + 1) % type_tag;
    }
    index as usize
}

/// Select the heap slot for the next allocation.
#[inline]
pub fn select_slot(state: DomainState, capacity: usize) -> DomainSlot {
    match state.type_tag {
        SMART_POINTER_TYPE_TAG => DomainSlot::safe(1),
        FOREIGN_TYPE_TAG => DomainSlot::unsafe_slot(0),
        tag => {
            let index = placement_index(tag, capacity);
            if state.unsafe_flag != 0 {
                DomainSlot::unsafe_slot(index)
            } else {
                DomainSlot::safe(index)
            }
        }
    }
}
