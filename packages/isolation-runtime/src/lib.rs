//! Domain-partitioned heap selector
//!
//! Every allocation is routed to one of up to [`MAX_HEAPS`] heaps per domain,
//! chosen from two thread-local registers:
//!
//! - the **unsafe flag**, written by instrumented call sites on the path to an
//!   unsafe allocation (nonzero selects the UNSAFE domain);
//! - the **type tag**, the logical object domain of the next allocation.
//!
//! ## Reserved tags
//!
//! | tag | meaning                         | heap        |
//! |-----|---------------------------------|-------------|
//! | `0` | foreign / uninstrumented code   | `UNSAFE[0]` |
//! | `1` | managed smart-pointer internals | `SAFE[1]`   |
//!
//! ## Usage
//!
//! ```rust
//! use isolation_runtime::{DomainAllocator, DomainSlot, DomainState, InMemoryBackend};
//!
//! let allocator: DomainAllocator<InMemoryBackend, 16> =
//!     DomainAllocator::new(InMemoryBackend::new());
//!
//! let ptr = allocator.allocate(DomainState::new(5, 0), 32);
//! assert!(allocator.pool().get(DomainSlot::safe(5)).is_some());
//! unsafe { allocator.free(ptr) };
//! ```
//!
//! All state is per thread. Nothing here takes a lock.

pub mod allocator;
pub mod bootstrap;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod pool;
pub mod ports;
pub mod state;

#[cfg(feature = "mimalloc")]
pub mod global;

#[cfg(feature = "c-abi")]
pub mod ffi;

pub use allocator::DomainAllocator;
pub use bootstrap::{BootstrapBuffer, BOOTSTRAP_BUFFER_SIZE};
pub use domain::{
    placement_index, select_slot, Domain, DomainSlot, DomainState, FOREIGN_TYPE_TAG, MAX_HEAPS,
    RESERVED_SLOTS, SMART_POINTER_TYPE_TAG,
};
pub use error::{ErrorKind, Result, RuntimeError};
pub use infrastructure::InMemoryBackend;
#[cfg(feature = "mimalloc")]
pub use infrastructure::MiMallocBackend;
pub use pool::HeapPool;
pub use ports::{HeapBackend, HeapHandle};
