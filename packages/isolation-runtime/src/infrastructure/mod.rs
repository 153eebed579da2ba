//! Heap backend implementations

pub mod in_memory;

#[cfg(feature = "mimalloc")]
pub mod mimalloc;

pub use in_memory::InMemoryBackend;

#[cfg(feature = "mimalloc")]
pub use mimalloc::MiMallocBackend;
