//! In-memory heap backend
//!
//! Serves blocks from the global Rust allocator while recording which fake
//! heap owns each block. Used to observe domain routing in tests and to
//! exercise failure paths (exhausted heaps, refused heap creation) without
//! touching the real primitive.

use crate::ports::{HeapBackend, HeapHandle};
use std::alloc::{self, Layout};
use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;

const BLOCK_ALIGN: usize = 16;

#[derive(Debug, Default)]
struct FakeHeap {
    exhausted: bool,
    live_blocks: usize,
    total_allocations: usize,
}

#[derive(Debug)]
struct Block {
    heap: usize,
    layout: Layout,
}

#[derive(Debug, Default)]
struct FakeState {
    heaps: Vec<FakeHeap>,
    blocks: HashMap<usize, Block>,
    refuse_heap_creation: bool,
}

/// Heap backend that tracks ownership of every block it hands out
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RefCell<FakeState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of heaps created so far
    pub fn heaps_created(&self) -> usize {
        self.state.borrow().heaps.len()
    }

    /// Heap that owns `ptr`, if it is a live block
    pub fn owner(&self, ptr: *const u8) -> Option<HeapHandle> {
        let state = self.state.borrow();
        state
            .blocks
            .get(&(ptr as usize))
            .and_then(|block| handle_for(block.heap))
    }

    /// Live blocks currently owned by `heap`
    pub fn live_blocks(&self, heap: HeapHandle) -> usize {
        let state = self.state.borrow();
        index_of(heap)
            .and_then(|idx| state.heaps.get(idx))
            .map_or(0, |h| h.live_blocks)
    }

    /// Allocations ever served by `heap`
    pub fn total_allocations(&self, heap: HeapHandle) -> usize {
        let state = self.state.borrow();
        index_of(heap)
            .and_then(|idx| state.heaps.get(idx))
            .map_or(0, |h| h.total_allocations)
    }

    /// Make every further allocation from `heap` fail
    pub fn set_exhausted(&self, heap: HeapHandle, exhausted: bool) {
        let mut state = self.state.borrow_mut();
        if let Some(h) = index_of(heap).and_then(|idx| state.heaps.get_mut(idx)) {
            h.exhausted = exhausted;
        }
    }

    /// Make `create_heap` return `None`
    pub fn refuse_heap_creation(&self, refuse: bool) {
        self.state.borrow_mut().refuse_heap_creation = refuse;
    }

    fn allocate_block(&self, heap: HeapHandle, size: usize, zeroed: bool) -> *mut u8 {
        let mut state = self.state.borrow_mut();
        let Some(idx) = index_of(heap).filter(|idx| *idx < state.heaps.len()) else {
            return std::ptr::null_mut();
        };
        if state.heaps[idx].exhausted {
            return std::ptr::null_mut();
        }
        let Ok(layout) = Layout::from_size_align(size.max(1), BLOCK_ALIGN) else {
            return std::ptr::null_mut();
        };

        // SAFETY: layout has a nonzero size.
        let ptr = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };
        if ptr.is_null() {
            return ptr;
        }

        state.blocks.insert(ptr as usize, Block { heap: idx, layout });
        let fake = &mut state.heaps[idx];
        fake.live_blocks += 1;
        fake.total_allocations += 1;
        ptr
    }
}

impl HeapBackend for InMemoryBackend {
    fn create_heap(&self) -> Option<HeapHandle> {
        let mut state = self.state.borrow_mut();
        if state.refuse_heap_creation {
            return None;
        }
        state.heaps.push(FakeHeap::default());
        handle_for(state.heaps.len() - 1)
    }

    fn alloc(&self, heap: HeapHandle, size: usize) -> *mut u8 {
        self.allocate_block(heap, size, false)
    }

    fn alloc_zeroed(&self, heap: HeapHandle, count: usize, size: usize) -> *mut u8 {
        match count.checked_mul(size) {
            Some(total) => self.allocate_block(heap, total, true),
            None => std::ptr::null_mut(),
        }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let mut state = self.state.borrow_mut();
        let Some(block) = state.blocks.remove(&(ptr as usize)) else {
            tracing::warn!("in-memory backend: free of unknown block {:p}", ptr);
            return;
        };
        if let Some(heap) = state.heaps.get_mut(block.heap) {
            heap.live_blocks -= 1;
        }
        // SAFETY: the block was allocated above with exactly this layout.
        unsafe { alloc::dealloc(ptr, block.layout) };
    }

    unsafe fn resize(&self, heap: HeapHandle, ptr: *mut u8, new_size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.alloc(heap, new_size);
        }
        let old_size = match self.state.borrow().blocks.get(&(ptr as usize)) {
            Some(block) => block.layout.size(),
            None => return std::ptr::null_mut(),
        };

        let replacement = self.alloc(heap, new_size);
        if replacement.is_null() {
            return replacement;
        }
        // SAFETY: both blocks are live and at least min(old, new) bytes long.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr, replacement, old_size.min(new_size));
            self.free(ptr);
        }
        replacement
    }
}

impl Drop for InMemoryBackend {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (addr, block) in state.blocks.drain() {
            // SAFETY: every tracked block is live and owns its layout.
            unsafe { alloc::dealloc(addr as *mut u8, block.layout) };
        }
    }
}

fn handle_for(index: usize) -> Option<HeapHandle> {
    // Handles are tagged indices, never dereferenced.
    HeapHandle::from_raw(((index + 1) * BLOCK_ALIGN) as *mut c_void)
}

fn index_of(heap: HeapHandle) -> Option<usize> {
    (heap.as_ptr() as usize / BLOCK_ALIGN).checked_sub(1)
}
