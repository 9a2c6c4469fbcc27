//! Pluggable memory allocation for the large buffers the block manager and
//! neighbor pools hand out, so callers can pool or instrument memory without
//! touching the graph/index code. Small scratch containers (heaps, visited
//! sets) go through the process allocator directly rather than this trait.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// A pluggable allocator for large, long-lived buffers.
///
/// # Safety
///
/// Implementors must behave like a standard allocator: `allocate` returns a
/// block of at least `layout.size()` bytes aligned to `layout.align()` (or
/// `None` on failure), `deallocate` must be called with the same `Layout`
/// used to allocate the pointer, and `reallocate` must preserve the
/// contents of the overlapping prefix.
pub unsafe trait Allocator: Send + Sync {
    /// Allocates a block matching `layout`, or `None` if allocation failed.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Frees a block previously returned by `allocate` or `reallocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for a block still
    /// matching `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Resizes a previously allocated block in place where possible,
    /// otherwise allocates a new block and copies the overlapping prefix.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for a block matching
    /// `old_layout`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Option<NonNull<u8>> {
        let new_ptr = self.allocate(new_layout)?;
        let copy_len = old_layout.size().min(new_layout.size());
        std::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), copy_len);
        self.deallocate(ptr, old_layout);
        Some(new_ptr)
    }

    /// A short name identifying this allocator, for stats/diagnostics.
    fn name(&self) -> &str;
}

/// The default allocator, backed by the process global allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

// SAFETY: delegates directly to `std::alloc`, which upholds the same
// contract this trait requires.
unsafe impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return NonNull::new(layout.align() as *mut u8);
        }
        // SAFETY: layout has nonzero size, checked above.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        // SAFETY: caller guarantees `ptr`/`layout` match a prior `allocate`.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }

    fn name(&self) -> &str {
        "system"
    }
}
