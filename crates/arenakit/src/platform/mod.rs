//! Aligned system allocation, per-OS.
//!
//! Heap-backed arenas and the aligned heap allocator obtain their memory
//! here rather than through the global Rust allocator, so a block can be
//! freed knowing only its pointer (no `Layout` round-trip).

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as sys;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as sys;

use core::ptr::NonNull;

/// Allocate `size` bytes aligned to `align`. Returns `None` on failure.
///
/// `align` must be a power of two and at least one machine word.
#[inline]
pub fn alloc_aligned(size: usize, align: usize) -> Option<NonNull<u8>> {
    debug_assert!(align.is_power_of_two());
    unsafe { sys::alloc_aligned(size, align) }
}

/// Free memory previously returned by [`alloc_aligned`].
///
/// # Safety
/// `ptr` must have been returned by `alloc_aligned` and not freed already.
#[inline]
pub unsafe fn free_aligned(ptr: NonNull<u8>) {
    sys::free_aligned(ptr);
}
