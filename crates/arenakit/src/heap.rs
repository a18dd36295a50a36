//! Aligned heap allocator.
//!
//! Stateless: every request goes straight to the system's aligned
//! allocation primitives. The slowest strategy in the crate, used when no
//! arena is available, as a bootstrap allocator for constructing arenas,
//! and as the fallback of [`crate::allocator::Allocator`].

use core::ptr::NonNull;

use crate::platform;

/// An allocator mapping directly onto the system's aligned allocate/free.
#[derive(Default)]
pub struct AlignedHeapAllocator;

impl AlignedHeapAllocator {
    pub const fn new() -> Self {
        Self
    }

    /// Allocate `size` bytes aligned to `align`. `None` on failure.
    #[inline]
    pub fn allocate(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        platform::alloc_aligned(size, align)
    }

    /// Free a block obtained from this allocator.
    ///
    /// # Safety
    /// `ptr` must have come from [`AlignedHeapAllocator::allocate`] and not
    /// have been freed already.
    #[inline]
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        platform::free_aligned(ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_with_requested_alignment() {
        let heap = AlignedHeapAllocator::new();
        for shift in 3..12 {
            let align = 1usize << shift;
            let p = heap.allocate(64, align).unwrap();
            assert_eq!(p.as_ptr() as usize % align, 0);
            unsafe { heap.deallocate(p) };
        }
    }

    #[test]
    fn blocks_are_writable() {
        let heap = AlignedHeapAllocator::new();
        let p = heap.allocate(128, 16).unwrap();
        unsafe {
            core::ptr::write_bytes(p.as_ptr(), 0x5A, 128);
            assert_eq!(*p.as_ptr().add(127), 0x5A);
            heap.deallocate(p);
        }
    }
}
