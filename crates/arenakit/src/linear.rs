//! Linear (bump) allocator.
//!
//! Serves variable-sized blocks by advancing a single cursor through an
//! arena range. Individual blocks cannot be freed; the only reclamation is
//! [`LinearAllocator::reset`], which invalidates every prior allocation.
//! Not safe for concurrent use: share it behind a
//! [`crate::sync::SpinMutex`] or compose it with a
//! [`crate::sync::Spinlock`] policy in [`crate::allocator::Allocator`].

use core::ptr::NonNull;

use crate::allocator::BlockAllocator;
use crate::arena::Arena;
use crate::util::align_up;

/// A bump allocator over `[begin, begin + size)`. The cursor is an offset
/// into the range, not a raw pointer, so the state stays compact and the
/// bounds check is a plain integer compare.
pub struct LinearAllocator {
    begin: NonNull<u8>,
    size: u32,
    current: u32,
}

unsafe impl Send for LinearAllocator {}

impl LinearAllocator {
    /// Build over a raw range.
    ///
    /// # Safety
    /// `[begin, end)` must be a valid writable range no larger than
    /// `u32::MAX` bytes that outlives the allocator, with `end >= begin`.
    pub unsafe fn new(begin: NonNull<u8>, end: NonNull<u8>) -> Self {
        let size = end.as_ptr() as usize - begin.as_ptr() as usize;
        debug_assert!(size <= u32::MAX as usize);
        Self {
            begin,
            size: size as u32,
            current: 0,
        }
    }

    /// Build over an arena's full range.
    ///
    /// # Safety
    /// The arena must outlive the allocator and its range must not be used
    /// by any other allocator.
    pub unsafe fn from_arena<A: Arena>(arena: &A) -> Self {
        Self::new(arena.begin(), arena.end())
    }

    /// Allocate `size` bytes at `align` alignment. `None` means the
    /// advance would pass the end of the range (exhausted).
    #[inline]
    pub fn allocate(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        debug_assert!(align.is_power_of_two());
        let base = self.begin.as_ptr() as usize;
        let aligned = align_up(base + self.current as usize, align);
        let next = aligned.checked_add(size)?;
        if next > base + self.size as usize {
            return None;
        }
        self.current = (next - base) as u32;
        // aligned is within a live non-null range
        Some(unsafe { NonNull::new_unchecked(aligned as *mut u8) })
    }

    /// Whether `ptr` falls inside this allocator's range.
    #[inline]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        let base = self.begin.as_ptr() as usize;
        addr >= base && addr < base + self.size as usize
    }

    /// Rewind the cursor to the beginning of the range. Invalidates every
    /// prior allocation: subsequent allocations overwrite them.
    #[inline]
    pub fn reset(&mut self) {
        self.current = 0;
    }

    /// Bytes consumed so far, including alignment padding.
    #[inline]
    pub fn used(&self) -> usize {
        self.current as usize
    }

    /// Bytes left before exhaustion, ignoring alignment of future requests.
    #[inline]
    pub fn remaining(&self) -> usize {
        (self.size - self.current) as usize
    }
}

impl BlockAllocator for LinearAllocator {
    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        LinearAllocator::allocate(self, size, align)
    }

    /// Individual frees are not supported; only [`LinearAllocator::reset`]
    /// reclaims memory.
    #[inline]
    unsafe fn deallocate(&mut self, _ptr: NonNull<u8>) {}

    #[inline]
    fn owns(&self, ptr: NonNull<u8>) -> bool {
        LinearAllocator::owns(self, ptr)
    }

    #[inline]
    unsafe fn reset(&mut self) {
        LinearAllocator::reset(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, StackArena};
    use proptest::prelude::*;

    #[test]
    fn bumps_through_the_range() {
        let arena = StackArena::<64>::new();
        let mut bump = unsafe { LinearAllocator::from_arena(&arena) };
        let a = bump.allocate(16, 8).unwrap();
        let b = bump.allocate(16, 8).unwrap();
        assert_eq!(a, arena.begin());
        assert_eq!(b.as_ptr() as usize, a.as_ptr() as usize + 16);
        assert_eq!(bump.used(), 32);
    }

    #[test]
    fn respects_alignment() {
        let arena = StackArena::<128>::new();
        let mut bump = unsafe { LinearAllocator::from_arena(&arena) };
        bump.allocate(1, 1).unwrap();
        let p = bump.allocate(8, 64).unwrap();
        assert_eq!(p.as_ptr() as usize % 64, 0);
    }

    #[test]
    fn exhaustion_is_none_and_cursor_is_untouched() {
        let arena = StackArena::<32>::new();
        let mut bump = unsafe { LinearAllocator::from_arena(&arena) };
        bump.allocate(24, 8).unwrap();
        let used = bump.used();
        assert!(bump.allocate(16, 8).is_none());
        assert_eq!(bump.used(), used);
        // A smaller request still fits.
        assert!(bump.allocate(8, 8).is_some());
    }

    #[test]
    fn owns_only_in_range() {
        let arena = StackArena::<32>::new();
        let bump = unsafe { LinearAllocator::from_arena(&arena) };
        assert!(bump.owns(arena.begin()));
        let outside = unsafe { NonNull::new_unchecked(arena.end().as_ptr()) };
        assert!(!bump.owns(outside));
    }

    proptest! {
        // Replay property: after reset, the same request sequence yields
        // the identical addresses and outcomes.
        #[test]
        fn reset_replays_identically(
            requests in proptest::collection::vec((1usize..64, 0u32..5), 1..20)
        ) {
            let arena = StackArena::<512>::new();
            let mut bump = unsafe { LinearAllocator::from_arena(&arena) };

            let first: Vec<_> = requests
                .iter()
                .map(|&(size, shift)| bump.allocate(size, 1 << shift))
                .collect();
            bump.reset();
            let second: Vec<_> = requests
                .iter()
                .map(|&(size, shift)| bump.allocate(size, 1 << shift))
                .collect();

            prop_assert_eq!(first, second);
        }
    }
}
