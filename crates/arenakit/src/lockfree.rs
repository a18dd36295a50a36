//! Lock-free thread-safe free list.
//!
//! Same external contract as [`crate::freelist::Freelist`], but `push` and
//! `pop` are safe under concurrent use from any number of threads. The
//! shared head is a single CAS-able word packing `{offset, tag}`:
//!
//! - `offset` identifies the block at the front of the chain, relative to
//!   the seeded range base. Offsets (not raw pointers) keep the packed word
//!   a fixed 64 bits and let debug builds bounds-check against the range.
//! - `tag` is a generation counter incremented on every successful CAS.
//!
//! The tag is what defeats ABA: a LIFO over a fixed-stride range reuses
//! offsets constantly, so a thread that read head = X and got preempted
//! could otherwise CAS against a head that is offset-equal but chains to
//! different blocks underneath. Bumping the tag on every mutation makes any
//! interleaved pop/push pair change the packed word even when the offset
//! coincides, so the stale CAS fails and the loop retries.
//!
//! CAS contention is handled by unbounded retry with no backoff: the list
//! is intended for light contention, or to be paired with the adaptive
//! backoff of [`crate::sync::Spinlock`] at a higher level.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::util::{align_up, is_aligned, WORD_SIZE};

/// Sentinel offset for the empty list. Offsets are multiples of the block
/// alignment (at least 4), so `u32::MAX` can never name a real block.
const NIL: u32 = u32::MAX;

#[inline(always)]
const fn pack(offset: u32, tag: u32) -> u64 {
    ((offset as u64) << 32) | tag as u64
}

#[inline(always)]
const fn offset_of(head: u64) -> u32 {
    (head >> 32) as u32
}

#[inline(always)]
const fn tag_of(head: u64) -> u32 {
    head as u32
}

/// A free list of equal-sized blocks supporting concurrent push/pop from
/// multiple threads without locks.
pub struct ThreadSafeFreelist {
    /// Packed `{offset, tag}` head.
    head: AtomicU64,
    /// Base of the seeded range; all offsets are relative to this.
    base: NonNull<u8>,
    /// Length of the seeded range in bytes.
    capacity: u32,
    stride: u32,
    alignment: usize,
    seeded: usize,
}

unsafe impl Send for ThreadSafeFreelist {}
unsafe impl Sync for ThreadSafeFreelist {}

impl ThreadSafeFreelist {
    /// Effective stride: at least one word (the embedded link), rounded up
    /// to the alignment.
    #[inline]
    pub fn stride_for(element_size: usize, alignment: usize) -> usize {
        align_up(element_size.max(WORD_SIZE), alignment)
    }

    /// Seed a list over `[begin, end)`, linking every stride-sized slot.
    ///
    /// # Safety
    /// `[begin, end)` must be a valid writable range no larger than
    /// `u32::MAX` bytes, exclusively borrowed by this list until the last
    /// block is handed back. `alignment` must be a power of two.
    pub unsafe fn new(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self {
        debug_assert!(alignment.is_power_of_two());
        let size = end.as_ptr() as usize - begin.as_ptr() as usize;
        debug_assert!(size < u32::MAX as usize);
        // Slots must hold an AtomicU32 link, so never align below 4.
        let alignment = alignment.max(core::mem::align_of::<AtomicU32>());
        let mut list = Self {
            head: AtomicU64::new(pack(NIL, 0)),
            base: begin,
            capacity: size as u32,
            stride: Self::stride_for(element_size, alignment) as u32,
            alignment,
            seeded: 0,
        };
        list.link_range(0);
        list
    }

    /// Block stride in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride as usize
    }

    /// Number of blocks the last seeding linked. Counted while walking the
    /// range, so an unaligned range start that costs a slot is reflected
    /// here.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.seeded
    }

    /// Push a block onto the front of the list. Always succeeds, never
    /// blocks.
    ///
    /// # Safety
    /// `block` must be a live block previously popped from this list and
    /// not already pushed back (double free is not detected).
    pub unsafe fn push(&self, block: NonNull<u8>) {
        debug_assert!(is_aligned(block.as_ptr() as usize, self.alignment));
        let offset = (block.as_ptr() as usize - self.base.as_ptr() as usize) as u32;
        debug_assert!(offset < self.capacity);
        let link = self.link_at(block.as_ptr());

        let mut head = self.head.load(Ordering::Acquire);
        loop {
            // Plain-ordered store: the Release CAS below publishes it.
            link.store(offset_of(head), Ordering::Relaxed);
            let next = pack(offset, tag_of(head).wrapping_add(1));
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::Release, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(observed) => head = observed,
            }
        }
    }

    /// Pop the front block. `None` means exhausted; this never blocks and
    /// never returns a block still reachable by another thread.
    pub fn pop(&self) -> Option<NonNull<u8>> {
        let mut head = self.head.load(Ordering::Acquire);
        loop {
            let offset = offset_of(head);
            if offset == NIL {
                return None;
            }
            let block = unsafe { self.base.as_ptr().add(offset as usize) };
            // This load may race with the block's new owner if another
            // thread pops it first; the CAS below then fails on the tag
            // and the stale value is discarded.
            let next_offset = unsafe { self.link_at(block) }.load(Ordering::Relaxed);
            let next = pack(next_offset, tag_of(head).wrapping_add(1));
            match self
                .head
                .compare_exchange_weak(head, next, Ordering::Acquire, Ordering::Acquire)
            {
                // The node at `offset` is now exclusively caller-owned.
                Ok(_) => return Some(unsafe { NonNull::new_unchecked(block) }),
                Err(observed) => head = observed,
            }
        }
    }

    /// Relink every slot of `[begin, end)` into a fresh chain under a new
    /// generation tag, discarding the current chain.
    ///
    /// Not safe to call concurrently with push/pop: the `&mut self` receiver
    /// enforces the single-writer precondition.
    ///
    /// # Safety
    /// Same range contract as [`ThreadSafeFreelist::new`]; all blocks popped
    /// from this list must be dead.
    pub unsafe fn reset(&mut self, begin: NonNull<u8>, end: NonNull<u8>) {
        let size = end.as_ptr() as usize - begin.as_ptr() as usize;
        debug_assert!(size < u32::MAX as usize);
        self.base = begin;
        self.capacity = size as u32;
        let tag = tag_of(self.head.load(Ordering::Relaxed)).wrapping_add(1);
        self.link_range(tag);
    }

    /// Current `{offset, tag}` head state, for tests instrumenting the
    /// generation sequence.
    #[cfg(test)]
    fn head_state(&self) -> (u32, u32) {
        let head = self.head.load(Ordering::Acquire);
        (offset_of(head), tag_of(head))
    }

    /// The embedded next link of a free block: a plain u32 offset, not a
    /// tagged word.
    ///
    /// # Safety
    /// `block` must point into the seeded range at a slot boundary.
    #[inline(always)]
    unsafe fn link_at(&self, block: *mut u8) -> &AtomicU32 {
        &*(block as *const AtomicU32)
    }

    /// Seed the chain: link slot k to slot k+1, last slot to NIL.
    fn link_range(&mut self, tag: u32) {
        let base = self.base.as_ptr() as usize;
        let first = align_up(base, self.alignment);
        let end = base + self.capacity as usize;
        let stride = self.stride as usize;

        let mut head_offset = NIL;
        let mut current = first;
        let mut prev: Option<*mut u8> = None;
        self.seeded = 0;
        while current + stride <= end {
            let offset = (current - base) as u32;
            if let Some(p) = prev {
                unsafe { self.link_at(p) }.store(offset, Ordering::Relaxed);
            } else {
                head_offset = offset;
            }
            prev = Some(current as *mut u8);
            self.seeded += 1;
            current += stride;
        }
        if let Some(p) = prev {
            unsafe { self.link_at(p) }.store(NIL, Ordering::Relaxed);
        }
        self.head.store(pack(head_offset, tag), Ordering::Release);
    }
}
