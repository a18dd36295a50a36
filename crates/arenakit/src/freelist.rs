//! Intrusive singly-linked free list over equal-sized blocks.
//!
//! Each free block stores a forward link in its first word, so the list
//! needs no storage of its own. Only free blocks are linked: once a block
//! is popped, its storage belongs to the caller until it is pushed back.
//!
//! Not safe for concurrent use. Share it behind a [`crate::sync::Spinlock`]
//! or use [`crate::lockfree::ThreadSafeFreelist`] instead.

use core::ptr::{self, NonNull};

use crate::util::{align_ptr_up, align_up, is_aligned, WORD_SIZE};

/// Link stored in the first word of every free block.
struct FreeNode {
    next: *mut FreeNode,
}

/// A single-threaded free list of equal-sized blocks carved from a
/// caller-supplied memory range.
pub struct Freelist {
    head: *mut FreeNode,
    begin: NonNull<u8>,
    end: NonNull<u8>,
    stride: usize,
    alignment: usize,
    seeded: usize,
    resettable: bool,
}

impl Freelist {
    /// Effective stride for blocks of `element_size` at `alignment`: at
    /// least one word (for the embedded link), rounded up to the alignment.
    #[inline]
    pub fn stride_for(element_size: usize, alignment: usize) -> usize {
        align_up(element_size.max(WORD_SIZE), alignment)
    }

    /// Seed a list over the full range `[begin, end)`, linking every
    /// stride-sized slot. The list is resettable: [`Freelist::reset`] can
    /// relink the whole range later.
    ///
    /// # Safety
    /// `[begin, end)` must be a valid writable range with `end >= begin`,
    /// exclusively borrowed by this list until the last block is handed
    /// back. `alignment` must be a power of two.
    pub unsafe fn new(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self {
        let mut list = Self::over(begin, end, element_size, alignment);
        list.resettable = true;
        list
    }

    /// Seed a list over a custom sub-range of a larger region. The list is
    /// not resettable, since it may not represent the full region after
    /// partial linking.
    ///
    /// # Safety
    /// Same contract as [`Freelist::new`].
    pub unsafe fn over(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self {
        debug_assert!(alignment.is_power_of_two());
        debug_assert!(end.as_ptr() as usize >= begin.as_ptr() as usize);
        let mut list = Self {
            head: ptr::null_mut(),
            begin,
            end,
            stride: Self::stride_for(element_size, alignment),
            alignment,
            seeded: 0,
            resettable: false,
        };
        list.link_range();
        list
    }

    /// Whether [`Freelist::reset`] may be called on this list.
    #[inline]
    pub fn is_resettable(&self) -> bool {
        self.resettable
    }

    /// Block stride in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of blocks the last seeding linked. Counted while walking the
    /// range, so an unaligned range start that costs a slot is reflected
    /// here.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.seeded
    }

    /// Pop the front block, or `None` if the list is exhausted.
    #[inline]
    pub fn pop(&mut self) -> Option<NonNull<u8>> {
        let node = NonNull::new(self.head)?;
        self.head = unsafe { node.as_ref().next };
        Some(node.cast())
    }

    /// Push a block back onto the front of the list.
    ///
    /// # Safety
    /// `block` must be a live block previously popped from this list and
    /// not already pushed back (double free is not detected).
    #[inline]
    pub unsafe fn push(&mut self, block: NonNull<u8>) {
        debug_assert!(is_aligned(block.as_ptr() as usize, self.alignment));
        let node = block.cast::<FreeNode>();
        (*node.as_ptr()).next = self.head;
        self.head = node.as_ptr();
    }

    /// Relink every slot of the original range, discarding the current
    /// chain. Usage error on a non-resettable list: debug builds assert,
    /// release builds do nothing.
    ///
    /// # Safety
    /// All blocks popped from this list must be dead; relinking reclaims
    /// their storage.
    pub unsafe fn reset(&mut self) {
        debug_assert!(self.resettable, "reset on a non-resettable free list");
        if self.resettable {
            self.link_range();
        }
    }

    /// Walk the range and link every stride-sized slot into a fresh chain.
    fn link_range(&mut self) {
        let end = self.end.as_ptr() as usize;
        let mut current = align_ptr_up(self.begin, self.alignment).as_ptr();
        self.head = ptr::null_mut();
        self.seeded = 0;

        // Build the chain front-to-back so pop order matches range order.
        let mut tail: *mut FreeNode = ptr::null_mut();
        while (current as usize) + self.stride <= end {
            let node = current.cast::<FreeNode>();
            unsafe { (*node).next = ptr::null_mut() };
            if tail.is_null() {
                self.head = node;
            } else {
                unsafe { (*tail).next = node };
            }
            tail = node;
            self.seeded += 1;
            current = unsafe { current.add(self.stride) };
        }
    }
}
