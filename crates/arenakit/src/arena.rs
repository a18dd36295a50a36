//! Memory arenas: providers of a contiguous byte range for allocators.
//!
//! Two variants share one contract:
//! - [`StackArena`]: an embedded buffer with a compile-time size, no heap use
//! - [`HeapArena`]: reserves its range from the system allocator at
//!   construction and releases it exactly once on drop
//!
//! Arenas are move-only (no `Clone`): copying a live range would alias
//! ownership of the memory behind it.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use crate::error::ArenaError;
use crate::platform;

/// Alignment of a heap arena's range. Matches max_align_t on 64-bit.
pub const ARENA_ALIGN: usize = 16;

/// Default size for [`DefaultStackArena`].
pub const DEFAULT_STACK_ARENA_SIZE: usize = 1024;

/// A provider of a contiguous memory range `[begin, end)`.
///
/// Invariant: `end >= begin` and `size() == end - begin`, immutable after
/// construction. The arena must outlive any allocator constructed over it.
pub trait Arena {
    /// Start of the range.
    fn begin(&self) -> NonNull<u8>;

    /// One past the last byte of the range.
    fn end(&self) -> NonNull<u8>;

    /// Size of the range in bytes.
    #[inline]
    fn size(&self) -> usize {
        self.end().as_ptr() as usize - self.begin().as_ptr() as usize
    }
}

/// An arena backed by an embedded buffer of `N` bytes.
///
/// The range's lifetime is tied to the enclosing object; nothing is
/// released on drop. The compile-time capacity is exposed as
/// [`StackArena::CAPACITY`] so callers can size storage without
/// indirection.
#[repr(align(16))]
pub struct StackArena<const N: usize> {
    buffer: UnsafeCell<[u8; N]>,
}

impl<const N: usize> StackArena<N> {
    /// Compile-time size of the arena.
    pub const CAPACITY: usize = N;

    pub const fn new() -> Self {
        Self {
            buffer: UnsafeCell::new([0; N]),
        }
    }
}

impl<const N: usize> Default for StackArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Arena for StackArena<N> {
    #[inline]
    fn begin(&self) -> NonNull<u8> {
        // UnsafeCell::get never returns null for a live object
        unsafe { NonNull::new_unchecked(self.buffer.get().cast()) }
    }

    #[inline]
    fn end(&self) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.buffer.get().cast::<u8>().add(N)) }
    }

    #[inline]
    fn size(&self) -> usize {
        N
    }
}

/// A stack arena with the default capacity.
pub type DefaultStackArena = StackArena<DEFAULT_STACK_ARENA_SIZE>;

/// An arena that exclusively owns a range reserved from the system
/// allocator. The range is released exactly once, on drop.
pub struct HeapArena {
    begin: NonNull<u8>,
    size: usize,
}

// The arena only hands out the range; allocators built over it carry
// their own synchronization contracts.
unsafe impl Send for HeapArena {}
unsafe impl Sync for HeapArena {}

impl HeapArena {
    /// Reserve `size` bytes from the system allocator.
    ///
    /// Reservation failure is a hard constructor error: there is no
    /// partial-arena state worth returning.
    pub fn new(size: usize) -> Result<Self, ArenaError> {
        if size == 0 {
            return Err(ArenaError::ZeroSize);
        }
        let begin = platform::alloc_aligned(size, ARENA_ALIGN)
            .ok_or(ArenaError::ReserveFailed { size })?;
        tracing::trace!(size, addr = begin.as_ptr() as usize, "heap arena reserved");
        Ok(Self { begin, size })
    }
}

impl Arena for HeapArena {
    #[inline]
    fn begin(&self) -> NonNull<u8> {
        self.begin
    }

    #[inline]
    fn end(&self) -> NonNull<u8> {
        unsafe { NonNull::new_unchecked(self.begin.as_ptr().add(self.size)) }
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
    }
}

impl Drop for HeapArena {
    fn drop(&mut self) {
        tracing::trace!(
            size = self.size,
            addr = self.begin.as_ptr() as usize,
            "heap arena released"
        );
        unsafe { platform::free_aligned(self.begin) };
    }
}
