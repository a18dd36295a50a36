//! Composable allocator: arena + primary strategy + heap fallback + lock
//! policy.
//!
//! Allocation always tries the primary allocator first and falls back to
//! the aligned heap allocator on exhaustion, so requests never fail while
//! the system allocator has memory. Frees are routed back by ownership
//! check. Every operation runs under the locking policy; the default
//! [`NoopLock`] does no locking, so the composed allocator is only
//! thread-safe when a real policy such as [`Spinlock`] is chosen.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use crate::arena::{Arena, HeapArena, ARENA_ALIGN};
use crate::error::ArenaError;
use crate::freelist::Freelist;
use crate::heap::AlignedHeapAllocator;
use crate::linear::LinearAllocator;
use crate::pool::{FreeStore, PoolAllocator};
use crate::sync::{LockPolicy, NoopLock, Spinlock};
use crate::util::WORD_SIZE;

/// The allocator surface every arena-backed strategy implements.
pub trait BlockAllocator {
    /// Allocate `size` bytes at `align`. `None` means exhausted.
    fn allocate(&mut self, size: usize, align: usize) -> Option<NonNull<u8>>;

    /// Return a block to free storage.
    ///
    /// # Safety
    /// `ptr` must be a live block obtained from this allocator.
    unsafe fn deallocate(&mut self, ptr: NonNull<u8>);

    /// Whether `ptr` falls inside this allocator's range.
    fn owns(&self, ptr: NonNull<u8>) -> bool;

    /// Invalidate all prior allocations.
    ///
    /// # Safety
    /// No blocks from this allocator may still be in use.
    unsafe fn reset(&mut self);
}

/// Marker for lock policies that actually provide mutual exclusion.
///
/// # Safety
/// Implementors must guarantee that between `lock()` and `unlock()` no
/// other thread can be inside the same critical section.
pub unsafe trait ThreadSafePolicy: LockPolicy {}

unsafe impl ThreadSafePolicy for Spinlock {}

/// An allocator composed of an arena, a primary strategy over the arena's
/// range, an [`AlignedHeapAllocator`] fallback, and a locking policy.
///
/// The arena is boxed so the composed allocator can move without
/// invalidating the raw range the primary strategy holds.
pub struct Allocator<A: Arena, P: BlockAllocator, L: LockPolicy = NoopLock> {
    primary: UnsafeCell<P>,
    fallback: AlignedHeapAllocator,
    lock: L,
    // Declared last: drop order is allocator before arena.
    arena: Box<A>,
}

unsafe impl<A: Arena + Send, P: BlockAllocator + Send, L: LockPolicy + Send> Send
    for Allocator<A, P, L>
{
}
unsafe impl<A: Arena + Sync, P: BlockAllocator + Send, L: ThreadSafePolicy + Sync> Sync
    for Allocator<A, P, L>
{
}

impl<A: Arena, P: BlockAllocator, L: LockPolicy> Allocator<A, P, L> {
    /// Compose an allocator: the arena is pinned on the heap, then
    /// `build` constructs the primary strategy over its raw range. The
    /// range passed to `build` stays valid and stable for this
    /// allocator's whole lifetime.
    pub fn new(arena: A, build: impl FnOnce(NonNull<u8>, NonNull<u8>) -> P) -> Self {
        let arena = Box::new(arena);
        let primary = build(arena.begin(), arena.end());
        Self {
            primary: UnsafeCell::new(primary),
            fallback: AlignedHeapAllocator::new(),
            lock: L::default(),
            arena,
        }
    }

    /// Size of the underlying arena.
    pub fn arena_size(&self) -> usize {
        self.arena.size()
    }

    /// Allocate `size` bytes at `align`, trying the primary allocator
    /// first and the heap fallback on exhaustion.
    pub fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        self.lock.lock();
        let ptr = unsafe { &mut *self.primary.get() }.allocate(size, align);
        let result = ptr.or_else(|| {
            tracing::trace!(size, align, "primary exhausted, falling back to heap");
            self.fallback.allocate(size, align)
        });
        self.lock.unlock();
        result
    }

    /// Free a block, routing it to whichever allocator owns it.
    ///
    /// # Safety
    /// `ptr` must be a live block obtained from [`Allocator::alloc`] (or
    /// [`Allocator::create`]) on this allocator.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        self.lock.lock();
        let primary = &mut *self.primary.get();
        if primary.owns(ptr) {
            primary.deallocate(ptr);
        } else {
            self.fallback.deallocate(ptr);
        }
        self.lock.unlock();
    }

    /// Reset the primary allocator, invalidating every block it issued.
    /// Fallback allocations stay live; they are individually owned.
    ///
    /// # Safety
    /// No primary-issued blocks may still be in use.
    pub unsafe fn reset(&self) {
        self.lock.lock();
        (*self.primary.get()).reset();
        self.lock.unlock();
    }

    /// Allocate storage for a `T` and move `value` into it. Use
    /// [`Allocator::recycle`] (not `free`) to dispose of it.
    pub fn create<T>(&self, value: T) -> Option<NonNull<T>> {
        let ptr = self
            .alloc(core::mem::size_of::<T>(), core::mem::align_of::<T>().max(WORD_SIZE))?
            .cast::<T>();
        unsafe { ptr.as_ptr().write(value) };
        Some(ptr)
    }

    /// Drop the object in place and hand its storage back.
    ///
    /// # Safety
    /// `ptr` must have come from [`Allocator::create`] on this allocator
    /// and not have been recycled already.
    pub unsafe fn recycle<T>(&self, ptr: NonNull<T>) {
        core::ptr::drop_in_place(ptr.as_ptr());
        self.free(ptr.cast());
    }
}

/// A pool of equal-sized objects over a heap arena, not thread-safe.
pub type ObjectPool<L = NoopLock> = Allocator<HeapArena, PoolAllocator<Freelist>, L>;

/// A bump allocator over a heap arena, shareable across threads through
/// its spinlock policy.
pub type LockedBumpAllocator = Allocator<HeapArena, LinearAllocator, Spinlock>;

impl<F: FreeStore, L: LockPolicy> Allocator<HeapArena, PoolAllocator<F>, L> {
    /// A pool sized for `capacity` values of type `T`, backed by a fresh
    /// heap arena.
    pub fn pool_for_type<T>(capacity: usize) -> Result<Self, ArenaError> {
        let element_size = core::mem::size_of::<T>();
        let alignment = core::mem::align_of::<T>().max(WORD_SIZE);
        let stride = Freelist::stride_for(element_size, alignment);
        // Slack so an over-aligned first slot cannot cost a block.
        let size = capacity * stride + alignment.saturating_sub(ARENA_ALIGN);
        let arena = HeapArena::new(size)?;
        Ok(Self::new(arena, |begin, end| unsafe {
            PoolAllocator::new(begin, end, element_size, alignment)
        }))
    }
}

impl<L: LockPolicy> Allocator<HeapArena, LinearAllocator, L> {
    /// A bump allocator over a fresh heap arena of `size` bytes.
    pub fn bump(size: usize) -> Result<Self, ArenaError> {
        let arena = HeapArena::new(size)?;
        Ok(Self::new(arena, |begin, end| unsafe {
            LinearAllocator::new(begin, end)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn falls_back_to_heap_on_exhaustion() {
        let pool = ObjectPool::<NoopLock>::pool_for_type::<u64>(2).unwrap();

        let a = pool.alloc(8, 8).unwrap();
        let b = pool.alloc(8, 8).unwrap();
        // Pool is exhausted; the third request is served by the heap.
        let c = pool.alloc(8, 8).unwrap();

        let in_arena = |p: NonNull<u8>| {
            let primary = unsafe { &*pool.primary.get() };
            primary.owns(p)
        };
        assert!(in_arena(a));
        assert!(in_arena(b));
        assert!(!in_arena(c));

        unsafe {
            pool.free(c);
            pool.free(b);
            pool.free(a);
        }
        // Freeing returned the pool blocks; the next request hits the
        // arena again.
        assert!(in_arena(pool.alloc(8, 8).unwrap()));
    }

    #[test]
    fn over_aligned_request_goes_to_the_heap() {
        // Pool blocks are 8-aligned; asking for 64 must not hand out a
        // pool block at a weaker alignment. The heap fallback serves it.
        let pool = ObjectPool::<NoopLock>::pool_for_type::<u64>(4).unwrap();

        let p = pool.alloc(8, 64).unwrap();
        assert_eq!(p.as_ptr() as usize % 64, 0);
        let primary = unsafe { &*pool.primary.get() };
        assert!(!primary.owns(p));

        unsafe { pool.free(p) };
    }

    #[test]
    fn bump_resets() {
        let bump = LockedBumpAllocator::bump(256).unwrap();
        let first = bump.alloc(64, 16).unwrap();
        bump.alloc(64, 16).unwrap();
        unsafe { bump.reset() };
        assert_eq!(bump.alloc(64, 16).unwrap(), first);
    }

    #[test]
    fn create_and_recycle_run_drop() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Tracked(#[allow(dead_code)] u64);
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let pool = ObjectPool::<NoopLock>::pool_for_type::<Tracked>(4).unwrap();
        let obj = pool.create(Tracked(7)).unwrap();
        assert_eq!(unsafe { obj.as_ref() }.0, 7);
        unsafe { pool.recycle(obj) };
        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn arena_size_matches_request() {
        let bump = LockedBumpAllocator::bump(512).unwrap();
        assert_eq!(bump.arena_size(), 512);
    }
}
