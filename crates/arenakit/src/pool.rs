//! Pool allocator: equal-sized blocks from an arena, backed by a free list.
//!
//! The pool is generic over the free-list backend through [`FreeStore`]:
//! [`Freelist`] for single-threaded pools, [`ThreadSafeFreelist`] for pools
//! shared across threads without locks. Construction walks the arena range
//! once, seeding the backend with every aligned, stride-sized slot.

use core::ptr::NonNull;

use crate::allocator::BlockAllocator;
use crate::arena::Arena;
use crate::freelist::Freelist;
use crate::lockfree::ThreadSafeFreelist;
use crate::util::WORD_SIZE;

/// Free-list backend contract for [`PoolAllocator`].
///
/// Implementations hand out and take back equal-sized blocks from a seeded
/// range. All methods funnel through `&mut self`; the thread-safe backend
/// additionally exposes `&self` operations on its own type for concurrent
/// callers.
pub trait FreeStore {
    /// Seed a store over `[begin, end)`.
    ///
    /// # Safety
    /// `[begin, end)` must be a valid writable range, exclusively borrowed
    /// by the store. `alignment` must be a power of two.
    unsafe fn seed(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self;

    /// Pop a block, or `None` if exhausted.
    fn pop_block(&mut self) -> Option<NonNull<u8>>;

    /// Push a block back.
    ///
    /// # Safety
    /// `block` must be a live block popped from this store.
    unsafe fn push_block(&mut self, block: NonNull<u8>);

    /// Relink the whole range into a fresh chain.
    ///
    /// # Safety
    /// All popped blocks must be dead.
    unsafe fn reset_store(&mut self, begin: NonNull<u8>, end: NonNull<u8>);

    /// Block stride in bytes.
    fn stride(&self) -> usize;

    /// Number of blocks the last seeding linked.
    fn block_count(&self) -> usize;
}

impl FreeStore for Freelist {
    unsafe fn seed(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self {
        Freelist::new(begin, end, element_size, alignment)
    }

    #[inline]
    fn pop_block(&mut self) -> Option<NonNull<u8>> {
        self.pop()
    }

    #[inline]
    unsafe fn push_block(&mut self, block: NonNull<u8>) {
        self.push(block);
    }

    unsafe fn reset_store(&mut self, _begin: NonNull<u8>, _end: NonNull<u8>) {
        self.reset();
    }

    #[inline]
    fn stride(&self) -> usize {
        Freelist::stride(self)
    }

    #[inline]
    fn block_count(&self) -> usize {
        Freelist::block_count(self)
    }
}

impl FreeStore for ThreadSafeFreelist {
    unsafe fn seed(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self {
        ThreadSafeFreelist::new(begin, end, element_size, alignment)
    }

    #[inline]
    fn pop_block(&mut self) -> Option<NonNull<u8>> {
        self.pop()
    }

    #[inline]
    unsafe fn push_block(&mut self, block: NonNull<u8>) {
        self.push(block);
    }

    unsafe fn reset_store(&mut self, begin: NonNull<u8>, end: NonNull<u8>) {
        self.reset(begin, end);
    }

    #[inline]
    fn stride(&self) -> usize {
        ThreadSafeFreelist::stride(self)
    }

    #[inline]
    fn block_count(&self) -> usize {
        ThreadSafeFreelist::block_count(self)
    }
}

/// An allocator handing out equal-sized blocks carved from an arena range.
pub struct PoolAllocator<F: FreeStore = Freelist> {
    store: F,
    begin: NonNull<u8>,
    end: NonNull<u8>,
    /// Alignment the pool was seeded with; blocks guarantee no more.
    alignment: usize,
}

unsafe impl<F: FreeStore + Send> Send for PoolAllocator<F> {}
unsafe impl<F: FreeStore + Sync> Sync for PoolAllocator<F> {}

impl<F: FreeStore> PoolAllocator<F> {
    /// Build a pool over a raw range, seeding every stride-sized slot.
    ///
    /// # Safety
    /// `[begin, end)` must be a valid writable range that outlives the
    /// pool and is used by no other allocator. `alignment` must be a power
    /// of two.
    pub unsafe fn new(
        begin: NonNull<u8>,
        end: NonNull<u8>,
        element_size: usize,
        alignment: usize,
    ) -> Self {
        let store = F::seed(begin, end, element_size, alignment);
        tracing::trace!(
            element_size,
            alignment,
            slots = store.block_count(),
            "pool seeded"
        );
        Self {
            store,
            begin,
            end,
            alignment,
        }
    }

    /// Build a pool over an arena's full range.
    ///
    /// # Safety
    /// The arena must outlive the pool and its range must not be used by
    /// any other allocator.
    pub unsafe fn from_arena<A: Arena>(arena: &A, element_size: usize, alignment: usize) -> Self {
        Self::new(arena.begin(), arena.end(), element_size, alignment)
    }

    /// Build a pool sized for values of type `T`. The alignment is at
    /// least one word so blocks can hold the embedded free-list link.
    ///
    /// # Safety
    /// Same contract as [`PoolAllocator::from_arena`].
    pub unsafe fn for_type<T, A: Arena>(arena: &A) -> Self {
        Self::from_arena(
            arena,
            core::mem::size_of::<T>(),
            core::mem::align_of::<T>().max(WORD_SIZE),
        )
    }

    /// Pop one block. `None` means the pool is exhausted.
    #[inline]
    pub fn allocate(&mut self) -> Option<NonNull<u8>> {
        self.store.pop_block()
    }

    /// Return a block to the pool.
    ///
    /// # Safety
    /// `block` must have been obtained from this pool and not freed since
    /// (double free is undefined behavior, not detected).
    #[inline]
    pub unsafe fn deallocate(&mut self, block: NonNull<u8>) {
        debug_assert!(self.owns(block), "deallocate of a foreign block");
        self.store.push_block(block);
    }

    /// Whether `ptr` falls inside the pool's seeded range.
    #[inline]
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        addr >= self.begin.as_ptr() as usize && addr < self.end.as_ptr() as usize
    }

    /// Reseed the whole range, invalidating every outstanding block.
    ///
    /// # Safety
    /// No blocks from this pool may be live, and no other thread may be
    /// using the pool.
    pub unsafe fn reset(&mut self) {
        self.store.reset_store(self.begin, self.end);
    }

    /// Number of blocks the pool was seeded with. A range whose start had
    /// to be aligned up holds fewer blocks than its size divided by the
    /// stride, and this reports the seeded count, not the quotient.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.block_count()
    }
}

/// `&self` operations for pools backed by the lock-free list, usable
/// concurrently from any number of threads.
impl PoolAllocator<ThreadSafeFreelist> {
    /// Pop one block without exclusive access. `None` means exhausted.
    #[inline]
    pub fn allocate_shared(&self) -> Option<NonNull<u8>> {
        self.store.pop()
    }

    /// Return a block without exclusive access.
    ///
    /// # Safety
    /// Same contract as [`PoolAllocator::deallocate`].
    #[inline]
    pub unsafe fn deallocate_shared(&self, block: NonNull<u8>) {
        debug_assert!(self.owns(block), "deallocate of a foreign block");
        self.store.push(block);
    }
}

impl<F: FreeStore> BlockAllocator for PoolAllocator<F> {
    /// Pool blocks have a fixed stride and alignment; requests beyond
    /// either are exhaustion, not an error. The alignment check is against
    /// the seeding alignment, not the stride: a stride-sized slot is only
    /// guaranteed to sit on a seeding-alignment boundary.
    #[inline]
    fn allocate(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if size > self.store.stride() || align > self.alignment {
            return None;
        }
        PoolAllocator::allocate(self)
    }

    #[inline]
    unsafe fn deallocate(&mut self, ptr: NonNull<u8>) {
        PoolAllocator::deallocate(self, ptr);
    }

    #[inline]
    fn owns(&self, ptr: NonNull<u8>) -> bool {
        PoolAllocator::owns(self, ptr)
    }

    #[inline]
    unsafe fn reset(&mut self) {
        PoolAllocator::reset(self);
    }
}
