//! Composable arena-backed allocation primitives.
//!
//! The crate provides fixed or dynamically-sized blocks from pre-reserved
//! backing regions without a trip through the global allocator on every
//! request:
//!
//! - [`arena`]: [`StackArena`](arena::StackArena) (embedded buffer) and
//!   [`HeapArena`](arena::HeapArena) (system reservation, released on drop)
//! - [`linear`]: bump allocation with O(1) reset
//! - [`pool`]: equal-sized blocks over a free list, single-threaded or
//!   lock-free
//! - [`lockfree`]: the thread-safe free list, ABA-safe via a tagged head
//! - [`sync`]: spinlock with spin-then-sleep backoff, for sharing the
//!   non-lock-free strategies
//! - [`heap`]: direct aligned system allocation, the bootstrap/fallback
//!   strategy
//! - [`allocator`]: composition of arena + strategy + fallback + lock
//!   policy
//!
//! Exhaustion is always an empty result (`None`), never a panic; only
//! heap-arena reservation can fail hard, at construction.

pub mod allocator;
pub mod arena;
pub mod error;
pub mod freelist;
pub mod heap;
pub mod linear;
pub mod lockfree;
pub mod platform;
pub mod pool;
pub mod sync;
pub mod util;

pub use allocator::{Allocator, BlockAllocator, LockedBumpAllocator, ObjectPool};
pub use arena::{Arena, DefaultStackArena, HeapArena, StackArena};
pub use error::ArenaError;
pub use freelist::Freelist;
pub use heap::AlignedHeapAllocator;
pub use linear::LinearAllocator;
pub use lockfree::ThreadSafeFreelist;
pub use pool::{FreeStore, PoolAllocator};
pub use sync::{LockPolicy, NoopLock, Sleeper, SpinGuard, SpinMutex, Spinlock};
