//! Integration tests for the composition layer: arenas, strategies, and
//! the composed allocator, exercised through the crate's public API.

use std::ptr::NonNull;

use arenakit::{
    Arena, Freelist, HeapArena, LinearAllocator, LockedBumpAllocator, NoopLock, ObjectPool,
    PoolAllocator, StackArena,
};

// ---------------------------------------------------------------------------
// Pool over each arena variant
// ---------------------------------------------------------------------------

#[test]
fn pool_over_stack_arena() {
    let arena = StackArena::<512>::new();
    let mut pool: PoolAllocator = unsafe { PoolAllocator::from_arena(&arena, 32, 16) };
    let k = pool.capacity();
    assert_eq!(k, 16);

    let blocks: Vec<_> = (0..k).map(|_| pool.allocate().unwrap()).collect();
    assert!(pool.allocate().is_none());
    for b in &blocks {
        assert!(pool.owns(*b));
    }
    for b in blocks {
        unsafe { pool.deallocate(b) };
    }
}

#[test]
fn pool_over_heap_arena() {
    let arena = HeapArena::new(1024).unwrap();
    let mut pool: PoolAllocator = unsafe { PoolAllocator::from_arena(&arena, 64, 64) };
    let p = pool.allocate().unwrap();
    assert_eq!(p.as_ptr() as usize % 64, 0);
    unsafe { pool.deallocate(p) };
}

// ---------------------------------------------------------------------------
// Linear allocator: cumulative aligned offsets bound the sequence
// ---------------------------------------------------------------------------

#[test]
fn linear_sequence_succeeds_iff_it_fits() {
    let arena = StackArena::<128>::new();
    let mut bump = unsafe { LinearAllocator::from_arena(&arena) };

    // Alignments no stronger than the arena's own, so the cursor needs
    // no padding and 64 + 32 + 32 = 128 exactly.
    assert!(bump.allocate(64, 16).is_some());
    assert!(bump.allocate(32, 16).is_some());
    assert_eq!(bump.remaining(), 32);
    assert!(bump.allocate(32, 16).is_some());
    assert!(bump.allocate(1, 1).is_none());

    // Identical replay after reset.
    bump.reset();
    assert!(bump.allocate(64, 16).is_some());
    assert!(bump.allocate(32, 16).is_some());
    assert!(bump.allocate(32, 16).is_some());
    assert!(bump.allocate(1, 1).is_none());
}

// ---------------------------------------------------------------------------
// Composed allocator: primary, fallback, and routing of frees
// ---------------------------------------------------------------------------

#[test]
fn composed_pool_exhausts_into_fallback() {
    let pool = ObjectPool::<NoopLock>::pool_for_type::<[u64; 4]>(3).unwrap();

    let mut blocks = Vec::new();
    // 3 from the arena, 2 from the heap fallback; none fail.
    for _ in 0..5 {
        let p = pool.alloc(32, 8).expect("fallback must absorb exhaustion");
        unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAB, 32) };
        blocks.push(p);
    }
    for p in blocks {
        unsafe { pool.free(p) };
    }
}

#[test]
fn composed_create_recycle() {
    let pool = ObjectPool::<NoopLock>::pool_for_type::<String>(8).unwrap();
    let s = pool.create(String::from("arena-backed")).unwrap();
    assert_eq!(unsafe { s.as_ref() }, "arena-backed");
    unsafe { pool.recycle(s) };
}

#[test]
fn locked_bump_shared_across_threads() {
    use std::sync::{Arc, Barrier};

    const THREADS: usize = 4;
    const PER_THREAD: usize = 64;

    let bump = Arc::new(LockedBumpAllocator::bump(THREADS * PER_THREAD * 16).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let bump = Arc::clone(&bump);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                let mut out = Vec::with_capacity(PER_THREAD);
                for _ in 0..PER_THREAD {
                    let p = bump.alloc(16, 16).unwrap();
                    out.push(p.as_ptr() as usize);
                }
                out
            })
        })
        .collect();

    let mut all: Vec<usize> = Vec::new();
    for h in handles {
        all.extend(h.join().unwrap());
    }
    all.sort_unstable();
    all.dedup();
    // Every allocation landed on a distinct address.
    assert_eq!(all.len(), THREADS * PER_THREAD);
}

// ---------------------------------------------------------------------------
// Free list as a standalone strategy over a sub-range
// ---------------------------------------------------------------------------

#[test]
fn freelist_over_sub_range() {
    let arena = StackArena::<256>::new();
    let mid = unsafe { NonNull::new_unchecked(arena.begin().as_ptr().add(128)) };
    let mut front = unsafe { Freelist::new(arena.begin(), mid, 32, 16) };
    let mut back = unsafe { Freelist::over(mid, arena.end(), 32, 16) };

    let mut count = 0;
    while front.pop().is_some() {
        count += 1;
    }
    while back.pop().is_some() {
        count += 1;
    }
    assert_eq!(count, 8);
    assert!(!back.is_resettable());
}
