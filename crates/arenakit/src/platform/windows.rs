use core::ptr::NonNull;

use crate::util::WORD_SIZE;

/// # Safety
/// `align` must be a power of two.
pub unsafe fn alloc_aligned(size: usize, align: usize) -> Option<NonNull<u8>> {
    let align = align.max(WORD_SIZE);
    let out = libc::aligned_malloc(size, align);
    NonNull::new(out.cast())
}

/// # Safety
/// `ptr` must have been returned by `alloc_aligned`.
pub unsafe fn free_aligned(ptr: NonNull<u8>) {
    libc::aligned_free(ptr.as_ptr().cast());
}
