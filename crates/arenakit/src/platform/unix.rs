use core::ptr::{self, NonNull};

use crate::util::WORD_SIZE;

/// # Safety
/// `align` must be a power of two.
pub unsafe fn alloc_aligned(size: usize, align: usize) -> Option<NonNull<u8>> {
    // posix_memalign requires the alignment to be a multiple of
    // sizeof(void*); round small alignments up.
    let align = align.max(WORD_SIZE);
    let mut out: *mut libc::c_void = ptr::null_mut();
    let rc = libc::posix_memalign(&mut out, align, size);
    if rc != 0 {
        return None;
    }
    NonNull::new(out.cast())
}

/// # Safety
/// `ptr` must have been returned by `alloc_aligned`.
pub unsafe fn free_aligned(ptr: NonNull<u8>) {
    libc::free(ptr.as_ptr().cast());
}
