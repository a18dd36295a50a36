use core::ptr::NonNull;

/// Machine word size. Free-list nodes store a forward link in the first
/// word of a free block, so no stride may be smaller than this.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Align `value` up to the next multiple of `align`.
/// `align` must be a power of two.
#[inline(always)]
pub const fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Align `value` down to the previous multiple of `align`.
/// `align` must be a power of two.
#[inline(always)]
pub const fn align_down(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Check if `value` is aligned to `align`.
#[inline(always)]
pub const fn is_aligned(value: usize, align: usize) -> bool {
    value & (align - 1) == 0
}

/// Align a pointer's address up to `align`. Does not dereference.
/// `align` must be a power of two.
#[inline(always)]
pub fn align_ptr_up(ptr: NonNull<u8>, align: usize) -> NonNull<u8> {
    let addr = align_up(ptr.as_ptr() as usize, align);
    // align_up of a non-null address with a power-of-two align stays non-null
    unsafe { NonNull::new_unchecked(addr as *mut u8) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn align_up_basic() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 16), 16);
        assert_eq!(align_up(17, 16), 32);
    }

    #[test]
    fn align_down_basic() {
        assert_eq!(align_down(0, 8), 0);
        assert_eq!(align_down(7, 8), 0);
        assert_eq!(align_down(9, 8), 8);
        assert_eq!(align_down(31, 16), 16);
    }

    #[test]
    fn is_aligned_basic() {
        assert!(is_aligned(0, 8));
        assert!(is_aligned(64, 64));
        assert!(!is_aligned(63, 64));
    }

    proptest! {
        #[test]
        fn align_up_properties(addr in 0usize..(usize::MAX / 2), shift in 0u32..20) {
            let align = 1usize << shift;
            let aligned = align_up(addr, align);
            prop_assert_eq!(aligned % align, 0);
            prop_assert!(aligned >= addr);
            prop_assert!(aligned - addr < align);
        }

        #[test]
        fn align_down_properties(addr in 0usize..(usize::MAX / 2), shift in 0u32..20) {
            let align = 1usize << shift;
            let aligned = align_down(addr, align);
            prop_assert_eq!(aligned % align, 0);
            prop_assert!(aligned <= addr);
            prop_assert!(addr - aligned < align);
        }
    }
}
