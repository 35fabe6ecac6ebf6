use core::{alloc::Layout, ptr::NonNull};
use std::alloc;

use crate::error::AllocError;

/// A source of raw memory blocks.
///
/// Containers call [`allocate`](Allocator::allocate) and
/// [`deallocate`](Allocator::deallocate) in matching pairs. An allocator never constructs or
/// destroys values, it only hands out and takes back uninitialized bytes.
pub trait Allocator {
    /// Returns a pointer to an uninitialized block that fits `layout`.
    ///
    /// `layout` must have a non-zero size.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block.
    ///
    /// ## Safety
    /// - `ptr` must have been returned by [`allocate`](Allocator::allocate) on this allocator.
    /// - `layout` must be the same layout that was passed to that call.
    /// - The block must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}

/// The process-wide heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

impl Allocator for Global {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        assert!(layout.size() != 0, "zero-sized allocations are not supported");
        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError::OutOfMemory)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        alloc::dealloc(ptr.as_ptr(), layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_round_trip() {
        let layout = Layout::array::<u64>(4).unwrap();
        let ptr = Global.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % layout.align(), 0);
        unsafe {
            ptr.cast::<u64>().as_ptr().write(42);
            assert_eq!(ptr.cast::<u64>().as_ptr().read(), 42);
            Global.deallocate(ptr, layout);
        }
    }

    #[test]
    fn references_forward_to_the_allocator() {
        fn allocate_through<A: Allocator>(alloc: A) {
            let layout = Layout::new::<u32>();
            let ptr = alloc.allocate(layout).unwrap();
            unsafe { alloc.deallocate(ptr, layout) };
        }

        allocate_through(&Global);
    }
}
