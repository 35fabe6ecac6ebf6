use core::{alloc::Layout, marker::PhantomData, mem, ptr::NonNull};

use bytesize::ByteSize;
use log::debug;

use crate::{error::AllocError, traits::Allocator};

/// Hands out uninitialized blocks sized in elements of `T` rather than bytes.
///
/// Zero-sized types never reach the allocator.
pub(crate) struct Storage<T, A: Allocator> {
    alloc: A,
    _marker: PhantomData<T>,
}

impl<T, A: Allocator> Storage<T, A> {
    pub(crate) const IS_ZST: bool = mem::size_of::<T>() == 0;

    pub(crate) const fn new(alloc: A) -> Self {
        Self {
            alloc,
            _marker: PhantomData,
        }
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Returns an uninitialized block for `n` elements.
    pub(crate) fn allocate(&self, n: usize) -> Result<NonNull<T>, AllocError> {
        debug_assert!(n > 0);
        if Self::IS_ZST {
            return Ok(NonNull::dangling());
        }

        let layout = Layout::array::<T>(n).map_err(|_| AllocError::CapacityOverflow)?;
        match self.alloc.allocate(layout) {
            Ok(ptr) => Ok(ptr.cast()),
            Err(err) => {
                debug!(
                    "failed to allocate {n} elements ({}): {err}",
                    ByteSize::b(layout.size() as u64).to_string_as(true)
                );
                Err(err)
            }
        }
    }

    /// Releases a block.
    ///
    /// ## Safety
    /// - `block` must have come from [`allocate`](Self::allocate) on this storage with the same `n`.
    /// - Every element in the block must already be destroyed or moved out.
    pub(crate) unsafe fn deallocate(&self, block: NonNull<T>, n: usize) {
        if Self::IS_ZST {
            return;
        }
        // SAFETY: the same layout was valid when the block was allocated
        let layout = Layout::from_size_align_unchecked(mem::size_of::<T>() * n, mem::align_of::<T>());
        self.alloc.deallocate(block.cast(), layout)
    }
}
