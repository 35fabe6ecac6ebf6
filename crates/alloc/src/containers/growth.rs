use core::{mem, ptr::NonNull};

use bytesize::ByteSize;
use log::debug;

use super::{lifecycle, storage::Storage};
use crate::{error::AllocError, traits::Allocator};

/// Capacity of the first block when neither the requested size nor the current capacity gives
/// anything to double.
pub(crate) const MIN_NON_ZERO_CAP: usize = 4;

/// Returns the capacity to grow to when `required` elements must fit in a block of `cap`.
///
/// Doubles the larger of the two. Doubling zero is zero, so that case starts at
/// [`MIN_NON_ZERO_CAP`] instead. [`Vec`](crate::Vec) only grows when `required` exceeds `cap`,
/// so `required` is never zero there and a push onto an empty vector gets `max(1, 0) * 2 = 2`.
pub(crate) fn grown_capacity(required: usize, cap: usize) -> Result<usize, AllocError> {
    match required.max(cap) {
        0 => Ok(MIN_NON_ZERO_CAP),
        base => base.checked_mul(2).ok_or(AllocError::CapacityOverflow),
    }
}

/// Moves the `len` live elements of `old` into a fresh block of `new_cap` and releases `old`.
///
/// The new block is allocated before anything is touched, so on `Err` the old block and its
/// elements are exactly as they were.
///
/// ## Safety
/// - `old` must be `None` iff `old_cap` is zero, and otherwise a block of `old_cap` elements from
///   `storage` whose first `len` slots are live.
/// - `new_cap` must be at least `len` and non-zero.
pub(crate) unsafe fn migrate<T, A: Allocator>(
    storage: &Storage<T, A>,
    old: Option<NonNull<T>>,
    len: usize,
    old_cap: usize,
    new_cap: usize,
) -> Result<NonNull<T>, AllocError> {
    debug_assert!(len <= new_cap);
    let new = storage.allocate(new_cap)?;

    if let Some(old) = old {
        lifecycle::transfer(old.as_ptr(), new.as_ptr(), len);
        storage.deallocate(old, old_cap);
    }

    debug!(
        "grew vector from {old_cap} to {new_cap} elements ({})",
        ByteSize::b((new_cap * mem::size_of::<T>()) as u64).to_string_as(true)
    );
    Ok(new)
}
