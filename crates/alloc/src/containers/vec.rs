use core::{
    fmt,
    ops::{Deref, DerefMut, Index, IndexMut},
    ptr::{self, NonNull},
    slice,
};

use super::{growth, lifecycle, storage::Storage};
use crate::{
    error::{AllocError, VecError},
    traits::{Allocator, Global},
};

/// A contiguous growable array type, written as `Vec<T, A>`, short for 'vector'.
///
/// Elements live in a single block obtained from `A`. The block is replaced with one twice as
/// large whenever an operation needs more room than it has, so appending is amortized O(1).
///
/// Every operation that may allocate returns a [`Result`] instead of aborting, and leaves the
/// vector unchanged when the allocator refuses.
///
/// ```
/// use cairn_alloc::Vec;
///
/// let mut v = Vec::from_slice(&[1, 4, 3])?;
/// v.push(5)?;
/// assert_eq!(v, [1, 4, 3, 5]);
/// assert_eq!(v.pop(), Ok(5));
/// # Ok::<(), cairn_alloc::VecError>(())
/// ```
pub struct Vec<T, A: Allocator = Global> {
    // `None` iff `cap == 0`
    ptr: Option<NonNull<T>>,
    len: usize,
    cap: usize,
    storage: Storage<T, A>,
}

impl<T> Vec<T> {
    /// Constructs a new, empty `Vec<T>` on the global heap. Does not allocate.
    pub const fn new() -> Self {
        Self::new_in(Global)
    }

    /// Constructs a new, empty `Vec<T>` with room for at least `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Result<Self, VecError> {
        Self::with_capacity_in(capacity, Global)
    }

    /// Constructs a `Vec<T>` holding `count` default values.
    pub fn with_len(count: usize) -> Result<Self, VecError>
    where
        T: Default,
    {
        Self::with_len_in(count, Global)
    }

    /// Constructs a `Vec<T>` holding a clone of each item, in order.
    pub fn from_slice(items: &[T]) -> Result<Self, VecError>
    where
        T: Clone,
    {
        Self::from_slice_in(items, Global)
    }
}

impl<T, A: Allocator> Vec<T, A> {
    /// Constructs a new, empty `Vec<T, A>`. Does not allocate.
    pub const fn new_in(alloc: A) -> Self {
        let (ptr, cap) = if Storage::<T, A>::IS_ZST {
            (Some(NonNull::dangling()), usize::MAX)
        } else {
            (None, 0)
        };
        Self {
            ptr,
            len: 0,
            cap,
            storage: Storage::new(alloc),
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Result<Self, VecError> {
        let mut vec = Self::new_in(alloc);
        vec.reserve(capacity)?;
        Ok(vec)
    }

    pub fn with_len_in(count: usize, alloc: A) -> Result<Self, VecError>
    where
        T: Default,
    {
        let mut vec = Self::with_capacity_in(count, alloc)?;
        vec.resize(count)?;
        Ok(vec)
    }

    pub fn from_slice_in(items: &[T], alloc: A) -> Result<Self, VecError>
    where
        T: Clone,
    {
        let mut vec = Self::with_capacity_in(items.len(), alloc)?;
        vec.extend_from_slice(items)?;
        Ok(vec)
    }

    /// Returns the number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the current block can hold.
    ///
    /// Always `usize::MAX` if `T` is zero-sized.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn allocator(&self) -> &A {
        self.storage.allocator()
    }

    /// Returns a pointer to the block, or null if nothing is allocated.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.map_or(ptr::null(), |ptr| ptr.as_ptr().cast_const())
    }

    #[inline]
    fn base(&self) -> *mut T {
        self.ptr.unwrap_or(NonNull::dangling()).as_ptr()
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is live, and `base` is non-null and aligned even when empty
        unsafe { slice::from_raw_parts(self.base(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: see `as_slice`
        unsafe { slice::from_raw_parts_mut(self.base(), self.len) }
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Moves the block of `self` into a new vector, leaving `self` empty. O(1).
    pub fn take(&mut self) -> Self
    where
        A: Clone,
    {
        let empty = Self::new_in(self.allocator().clone());
        core::mem::replace(self, empty)
    }

    /// Ensures the capacity is at least `capacity`. Never shrinks and never touches the length.
    ///
    /// Allocates exactly `capacity` elements when it has to grow.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), VecError> {
        if capacity <= self.cap {
            return Ok(());
        }
        self.reallocate(capacity)
    }

    /// Grows the block by the doubling policy if `required` elements do not fit.
    fn grow_for(&mut self, required: usize) -> Result<(), VecError> {
        if required <= self.cap {
            return Ok(());
        }
        let new_cap = growth::grown_capacity(required, self.cap)?;
        self.reallocate(new_cap)
    }

    fn reallocate(&mut self, new_cap: usize) -> Result<(), VecError> {
        // SAFETY: `ptr`, `len` and `cap` describe the current block
        let new = unsafe { growth::migrate(&self.storage, self.ptr, self.len, self.cap, new_cap)? };
        self.ptr = Some(new);
        self.cap = new_cap;
        Ok(())
    }

    /// Appends an element to the back.
    ///
    /// On `Err` the value is dropped and the vector is unchanged.
    pub fn push(&mut self, value: T) -> Result<(), VecError> {
        let required = self
            .len
            .checked_add(1)
            .ok_or(AllocError::CapacityOverflow)?;
        self.grow_for(required)?;
        // SAFETY: `len < cap`, so the slot is allocated and uninitialized
        unsafe { self.base().add(self.len).write(value) };
        self.len = required;
        Ok(())
    }

    /// Removes the last element and returns it.
    pub fn pop(&mut self) -> Result<T, VecError> {
        if self.len == 0 {
            return Err(VecError::Underflow);
        }
        self.len -= 1;
        // SAFETY: the slot was live, and is no longer counted
        Ok(unsafe { self.base().add(self.len).read() })
    }

    /// Grows or shrinks the vector in place so that it holds exactly `new_len` elements,
    /// default-constructing new ones at the back.
    pub fn resize(&mut self, new_len: usize) -> Result<(), VecError>
    where
        T: Default,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        self.grow_for(new_len)?;
        let base = self.base();
        while self.len < new_len {
            // SAFETY: `len < new_len <= cap`
            unsafe { lifecycle::construct_at(base.add(self.len)) };
            self.len += 1;
        }
        Ok(())
    }

    /// Like [`resize`](Self::resize), but new elements come from `f`.
    pub fn resize_with<F>(&mut self, new_len: usize, f: F) -> Result<(), VecError>
    where
        F: FnMut() -> T,
    {
        if new_len <= self.len {
            self.truncate(new_len);
            return Ok(());
        }
        self.grow_for(new_len)?;
        let base = self.base();
        // SAFETY: `[len, new_len)` is allocated and uninitialized
        unsafe { lifecycle::construct_range(base, &mut self.len, new_len, f) };
        Ok(())
    }

    /// Destroys the elements at `[len, self.len())`. No-op if `len >= self.len()`.
    ///
    /// Keeps the block.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let old_len = self.len;
        self.len = len;
        // SAFETY: the slots were live and are no longer counted
        unsafe { lifecycle::destroy_range(self.base(), len..old_len) };
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Appends a clone of each item, in order.
    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<(), VecError>
    where
        T: Clone,
    {
        let required = self
            .len
            .checked_add(items.len())
            .ok_or(AllocError::CapacityOverflow)?;
        self.grow_for(required)?;
        let base = self.base();
        // SAFETY: `[len, required)` is allocated and uninitialized
        unsafe { lifecycle::construct_from(base, &mut self.len, items.iter().cloned()) };
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&T, VecError> {
        let len = self.len;
        self.as_slice()
            .get(index)
            .ok_or(VecError::OutOfRange { index, len })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, VecError> {
        let len = self.len;
        self.as_mut_slice()
            .get_mut(index)
            .ok_or(VecError::OutOfRange { index, len })
    }

    /// Replaces the contents of `self` with clones of the elements of `source`.
    ///
    /// The current elements are destroyed first. The block is kept if `source` fits in it,
    /// otherwise it is released and a block of `source.capacity()` elements takes its place.
    /// On `Err` the vector is left empty.
    pub fn clone_from_vec<B: Allocator>(&mut self, source: &Vec<T, B>) -> Result<(), VecError>
    where
        T: Clone,
    {
        self.clear();
        if source.len > self.cap {
            if let Some(old) = self.ptr.take() {
                // SAFETY: the block is empty and was allocated with `cap`
                unsafe { self.storage.deallocate(old, self.cap) };
            }
            self.cap = 0;
            self.ptr = Some(self.storage.allocate(source.cap)?);
            self.cap = source.cap;
        }
        let base = self.base();
        // SAFETY: `source.len <= cap` and the vector is empty
        unsafe { lifecycle::construct_from(base, &mut self.len, source.iter().cloned()) };
        Ok(())
    }

    /// Returns an independent deep copy using a clone of the same allocator.
    pub fn try_clone(&self) -> Result<Self, VecError>
    where
        T: Clone,
        A: Clone,
    {
        Self::from_slice_in(self, self.allocator().clone())
    }

    pub(super) fn into_raw_parts(self) -> (Option<NonNull<T>>, usize, usize, Storage<T, A>) {
        let me = core::mem::ManuallyDrop::new(self);
        // SAFETY: `me` is never dropped, so `storage` is moved out exactly once
        let storage = unsafe { ptr::read(&me.storage) };
        (me.ptr, me.len, me.cap, storage)
    }
}

impl<T, A: Allocator> Drop for Vec<T, A> {
    fn drop(&mut self) {
        self.clear();
        if let Some(ptr) = self.ptr.take() {
            // SAFETY: every element is destroyed and the block was allocated with `cap`
            unsafe { self.storage.deallocate(ptr, self.cap) };
        }
    }
}

impl<T, A: Allocator> Deref for Vec<T, A> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A: Allocator> DerefMut for Vec<T, A> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, A: Allocator> Index<usize> for Vec<T, A> {
    type Output = T;

    /// ## Panics
    ///
    /// Panics if `index >= self.len()`.
    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T, A: Allocator> IndexMut<usize> for Vec<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.get_mut(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<T, A: Allocator + Default> Default for Vec<T, A> {
    fn default() -> Self {
        Self::new_in(A::default())
    }
}

impl<T: Clone, A: Allocator + Clone> Clone for Vec<T, A> {
    /// ## Panics
    ///
    /// Panics if the allocator cannot provide a block for the copy.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(vec) => vec,
            Err(err) => panic!("failed to clone vector: {err}"),
        }
    }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for Vec<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq<U>, U, A: Allocator, B: Allocator> PartialEq<Vec<U, B>> for Vec<T, A> {
    fn eq(&self, other: &Vec<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: PartialEq<U>, U, A: Allocator, const N: usize> PartialEq<[U; N]> for Vec<T, A> {
    fn eq(&self, other: &[U; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq<U>, U, A: Allocator> PartialEq<[U]> for Vec<T, A> {
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Eq, A: Allocator> Eq for Vec<T, A> {}

impl<'a, T, A: Allocator> IntoIterator for &'a Vec<T, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: Allocator> IntoIterator for &'a mut Vec<T, A> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
