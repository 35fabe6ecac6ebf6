use core::{fmt, iter::FusedIterator, ptr::NonNull, slice};

use super::{lifecycle, storage::Storage, vec::Vec};
use crate::traits::Allocator;

/// An iterator that moves the elements out of a [`Vec`].
///
/// Elements that are never yielded are dropped with the iterator, which then releases the block.
pub struct IntoIter<T, A: Allocator> {
    buf: Option<NonNull<T>>,
    cap: usize,
    // live elements are `[start, end)`
    start: usize,
    end: usize,
    storage: Storage<T, A>,
}

impl<T, A: Allocator> IntoIter<T, A> {
    fn base(&self) -> *mut T {
        self.buf.unwrap_or(NonNull::dangling()).as_ptr()
    }

    /// Returns the elements that have not been yielded yet.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[start, end)` is live
        unsafe { slice::from_raw_parts(self.base().add(self.start), self.end - self.start) }
    }
}

impl<T, A: Allocator> IntoIterator for Vec<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> IntoIter<T, A> {
        let (buf, len, cap, storage) = self.into_raw_parts();
        IntoIter {
            buf,
            cap,
            start: 0,
            end: len,
            storage,
        }
    }
}

impl<T, A: Allocator> Iterator for IntoIter<T, A> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        // SAFETY: the slot is live and leaves `[start, end)` right after the read
        let value = unsafe { self.base().add(self.start).read() };
        self.start += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.start;
        (len, Some(len))
    }
}

impl<T, A: Allocator> DoubleEndedIterator for IntoIter<T, A> {
    fn next_back(&mut self) -> Option<T> {
        if self.start == self.end {
            return None;
        }
        self.end -= 1;
        // SAFETY: the slot was live and is no longer in `[start, end)`
        Some(unsafe { self.base().add(self.end).read() })
    }
}

impl<T, A: Allocator> ExactSizeIterator for IntoIter<T, A> {}

impl<T, A: Allocator> FusedIterator for IntoIter<T, A> {}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for IntoIter<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IntoIter").field(&self.as_slice()).finish()
    }
}

impl<T, A: Allocator> Drop for IntoIter<T, A> {
    fn drop(&mut self) {
        // SAFETY: `[start, end)` is live, and the block was allocated with `cap`
        unsafe {
            lifecycle::destroy_range(self.base(), self.start..self.end);
            if let Some(buf) = self.buf.take() {
                self.storage.deallocate(buf, self.cap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::arena::Arena;

    struct Counted<'a>(&'a Cell<usize>);

    impl Drop for Counted<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn yields_owned_values_from_both_ends() {
        let vec = Vec::from_slice(&[String::from("a"), String::from("b"), String::from("c")]).unwrap();
        let mut iter = vec.into_iter();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.next().as_deref(), Some("a"));
        assert_eq!(iter.next_back().as_deref(), Some("c"));
        assert_eq!(iter.as_slice(), [String::from("b")]);
        assert_eq!(iter.next().as_deref(), Some("b"));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);
    }

    #[test]
    fn drops_what_was_not_consumed() {
        let drops = Cell::new(0);
        let mut vec = Vec::new();
        for _ in 0..5 {
            vec.push(Counted(&drops)).unwrap();
        }
        let mut iter = vec.into_iter();
        drop(iter.next());
        assert_eq!(drops.get(), 1);
        drop(iter);
        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn releases_the_block() {
        let arena = Arena::new(4096, 1);
        let mut vec = Vec::new_in(&arena);
        vec.push(1u32).unwrap();
        vec.push(2).unwrap();
        let total: u32 = vec.into_iter().sum();
        assert_eq!(total, 3);
        assert_eq!(arena.used_blocks(), 0);
    }
}
