//! Constructing and destroying elements in place over raw storage.
//!
//! Every function here is `unsafe`: callers track which slots are live.

use core::{ops::Range, ptr};

/// Default-constructs a value in an uninitialized slot.
#[inline]
pub(crate) unsafe fn construct_at<T: Default>(slot: *mut T) {
    slot.write(T::default());
}

/// Drops the live value in a slot, leaving it uninitialized.
#[inline]
pub(crate) unsafe fn destroy_at<T>(slot: *mut T) {
    ptr::drop_in_place(slot);
}

/// Constructs values from `f` in slots `[*live, end)` of `base`, in ascending order.
///
/// `*live` is bumped after each slot is written, so it stays accurate if `f` panics.
pub(crate) unsafe fn construct_range<T, F>(base: *mut T, live: &mut usize, end: usize, f: F)
where
    F: FnMut() -> T,
{
    let count = end.saturating_sub(*live);
    construct_from(base, live, core::iter::repeat_with(f).take(count));
}

/// Moves every item of `items` into consecutive slots of `base` starting at `*live`.
///
/// The caller must have reserved room for all of them.
pub(crate) unsafe fn construct_from<T, I>(base: *mut T, live: &mut usize, items: I)
where
    I: IntoIterator<Item = T>,
{
    for item in items {
        base.add(*live).write(item);
        *live += 1;
    }
}

/// Drops the live values in slots `range` of `base`, in ascending order.
///
/// If a destructor panics, the values after it are leaked rather than dropped.
pub(crate) unsafe fn destroy_range<T>(base: *mut T, range: Range<usize>) {
    for index in range {
        destroy_at(base.add(index));
    }
}

/// Moves `count` live values from `src` into the uninitialized slots at `dst`.
///
/// Afterwards the source slots are logically uninitialized and must not be dropped.
/// Moving never fails, so no element is ever copied instead.
#[inline]
pub(crate) unsafe fn transfer<T>(src: *const T, dst: *mut T, count: usize) {
    ptr::copy_nonoverlapping(src, dst, count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::{cell::Cell, mem::MaybeUninit};

    struct Counted<'a>(&'a Cell<usize>);

    impl Drop for Counted<'_> {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn constructs_and_destroys_ranges() {
        let drops = Cell::new(0);
        let mut slots: [MaybeUninit<Counted<'_>>; 4] = [const { MaybeUninit::uninit() }; 4];
        let base = slots.as_mut_ptr().cast::<Counted<'_>>();
        let mut live = 1;
        unsafe {
            base.write(Counted(&drops));
            construct_range(base, &mut live, 4, || Counted(&drops));
            assert_eq!(live, 4);

            destroy_range(base, 2..4);
            assert_eq!(drops.get(), 2);
            destroy_at(base.add(1));
            destroy_at(base);
        }
        assert_eq!(drops.get(), 4);
    }

    #[test]
    fn default_constructs_in_place() {
        let mut slot = MaybeUninit::<u64>::uninit();
        unsafe {
            construct_at(slot.as_mut_ptr());
            assert_eq!(slot.assume_init(), 0);
        }
    }

    #[test]
    fn transfer_preserves_order() {
        let src = [String::from("a"), String::from("b"), String::from("c")];
        let mut dst: [MaybeUninit<String>; 3] = [const { MaybeUninit::uninit() }; 3];
        let src = core::mem::ManuallyDrop::new(src);
        unsafe {
            transfer(src.as_ptr(), dst.as_mut_ptr().cast(), 3);
            let dst = dst.map(|slot| slot.assume_init());
            assert_eq!(dst, ["a", "b", "c"]);
        }
    }
}
