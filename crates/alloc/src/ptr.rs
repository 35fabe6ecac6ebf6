use core::{fmt, marker::PhantomData};
use num_traits::{PrimInt, Unsigned};

/// An unsigned integer that can hold an offset into an allocator's memory region.
pub trait Address: PrimInt + Unsigned {
    /// Narrows `addr`. Callers guarantee that it fits.
    fn from_usize(addr: usize) -> Self;
    fn to_usize(self) -> usize;
}

macro_rules! impl_address {
    ($ty:ty) => {
        impl Address for $ty {
            fn from_usize(addr: usize) -> Self {
                debug_assert!(addr <= <$ty>::MAX as usize);
                addr as Self
            }

            fn to_usize(self) -> usize {
                self as usize
            }
        }
    };
}

impl_address!(usize);
#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl_address!(u32);
#[cfg(target_pointer_width = "64")]
impl_address!(u64);

pub type RelPtrUsize<T> = RelPtr<T, usize>;
pub type RelPtrU32<T> = RelPtr<T, u32>;

/// A strongly-typed pointer to a memory address, relative to some base address.
#[repr(transparent)]
pub struct RelPtr<T: ?Sized, P: Address> {
    addr: P,
    _marker: PhantomData<*mut T>,
}

impl<T: ?Sized, P: Address> Copy for RelPtr<T, P> {}

impl<T: ?Sized, P: Address> Clone for RelPtr<T, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized, P: Address> PartialEq for RelPtr<T, P> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<T: ?Sized, P: Address> Eq for RelPtr<T, P> {}

impl<T: ?Sized, P: Address> fmt::Debug for RelPtr<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelPtr({:#x})", self.addr())
    }
}

impl<T: ?Sized, P: Address> RelPtr<T, P> {
    pub(crate) fn with_addr(addr: usize) -> Self {
        Self {
            addr: P::from_usize(addr),
            _marker: PhantomData,
        }
    }

    /// Returns the offset from the base address, in bytes.
    pub fn addr(self) -> usize {
        self.addr.to_usize()
    }

    pub fn cast<U>(self) -> RelPtr<U, P> {
        RelPtr::with_addr(self.addr.to_usize())
    }
}

// pointer arithmetic
impl<T: Sized, P: Address> RelPtr<T, P> {
    /// Offsets the pointer by `count` values of `T`.
    pub(crate) fn add(self, count: usize) -> Self {
        Self::with_addr(self.addr() + count * core::mem::size_of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_steps_by_element_size() {
        let ptr = RelPtrU32::<u64>::with_addr(16);
        assert_eq!(ptr.add(3).addr(), 40);
        assert_eq!(ptr.cast::<u8>().add(3).addr(), 19);
    }

    #[test]
    fn narrow_address_is_half_the_size() {
        assert_eq!(core::mem::size_of::<RelPtrU32<u8>>(), 4);
        assert_eq!(core::mem::size_of::<RelPtrUsize<u8>>(), core::mem::size_of::<usize>());
        assert_eq!(format!("{:?}", RelPtrUsize::<u8>::with_addr(255)), "RelPtr(0xff)");
    }
}
