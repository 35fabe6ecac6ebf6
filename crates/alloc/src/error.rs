use core::fmt;
use std::error::Error;

/// An error with allocating or deallocating memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The allocator has no memory left that can satisfy the request.
    OutOfMemory,
    /// The request is larger than the biggest block the allocator hands out.
    RequestTooLarge,
    /// The allocator cannot produce a block with the requested alignment.
    UnsupportedAlignment,
    /// The requested element count does not fit in `isize::MAX` bytes.
    CapacityOverflow,
    PointerOutsideRange,
    PointerNotAligned,
    BlockAlreadyFree,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::OutOfMemory => "out of memory",
            Self::RequestTooLarge => "requested size exceeds the maximum block size",
            Self::UnsupportedAlignment => "requested alignment is not supported",
            Self::CapacityOverflow => "capacity overflow",
            Self::PointerOutsideRange => "pointer is outside the allocator's memory region",
            Self::PointerNotAligned => "pointer does not point to the start of a block",
            Self::BlockAlreadyFree => "block is already free",
        };
        f.write_str(msg)
    }
}

impl Error for AllocError {}

/// An error returned by the fallible [`Vec`](crate::Vec) operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VecError {
    /// The allocator could not provide storage. The container is left as it was.
    OutOfMemory(AllocError),
    /// Indexed access past the last live element.
    OutOfRange {
        /// The requested index.
        index: usize,
        /// The number of live elements at the time of the access.
        len: usize,
    },
    /// `pop` on an empty container.
    Underflow,
}

impl fmt::Display for VecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory(cause) => write!(f, "allocation failed: {cause}"),
            Self::OutOfRange { index, len } => {
                write!(f, "index out of range: the len is {len} but the index is {index}")
            }
            Self::Underflow => f.write_str("cannot pop from an empty vector"),
        }
    }
}

impl Error for VecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::OutOfMemory(cause) => Some(cause),
            _ => None,
        }
    }
}

impl From<AllocError> for VecError {
    fn from(err: AllocError) -> Self {
        Self::OutOfMemory(err)
    }
}
