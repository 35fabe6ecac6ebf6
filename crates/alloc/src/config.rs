use core::fmt;
use std::error::Error;

use bytesize::KIB;

// blocks are addressed with 32-bit offsets
const MAX_HEAP_BYTES: usize = u32::MAX as usize;

/// Configuration for an [`Arena`](crate::Arena).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Size of each page in bytes. Also the largest block the arena can hand out.
    ///
    /// Must be a power of two between [`MIN_PAGE_SIZE`](Self::MIN_PAGE_SIZE) and
    /// [`MAX_PAGE_SIZE`](Self::MAX_PAGE_SIZE).
    pub page_size: usize,
    /// Number of pages in the arena.
    pub page_count: usize,
}

impl ArenaConfig {
    /// The operating system page size (4 KiB).
    pub const MIN_PAGE_SIZE: usize = 4 * KIB as usize;
    /// Each page tracks at most 2048 blocks of 8 B.
    pub const MAX_PAGE_SIZE: usize = 16 * KIB as usize;
    pub const DEFAULT_PAGE_SIZE: usize = 16 * KIB as usize;
    /// 64 pages of 16 KiB is a 1 MiB heap.
    pub const DEFAULT_PAGE_COUNT: usize = 64;

    pub fn new(page_size: usize, page_count: usize) -> Self {
        Self {
            page_size,
            page_count,
        }
    }

    /// Total size of the heap region in bytes, or `None` if it overflows.
    pub fn heap_bytes(&self) -> Option<usize> {
        self.page_size.checked_mul(self.page_count)
    }

    /// Checks that the arena described by this config can be built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.page_size.is_power_of_two() {
            return Err(ConfigError::PageSizeNotPowerOfTwo);
        }
        if self.page_size < Self::MIN_PAGE_SIZE {
            return Err(ConfigError::PageSizeTooSmall);
        }
        if self.page_size > Self::MAX_PAGE_SIZE {
            return Err(ConfigError::PageSizeTooLarge);
        }
        if self.page_count == 0 {
            return Err(ConfigError::NoPages);
        }
        match self.heap_bytes() {
            Some(bytes) if bytes <= MAX_HEAP_BYTES => Ok(()),
            _ => Err(ConfigError::HeapTooLarge),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE, Self::DEFAULT_PAGE_COUNT)
    }
}

/// An invalid [`ArenaConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    PageSizeNotPowerOfTwo,
    PageSizeTooSmall,
    PageSizeTooLarge,
    NoPages,
    /// `page_size * page_count` does not fit in a 32-bit offset.
    HeapTooLarge,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageSizeNotPowerOfTwo => f.write_str("page size must be a power of two"),
            Self::PageSizeTooSmall => write!(
                f,
                "page size must be at least {} bytes",
                ArenaConfig::MIN_PAGE_SIZE
            ),
            Self::PageSizeTooLarge => write!(
                f,
                "page size must be at most {} bytes",
                ArenaConfig::MAX_PAGE_SIZE
            ),
            Self::NoPages => f.write_str("arena needs at least one page"),
            Self::HeapTooLarge => f.write_str("arena heap exceeds 4 GiB"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ArenaConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.heap_bytes(), Some(1024 * 1024));
    }

    #[test]
    fn rejects_bad_page_sizes() {
        assert_eq!(
            ArenaConfig::new(5000, 1).validate(),
            Err(ConfigError::PageSizeNotPowerOfTwo)
        );
        assert_eq!(
            ArenaConfig::new(2048, 1).validate(),
            Err(ConfigError::PageSizeTooSmall)
        );
        assert_eq!(
            ArenaConfig::new(32 * 1024, 1).validate(),
            Err(ConfigError::PageSizeTooLarge)
        );
    }

    #[test]
    fn rejects_empty_and_oversized_heaps() {
        assert_eq!(ArenaConfig::new(4096, 0).validate(), Err(ConfigError::NoPages));
        assert_eq!(
            ArenaConfig::new(4096, usize::MAX).validate(),
            Err(ConfigError::HeapTooLarge)
        );
    }
}
