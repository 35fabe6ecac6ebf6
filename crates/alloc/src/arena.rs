use core::{alloc::Layout, cell::RefCell, mem, ptr::NonNull};
use std::alloc;

use bitvec::{order::Lsb0, BitArr};
use bytesize::ByteSize;
use log::{error, trace};
use nonmax::NonMaxUsize;

use crate::{
    config::{ArenaConfig, ConfigError},
    error::AllocError,
    ptr::RelPtrU32,
    traits::Allocator,
};

// 16 block sizes in each group
// group | step size | min. size
//     0 |       8 B |       0 B
//     1 |       8 B |     128 B  <--  BASE_SIZE
//     2 |      16 B |     256 B
//     3 |      32 B |     512 B
//     4 |      64 B |     1 KiB
//     5 |     128 B |     2 KiB
//     6 |     256 B |     4 KiB
//     7 |     512 B |     8 KiB
//     8 |     1 KiB |    16 KiB

const BINS_PER_GROUP: usize = 16;
const BASE_STEP: usize = 8;
const BASE_SIZE: usize = BASE_STEP * BINS_PER_GROUP;

// 16 KiB / 8 B
const MAX_BLOCKS_PER_PAGE: usize = ArenaConfig::MAX_PAGE_SIZE / BASE_STEP;

/// Returns the index of the page bin corresponding to the given block size (in bytes).
const fn size_to_bin(mut bytes: usize) -> usize {
    let group = if bytes < BASE_SIZE {
        0
    } else {
        (1 + bytes.ilog2() - BASE_SIZE.ilog2()) as usize
    };
    let step = if group == 0 {
        BASE_STEP
    } else {
        BASE_STEP << (group - 1)
    };
    let min_bytes = if group == 0 { 0 } else { BINS_PER_GROUP * step };

    bytes -= min_bytes;
    (group * BINS_PER_GROUP) + (bytes / step) + (((bytes % step) != 0) as usize)
}

/// Returns the block size (in bytes) corresponding to the given bin index.
const fn bin_to_size(index: usize) -> usize {
    let group = index / BINS_PER_GROUP;
    let step = if group == 0 {
        BASE_STEP
    } else {
        BASE_STEP << (group - 1)
    };
    let min_bytes = if group == 0 { 0 } else { BINS_PER_GROUP * step };

    min_bytes + ((index % BINS_PER_GROUP) * step)
}

/// A free block of memory. Lives inside the block it describes.
#[repr(C)]
struct Block {
    // pointer to next free block (in the same page)
    next: Option<RelPtrU32<Block>>,
}

const _: () = assert!(mem::size_of::<Block>() <= BASE_STEP);

type Occupancy = BitArr!(for MAX_BLOCKS_PER_PAGE, in usize, Lsb0);

/// A contiguous memory region containing blocks of a fixed size.
struct Page {
    // number of blocks that have been allocated
    used: usize,
    // pointer to next free block (in the page)
    free: Option<RelPtrU32<Block>>,
    next: Option<NonMaxUsize>,
    prev: Option<NonMaxUsize>,
    // index of bin corresponding to block size, `None` while the page is unused
    bin: Option<usize>,
    // 1 bit per block, guards against double-frees
    occupied: Occupancy,
}

/// A collection of pages with the same block size.
struct Bin {
    // number of bytes in each block
    block_size: usize,
    // number of blocks in each page
    block_capacity: usize,
    // pages with at least one free block
    partial: PageList,
}

/// An intrusive doubly-linked list threaded through [`Page::prev`] and [`Page::next`].
#[derive(Clone, Copy, Default)]
struct PageList {
    head: Option<NonMaxUsize>,
}

impl PageList {
    fn head(&self) -> Option<usize> {
        self.head.map(|head| head.get())
    }

    fn push(&mut self, pages: &mut [Page], index: usize) {
        debug_assert!(pages[index].prev.is_none());
        debug_assert!(pages[index].next.is_none());
        if let Some(head) = self.head {
            pages[head.get()].prev = NonMaxUsize::new(index);
            pages[index].next = Some(head);
        }
        self.head = NonMaxUsize::new(index);
    }

    fn remove(&mut self, pages: &mut [Page], index: usize) {
        let prev = pages[index].prev.take();
        let next = pages[index].next.take();
        match prev {
            Some(prev) => pages[prev.get()].next = next,
            None => {
                debug_assert_eq!(self.head(), Some(index));
                self.head = next;
            }
        }
        if let Some(next) = next {
            pages[next.get()].prev = prev;
        }
    }

    fn pop(&mut self, pages: &mut [Page]) -> Option<usize> {
        let head = self.head()?;
        self.remove(pages, head);
        Some(head)
    }
}

struct Meta {
    bins: Box<[Bin]>,
    pages: Box<[Page]>,
    free_pages: PageList,
    free_page_count: usize,
    used_blocks: usize,
}

/// A non-global allocator that allocates blocks of fixed sizes from a contiguous memory region.
/// Blocks can be individually freed and reused.
///
/// Every page is either free or dedicated to a single block size. Requests are rounded up to the
/// nearest block size, so the arena never hands out more than one page at a time.
///
/// Internally, blocks are addressed relative to the region's base address.
pub struct Arena {
    heap: NonNull<u8>,
    heap_layout: Layout,
    page_size: usize,
    meta: RefCell<Meta>,
}

impl Arena {
    /// Constructs a new `Arena` with the specified page size and page count.
    ///
    /// # Panics
    ///
    /// Panics if the equivalent [`ArenaConfig`] is invalid.
    pub fn new(page_size: usize, page_count: usize) -> Self {
        match Self::with_config(&ArenaConfig::new(page_size, page_count)) {
            Ok(arena) => arena,
            Err(err) => panic!("invalid arena config: {err}"),
        }
    }

    /// Constructs a new `Arena` from a validated config.
    pub fn with_config(config: &ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ArenaConfig {
            page_size,
            page_count,
        } = *config;

        let heap_layout = Layout::from_size_align(page_size * page_count, page_size)
            .map_err(|_| ConfigError::HeapTooLarge)?;
        // SAFETY: validated config has at least one page
        let heap = match NonNull::new(unsafe { alloc::alloc(heap_layout) }) {
            Some(heap) => heap,
            None => alloc::handle_alloc_error(heap_layout),
        };

        let bin_count = size_to_bin(page_size) + 1;
        let bins = (0..bin_count)
            .map(|index| {
                let block_size = bin_to_size(index);
                Bin {
                    block_size,
                    block_capacity: if block_size == 0 {
                        0
                    } else {
                        page_size / block_size
                    },
                    partial: PageList::default(),
                }
            })
            .collect();

        let mut pages: Box<[Page]> = (0..page_count)
            .map(|_| Page {
                used: 0,
                free: None,
                next: None,
                prev: None,
                bin: None,
                occupied: Occupancy::ZERO,
            })
            .collect();
        let mut free_pages = PageList::default();
        for index in (0..page_count).rev() {
            free_pages.push(&mut pages, index);
        }

        Ok(Self {
            heap,
            heap_layout,
            page_size,
            meta: RefCell::new(Meta {
                bins,
                pages,
                free_pages,
                free_page_count: page_count,
                used_blocks: 0,
            }),
        })
    }

    /// Returns the size of each page, which is also the largest request the arena can satisfy.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of blocks currently handed out.
    pub fn used_blocks(&self) -> usize {
        self.meta.borrow().used_blocks
    }

    /// Returns the number of pages not dedicated to any block size.
    pub fn free_pages(&self) -> usize {
        self.meta.borrow().free_page_count
    }

    /// Returns `true` if the allocator contains the pointer address.
    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.heap.as_ptr() as usize;
        (start..start + self.heap_layout.size()).contains(&(ptr as usize))
    }

    /// Returns the relative address of `ptr`, or `None` if it lies outside the heap.
    pub fn rel_ptr(&self, ptr: NonNull<u8>) -> Option<RelPtrU32<u8>> {
        self.contains(ptr.as_ptr())
            .then(|| RelPtrU32::with_addr(ptr.as_ptr() as usize - self.heap.as_ptr() as usize))
    }

    /// Returns the absolute address of a block.
    pub fn get(&self, rel_ptr: RelPtrU32<u8>) -> Option<NonNull<u8>> {
        (rel_ptr.addr() < self.heap_layout.size()).then(|| self.get_ptr_unchecked(rel_ptr.addr()))
    }

    fn get_ptr_unchecked(&self, addr: usize) -> NonNull<u8> {
        debug_assert!(addr < self.heap_layout.size());
        // SAFETY: addr is inside the heap, so the result is in bounds and non-null
        unsafe { NonNull::new_unchecked(self.heap.as_ptr().add(addr)) }
    }

    /// Returns the index of the page containing the given addr.
    #[inline]
    fn get_page_index(&self, addr: usize) -> usize {
        addr >> self.page_size.ilog2()
    }

    /// Returns the given addr modulo the allocator's page size.
    #[inline]
    fn get_addr_in_page(&self, addr: usize) -> usize {
        addr & (self.page_size - 1)
    }

    /// Allocates a block.
    ///
    /// Returns a relative pointer to an unitialized block that meets the size and alignment
    /// required by `layout`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if there is no memory available that meets the requirements.
    pub fn allocate_block(&self, layout: Layout) -> Result<RelPtrU32<u8>, AllocError> {
        let size = layout.size();
        assert!(size != 0, "zero-sized allocations are not supported");

        if size > self.page_size {
            error!(
                "size requested is larger than the maximum block size: {} > {}",
                ByteSize::b(size as u64).to_string_as(true),
                ByteSize::b(self.page_size as u64).to_string_as(true)
            );
            return Err(AllocError::RequestTooLarge);
        }

        let bin_index = size_to_bin(size);
        let mut meta = self.meta.borrow_mut();
        let Meta {
            bins,
            pages,
            free_pages,
            free_page_count,
            used_blocks,
        } = &mut *meta;
        let bin = &mut bins[bin_index];

        // blocks start at multiples of the block size from a page-aligned base
        if bin.block_size % layout.align() != 0 {
            error!(
                "alignment {} is not supported for blocks of {}",
                layout.align(),
                ByteSize::b(bin.block_size as u64).to_string_as(true)
            );
            return Err(AllocError::UnsupportedAlignment);
        }

        let page_index = match bin.partial.head() {
            Some(index) => index,
            None => {
                let Some(index) = free_pages.pop(pages) else {
                    error!(
                        "arena is out of pages for a {} block",
                        ByteSize::b(bin.block_size as u64).to_string_as(true)
                    );
                    return Err(AllocError::OutOfMemory);
                };
                *free_page_count -= 1;

                // construct block freelist
                let first = RelPtrU32::<u8>::with_addr(index * self.page_size);
                for i in 0..bin.block_capacity {
                    let block = first.add(i * bin.block_size);
                    let next = (i + 1 < bin.block_capacity)
                        .then(|| first.add((i + 1) * bin.block_size).cast());
                    // SAFETY: the block lies inside this page and the heap is page-aligned
                    unsafe {
                        self.get_ptr_unchecked(block.addr())
                            .cast::<Block>()
                            .as_ptr()
                            .write(Block { next })
                    };
                }

                let page = &mut pages[index];
                page.bin = Some(bin_index);
                page.free = Some(first.cast());
                bin.partial.push(pages, index);
                trace!(
                    "page {index} now holds {} blocks of {}",
                    bin.block_capacity,
                    ByteSize::b(bin.block_size as u64).to_string_as(true)
                );
                index
            }
        };

        let page = &mut pages[page_index];
        debug_assert_eq!(page.bin, Some(bin_index));
        let Some(ptr) = page.free else {
            return Err(AllocError::OutOfMemory);
        };
        let addr = ptr.addr();
        debug_assert_eq!(self.get_page_index(addr), page_index);

        let block_index = self.get_addr_in_page(addr) / bin.block_size;
        debug_assert!(!page.occupied[block_index]);

        let block = self.get_ptr_unchecked(addr).cast::<Block>();
        // SAFETY: every block on the freelist holds a `Block`
        page.free = unsafe { block.as_ptr().read().next };
        page.occupied.set(block_index, true);
        page.used += 1;
        *used_blocks += 1;

        if page.used == bin.block_capacity {
            bin.partial.remove(pages, page_index);
        }

        Ok(ptr.cast())
    }

    /// Frees a block.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the pointer is invalid or the pointee block was not in use.
    pub fn deallocate_block(&self, rel_ptr: RelPtrU32<u8>) -> Result<(), AllocError> {
        let addr = rel_ptr.addr();
        if addr >= self.heap_layout.size() {
            return Err(AllocError::PointerOutsideRange);
        }

        let mut meta = self.meta.borrow_mut();
        let Meta {
            bins,
            pages,
            free_pages,
            free_page_count,
            used_blocks,
        } = &mut *meta;

        let page_index = self.get_page_index(addr);
        // an unused page has no blocks to free
        let Some(bin_index) = pages[page_index].bin else {
            return Err(AllocError::BlockAlreadyFree);
        };
        let bin = &mut bins[bin_index];

        let addr_in_page = self.get_addr_in_page(addr);
        let block_index = addr_in_page / bin.block_size;
        if (addr_in_page % bin.block_size) != 0 || block_index >= bin.block_capacity {
            return Err(AllocError::PointerNotAligned);
        }

        let page = &mut pages[page_index];
        if !page.occupied[block_index] {
            return Err(AllocError::BlockAlreadyFree);
        }

        let was_full = page.used == bin.block_capacity;
        let block = self.get_ptr_unchecked(addr).cast::<Block>();
        // SAFETY: the block is in use, so nobody else reads it as a `Block`
        unsafe { block.as_ptr().write(Block { next: page.free }) };
        page.free = Some(rel_ptr.cast());
        page.occupied.set(block_index, false);
        page.used -= 1;
        *used_blocks -= 1;
        let now_empty = page.used == 0;

        if was_full {
            bin.partial.push(pages, page_index);
        }

        if now_empty {
            bin.partial.remove(pages, page_index);
            let page = &mut pages[page_index];
            page.bin = None;
            page.free = None;
            free_pages.push(pages, page_index);
            *free_page_count += 1;
            trace!("page {page_index} returned to the arena");
        }

        Ok(())
    }
}

impl Allocator for Arena {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        self.allocate_block(layout)
            .map(|rel_ptr| self.get_ptr_unchecked(rel_ptr.addr()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        let result = self
            .rel_ptr(ptr)
            .ok_or(AllocError::PointerOutsideRange)
            .and_then(|rel_ptr| self.deallocate_block(rel_ptr));
        if let Err(err) = result {
            error!("invalid deallocation of {ptr:p}: {err}");
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: heap was allocated with heap_layout in `with_config`
        unsafe { alloc::dealloc(self.heap.as_ptr(), self.heap_layout) }
    }
}
