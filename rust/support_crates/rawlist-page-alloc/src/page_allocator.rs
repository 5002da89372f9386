//! A [`RegionAllocator`] that maps memory pages directly from the operating system.
//!
//! Every region is rounded up to whole pages, aligned to the page size and
//! zero-filled on first touch. Large (huge) pages reduce TLB pressure for big
//! element buffers; they are used only when the system is configured for them,
//! otherwise the allocator silently falls back to regular pages at construction.
//!
//! Growing a region allocated from regular pages is done in place when the
//! platform supports remapping (`mremap` on Linux), so a growable list placed
//! on this allocator avoids the copy that a heap reallocation would need.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::OnceLock;

use rawlist_common_traits::region_allocator::{AllocError, AllocFailure, RegionAllocator};

use crate::mmap;

/// Page-granular allocator backed by anonymous memory mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageAllocator {
    large_pages: bool,
}

impl PageAllocator {
    /// Creates an allocator that uses regular pages.
    pub const fn regular() -> PageAllocator {
        PageAllocator { large_pages: false }
    }

    /// Creates an allocator that uses large pages when the system supports them,
    /// and regular pages otherwise.
    pub fn with_large_pages() -> PageAllocator {
        let large_pages = large_pages_supported();
        if !large_pages {
            log::debug!("large pages unavailable, page allocator falls back to regular pages");
        }
        PageAllocator { large_pages }
    }

    /// Returns `true` if regions are backed by large pages.
    #[inline]
    pub fn uses_large_pages(&self) -> bool {
        self.large_pages
    }

    /// Size of a regular memory page on the current system.
    pub fn regular_page_size() -> usize {
        mmap::get_page_size()
    }

    /// Size of a large memory page on the current system.
    pub fn large_page_size() -> usize {
        mmap::get_large_page_size()
    }

    /// Page size this allocator rounds regions to. This is also the alignment
    /// of every region it returns.
    #[inline]
    pub fn granularity(&self) -> usize {
        if self.large_pages {
            Self::large_page_size()
        } else {
            Self::regular_page_size()
        }
    }

    /// Number of bytes actually mapped for a request of `size` bytes.
    pub fn region_capacity(&self, size: usize) -> std::io::Result<usize> {
        mmap::round_to_page(size, self.granularity())
    }

    fn map_err(layout: Layout, e: std::io::Error) -> AllocError {
        let cause = match e.raw_os_error() {
            Some(code) => AllocFailure::Os(code),
            None => AllocFailure::OutOfMemory,
        };
        AllocError::new(layout, cause)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, capacity: usize) {
        let res = if self.large_pages {
            unsafe { mmap::free_large_pages(ptr, capacity) }
        } else {
            unsafe { mmap::free(ptr, capacity) }
        };
        if let Err(e) = res {
            log::warn!("failed to unmap {capacity} bytes at {ptr:p}: {e}");
        }
    }
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::regular()
    }
}

unsafe impl RegionAllocator for PageAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if layout.align() > self.granularity() {
            return Err(AllocError::new(layout, AllocFailure::UnsupportedAlignment));
        }
        let res = if self.large_pages {
            mmap::allocate_large_pages(layout.size())
        } else {
            mmap::allocate(layout.size())
        };
        res.map(|(ptr, _capacity)| ptr)
            .map_err(|e| Self::map_err(layout, e))
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        match self.region_capacity(layout.size()) {
            Ok(capacity) => unsafe { self.release(ptr, capacity) },
            Err(e) => log::warn!("cannot release region of {} bytes: {e}", layout.size()),
        }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        let old_capacity = self
            .region_capacity(old_layout.size())
            .map_err(|e| Self::map_err(new_layout, e))?;
        let new_capacity = self
            .region_capacity(new_layout.size())
            .map_err(|e| Self::map_err(new_layout, e))?;
        if old_capacity == new_capacity {
            return Ok(ptr);
        }

        if !self.large_pages {
            return unsafe { mmap::remap(ptr, old_capacity, new_capacity) }
                .map_err(|e| Self::map_err(new_layout, e));
        }

        let new_ptr = self.allocate(new_layout)?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                new_ptr.as_ptr(),
                old_layout.size().min(new_layout.size()),
            );
            self.release(ptr, old_capacity);
        }
        Ok(new_ptr)
    }

    fn name(&self) -> &'static str {
        if self.large_pages {
            "large-pages"
        } else {
            "pages"
        }
    }
}

/// Checks whether large page allocations work on this system.
///
/// Performs a single test allocation the first time it is called; the result
/// is cached for the lifetime of the process.
pub fn large_pages_supported() -> bool {
    static RESULT: OnceLock<bool> = OnceLock::new();
    *RESULT.get_or_init(|| match mmap::allocate_large_pages(1) {
        Ok((ptr, capacity)) => {
            if let Err(e) = unsafe { mmap::free_large_pages(ptr, capacity) } {
                log::warn!("failed to unmap large page probe at {ptr:p}: {e}");
            }
            true
        }
        Err(e) => {
            log::debug!("large page probe failed: {e}");
            false
        }
    })
}
