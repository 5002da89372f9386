//! Operating system page allocator for rawlist element buffers.
//!
//! [`PageAllocator`](page_allocator::PageAllocator) hands out page-aligned,
//! zero-filled regions straight from the virtual memory subsystem, optionally
//! backed by large (huge) pages. It implements
//! [`RegionAllocator`](rawlist_common_traits::region_allocator::RegionAllocator),
//! so any growable list can be placed on it.

pub mod page_allocator;

#[cfg_attr(target_os = "linux", path = "mmap_linux.rs")]
#[cfg_attr(not(target_os = "linux"), path = "mmap_fallback.rs")]
pub mod mmap;
