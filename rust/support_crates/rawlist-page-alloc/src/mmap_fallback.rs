//! Page allocation emulated on top of the global allocator, for platforms
//! without a native backend. Regions are page-aligned and zeroed like real
//! mappings.

use std::alloc::{Layout, alloc_zeroed, dealloc, realloc};
use std::ptr::NonNull;

/// Allocates `size` bytes aligned to the (emulated) large page size.
pub fn allocate_large_pages(size: usize) -> std::io::Result<(NonNull<u8>, usize)> {
    allocate_aligned(size, get_large_page_size())
}

/// Frees a region returned by [`allocate_large_pages`].
///
/// # Safety
///
/// `ptr` and `capacity` must be exactly the pair returned by the allocation.
pub unsafe fn free_large_pages(ptr: NonNull<u8>, capacity: usize) -> std::io::Result<()> {
    let layout = page_layout(capacity, get_large_page_size())?;
    unsafe { dealloc(ptr.as_ptr(), layout) };
    Ok(())
}

/// Allocates `size` bytes aligned to the (emulated) regular page size.
pub fn allocate(size: usize) -> std::io::Result<(NonNull<u8>, usize)> {
    allocate_aligned(size, get_page_size())
}

/// Frees a region returned by [`allocate`] or [`remap`].
///
/// # Safety
///
/// `ptr` and `capacity` must describe a live region created by this module.
pub unsafe fn free(ptr: NonNull<u8>, capacity: usize) -> std::io::Result<()> {
    let layout = page_layout(capacity, get_page_size())?;
    unsafe { dealloc(ptr.as_ptr(), layout) };
    Ok(())
}

/// Resizes a regular-page region. Newly exposed bytes are zeroed.
///
/// # Safety
///
/// `ptr` and `old_capacity` must describe a live regular-page region created
/// by this module, and `new_capacity` must be a non-zero multiple of
/// [`get_page_size`].
pub unsafe fn remap(
    ptr: NonNull<u8>,
    old_capacity: usize,
    new_capacity: usize,
) -> std::io::Result<NonNull<u8>> {
    let layout = page_layout(old_capacity, get_page_size())?;
    let new_ptr = unsafe { realloc(ptr.as_ptr(), layout, new_capacity) };
    let new_ptr = NonNull::new(new_ptr)
        .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::OutOfMemory))?;
    if new_capacity > old_capacity {
        unsafe {
            new_ptr
                .as_ptr()
                .add(old_capacity)
                .write_bytes(0, new_capacity - old_capacity);
        }
    }
    Ok(new_ptr)
}

/// Returns the emulated large page size in bytes.
pub fn get_large_page_size() -> usize {
    2 * 1024 * 1024
}

/// Returns the emulated regular page size in bytes.
pub fn get_page_size() -> usize {
    4 * 1024
}

/// Rounds `size` up to a whole number of pages; a zero size maps one page.
pub fn round_to_page(size: usize, page_size: usize) -> std::io::Result<usize> {
    assert!(page_size.is_power_of_two());
    size.max(1)
        .checked_add(page_size - 1)
        .map(|n| n & !(page_size - 1))
        .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::OutOfMemory))
}

fn allocate_aligned(size: usize, page_size: usize) -> std::io::Result<(NonNull<u8>, usize)> {
    let capacity = round_to_page(size, page_size)?;
    let layout = page_layout(capacity, page_size)?;
    let ptr = unsafe { alloc_zeroed(layout) };
    let ptr =
        NonNull::new(ptr).ok_or_else(|| std::io::Error::from(std::io::ErrorKind::OutOfMemory))?;
    Ok((ptr, capacity))
}

fn page_layout(capacity: usize, page_size: usize) -> std::io::Result<Layout> {
    Layout::from_size_align(capacity, page_size)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid layout"))
}
