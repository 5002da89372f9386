use std::ptr::NonNull;
use std::sync::OnceLock;

/// Maps `size` bytes of anonymous memory backed by large (huge) pages.
///
/// The mapping is rounded up to a multiple of [`get_large_page_size`] and the
/// rounded capacity is returned alongside the pointer. The memory is zeroed.
///
/// Huge pages must be configured by the administrator for this to succeed, e.g.
/// `echo COUNT > /proc/sys/vm/nr_overcommit_hugepages`.
/// See <https://www.kernel.org/doc/Documentation/vm/hugetlbpage.txt>.
pub fn allocate_large_pages(size: usize) -> std::io::Result<(NonNull<u8>, usize)> {
    map(
        round_to_page(size, get_large_page_size())?,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_HUGETLB,
    )
}

/// Unmaps a region returned by [`allocate_large_pages`].
///
/// # Safety
///
/// `ptr` and `capacity` must be exactly the pair returned by the allocation,
/// and the region must not be used afterwards.
pub unsafe fn free_large_pages(ptr: NonNull<u8>, capacity: usize) -> std::io::Result<()> {
    unsafe { free(ptr, capacity) }
}

/// Maps `size` bytes of anonymous memory backed by regular pages.
///
/// The mapping is rounded up to a multiple of [`get_page_size`] and the rounded
/// capacity is returned alongside the pointer. The memory is zeroed.
pub fn allocate(size: usize) -> std::io::Result<(NonNull<u8>, usize)> {
    map(
        round_to_page(size, get_page_size())?,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
    )
}

/// Unmaps a region returned by [`allocate`] or [`remap`].
///
/// # Safety
///
/// `ptr` and `capacity` must describe a live mapping created by this module,
/// and the region must not be used afterwards.
pub unsafe fn free(ptr: NonNull<u8>, capacity: usize) -> std::io::Result<()> {
    let res = unsafe { libc::munmap(ptr.as_ptr().cast(), capacity) };
    if res < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Resizes a regular-page mapping, moving it if the kernel cannot extend it in
/// place. Contents up to the smaller of both capacities are preserved and newly
/// exposed pages are zeroed.
///
/// Returns the (possibly moved) pointer. On failure the old mapping is intact.
///
/// # Safety
///
/// `ptr` and `old_capacity` must describe a live regular-page mapping created
/// by this module, and `new_capacity` must be a non-zero multiple of
/// [`get_page_size`].
pub unsafe fn remap(
    ptr: NonNull<u8>,
    old_capacity: usize,
    new_capacity: usize,
) -> std::io::Result<NonNull<u8>> {
    debug_assert!(new_capacity.is_multiple_of(get_page_size()));
    let res = unsafe {
        libc::mremap(
            ptr.as_ptr().cast(),
            old_capacity,
            new_capacity,
            libc::MREMAP_MAYMOVE,
        )
    };
    if res == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }
    NonNull::new(res.cast()).ok_or_else(|| std::io::Error::other("mremap returned null"))
}

/// Returns the system's large page size in bytes (cached; 2MB if unknown).
pub fn get_large_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| read_large_page_size().unwrap_or(2 * 1024 * 1024))
}

/// Returns the system's regular page size in bytes (cached; 4KB if unknown).
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| read_page_size().unwrap_or(4 * 1024))
}

/// Rounds `size` up to a whole number of pages; a zero size maps one page.
pub fn round_to_page(size: usize, page_size: usize) -> std::io::Result<usize> {
    assert!(page_size.is_power_of_two());
    size.max(1)
        .checked_add(page_size - 1)
        .map(|n| n & !(page_size - 1))
        .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::OutOfMemory))
}

fn map(capacity: usize, flags: libc::c_int) -> std::io::Result<(NonNull<u8>, usize)> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            capacity,
            libc::PROT_READ | libc::PROT_WRITE,
            flags,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }
    let ptr = NonNull::new(ptr.cast()).ok_or_else(|| std::io::Error::other("mmap returned null"))?;
    Ok((ptr, capacity))
}

/// Parses the `Hugepagesize:` line of `/proc/meminfo` (reported in kB).
fn read_large_page_size() -> std::io::Result<usize> {
    let meminfo = std::fs::read_to_string("/proc/meminfo")?;
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("Hugepagesize:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<usize>().ok())
        .map(|kb| kb * 1024)
        .ok_or_else(|| std::io::Error::other("failed to read Hugepagesize"))
}

fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res <= 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(res as usize)
}
