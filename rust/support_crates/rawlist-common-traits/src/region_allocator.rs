//! `RegionAllocator`: a source of raw, contiguous memory regions.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::Arc;

/// A source of raw, contiguous memory regions with an explicit release point.
///
/// Regions are described by a [`Layout`]. The same layout that was used to
/// allocate a region must be presented again when the region is reallocated
/// or released. Callers never request zero-sized regions; an empty list holds
/// a dangling pointer and no region at all.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - A region returned by `allocate(layout)` is valid for reads and writes of
///   `layout.size()` bytes and is aligned to at least `layout.align()`.
/// - The region stays valid until it is passed to `deallocate` or
///   `reallocate` on the same allocator.
/// - Live regions never overlap.
pub unsafe trait RegionAllocator {
    /// Allocates a region described by `layout`.
    ///
    /// The content of the returned region is unspecified.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a region back to the allocator.
    ///
    /// Release failures are not reported to the caller: once a region is
    /// handed back, its owner has no way to retry.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a live region allocated by this allocator with
    /// exactly `layout`. The region must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Moves a region into a region of `new_layout`, preserving the first
    /// `min(old_layout.size(), new_layout.size())` bytes.
    ///
    /// On success the old region is released. On failure the old region is
    /// left untouched and still owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must denote a live region allocated by this allocator with
    /// exactly `old_layout`, and `new_layout.align()` must equal
    /// `old_layout.align()`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert_eq!(old_layout.align(), new_layout.align());
        let new_ptr = self.allocate(new_layout)?;
        let preserved = old_layout.size().min(new_layout.size());
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), preserved);
            self.deallocate(ptr, old_layout);
        }
        Ok(new_ptr)
    }

    /// Short human-readable name, used in diagnostics.
    fn name(&self) -> &'static str;
}

unsafe impl<A> RegionAllocator for &A
where
    A: RegionAllocator + ?Sized,
{
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        unsafe { (**self).reallocate(ptr, old_layout, new_layout) }
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

unsafe impl<A> RegionAllocator for Arc<A>
where
    A: RegionAllocator + ?Sized,
{
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { (**self).deallocate(ptr, layout) }
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        unsafe { (**self).reallocate(ptr, old_layout, new_layout) }
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// An error reported when an allocator cannot supply a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocError {
    size: usize,
    align: usize,
    cause: AllocFailure,
}

/// The reason an allocation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocFailure {
    /// The underlying allocator returned no memory.
    OutOfMemory,
    /// The request would exceed a configured byte budget.
    BudgetExceeded,
    /// The allocator cannot satisfy the requested alignment.
    UnsupportedAlignment,
    /// The operating system refused the request with the given error code.
    Os(i32),
}

impl AllocError {
    pub fn new(layout: Layout, cause: AllocFailure) -> AllocError {
        AllocError {
            size: layout.size(),
            align: layout.align(),
            cause,
        }
    }

    /// Requested region size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Requested region alignment in bytes.
    pub fn align(&self) -> usize {
        self.align
    }

    pub fn cause(&self) -> AllocFailure {
        self.cause
    }
}

impl std::fmt::Display for AllocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to allocate {} bytes (align {}): ",
            self.size, self.align
        )?;
        match self.cause {
            AllocFailure::OutOfMemory => f.write_str("out of memory"),
            AllocFailure::BudgetExceeded => f.write_str("budget exceeded"),
            AllocFailure::UnsupportedAlignment => f.write_str("unsupported alignment"),
            AllocFailure::Os(code) => write!(f, "os error {code}"),
        }
    }
}

impl std::error::Error for AllocError {}

impl From<AllocError> for std::io::Error {
    fn from(e: AllocError) -> Self {
        match e.cause {
            AllocFailure::Os(code) => std::io::Error::from_raw_os_error(code),
            AllocFailure::OutOfMemory => std::io::Error::new(std::io::ErrorKind::OutOfMemory, e),
            _ => std::io::Error::other(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_error_display() {
        let layout = Layout::from_size_align(64, 8).unwrap();
        let e = AllocError::new(layout, AllocFailure::BudgetExceeded);
        assert_eq!(e.size(), 64);
        assert_eq!(e.align(), 8);
        assert_eq!(
            e.to_string(),
            "failed to allocate 64 bytes (align 8): budget exceeded"
        );
    }

    #[test]
    fn test_alloc_error_into_io_error() {
        let layout = Layout::from_size_align(16, 16).unwrap();
        let io: std::io::Error = AllocError::new(layout, AllocFailure::OutOfMemory).into();
        assert_eq!(io.kind(), std::io::ErrorKind::OutOfMemory);

        let io: std::io::Error = AllocError::new(layout, AllocFailure::Os(12)).into();
        assert_eq!(io.raw_os_error(), Some(12));
    }
}
