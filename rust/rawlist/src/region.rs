//! Owned element regions: raw memory obtained from a [`RegionAllocator`] with a
//! single release point.
//!
//! An [`OwnedRegion`] knows its base address, its capacity in elements, its
//! alignment and the allocator it came from. Dropping it returns the memory to
//! that allocator. A region with zero capacity holds a dangling, well-aligned
//! base address and no memory at all.

use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use rawlist_common::{Error, Result};

use crate::alloc::RegionAllocator;

/// Exclusively owned, uninitialized storage for `capacity` elements of `T`.
pub struct OwnedRegion<T, A: RegionAllocator> {
    ptr: NonNull<T>,
    capacity: usize,
    align: usize,
    allocator: A,
    _marker: PhantomData<T>,
}

// SAFETY: the region is exclusively owned; moving it to another thread moves
// the elements and the allocator handle with it.
unsafe impl<T: Send, A: RegionAllocator + Send> Send for OwnedRegion<T, A> {}

// SAFETY: shared access only hands out shared element references.
unsafe impl<T: Sync, A: RegionAllocator + Sync> Sync for OwnedRegion<T, A> {}

impl<T, A: RegionAllocator> OwnedRegion<T, A> {
    /// Creates an empty region that owns no memory yet.
    pub fn empty(align: usize, allocator: A) -> OwnedRegion<T, A> {
        assert_element_size::<T>();
        debug_assert!(align.is_power_of_two() && align >= std::mem::align_of::<T>());
        OwnedRegion {
            ptr: dangling(align),
            capacity: 0,
            align,
            allocator,
            _marker: PhantomData,
        }
    }

    /// Allocates storage for `capacity` elements aligned to `align` bytes.
    pub fn allocate(capacity: usize, align: usize, allocator: A) -> Result<OwnedRegion<T, A>> {
        let mut region = Self::empty(align, allocator);
        region.resize(capacity)?;
        Ok(region)
    }

    /// Takes ownership of an existing region.
    ///
    /// # Safety
    ///
    /// `ptr` must have been allocated by `allocator` with exactly
    /// `OwnedRegion::<T, A>::layout(capacity, align)`, or be a dangling pointer
    /// aligned to `align` if `capacity` is zero. Nothing else may release it.
    pub unsafe fn from_raw_parts(
        ptr: NonNull<T>,
        capacity: usize,
        align: usize,
        allocator: A,
    ) -> OwnedRegion<T, A> {
        assert_element_size::<T>();
        OwnedRegion {
            ptr,
            capacity,
            align,
            allocator,
            _marker: PhantomData,
        }
    }

    /// Gives up ownership without releasing the memory.
    pub fn into_raw_parts(self) -> (NonNull<T>, usize, A) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again after the allocator is
        // moved out.
        let allocator = unsafe { std::ptr::read(&this.allocator) };
        (this.ptr, this.capacity, allocator)
    }

    #[inline]
    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Layout of a region holding `capacity` elements of `T` aligned to `align`.
    pub fn layout(capacity: usize, align: usize) -> Result<Layout> {
        Layout::array::<T>(capacity)
            .and_then(|layout| layout.align_to(align))
            .map_err(|_| Error::capacity_overflow(capacity, std::mem::size_of::<T>()))
    }

    /// Moves the region to exactly `new_capacity` elements, preserving the
    /// first `min(capacity, new_capacity)` elements.
    ///
    /// Any address previously obtained from this region is invalid afterwards.
    /// On failure the region is unchanged.
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity == self.capacity {
            return Ok(());
        }
        let new_layout = Self::layout(new_capacity, self.align)?;

        if new_capacity == 0 {
            self.release();
            self.ptr = dangling(self.align);
            self.capacity = 0;
            return Ok(());
        }

        let ptr = if self.capacity == 0 {
            self.allocator.allocate(new_layout)?
        } else {
            let old_layout = Self::layout(self.capacity, self.align)?;
            // SAFETY: `self.ptr` is live and was allocated with `old_layout`
            // by `self.allocator`; both layouts share `self.align`.
            unsafe {
                self.allocator
                    .reallocate(self.ptr.cast(), old_layout, new_layout)?
            }
        };
        self.ptr = ptr.cast();
        self.capacity = new_capacity;
        Ok(())
    }

    fn release(&mut self) {
        if self.capacity == 0 {
            return;
        }
        match Self::layout(self.capacity, self.align) {
            // SAFETY: the region is live, was allocated with this layout and is
            // never touched again by the caller.
            Ok(layout) => unsafe { self.allocator.deallocate(self.ptr.cast(), layout) },
            Err(e) => log::warn!("leaking region of {} elements: {e}", self.capacity),
        }
    }
}

impl<T, A: RegionAllocator> Drop for OwnedRegion<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T, A: RegionAllocator> std::fmt::Debug for OwnedRegion<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedRegion")
            .field("ptr", &self.ptr)
            .field("capacity", &self.capacity)
            .field("align", &self.align)
            .field("allocator", &self.allocator.name())
            .finish()
    }
}

/// A non-null, `align`-aligned address that owns nothing.
#[inline]
pub(crate) fn dangling<T>(align: usize) -> NonNull<T> {
    debug_assert!(align.is_power_of_two());
    // SAFETY: `align` is a power of two, hence non-zero.
    unsafe { NonNull::new_unchecked(std::ptr::without_provenance_mut(align)) }
}

#[inline]
pub(crate) fn assert_element_size<T>() {
    assert!(
        std::mem::size_of::<T>() != 0,
        "zero-sized element types are not supported"
    );
}
