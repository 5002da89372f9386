//! Growable lists over an explicitly allocated region.

use std::mem::ManuallyDrop;
use std::ptr::NonNull;

use rawlist_common::{Error, Result};

use crate::alloc::{Heap, RegionAllocator};
use crate::config::GrowthPolicy;
use crate::list::{List, Storage, index_out_of_range, sealed};
use crate::region::OwnedRegion;

/// A list that owns a reallocatable region obtained from an allocator `A`.
///
/// Any operation that changes the capacity moves the region, which
/// invalidates addresses obtained from [`as_ptr`](List::as_ptr). The borrow
/// checker already rules out slices and views held across such a call.
///
/// The region goes back to the allocator when the list is dropped or
/// explicitly [disposed](UnsafeList::dispose).
pub type UnsafeList<T, A = Heap> = List<T, GrowableStorage<T, A>>;

/// Storage of an [`UnsafeList`].
pub struct GrowableStorage<T, A: RegionAllocator> {
    region: OwnedRegion<T, A>,
    policy: GrowthPolicy,
}

impl<T, A: RegionAllocator> sealed::Sealed for GrowableStorage<T, A> {}

// SAFETY: the region is valid for `capacity` elements until it is resized,
// which requires `&mut` access to the list.
unsafe impl<T, A: RegionAllocator> Storage<T> for GrowableStorage<T, A> {
    #[inline]
    fn base(&self) -> NonNull<T> {
        self.region.ptr()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.region.capacity()
    }
}

impl<T: Copy> UnsafeList<T, Heap> {
    /// Creates an empty list on the global heap with room for `capacity` elements.
    pub fn new(capacity: usize) -> Result<UnsafeList<T, Heap>> {
        Self::new_in(capacity, Heap)
    }

    /// Creates a list on the global heap holding a copy of `values`.
    pub fn from_slice(values: &[T]) -> Result<UnsafeList<T, Heap>> {
        Self::from_slice_in(values, Heap)
    }

    /// Takes over the allocation of `vec` without copying.
    pub fn from_vec(vec: Vec<T>) -> UnsafeList<T, Heap> {
        let mut vec = ManuallyDrop::new(vec);
        let (len, capacity) = (vec.len(), vec.capacity());
        // SAFETY: a `Vec` pointer is never null.
        let ptr = unsafe { NonNull::new_unchecked(vec.as_mut_ptr()) };
        // SAFETY: a `Vec<T>` buffer is allocated by the global allocator with
        // `Layout::array::<T>(capacity)`, the exact layout `Heap` regions use,
        // and its first `len` elements are initialized.
        unsafe { Self::from_raw_parts_in(ptr, len, capacity, Heap) }
    }

    /// Turns the list into a `Vec`, reusing the region when its alignment is
    /// the natural alignment of `T`.
    pub fn into_vec(self) -> Vec<T> {
        if self.storage.region.align() != std::mem::align_of::<T>() {
            return self.to_vec();
        }
        let len = self.len();
        let List { storage, .. } = self;
        let (ptr, capacity, _) = storage.region.into_raw_parts();
        // SAFETY: the region was allocated by the global allocator with the
        // layout of `Vec<T>` with this capacity, or is dangling and empty.
        unsafe { Vec::from_raw_parts(ptr.as_ptr(), len, capacity) }
    }
}

impl<T: Copy, A: RegionAllocator> UnsafeList<T, A> {
    /// Creates an empty list with room for `capacity` elements, using the
    /// default [`GrowthPolicy`].
    pub fn new_in(capacity: usize, allocator: A) -> Result<UnsafeList<T, A>> {
        Self::with_policy_in(capacity, GrowthPolicy::default(), allocator)
    }

    /// Creates an empty list with room for `capacity` elements.
    pub fn with_policy_in(
        capacity: usize,
        policy: GrowthPolicy,
        allocator: A,
    ) -> Result<UnsafeList<T, A>> {
        policy.validate()?;
        let region = OwnedRegion::allocate(capacity, policy.alignment_for::<T>(), allocator)?;
        Ok(List::from_storage(GrowableStorage { region, policy }, 0))
    }

    /// Creates a list holding a copy of `values`, with no spare capacity.
    pub fn from_slice_in(values: &[T], allocator: A) -> Result<UnsafeList<T, A>> {
        let mut list = Self::new_in(values.len(), allocator)?;
        list.add_range(values)?;
        Ok(list)
    }

    /// Adopts an existing region of `capacity` elements whose first `length`
    /// are valid. The list becomes the sole owner and releases the region
    /// through `allocator`.
    ///
    /// # Safety
    ///
    /// - `ptr` must have been allocated by `allocator` with the layout
    ///   `Layout::array::<T>(capacity)`, or be dangling and well aligned when
    ///   `capacity` is zero.
    /// - The first `length` elements must be initialized and
    ///   `length <= capacity`.
    /// - Nothing else may use or release the region afterwards.
    pub unsafe fn from_raw_parts_in(
        ptr: NonNull<T>,
        length: usize,
        capacity: usize,
        allocator: A,
    ) -> UnsafeList<T, A> {
        // SAFETY: forwarded to the caller.
        let region = unsafe {
            OwnedRegion::from_raw_parts(ptr, capacity, std::mem::align_of::<T>(), allocator)
        };
        List::from_storage(
            GrowableStorage {
                region,
                policy: GrowthPolicy::default(),
            },
            length,
        )
    }

    pub fn allocator(&self) -> &A {
        self.storage.region.allocator()
    }

    pub fn policy(&self) -> &GrowthPolicy {
        &self.storage.policy
    }

    /// Reallocates the region to exactly `new_capacity` elements.
    ///
    /// Fails with `InvalidArgument` if `new_capacity < len()`, and with the
    /// allocator's error if the region cannot be moved. The list is unchanged
    /// on failure.
    pub fn set_capacity(&mut self, new_capacity: usize) -> Result<()> {
        let len = self.len();
        if new_capacity < len {
            return Err(Error::invalid_arg(
                "new_capacity",
                format!("{new_capacity} is less than the length {len}"),
            ));
        }
        self.reallocate(new_capacity)
    }

    /// Makes sure at least `min_capacity` elements fit, growing by the
    /// [`GrowthPolicy`] when they do not.
    pub fn ensure_capacity(&mut self, min_capacity: usize) -> Result<()> {
        let capacity = self.capacity();
        if min_capacity <= capacity {
            return Ok(());
        }
        let new_capacity = self.storage.policy.next_capacity(capacity, min_capacity);
        self.reallocate(new_capacity)
    }

    /// Makes room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len()
            .checked_add(additional)
            .ok_or_else(|| Error::capacity_overflow(usize::MAX, std::mem::size_of::<T>()))?;
        self.ensure_capacity(required)
    }

    /// Shrinks the capacity to the length.
    pub fn trim_excess(&mut self) -> Result<()> {
        self.reallocate(self.len())
    }

    fn reallocate(&mut self, new_capacity: usize) -> Result<()> {
        let old_capacity = self.capacity();
        if new_capacity == old_capacity {
            return Ok(());
        }
        self.storage.region.resize(new_capacity)?;
        log::debug!(
            "list of {}-byte elements reallocated on {}: {} -> {} elements",
            std::mem::size_of::<T>(),
            self.storage.region.allocator().name(),
            old_capacity,
            new_capacity,
        );
        Ok(())
    }

    /// Appends `value`, growing the region if the list is full.
    pub fn add(&mut self, value: T) -> Result<()> {
        if self.is_full() {
            self.reserve(1)?;
        }
        self.add_no_resize(value);
        Ok(())
    }

    /// Appends all of `values`, growing the region at most once.
    pub fn add_range(&mut self, values: &[T]) -> Result<()> {
        self.reserve(values.len())?;
        let added = self.try_add_range_no_resize(values);
        debug_assert!(added);
        Ok(())
    }

    /// Inserts `value` at `index`, shifting `[index, len)` one slot right.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`; appending goes through [`add`](Self::add).
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        let len = self.len();
        if index >= len {
            index_out_of_range(index, len);
        }
        self.insert_range(index, std::slice::from_ref(&value))
    }

    /// Inserts `values` at `index`, shifting `[index, len)` right.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert_range(&mut self, index: usize, values: &[T]) -> Result<()> {
        let len = self.len();
        if index > len {
            index_out_of_range(index, len);
        }
        self.reserve(values.len())?;
        let base = self.as_mut_ptr();
        // SAFETY: after `reserve` the region holds `len + values.len()` slots.
        // The tail move may overlap itself, the insert source cannot overlap
        // the list.
        unsafe {
            std::ptr::copy(base.add(index), base.add(index + values.len()), len - index);
            std::ptr::copy_nonoverlapping(values.as_ptr(), base.add(index), values.len());
            self.set_len(len + values.len());
        }
        Ok(())
    }

    /// Sets the length to `new_len`, growing the region if needed and filling
    /// new slots with `value`. Shrinking only truncates.
    pub fn resize(&mut self, new_len: usize, value: T) -> Result<()> {
        self.ensure_capacity(new_len)?;
        self.resize_within_capacity(new_len, value);
        Ok(())
    }

    /// Sets the length to `new_len`, filling new slots with zero bytes.
    pub fn resize_zeroed(&mut self, new_len: usize) -> Result<()>
    where
        T: bytemuck::Zeroable,
    {
        self.resize(new_len, T::zeroed())
    }

    /// Replaces the contents with a copy of `values`, growing if needed.
    pub fn copy_from(&mut self, values: &[T]) -> Result<()> {
        self.clear();
        self.add_range(values)
    }

    /// Copies the list into a new region from a clone of its allocator.
    pub fn try_clone(&self) -> Result<UnsafeList<T, A>>
    where
        A: Clone,
    {
        let mut list =
            Self::with_policy_in(self.len(), self.storage.policy, self.allocator().clone())?;
        list.add_range(self.as_slice())?;
        Ok(list)
    }

    /// Releases the region back to the allocator.
    ///
    /// Dropping the list has the same effect; `dispose` marks the release
    /// point explicitly.
    pub fn dispose(self) {
        log::debug!(
            "disposing list of {} elements ({} allocated) on {}",
            self.len(),
            self.capacity(),
            self.allocator().name(),
        );
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{AllocFailure, Budgeted, PageAllocator};
    use rawlist_common::error::ErrorKind;

    #[test]
    fn test_add_grows() {
        let mut list = UnsafeList::<i32>::new(2).unwrap();
        list.add(10).unwrap();
        list.add(20).unwrap();
        list.add(30).unwrap();
        assert!(list.capacity() >= 3);
        assert_eq!(list.len(), 3);
        assert_eq!(
            [*list.element_at(0), *list.element_at(1), *list.element_at(2)],
            [10, 20, 30]
        );
    }

    #[test]
    fn test_try_add_no_resize_does_not_grow() {
        let mut list = UnsafeList::<u8>::new(1).unwrap();
        assert!(list.try_add_no_resize(1));
        assert!(!list.try_add_no_resize(2));
        assert_eq!(list.capacity(), 1);
        assert_eq!(list, [1]);
    }

    #[test]
    fn test_growth_follows_policy() {
        let policy = GrowthPolicy::new().with_min_capacity(4).with_factor(3);
        let mut list = UnsafeList::<u64>::with_policy_in(0, policy, Heap).unwrap();
        list.add(1).unwrap();
        assert_eq!(list.capacity(), 4);
        list.add_range(&[2, 3, 4, 5]).unwrap();
        assert_eq!(list.capacity(), 12);
        list.reserve(100).unwrap();
        assert_eq!(list.capacity(), 105);
    }

    #[test]
    fn test_invalid_policy_rejected() {
        let policy = GrowthPolicy::new().with_factor(1);
        let err = UnsafeList::<u64>::with_policy_in(4, policy, Heap).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_aligned_region() {
        let policy = GrowthPolicy::new().with_alignment(64);
        let mut list = UnsafeList::<u16>::with_policy_in(3, policy, Heap).unwrap();
        assert!((list.as_ptr() as usize).is_multiple_of(64));
        list.add_range(&[1; 100]).unwrap();
        assert!((list.as_ptr() as usize).is_multiple_of(64));
        let vec = list.into_vec();
        assert_eq!(vec.len(), 100);
    }

    #[test]
    fn test_insert() {
        let mut list = UnsafeList::<char>::from_slice(&['a', 'b', 'd']).unwrap();
        list.insert(2, 'c').unwrap();
        list.insert(0, '_').unwrap();
        assert_eq!(list, ['_', 'a', 'b', 'c', 'd']);
        list.insert_range(5, &['e', 'f']).unwrap();
        list.insert_range(1, &[]).unwrap();
        assert_eq!(list, ['_', 'a', 'b', 'c', 'd', 'e', 'f']);
    }

    #[test]
    #[should_panic(expected = "index out of range")]
    fn test_insert_at_end_panics() {
        let mut list = UnsafeList::<i32>::from_slice(&[1, 2]).unwrap();
        let _ = list.insert(2, 3);
    }

    #[test]
    fn test_set_capacity() {
        let mut list = UnsafeList::<u32>::from_slice(&[1, 2, 3]).unwrap();
        list.set_capacity(10).unwrap();
        assert_eq!(list.capacity(), 10);
        assert_eq!(list, [1, 2, 3]);

        let err = list.set_capacity(2).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        assert_eq!(list.capacity(), 10);

        list.trim_excess().unwrap();
        assert_eq!(list.capacity(), 3);
        list.clear();
        list.trim_excess().unwrap();
        assert_eq!(list.capacity(), 0);
        list.add(7).unwrap();
        assert_eq!(list, [7]);
    }

    #[test]
    fn test_resize_grows_and_fills() {
        let mut list = UnsafeList::<i16>::new(1).unwrap();
        list.add(5).unwrap();
        list.resize(4, -2).unwrap();
        assert_eq!(list, [5, -2, -2, -2]);
        list.resize(1, 0).unwrap();
        assert_eq!(list, [5]);
        list.resize_zeroed(3).unwrap();
        assert_eq!(list, [5, 0, 0]);
    }

    #[test]
    fn test_vec_roundtrip() {
        let mut vec = Vec::with_capacity(16);
        vec.extend_from_slice(&[1u64, 2, 3]);
        let mut list = UnsafeList::<u64>::from_vec(vec);
        assert_eq!(list.capacity(), 16);
        assert_eq!(list, [1, 2, 3]);
        list.add(4).unwrap();
        let vec = list.into_vec();
        assert_eq!(vec, vec![1, 2, 3, 4]);
        assert_eq!(vec.capacity(), 16);

        let empty = UnsafeList::<u64>::from_vec(Vec::new());
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn test_adopt_raw_parts() {
        let alloc = Heap;
        let layout = std::alloc::Layout::array::<u32>(4).unwrap();
        let ptr = alloc.allocate(layout).unwrap().cast::<u32>();
        unsafe {
            ptr.as_ptr().write(11);
            ptr.as_ptr().add(1).write(22);
        }
        let mut list = unsafe { UnsafeList::<u32>::from_raw_parts_in(ptr, 2, 4, alloc) };
        assert_eq!(list, [11, 22]);
        list.add_range(&[33, 44, 55]).unwrap();
        assert_eq!(list, [11, 22, 33, 44, 55]);
        list.dispose();
    }

    #[test]
    fn test_budget_failure_leaves_list_intact() {
        let budget = Budgeted::new(Heap, 16);
        let policy = GrowthPolicy::new().with_min_capacity(0);
        let mut list = UnsafeList::<u32, _>::with_policy_in(2, policy, &budget).unwrap();
        list.add_range(&[1, 2, 3, 4]).unwrap();
        assert_eq!(list.capacity(), 4);
        assert_eq!(budget.remaining(), 0);

        let err = list.add(5).unwrap_err();
        let alloc_error = err.alloc_error().expect("allocation error");
        assert_eq!(alloc_error.cause(), AllocFailure::BudgetExceeded);
        assert_eq!(list, [1, 2, 3, 4]);
        assert!(!list.try_add_no_resize(5));

        list.dispose();
        assert_eq!(budget.remaining(), 16);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut list = UnsafeList::<u8>::from_slice(&[1, 2, 3]).unwrap();
        let copy = list.try_clone().unwrap();
        list[0] = 100;
        assert_eq!(copy, [1, 2, 3]);
        assert_ne!(list, copy);
    }

    #[test]
    fn test_page_allocator_backing() {
        let mut list = UnsafeList::<u64, _>::new_in(16, PageAllocator::regular()).unwrap();
        for i in 0..10_000u64 {
            list.add(i).unwrap();
        }
        assert_eq!(list.len(), 10_000);
        assert!(list.iter().copied().eq(0..10_000));
        list.remove_range(0, 5_000);
        assert_eq!(*list.element_at(0), 5_000);
        list.trim_excess().unwrap();
        assert_eq!(list.capacity(), 5_000);
    }
}
