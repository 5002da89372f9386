//! The shared element-buffer contract of fixed and growable lists.
//!
//! A [`List`] is a contiguous run of `capacity` slots of which the first `len`
//! hold valid elements. Slots in `[len, capacity)` are never read. What backs
//! the slots (caller memory, a self-owned fixed region, or a reallocatable
//! region) is decided by the storage parameter `S`; see
//! [`FixedList`](crate::FixedList) and [`UnsafeList`](crate::UnsafeList).
//!
//! The length is kept in an atomic counter so that a
//! [`ParallelWriter`](crate::ParallelWriter) can reserve slots from many threads.
//! Every other operation takes `&mut self` and uses the counter non-atomically.

use std::ops::{Bound, Range, RangeBounds};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::iter::{Iter, IterMut};
use crate::parallel::ParallelWriter;

/// Backing memory of a [`List`].
///
/// # Safety
///
/// `base()` must point to a region valid for reads and writes of `capacity()`
/// elements, aligned for `T`, for as long as the storage value is alive and
/// not mutated through its own methods.
pub unsafe trait Storage<T>: sealed::Sealed {
    /// Address of slot 0.
    fn base(&self) -> NonNull<T>;

    /// Number of slots.
    fn capacity(&self) -> usize;
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A list of trivially copyable elements over raw contiguous storage.
pub struct List<T, S> {
    pub(crate) storage: S,
    pub(crate) len: AtomicUsize,
    pub(crate) _marker: std::marker::PhantomData<T>,
}

impl<T: Copy, S: Storage<T>> List<T, S> {
    pub(crate) fn from_storage(storage: S, len: usize) -> List<T, S> {
        assert!(
            len <= storage.capacity(),
            "length {len} exceeds capacity {}",
            storage.capacity()
        );
        List {
            storage,
            len: AtomicUsize::new(len),
            _marker: std::marker::PhantomData,
        }
    }

    /// Number of valid elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements the current storage can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Byte size of one element.
    #[inline]
    pub const fn stride(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// Base address of the element storage.
    ///
    /// The address is invalidated by any capacity change of a growable list.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.storage.base().as_ptr()
    }

    /// Mutable base address of the element storage.
    ///
    /// The address is invalidated by any capacity change of a growable list.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.storage.base().as_ptr()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: slots `[0, len)` are initialized and `len <= capacity`.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len()) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = self.len();
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), len) }
    }

    /// Returns the element at `index`, or `None` if it is out of the valid range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    /// Returns the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn element_at(&self, index: usize) -> &T {
        let len = self.len();
        match self.as_slice().get(index) {
            Some(value) => value,
            None => index_out_of_range(index, len),
        }
    }

    /// Returns a mutable reference to the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn element_at_mut(&mut self, index: usize) -> &mut T {
        let len = self.len();
        match self.as_mut_slice().get_mut(index) {
            Some(value) => value,
            None => index_out_of_range(index, len),
        }
    }

    /// Appends `value` if there is a free slot. Never reallocates.
    ///
    /// Returns `false`, leaving the list untouched, when the list is full.
    #[inline]
    pub fn try_add_no_resize(&mut self, value: T) -> bool {
        let len = *self.len.get_mut();
        if len == self.capacity() {
            return false;
        }
        // SAFETY: `len < capacity`, the slot is inside the storage.
        unsafe { self.storage.base().as_ptr().add(len).write(value) };
        *self.len.get_mut() = len + 1;
        true
    }

    /// Appends `value`. Never reallocates.
    ///
    /// # Panics
    ///
    /// Panics if the list is full.
    #[inline]
    pub fn add_no_resize(&mut self, value: T) {
        if !self.try_add_no_resize(value) {
            capacity_exceeded(self.len() + 1, self.capacity());
        }
    }

    /// Appends all of `values` if they fit, or nothing at all.
    pub fn try_add_range_no_resize(&mut self, values: &[T]) -> bool {
        let len = *self.len.get_mut();
        if values.len() > self.capacity() - len {
            return false;
        }
        // SAFETY: `[len, len + values.len())` lies inside the storage and
        // cannot overlap `values`, which is borrowed from elsewhere.
        unsafe {
            std::ptr::copy_nonoverlapping(
                values.as_ptr(),
                self.storage.base().as_ptr().add(len),
                values.len(),
            );
        }
        *self.len.get_mut() = len + values.len();
        true
    }

    /// Discards the last element and returns it. No data is moved.
    ///
    /// To discard an arbitrary element in O(1), use
    /// [`remove_at_swap_back`](Self::remove_at_swap_back).
    #[inline]
    pub fn remove_last(&mut self) -> Option<T> {
        let len = *self.len.get_mut();
        if len == 0 {
            return None;
        }
        *self.len.get_mut() = len - 1;
        // SAFETY: slot `len - 1` was initialized and is still inside the storage.
        Some(unsafe { self.storage.base().as_ptr().add(len - 1).read() })
    }

    /// Removes the element at `index` by moving the last element into its slot.
    /// Does not preserve order. O(1).
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove_at_swap_back(&mut self, index: usize) -> T {
        let len = self.len();
        if index >= len {
            index_out_of_range(index, len);
        }
        let slice = self.as_mut_slice();
        let removed = slice[index];
        slice[index] = slice[len - 1];
        *self.len.get_mut() = len - 1;
        removed
    }

    /// Removes `count` elements starting at `index`, filling the hole with
    /// elements taken from the end of the list. Does not preserve order.
    ///
    /// # Panics
    ///
    /// Panics if `index + count > len()`.
    pub fn remove_range_swap_back(&mut self, index: usize, count: usize) {
        let len = self.len();
        let end = check_range(index, count, len);
        let moved = count.min(len - end);
        let base = self.as_mut_ptr();
        // SAFETY: source `[len - moved, len)` and destination
        // `[index, index + moved)` are both initialized and disjoint, because
        // `index + moved <= end <= len - moved` whenever `moved > 0`.
        unsafe { std::ptr::copy_nonoverlapping(base.add(len - moved), base.add(index), moved) };
        *self.len.get_mut() = len - count;
    }

    /// Removes `count` elements starting at `index`, shifting the tail down.
    /// Preserves the relative order of the remaining elements.
    /// O(`len - index`).
    ///
    /// # Panics
    ///
    /// Panics if `index + count > len()`.
    pub fn remove_range(&mut self, index: usize, count: usize) {
        let len = self.len();
        let end = check_range(index, count, len);
        self.as_mut_slice().copy_within(end..len, index);
        *self.len.get_mut() = len - count;
    }

    /// Removes the element at `index`, shifting the tail down.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove_at(&mut self, index: usize) -> T {
        let removed = *self.element_at(index);
        self.remove_range(index, 1);
        removed
    }

    /// Shortens the list to `len` elements. Has no effect if `len >= self.len()`.
    #[inline]
    pub fn truncate(&mut self, len: usize) {
        let current = self.len.get_mut();
        if len < *current {
            *current = len;
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        *self.len.get_mut() = 0;
    }

    /// Assigns `value` to every element in `[start, start + count)`.
    ///
    /// # Panics
    ///
    /// Panics if `start + count > len()`.
    pub fn fill(&mut self, value: T, start: usize, count: usize) {
        let end = check_range(start, count, self.len());
        self.as_mut_slice()[start..end].fill(value);
    }

    /// Sets the length to `new_len` without growing the storage. Slots exposed
    /// by growing are set to `value`; shrinking only truncates.
    ///
    /// # Panics
    ///
    /// Panics if `new_len > capacity()`.
    pub fn resize_within_capacity(&mut self, new_len: usize, value: T) {
        let capacity = self.capacity();
        if new_len > capacity {
            capacity_exceeded(new_len, capacity);
        }
        let len = *self.len.get_mut();
        if new_len > len {
            // SAFETY: `[len, new_len)` lies inside the storage.
            let tail = unsafe {
                std::slice::from_raw_parts_mut(
                    self.storage.base().as_ptr().add(len).cast::<std::mem::MaybeUninit<T>>(),
                    new_len - len,
                )
            };
            tail.fill(std::mem::MaybeUninit::new(value));
        }
        *self.len.get_mut() = new_len;
    }

    /// Sets the length to `new_len` without initializing anything.
    ///
    /// # Safety
    ///
    /// `new_len` must not exceed `capacity()`, and every slot in
    /// `[len(), new_len)` must already hold a valid value of `T`.
    #[inline]
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity());
        *self.len.get_mut() = new_len;
    }

    /// Returns `true` if some element equals `value`.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.as_slice().contains(value)
    }

    /// Index of the first element equal to `value`.
    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.as_slice().iter().position(|v| v == value)
    }

    /// A read-only window over `range` of the valid elements.
    ///
    /// # Panics
    ///
    /// Panics if the range is inverted or ends past `len()`.
    pub fn view(&self, range: impl RangeBounds<usize>) -> &[T] {
        let range = verify_range(range, self.len());
        &self.as_slice()[range]
    }

    /// A mutable window over `range` of the valid elements. Writes are visible
    /// through the list.
    ///
    /// # Panics
    ///
    /// Panics if the range is inverted or ends past `len()`.
    pub fn view_mut(&mut self, range: impl RangeBounds<usize>) -> &mut [T] {
        let range = verify_range(range, self.len());
        &mut self.as_mut_slice()[range]
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.as_slice())
    }

    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut::new(self.as_mut_slice())
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Compares the raw bytes of the valid regions of both lists.
    ///
    /// Equivalent to `==` for element types whose equality is bitwise; differs
    /// for types like `f32` where `0.0 == -0.0` and `NaN != NaN`.
    pub fn memory_eq<S2: Storage<T>>(&self, other: &List<T, S2>) -> bool
    where
        T: bytemuck::NoUninit,
    {
        bytemuck::cast_slice::<T, u8>(self.as_slice())
            == bytemuck::cast_slice::<T, u8>(other.as_slice())
    }

    /// Starts a concurrent append phase.
    ///
    /// The returned writer can be copied to any number of threads. The list
    /// stays mutably borrowed until every copy is gone, so nothing can read,
    /// remove or reallocate while appends are in flight.
    pub fn parallel_writer(&mut self) -> ParallelWriter<'_, T> {
        ParallelWriter::new(self.storage.base(), self.storage.capacity(), &self.len)
    }
}

impl<T: Copy, S: Storage<T>> std::ops::Index<usize> for List<T, S> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        self.element_at(index)
    }
}

impl<T: Copy, S: Storage<T>> std::ops::IndexMut<usize> for List<T, S> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.element_at_mut(index)
    }
}

impl<T: Copy, S: Storage<T>> AsRef<[T]> for List<T, S> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy, S: Storage<T>> AsMut<[T]> for List<T, S> {
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T, S1, S2> PartialEq<List<T, S2>> for List<T, S1>
where
    T: Copy + PartialEq,
    S1: Storage<T>,
    S2: Storage<T>,
{
    fn eq(&self, other: &List<T, S2>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Copy + Eq, S: Storage<T>> Eq for List<T, S> {}

impl<T: Copy + PartialEq, S: Storage<T>> PartialEq<[T]> for List<T, S> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: Copy + PartialEq, S: Storage<T>, const N: usize> PartialEq<[T; N]> for List<T, S> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Copy + std::fmt::Debug, S: Storage<T>> std::fmt::Debug for List<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("values", &self.as_slice())
            .field("len", &self.len())
            .field("cap", &self.capacity())
            .finish_non_exhaustive()
    }
}

impl<'a, T: Copy, S: Storage<T>> IntoIterator for &'a List<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T: Copy, S: Storage<T>> IntoIterator for &'a mut List<T, S> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

#[cold]
#[track_caller]
pub(crate) fn index_out_of_range(index: usize, len: usize) -> ! {
    panic!("index out of range: the len is {len} but the index is {index}")
}

#[cold]
#[track_caller]
pub(crate) fn capacity_exceeded(requested: usize, capacity: usize) -> ! {
    panic!("capacity exceeded: requested {requested} elements, capacity is {capacity}")
}

/// Validates `[start, start + count)` against `len` and returns the end.
#[inline]
#[track_caller]
pub(crate) fn check_range(start: usize, count: usize, len: usize) -> usize {
    match start.checked_add(count) {
        Some(end) if end <= len => end,
        _ => panic!("range out of bounds: {start} + {count} exceeds length {len}"),
    }
}

/// Resolves `range` against `len`, panicking if it is inverted or ends past `len`.
#[track_caller]
pub(crate) fn verify_range(range: impl RangeBounds<usize>, len: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&n) => n.saturating_add(1),
        Bound::Excluded(&n) => n,
        Bound::Unbounded => len,
    };
    assert!(
        start <= end,
        "range start must not be greater than end: {start} > {end}"
    );
    assert!(end <= len, "range end out of bounds: {end} > {len}");
    start..end
}
