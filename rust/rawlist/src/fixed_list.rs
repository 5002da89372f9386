//! Fixed-capacity lists over borrowed or self-owned storage.

use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use rawlist_common::Result;

use crate::alloc::Heap;
use crate::list::{List, Storage, capacity_exceeded, sealed};
use crate::region::{OwnedRegion, assert_element_size};

/// A list whose capacity is fixed for its whole lifetime.
///
/// The storage is either borrowed from the caller (see
/// [`from_buffer`](FixedList::from_buffer)) or allocated once by the list
/// itself (see [`new`](FixedList::new)) and released when the list is dropped.
/// A fixed list never reallocates, so raw addresses stay valid as long as the
/// list is alive.
pub type FixedList<'a, T> = List<T, FixedStorage<'a, T>>;

/// Storage of a [`FixedList`]: caller memory or a self-owned region.
pub struct FixedStorage<'a, T> {
    repr: Repr<'a, T>,
}

enum Repr<'a, T> {
    Borrowed {
        ptr: NonNull<T>,
        capacity: usize,
        _marker: PhantomData<&'a mut [T]>,
    },
    Owned(OwnedRegion<T, Heap>),
}

// SAFETY: a borrowed region is an exclusive borrow, an owned region is
// exclusively owned; both are as thread-safe as `&mut [T]`.
unsafe impl<T: Send> Send for FixedStorage<'_, T> {}

// SAFETY: see above.
unsafe impl<T: Sync> Sync for FixedStorage<'_, T> {}

impl<T> sealed::Sealed for FixedStorage<'_, T> {}

// SAFETY: the borrowed pointer comes from a live `&'a mut` slice of
// `capacity` elements; the owned region is valid until dropped.
unsafe impl<T> Storage<T> for FixedStorage<'_, T> {
    #[inline]
    fn base(&self) -> NonNull<T> {
        match &self.repr {
            Repr::Borrowed { ptr, .. } => *ptr,
            Repr::Owned(region) => region.ptr(),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        match &self.repr {
            Repr::Borrowed { capacity, .. } => *capacity,
            Repr::Owned(region) => region.capacity(),
        }
    }
}

impl<T: Copy> FixedList<'static, T> {
    /// Allocates an empty list able to hold exactly `capacity` elements.
    pub fn try_new(capacity: usize) -> Result<FixedList<'static, T>> {
        let region = OwnedRegion::allocate(capacity, std::mem::align_of::<T>(), Heap)?;
        Ok(List::from_storage(
            FixedStorage {
                repr: Repr::Owned(region),
            },
            0,
        ))
    }

    /// Allocates an empty list able to hold exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if the allocation fails. See [`try_new`](Self::try_new).
    pub fn new(capacity: usize) -> FixedList<'static, T> {
        match Self::try_new(capacity) {
            Ok(list) => list,
            Err(e) => panic!("failed to create fixed list: {e}"),
        }
    }

    /// Allocates a list holding a copy of `values`, with no spare capacity.
    pub fn from_slice(values: &[T]) -> FixedList<'static, T> {
        let mut list = Self::new(values.len());
        list.add_range(values);
        list
    }
}

impl<'a, T: Copy> FixedList<'a, T> {
    /// Wraps caller memory as an empty list of capacity `buffer.len()`.
    ///
    /// The current contents of `buffer` are ignored and may be overwritten.
    pub fn from_buffer(buffer: &'a mut [T]) -> FixedList<'a, T> {
        Self::from_buffer_with_len(buffer, 0)
    }

    /// Wraps caller memory whose first `len` elements are already valid.
    ///
    /// # Panics
    ///
    /// Panics if `len > buffer.len()`.
    pub fn from_buffer_with_len(buffer: &'a mut [T], len: usize) -> FixedList<'a, T> {
        assert_element_size::<T>();
        let capacity = buffer.len();
        let ptr = NonNull::from(buffer).cast::<T>();
        List::from_storage(Self::borrowed(ptr, capacity), len)
    }

    /// Wraps uninitialized caller memory as an empty list.
    pub fn from_uninit(buffer: &'a mut [MaybeUninit<T>]) -> FixedList<'a, T> {
        assert_element_size::<T>();
        let capacity = buffer.len();
        let ptr = NonNull::from(buffer).cast::<T>();
        List::from_storage(Self::borrowed(ptr, capacity), 0)
    }

    fn borrowed(ptr: NonNull<T>, capacity: usize) -> FixedStorage<'a, T> {
        FixedStorage {
            repr: Repr::Borrowed {
                ptr,
                capacity,
                _marker: PhantomData,
            },
        }
    }

    /// Returns `true` if the storage belongs to the caller.
    pub fn is_borrowed(&self) -> bool {
        matches!(self.storage.repr, Repr::Borrowed { .. })
    }

    /// Returns `true` if the storage is released when the list is dropped.
    pub fn is_owned(&self) -> bool {
        matches!(self.storage.repr, Repr::Owned(_))
    }

    /// Appends `value`.
    ///
    /// # Panics
    ///
    /// Panics if the list is full.
    #[inline]
    pub fn add(&mut self, value: T) {
        self.add_no_resize(value);
    }

    /// Appends `value` if there is room. Returns `false` without touching the
    /// list when it is full.
    #[inline]
    pub fn try_add(&mut self, value: T) -> bool {
        self.try_add_no_resize(value)
    }

    /// Appends all of `values`.
    ///
    /// # Panics
    ///
    /// Panics if they do not fit; nothing is appended in that case.
    pub fn add_range(&mut self, values: &[T]) {
        if !self.try_add_range_no_resize(values) {
            capacity_exceeded(self.len() + values.len(), self.capacity());
        }
    }

    /// Sets the length to `new_len`, filling new slots with `value`.
    ///
    /// # Panics
    ///
    /// Panics if `new_len > capacity()`.
    pub fn resize(&mut self, new_len: usize, value: T) {
        self.resize_within_capacity(new_len, value);
    }

    /// Sets the length to `new_len`, filling new slots with zero bytes.
    ///
    /// # Panics
    ///
    /// Panics if `new_len > capacity()`.
    pub fn resize_zeroed(&mut self, new_len: usize)
    where
        T: bytemuck::Zeroable,
    {
        self.resize_within_capacity(new_len, T::zeroed());
    }

    /// Replaces the contents with a copy of `values`.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() > capacity()`.
    pub fn copy_from(&mut self, values: &[T]) {
        self.clear();
        self.add_range(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_add_at_capacity() {
        let mut list = FixedList::<i32>::new(4);
        list.add(1);
        list.add(2);
        list.add(3);
        assert_eq!(list.len(), 3);
        assert!(list.try_add(4));
        assert_eq!(list.len(), 4);
        assert!(!list.try_add(5));
        assert_eq!(list.len(), 4);
        assert_eq!(list, [1, 2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "capacity exceeded")]
    fn test_add_past_capacity_panics() {
        let mut list = FixedList::<u8>::new(1);
        list.add(1);
        list.add(2);
    }

    #[test]
    fn test_borrowed_buffer_sees_writes() {
        let mut buffer = [0u32; 8];
        {
            let mut list = FixedList::from_buffer(&mut buffer);
            assert!(list.is_borrowed());
            assert!(list.is_empty());
            assert_eq!(list.capacity(), 8);
            list.add_range(&[7, 8, 9]);
            list[1] = 80;
        }
        assert_eq!(&buffer[..4], &[7, 80, 9, 0]);
    }

    #[test]
    fn test_borrowed_buffer_with_len() {
        let mut buffer = [5u16, 6, 7, 0];
        let mut list = FixedList::from_buffer_with_len(&mut buffer, 3);
        assert_eq!(list, [5, 6, 7]);
        assert_eq!(list.remove_last(), Some(7));
        assert_eq!(list.len(), 2);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_borrowed_buffer_len_too_large() {
        let mut buffer = [0u8; 2];
        let _ = FixedList::from_buffer_with_len(&mut buffer, 3);
    }

    #[test]
    fn test_uninit_buffer() {
        let mut buffer = [MaybeUninit::<u64>::uninit(); 3];
        let mut list = FixedList::from_uninit(&mut buffer);
        list.add(1);
        list.add(2);
        list.resize(3, 9);
        assert_eq!(list.to_vec(), vec![1, 2, 9]);
        assert!(list.is_full());
    }

    #[test]
    fn test_zero_capacity() {
        let mut list = FixedList::<u32>::new(0);
        assert!(list.is_owned());
        assert!(list.is_full());
        assert!(!list.try_add(1));
        assert_eq!(list.iter().count(), 0);

        let mut empty: [u32; 0] = [];
        let mut list = FixedList::from_buffer(&mut empty);
        assert!(!list.try_add(1));
    }

    #[test]
    fn test_resize_fills_new_slots() {
        let mut list = FixedList::<i64>::new(10);
        list.add_range(&[1, 2, 3]);
        list.resize(6, -1);
        assert_eq!(list, [1, 2, 3, -1, -1, -1]);
        list.resize(2, 100);
        assert_eq!(list, [1, 2]);
        list.resize_zeroed(4);
        assert_eq!(list, [1, 2, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "capacity exceeded")]
    fn test_resize_past_capacity_panics() {
        let mut list = FixedList::<i64>::new(2);
        list.resize(3, 0);
    }

    #[test]
    fn test_add_range_is_all_or_nothing() {
        let mut list = FixedList::<u8>::new(4);
        list.add_range(&[1, 2]);
        assert!(!list.try_add_range_no_resize(&[3, 4, 5]));
        assert_eq!(list, [1, 2]);
        assert!(list.try_add_range_no_resize(&[3, 4]));
        assert_eq!(list, [1, 2, 3, 4]);
    }

    #[test]
    fn test_copy_from() {
        let mut list = FixedList::from_slice(&[1u32, 2, 3, 4]);
        assert_eq!(list.capacity(), 4);
        list.copy_from(&[9, 8]);
        assert_eq!(list, [9, 8]);
    }

    #[test]
    fn test_owned_and_borrowed_compare_equal() {
        let mut buffer = [0i32; 3];
        let mut borrowed = FixedList::from_buffer(&mut buffer);
        borrowed.add_range(&[4, 5, 6]);
        let owned = FixedList::from_slice(&[4, 5, 6]);
        assert_eq!(borrowed, owned);
        assert!(borrowed.memory_eq(&owned));
    }
}
