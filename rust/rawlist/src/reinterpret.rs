//! Viewing a list's memory as a different element type of the same size.
//!
//! Both element types must be [`bytemuck::Pod`], so every bit pattern of one
//! is a valid value of the other. Equal size is checked when the call is
//! compiled, alignment of the base address when it runs.

use std::ptr::NonNull;
use std::sync::atomic::AtomicUsize;

use bytemuck::Pod;

use crate::list::{List, Storage, capacity_exceeded, index_out_of_range};
use crate::region::dangling;

impl<T: Pod, S: Storage<T>> List<T, S> {
    /// Borrows the list as a list of `U` over the same slots.
    ///
    /// Length changes made through the returned handle are seen by the list.
    ///
    /// # Panics
    ///
    /// Panics if the base address is not aligned for `U`. Fails to compile if
    /// `T` and `U` differ in size.
    pub fn reinterpret<U: Pod>(&mut self) -> Reinterpreted<'_, U> {
        const { assert_same_stride::<T, U>() };
        let capacity = self.capacity();
        let base = if capacity == 0 {
            dangling::<U>(std::mem::align_of::<U>())
        } else {
            let base = self.storage.base().cast::<U>();
            assert!(
                (base.as_ptr() as usize).is_multiple_of(std::mem::align_of::<U>()),
                "base address is not aligned for the target element type"
            );
            base
        };
        Reinterpreted {
            base,
            capacity,
            len: AtomicUsize::get_mut(&mut self.len),
        }
    }

    /// The valid elements read as `U`.
    ///
    /// # Panics
    ///
    /// Panics if the base address is not aligned for `U`.
    pub fn reinterpret_slice<U: Pod>(&self) -> &[U] {
        const { assert_same_stride::<T, U>() };
        if self.is_empty() {
            return &[];
        }
        bytemuck::cast_slice(self.as_slice())
    }
}

const fn assert_same_stride<T, U>() {
    assert!(
        std::mem::size_of::<T>() == std::mem::size_of::<U>(),
        "stride mismatch: element types must have the same size"
    );
}

/// A list handle over borrowed slots, typed as `U`.
pub struct Reinterpreted<'a, U> {
    base: NonNull<U>,
    capacity: usize,
    len: &'a mut usize,
}

impl<U: Pod> Reinterpreted<'_, U> {
    #[inline]
    pub fn len(&self) -> usize {
        *self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[U] {
        // SAFETY: `[0, len)` is initialized (as `T`, and every bit pattern is
        // a valid `U`), aligned for `U`, and exclusively borrowed.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), *self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [U] {
        // SAFETY: as above.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), *self.len) }
    }

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn element_at(&self, index: usize) -> &U {
        let len = self.len();
        match self.as_slice().get(index) {
            Some(value) => value,
            None => index_out_of_range(index, len),
        }
    }

    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn element_at_mut(&mut self, index: usize) -> &mut U {
        let len = self.len();
        match self.as_mut_slice().get_mut(index) {
            Some(value) => value,
            None => index_out_of_range(index, len),
        }
    }

    /// Appends `value` if there is a free slot.
    pub fn try_add_no_resize(&mut self, value: U) -> bool {
        let len = *self.len;
        if len == self.capacity {
            return false;
        }
        // SAFETY: `len < capacity`.
        unsafe { self.base.as_ptr().add(len).write(value) };
        *self.len = len + 1;
        true
    }

    /// Appends `value`.
    ///
    /// # Panics
    ///
    /// Panics if the list is full.
    pub fn add_no_resize(&mut self, value: U) {
        if !self.try_add_no_resize(value) {
            capacity_exceeded(self.len() + 1, self.capacity);
        }
    }

    pub fn truncate(&mut self, len: usize) {
        if len < *self.len {
            *self.len = len;
        }
    }
}

impl<U: Pod + std::fmt::Debug> std::fmt::Debug for Reinterpreted<'_, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reinterpreted")
            .field("values", &self.as_slice())
            .field("cap", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{FixedList, UnsafeList};

    #[test]
    fn test_reinterpret_shares_memory_and_length() {
        let mut list =
            UnsafeList::<u32>::from_slice(&[1.0f32.to_bits(), 2.5f32.to_bits()]).unwrap();
        list.ensure_capacity(3).unwrap();
        {
            let mut floats = list.reinterpret::<f32>();
            assert_eq!(floats.as_slice(), &[1.0, 2.5]);
            *floats.element_at_mut(0) = -4.0;
            assert!(floats.try_add_no_resize(0.5));
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], (-4.0f32).to_bits());
        assert_eq!(list[2], 0.5f32.to_bits());
        assert_eq!(list.reinterpret_slice::<f32>(), &[-4.0, 2.5, 0.5]);
    }

    #[test]
    fn test_reinterpret_truncate_and_capacity() {
        let mut list = FixedList::<i64>::new(2);
        {
            let mut unsigned = list.reinterpret::<u64>();
            assert_eq!(unsigned.capacity(), 2);
            unsigned.add_no_resize(u64::MAX);
            unsigned.add_no_resize(7);
            assert!(!unsigned.try_add_no_resize(8));
            unsigned.truncate(1);
        }
        assert_eq!(list, [-1]);
    }

    #[test]
    fn test_reinterpret_empty_list() {
        let mut list = FixedList::<[u8; 4]>::new(0);
        let view = list.reinterpret::<u32>();
        assert!(view.is_empty());
        assert_eq!(view.as_slice(), &[] as &[u32]);
    }

    #[test]
    fn test_reinterpret_slice_empty_list() {
        let fixed = FixedList::<[u8; 4]>::new(0);
        assert!(fixed.reinterpret_slice::<u32>().is_empty());

        let mut growable = UnsafeList::<[u8; 4]>::new(0).unwrap();
        assert!(growable.reinterpret_slice::<u32>().is_empty());
        growable.add([1, 0, 0, 0]).unwrap();
        growable.clear();
        assert!(growable.reinterpret_slice::<u32>().is_empty());
    }

    #[test]
    #[should_panic(expected = "not aligned")]
    fn test_reinterpret_misaligned_panics() {
        #[repr(C, align(8))]
        struct Aligned([u8; 16]);
        let mut storage = Aligned([0; 16]);
        let words: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut storage.0[1..9]);
        let mut list = FixedList::from_buffer(words);
        let _ = list.reinterpret::<u32>();
    }
}
