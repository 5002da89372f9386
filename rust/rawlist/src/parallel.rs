//! Lock-free concurrent appends into a pre-sized list.
//!
//! A [`ParallelWriter`] reserves slots by atomically advancing the list's
//! length and then writes into the reserved slot. Slot indices are handed out
//! in claim order; the order in which the writes complete is unspecified.
//!
//! The writer mutably borrows the list. Reading, removing and reallocating
//! are impossible while any copy of it is alive, and the end of the borrow
//! (a joined thread scope, a finished rayon call) is the point at which the
//! appended values become visible to the owner.

use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Concurrent append handle for a [`List`](crate::List).
///
/// Cheap to copy; every thread gets its own copy.
pub struct ParallelWriter<'a, T> {
    base: NonNull<T>,
    capacity: usize,
    len: &'a AtomicUsize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: writers only move `T` values into disjoint, exclusively reserved
// slots, so sharing them is sound whenever `T` itself can cross threads.
unsafe impl<T: Send> Send for ParallelWriter<'_, T> {}

// SAFETY: see above.
unsafe impl<T: Send> Sync for ParallelWriter<'_, T> {}

impl<T> Clone for ParallelWriter<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ParallelWriter<'_, T> {}

impl<'a, T: Copy> ParallelWriter<'a, T> {
    pub(crate) fn new(
        base: NonNull<T>,
        capacity: usize,
        len: &'a AtomicUsize,
    ) -> ParallelWriter<'a, T> {
        ParallelWriter {
            base,
            capacity,
            len,
            _marker: PhantomData,
        }
    }

    /// Capacity of the underlying list. Never changes while the writer lives.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots claimed so far.
    ///
    /// **Note**: the value may be outdated by the time it is observed, and may
    /// briefly exceed the capacity while a rejected claim is being rolled back.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `value` without checking the capacity.
    ///
    /// # Safety
    ///
    /// The total number of values appended through all writers of the list
    /// must not exceed its free capacity. The caller sizes the list before the
    /// concurrent phase; an excess claim writes past the end of the region.
    #[inline]
    pub unsafe fn add_unchecked_parallel(&self, value: T) {
        let index = self.len.fetch_add(1, Ordering::Relaxed);
        debug_assert!(index < self.capacity, "parallel append past capacity");
        // SAFETY: `index` is unique to this call and, by the caller's
        // guarantee, inside the region.
        unsafe { self.base.as_ptr().add(index).write(value) };
    }

    /// Appends `value` if a free slot can be claimed.
    ///
    /// A claim that lands past the end is undone before returning `false`, so
    /// once all writers are done the list length never exceeds its capacity.
    #[inline]
    pub fn try_add_parallel(&self, value: T) -> bool {
        let index = self.len.fetch_add(1, Ordering::Relaxed);
        if index >= self.capacity {
            self.len.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        // SAFETY: `index < capacity` and no other claim received it.
        unsafe { self.base.as_ptr().add(index).write(value) };
        true
    }

    /// Appends all of `values` into one contiguous block, or nothing at all.
    ///
    /// The block is reserved with a compare-exchange loop rather than an
    /// add-then-undo, since undoing a multi-slot claim could release slots
    /// another writer has already been granted.
    pub fn try_add_range_parallel(&self, values: &[T]) -> bool {
        let count = values.len();
        let mut start = self.len.load(Ordering::Relaxed);
        loop {
            if start > self.capacity || count > self.capacity - start {
                return false;
            }
            match self.len.compare_exchange_weak(
                start,
                start + count,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => start = current,
            }
        }
        // SAFETY: `[start, start + count)` lies inside the region and was
        // reserved by this call alone.
        unsafe {
            std::ptr::copy_nonoverlapping(values.as_ptr(), self.base.as_ptr().add(start), count);
        }
        true
    }
}

impl<T> std::fmt::Debug for ParallelWriter<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelWriter")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("cap", &self.capacity)
            .finish()
    }
}
