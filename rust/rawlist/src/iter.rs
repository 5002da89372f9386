//! Element iterators over the valid range of a list.
//!
//! Iterators borrow the list, so the list cannot change underneath them.

use std::iter::FusedIterator;

/// Forward (and backward) cursor over `&T` elements of a list.
#[derive(Clone)]
pub struct Iter<'a, T> {
    inner: std::slice::Iter<'a, T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(values: &'a [T]) -> Iter<'a, T> {
        Iter {
            inner: values.iter(),
        }
    }

    /// The elements not yet yielded.
    pub fn as_slice(&self) -> &'a [T] {
        self.inner.as_slice()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<&'a T> {
        self.inner.nth(n)
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Iter").field(&self.as_slice()).finish()
    }
}

/// Cursor over `&mut T` elements of a list.
pub struct IterMut<'a, T> {
    inner: std::slice::IterMut<'a, T>,
}

impl<'a, T> IterMut<'a, T> {
    pub(crate) fn new(values: &'a mut [T]) -> IterMut<'a, T> {
        IterMut {
            inner: values.iter_mut(),
        }
    }
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

#[cfg(test)]
mod tests {
    use crate::{FixedList, UnsafeList};

    #[test]
    fn test_iter_visits_valid_range_only() {
        let mut buffer = [9u8; 6];
        let list = FixedList::from_buffer_with_len(&mut buffer, 4);
        let mut iter = list.iter();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some(&9));
        assert_eq!(iter.next_back(), Some(&9));
        assert_eq!(iter.as_slice().len(), 2);
        assert_eq!(iter.by_ref().count(), 2);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_iter_mut_writes_through() {
        let mut list = UnsafeList::<i32>::from_slice(&[1, 2, 3]).unwrap();
        for v in &mut list {
            *v *= 10;
        }
        let collected: Vec<i32> = (&list).into_iter().copied().collect();
        assert_eq!(collected, vec![10, 20, 30]);
        assert_eq!(list.iter().rev().copied().collect::<Vec<_>>(), vec![30, 20, 10]);
    }
}
