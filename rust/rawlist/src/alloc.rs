//! Allocators that element lists can be placed on.
//!
//! Every growable list is created against an explicit [`RegionAllocator`]:
//!
//! - [`Heap`]: the process-wide global allocator.
//! - [`PageAllocator`]: page-aligned regions mapped directly from the OS.
//! - [`Budgeted`]: wraps another allocator and refuses requests beyond a byte budget.
//!
//! Shared references and `Arc`s of allocators are allocators too, so several
//! lists may draw from one [`Budgeted`] instance.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use rawlist_common_traits::region_allocator::{AllocError, AllocFailure, RegionAllocator};
pub use rawlist_page_alloc::page_allocator::PageAllocator;

/// The global allocator.
///
/// Regions are compatible with `Vec<T>` allocations of the same layout, which
/// is what makes [`UnsafeList::from_vec`](crate::UnsafeList::from_vec) possible.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Heap;

// SAFETY: delegates to the global allocator, which upholds the contract.
unsafe impl RegionAllocator for Heap {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert_ne!(layout.size(), 0);
        // SAFETY: regions are never zero-sized.
        let ptr = unsafe { std::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| AllocError::new(layout, AllocFailure::OutOfMemory))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded to the caller.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        debug_assert_eq!(old_layout.align(), new_layout.align());
        // SAFETY: same alignment, live region, non-zero new size.
        let new_ptr = unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_layout.size()) };
        NonNull::new(new_ptr).ok_or_else(|| AllocError::new(new_layout, AllocFailure::OutOfMemory))
    }

    fn name(&self) -> &'static str {
        "heap"
    }
}

/// An allocator that enforces an upper bound on the total number of bytes
/// held by the regions it hands out.
///
/// The budget is tracked with a lock-free counter, so a single `Budgeted`
/// can be shared by lists living on different threads.
pub struct Budgeted<A> {
    inner: A,
    limit: usize,
    remaining: AtomicUsize,
}

impl<A: RegionAllocator> Budgeted<A> {
    /// Wraps `inner`, allowing at most `limit` bytes to be live at once.
    pub fn new(inner: A, limit: usize) -> Budgeted<A> {
        Budgeted {
            inner,
            limit,
            remaining: AtomicUsize::new(limit),
        }
    }

    /// The configured byte budget.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes that can still be allocated.
    ///
    /// **Note**: intended for diagnostics; the value may be outdated by the time
    /// it is observed in a concurrent environment.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    fn withdraw(&self, amount: usize) -> bool {
        let mut current = self.remaining.load(Ordering::Relaxed);
        while current >= amount {
            match self.remaining.compare_exchange_weak(
                current,
                current - amount,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(updated) => current = updated,
            }
        }
        false
    }

    fn deposit(&self, amount: usize) {
        self.remaining.fetch_add(amount, Ordering::Release);
    }
}

// SAFETY: every region comes from `inner` unchanged; the budget only decides
// whether a request is forwarded.
unsafe impl<A: RegionAllocator> RegionAllocator for Budgeted<A> {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        if !self.withdraw(layout.size()) {
            return Err(AllocError::new(layout, AllocFailure::BudgetExceeded));
        }
        self.inner.allocate(layout).inspect_err(|_| {
            self.deposit(layout.size());
        })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.inner.deallocate(ptr, layout) };
        self.deposit(layout.size());
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_layout: Layout,
    ) -> Result<NonNull<u8>, AllocError> {
        let (old_size, new_size) = (old_layout.size(), new_layout.size());
        if new_size > old_size && !self.withdraw(new_size - old_size) {
            return Err(AllocError::new(new_layout, AllocFailure::BudgetExceeded));
        }
        match unsafe { self.inner.reallocate(ptr, old_layout, new_layout) } {
            Ok(new_ptr) => {
                if new_size < old_size {
                    self.deposit(old_size - new_size);
                }
                Ok(new_ptr)
            }
            Err(e) => {
                if new_size > old_size {
                    self.deposit(new_size - old_size);
                }
                Err(e)
            }
        }
    }

    fn name(&self) -> &'static str {
        "budgeted"
    }
}

impl<A> std::fmt::Debug for Budgeted<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Budgeted")
            .field("limit", &self.limit)
            .field("remaining", &self.remaining.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
