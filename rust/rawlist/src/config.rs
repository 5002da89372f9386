//! Growth and alignment configuration for growable lists.

use rawlist_common::{Result, verify_arg};

/// Controls how a growable list picks a new capacity and how its region is aligned.
///
/// Validated when a list is created; immutable for the lifetime of the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrowthPolicy {
    min_capacity: usize,
    factor: usize,
    alignment: usize,
}

impl GrowthPolicy {
    /// Smallest capacity an automatically grown list will allocate.
    pub const DEFAULT_MIN_CAPACITY: usize = 8;

    /// Capacity multiplier applied on automatic growth.
    pub const DEFAULT_FACTOR: usize = 2;

    pub const fn new() -> GrowthPolicy {
        GrowthPolicy {
            min_capacity: Self::DEFAULT_MIN_CAPACITY,
            factor: Self::DEFAULT_FACTOR,
            alignment: 0,
        }
    }

    /// Sets the smallest capacity chosen by automatic growth.
    pub const fn with_min_capacity(mut self, min_capacity: usize) -> GrowthPolicy {
        self.min_capacity = min_capacity;
        self
    }

    /// Sets the capacity multiplier. Must be at least 2.
    pub const fn with_factor(mut self, factor: usize) -> GrowthPolicy {
        self.factor = factor;
        self
    }

    /// Requests a minimum alignment (in bytes) for the element region, on top
    /// of the element type's natural alignment. Must be a power of two.
    pub const fn with_alignment(mut self, alignment: usize) -> GrowthPolicy {
        self.alignment = alignment;
        self
    }

    pub fn min_capacity(&self) -> usize {
        self.min_capacity
    }

    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Checks that the policy can be used to create a list.
    pub fn validate(&self) -> Result<()> {
        verify_arg!(factor, self.factor >= 2);
        verify_arg!(
            alignment,
            self.alignment == 0 || self.alignment.is_power_of_two()
        );
        Ok(())
    }

    /// Effective region alignment for elements of type `T`.
    pub fn alignment_for<T>(&self) -> usize {
        self.alignment.max(std::mem::align_of::<T>())
    }

    /// Capacity to grow to when `required` elements must fit and the list
    /// currently holds `current`.
    pub fn next_capacity(&self, current: usize, required: usize) -> usize {
        current
            .saturating_mul(self.factor)
            .max(required)
            .max(self.min_capacity)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::new()
    }
}
